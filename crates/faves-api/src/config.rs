use std::collections::HashMap;
use std::env;
use std::fmt;

use thiserror::Error;

const BIND_ADDR_VAR: &str = "FAVES_API_BIND_ADDR";
const TOKENS_VAR: &str = "FAVES_API_TOKENS";
const SEED_CATALOGS_VAR: &str = "FAVES_API_SEED_CATALOGS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// A catalog created in `pending_approval` at start-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedCatalog {
    pub id: String,
    pub name: String,
}

#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    /// Bearer token -> user id
    pub tokens: HashMap<String, String>,
    pub seed_catalogs: Vec<SeedCatalog>,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut users = self.tokens.values().collect::<Vec<_>>();
        users.sort();
        formatter
            .debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("tokens", &format!("[REDACTED; users={users:?}]"))
            .field("seed_catalogs", &self.seed_catalogs)
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = value_or_default(&lookup, BIND_ADDR_VAR, "127.0.0.1:8080");
        let tokens = parse_tokens(&required_trimmed(&lookup, TOKENS_VAR)?)?;
        let seed_catalogs = optional_trimmed(&lookup, SEED_CATALOGS_VAR)
            .map(|raw| parse_seed_catalogs(&raw))
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            bind_addr,
            tokens,
            seed_catalogs,
        })
    }
}

/// Parse comma separated `token=user` pairs.
fn parse_tokens(raw: &str) -> Result<HashMap<String, String>, ConfigError> {
    let mut tokens = HashMap::new();
    for (token, user) in parse_pairs(raw, TOKENS_VAR)? {
        if tokens.insert(token, user).is_some() {
            return Err(ConfigError::Invalid(format!(
                "{TOKENS_VAR} lists the same token twice"
            )));
        }
    }
    if tokens.is_empty() {
        return Err(ConfigError::MissingVar(TOKENS_VAR));
    }
    Ok(tokens)
}

/// Parse comma separated `id=name` pairs.
fn parse_seed_catalogs(raw: &str) -> Result<Vec<SeedCatalog>, ConfigError> {
    let mut seen = std::collections::HashSet::new();
    let mut catalogs = Vec::new();
    for (id, name) in parse_pairs(raw, SEED_CATALOGS_VAR)? {
        if !seen.insert(id.clone()) {
            return Err(ConfigError::Invalid(format!(
                "{SEED_CATALOGS_VAR} lists catalog '{id}' twice"
            )));
        }
        catalogs.push(SeedCatalog { id, name });
    }
    Ok(catalogs)
}

fn parse_pairs(raw: &str, name: &str) -> Result<Vec<(String, String)>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (left, right) = entry
                .split_once('=')
                .map(|(left, right)| (left.trim(), right.trim()))
                .filter(|(left, right)| !left.is_empty() && !right.is_empty())
                .ok_or_else(|| {
                    ConfigError::Invalid(format!("{name} entries must look like `key=value`"))
                })?;
            Ok((left.to_string(), right.to_string()))
        })
        .collect()
}

fn value_or_default(lookup: impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    optional_trimmed(lookup, name).unwrap_or_else(|| default.to_string())
}

fn required_trimmed(
    lookup: impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<String, ConfigError> {
    optional_trimmed(lookup, name).ok_or(ConfigError::MissingVar(name))
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
