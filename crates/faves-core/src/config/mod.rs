//! Client configuration for talking to the favorites API.
//!
//! Values come from explicit arguments (CLI profiles) or the environment:
//! `FAVES_API_BASE_URL`, `FAVES_ACCESS_TOKEN`, `FAVES_REQUEST_TIMEOUT_SECS`.

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::util::{normalize_base_url, normalize_text_option};

/// Default per-request timeout; a timed out request counts as a failure.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

const BASE_URL_VAR: &str = "FAVES_API_BASE_URL";
const ACCESS_TOKEN_VAR: &str = "FAVES_ACCESS_TOKEN";
const TIMEOUT_VAR: &str = "FAVES_REQUEST_TIMEOUT_SECS";

#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Normalized base URL without trailing slash
    pub api_base_url: String,
    /// Bearer token for the current user
    pub access_token: Option<String>,
    pub request_timeout: Duration,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ClientConfig")
            .field("api_base_url", &self.api_base_url)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl ClientConfig {
    /// Build a config from explicit values, validating the base URL.
    pub fn new(api_base_url: &str, access_token: Option<String>) -> Result<Self> {
        Ok(Self {
            api_base_url: normalize_base_url(api_base_url).map_err(Error::Config)?,
            access_token: normalize_text_option(access_token),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        })
    }

    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Read configuration from the process environment.
    ///
    /// Returns `Ok(None)` when no base URL is configured.
    pub fn from_env() -> Result<Option<Self>> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Option<Self>> {
        let Some(base_url) = normalize_text_option(lookup(BASE_URL_VAR)) else {
            return Ok(None);
        };

        let mut config = Self::new(&base_url, lookup(ACCESS_TOKEN_VAR))?;
        if let Some(raw) = normalize_text_option(lookup(TIMEOUT_VAR)) {
            let secs = raw.parse::<u64>().ok().filter(|secs| *secs > 0).ok_or_else(|| {
                Error::Config(format!("{TIMEOUT_VAR} must be a positive integer"))
            })?;
            config.request_timeout = Duration::from_secs(secs);
        }
        Ok(Some(config))
    }
}
