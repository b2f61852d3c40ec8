//! Favorite model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::util::normalize_text_option;

/// Prefix that marks a locally minted, not yet confirmed favorite id.
pub const TEMPORARY_ID_PREFIX: &str = "tmp-";

/// Identifier of a favorite.
///
/// Locally created favorites carry a temporary id (`tmp-<uuid v7>`) until the
/// server confirms them; confirmed favorites carry the server's opaque id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FavoriteId {
    /// Client-minted id, time-sortable and never reused
    Temporary(Uuid),
    /// Server-issued id
    Server(String),
}

impl FavoriteId {
    /// Mint a fresh temporary id using UUID v7
    #[must_use]
    pub fn temporary() -> Self {
        Self::Temporary(Uuid::now_v7())
    }

    /// Wrap a server-issued id, rejecting blanks and the temporary prefix
    pub fn server(id: impl Into<String>) -> Result<Self> {
        let id = normalize_text_option(Some(id.into()))
            .ok_or_else(|| Error::InvalidFavoriteShape("favorite id must not be empty".into()))?;
        if id.starts_with(TEMPORARY_ID_PREFIX) {
            return Err(Error::InvalidFavoriteShape(format!(
                "server favorite id '{id}' uses the reserved '{TEMPORARY_ID_PREFIX}' prefix"
            )));
        }
        Ok(Self::Server(id))
    }

    #[must_use]
    pub const fn is_temporary(&self) -> bool {
        matches!(self, Self::Temporary(_))
    }
}

impl fmt::Display for FavoriteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Temporary(uuid) => write!(f, "{TEMPORARY_ID_PREFIX}{uuid}"),
            Self::Server(id) => f.write_str(id),
        }
    }
}

impl FromStr for FavoriteId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().strip_prefix(TEMPORARY_ID_PREFIX) {
            Some(raw) => Uuid::parse_str(raw).map(Self::Temporary).map_err(|error| {
                Error::InvalidFavoriteShape(format!("invalid temporary favorite id '{s}': {error}"))
            }),
            None => Self::server(s),
        }
    }
}

impl TryFrom<String> for FavoriteId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<FavoriteId> for String {
    fn from(value: FavoriteId) -> Self {
        value.to_string()
    }
}

/// Kind of item a favorite points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Catalog,
    Product,
}

impl TargetKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Catalog => "catalog",
            Self::Product => "product",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "catalog" => Ok(Self::Catalog),
            "product" => Ok(Self::Product),
            other => Err(Error::InvalidInput(format!(
                "unknown favorite target kind '{other}' (expected catalog or product)"
            ))),
        }
    }
}

/// The `(target_kind, target_id)` pair a favorite is unique on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetKey {
    pub kind: TargetKind,
    pub target_id: String,
}

impl TargetKey {
    pub fn new(kind: TargetKind, target_id: impl Into<String>) -> Self {
        Self {
            kind,
            target_id: target_id.into(),
        }
    }

    /// Build a key from user input, trimming the id and rejecting blanks
    pub fn parse(kind: TargetKind, target_id: &str) -> Result<Self> {
        let target_id = normalize_text_option(Some(target_id.to_string())).ok_or_else(|| {
            Error::InvalidFavoriteShape(format!("{kind} id must not be empty"))
        })?;
        Ok(Self::new(kind, target_id))
    }
}

impl fmt::Display for TargetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.target_id)
    }
}

/// A user's marking of exactly one catalog or product as favorited
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Favorite {
    /// Temporary until the server confirms the create
    pub id: FavoriteId,
    pub target_kind: TargetKind,
    pub target_id: String,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
}

impl Favorite {
    /// Synthesize an unconfirmed favorite for `key`, stamped with the current time
    #[must_use]
    pub fn optimistic(key: &TargetKey) -> Self {
        Self {
            id: FavoriteId::temporary(),
            target_kind: key.kind,
            target_id: key.target_id.clone(),
            created_at: Utc::now().timestamp_millis(),
        }
    }

    #[must_use]
    pub fn key(&self) -> TargetKey {
        TargetKey::new(self.target_kind, self.target_id.clone())
    }

    #[must_use]
    pub fn matches(&self, kind: TargetKind, target_id: &str) -> bool {
        self.target_kind == kind && self.target_id == target_id
    }

    /// Check the entity before it is accepted into a collection
    pub fn validate(&self) -> Result<()> {
        if self.target_id.trim().is_empty() {
            return Err(Error::InvalidFavoriteShape(format!(
                "favorite {} has an empty {} id",
                self.id, self.target_kind
            )));
        }
        if self.target_id.trim() != self.target_id {
            return Err(Error::InvalidFavoriteShape(format!(
                "favorite {} has surrounding whitespace in its {} id",
                self.id, self.target_kind
            )));
        }
        Ok(())
    }
}

/// Favorite as exchanged with the server.
///
/// Exactly one of `catalog_id`/`product_id` is populated; `target_kind` is
/// optional on the wire and, when present, must agree with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteRecord {
    pub id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_kind: Option<TargetKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
}

impl FavoriteRecord {
    pub fn new(
        id: impl Into<String>,
        key: &TargetKey,
        created_at: DateTime<Utc>,
    ) -> Self {
        let (catalog_id, product_id) = match key.kind {
            TargetKind::Catalog => (Some(key.target_id.clone()), None),
            TargetKind::Product => (None, Some(key.target_id.clone())),
        };
        Self {
            id: id.into(),
            created_at,
            target_kind: Some(key.kind),
            catalog_id,
            product_id,
        }
    }
}

impl TryFrom<FavoriteRecord> for Favorite {
    type Error = Error;

    fn try_from(record: FavoriteRecord) -> Result<Self> {
        let key = validate(&record)?;
        let favorite = Self {
            id: FavoriteId::server(record.id)?,
            target_kind: key.kind,
            target_id: key.target_id,
            created_at: record.created_at.timestamp_millis(),
        };
        favorite.validate()?;
        Ok(favorite)
    }
}

/// Validate a wire record's shape and derive its target.
///
/// Fails when neither or both of catalog/product ids are set (blank strings
/// count as unset), or when `target_kind` disagrees with the populated id.
pub fn validate(candidate: &FavoriteRecord) -> Result<TargetKey> {
    let catalog_id = normalize_text_option(candidate.catalog_id.clone());
    let product_id = normalize_text_option(candidate.product_id.clone());

    let key = match (catalog_id, product_id) {
        (Some(catalog_id), None) => TargetKey::new(TargetKind::Catalog, catalog_id),
        (None, Some(product_id)) => TargetKey::new(TargetKind::Product, product_id),
        (None, None) => {
            return Err(Error::InvalidFavoriteShape(format!(
                "favorite {} has neither a catalog id nor a product id",
                candidate.id
            )))
        }
        (Some(_), Some(_)) => {
            return Err(Error::InvalidFavoriteShape(format!(
                "favorite {} has both a catalog id and a product id",
                candidate.id
            )))
        }
    };

    if let Some(kind) = candidate.target_kind {
        if kind != key.kind {
            return Err(Error::InvalidFavoriteShape(format!(
                "favorite {} declares kind {kind} but carries a {} id",
                candidate.id, key.kind
            )));
        }
    }

    Ok(key)
}

/// Body of a create-favorite request: the kind-specific identifier only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateFavoriteRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
}

impl CreateFavoriteRequest {
    #[must_use]
    pub fn for_target(key: &TargetKey) -> Self {
        match key.kind {
            TargetKind::Catalog => Self {
                catalog_id: Some(key.target_id.clone()),
                product_id: None,
            },
            TargetKind::Product => Self {
                catalog_id: None,
                product_id: Some(key.target_id.clone()),
            },
        }
    }

    /// Resolve the requested target, applying the same shape rules as records
    pub fn target(&self) -> Result<TargetKey> {
        validate(&FavoriteRecord {
            id: "<new>".to_string(),
            created_at: DateTime::<Utc>::default(),
            target_kind: None,
            catalog_id: self.catalog_id.clone(),
            product_id: self.product_id.clone(),
        })
    }
}
