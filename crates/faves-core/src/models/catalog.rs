//! Catalog status as reported by the catalog service.
//!
//! The publication lifecycle (`pending_approval → approved → published`, with
//! `revert` from `published` back to `approved`) is owned by the server. The
//! client only reads and displays it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Publication status of a catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogStatus {
    PendingApproval,
    Approved,
    Published,
}

impl CatalogStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PendingApproval => "pending_approval",
            Self::Approved => "approved",
            Self::Published => "published",
        }
    }

    /// Human-readable label for list output
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::PendingApproval => "Pending approval",
            Self::Approved => "Approved",
            Self::Published => "Published",
        }
    }

    #[must_use]
    pub const fn is_public(self) -> bool {
        matches!(self, Self::Published)
    }
}

impl fmt::Display for CatalogStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CatalogStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "pending_approval" => Ok(Self::PendingApproval),
            "approved" => Ok(Self::Approved),
            "published" => Ok(Self::Published),
            other => Err(Error::InvalidInput(format!(
                "unknown catalog status '{other}'"
            ))),
        }
    }
}

/// Read-only view of a catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub id: String,
    pub name: String,
    pub status: CatalogStatus,
    pub updated_at: DateTime<Utc>,
}
