//! Error types for faves-core

use thiserror::Error;

use crate::client::ApiError;
use crate::models::TargetKey;

/// Result type alias using faves-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in faves-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed favorite, rejected before it reaches the cache
    #[error("Invalid favorite shape: {0}")]
    InvalidFavoriteShape(String),

    /// Create request failed; the optimistic insert was rolled back
    #[error("Failed to add favorite {target}: {source}")]
    AddFavoriteFailed {
        target: TargetKey,
        #[source]
        source: ApiError,
    },

    /// Delete request failed; the optimistic removal was rolled back
    #[error("Failed to remove favorite {target}: {source}")]
    RemoveFavoriteFailed {
        target: TargetKey,
        #[source]
        source: ApiError,
    },

    /// List request failed; the cache was left untouched
    #[error("Favorites sync failed: {0}")]
    SyncFailed(#[source] ApiError),

    /// Read-only collaborator call failed
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invalid client configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
