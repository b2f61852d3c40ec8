//! faves-core - Core library for faves
//!
//! This crate contains the favorite models, the locally persisted favorites
//! cache, the HTTP client for the favorites backend, and the reconciliation
//! engine that keeps the two consistent. Front ends (the CLI) build one
//! [`ReconciliationEngine`] at start-up and drive everything through it.

pub mod cache;
pub mod client;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod models;
pub mod state;
pub mod store;
pub mod util;

pub use client::{ApiError, FavoritesApi, HttpFavoritesClient};
pub use config::ClientConfig;
pub use engine::ReconciliationEngine;
pub use error::{Error, Result};
pub use models::{Favorite, FavoriteId, TargetKey, TargetKind};
pub use state::SyncStatus;
pub use store::{FavoritesPersistence, LibSqlFavoritesStore};
