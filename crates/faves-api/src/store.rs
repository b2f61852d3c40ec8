//! In-memory favorites and catalogs.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::Utc;
use faves_core::models::{Catalog, CatalogStatus, FavoriteRecord};
use faves_core::TargetKey;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::catalogs::CatalogTransition;
use crate::config::SeedCatalog;
use crate::error::AppError;

#[derive(Default)]
struct StoreState {
    /// user id -> favorites in creation order
    favorites: HashMap<String, Vec<FavoriteRecord>>,
    catalogs: BTreeMap<String, Catalog>,
}

#[derive(Clone, Default)]
pub struct AppStore {
    state: Arc<Mutex<StoreState>>,
}

/// Result of a create: the record plus whether it was new.
#[derive(Debug)]
pub struct CreatedFavorite {
    pub record: FavoriteRecord,
    pub created: bool,
}

impl AppStore {
    pub fn with_catalogs(seeds: &[SeedCatalog]) -> Self {
        let now = Utc::now();
        let catalogs = seeds
            .iter()
            .map(|seed| {
                (
                    seed.id.clone(),
                    Catalog {
                        id: seed.id.clone(),
                        name: seed.name.clone(),
                        status: CatalogStatus::PendingApproval,
                        updated_at: now,
                    },
                )
            })
            .collect();
        Self {
            state: Arc::new(Mutex::new(StoreState {
                favorites: HashMap::new(),
                catalogs,
            })),
        }
    }

    /// Favorite `target` for `user_id`; an existing favorite is returned as-is.
    pub async fn create_favorite(&self, user_id: &str, target: &TargetKey) -> CreatedFavorite {
        let mut state = self.state.lock().await;
        let favorites = state.favorites.entry(user_id.to_string()).or_default();

        let existing = favorites.iter().find(|record| {
            faves_core::models::validate(record).is_ok_and(|key| &key == target)
        });
        if let Some(record) = existing {
            return CreatedFavorite {
                record: record.clone(),
                created: false,
            };
        }

        let record = FavoriteRecord::new(Uuid::now_v7().to_string(), target, Utc::now());
        favorites.push(record.clone());
        CreatedFavorite {
            record,
            created: true,
        }
    }

    /// Returns whether a favorite with `id` existed for the user.
    pub async fn delete_favorite(&self, user_id: &str, id: &str) -> bool {
        let mut state = self.state.lock().await;
        let Some(favorites) = state.favorites.get_mut(user_id) else {
            return false;
        };
        let before = favorites.len();
        favorites.retain(|record| record.id != id);
        favorites.len() != before
    }

    pub async fn list_favorites(&self, user_id: &str) -> Vec<FavoriteRecord> {
        self.state
            .lock()
            .await
            .favorites
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn create_catalog(&self, id: Option<String>, name: &str) -> Result<Catalog, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::bad_request("Catalog name must not be empty"));
        }
        let id = match id.as_deref().map(str::trim) {
            Some("") => return Err(AppError::bad_request("Catalog id must not be empty")),
            Some(id) => id.to_string(),
            None => Uuid::now_v7().to_string(),
        };

        let mut state = self.state.lock().await;
        if state.catalogs.contains_key(&id) {
            return Err(AppError::conflict(format!("Catalog '{id}' already exists")));
        }
        let catalog = Catalog {
            id: id.clone(),
            name: name.to_string(),
            status: CatalogStatus::PendingApproval,
            updated_at: Utc::now(),
        };
        state.catalogs.insert(id, catalog.clone());
        Ok(catalog)
    }

    pub async fn get_catalog(&self, id: &str) -> Result<Catalog, AppError> {
        self.state
            .lock()
            .await
            .catalogs
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("Catalog '{id}'")))
    }

    pub async fn transition_catalog(
        &self,
        id: &str,
        transition: CatalogTransition,
    ) -> Result<Catalog, AppError> {
        let mut state = self.state.lock().await;
        let catalog = state
            .catalogs
            .get_mut(id)
            .ok_or_else(|| AppError::not_found(format!("Catalog '{id}'")))?;

        let next = transition.apply(catalog.status).ok_or_else(|| {
            AppError::conflict(format!(
                "Cannot {} catalog '{id}' while it is {}",
                transition.as_str(),
                catalog.status
            ))
        })?;
        catalog.status = next;
        catalog.updated_at = Utc::now();
        Ok(catalog.clone())
    }
}
