//! Reconciliation engine
//!
//! Owns the local favorites cache and is its only writer. Mutations are
//! applied to the cache first (so readers see them immediately), then sent to
//! the server, then confirmed or rolled back. A full sync replaces the cache
//! with the server's authoritative list.
//!
//! Mutations on the same target are serialized through a per-target guard: a
//! second add/remove/toggle for a target waits until the first one's request
//! has resolved and its confirmation or rollback has been applied.
//!
//! A full sync takes no target guards. A confirmation that arrives after a
//! sync is applied on top of it: a confirmed create puts back an entity the
//! sync dropped, and a confirmed delete removes one the sync brought back.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;

use crate::cache::{FavoritesCache, InsertOutcome};
use crate::client::{ApiError, FavoritesApi};
use crate::error::{Error, Result};
use crate::models::{Catalog, CatalogStatus, Favorite, TargetKey, TargetKind};
use crate::state::SyncStatus;
use crate::store::FavoritesPersistence;

type TargetGuard = Arc<Mutex<()>>;

pub struct ReconciliationEngine<A, S> {
    api: A,
    store: S,
    cache: Mutex<FavoritesCache>,
    status: Mutex<SyncStatus>,
    in_flight: Mutex<HashMap<TargetKey, TargetGuard>>,
    persist_lock: Mutex<()>,
}

impl<A: FavoritesApi, S: FavoritesPersistence> ReconciliationEngine<A, S> {
    /// Build the engine and load the persisted favorites.
    ///
    /// The loaded collection is provisional until [`Self::sync_from_server`]
    /// succeeds.
    pub async fn init(api: A, store: S) -> Result<Self> {
        let cache = match store.load().await? {
            Some(snapshot) => FavoritesCache::from_snapshot(snapshot),
            None => FavoritesCache::new(),
        };
        tracing::info!("Loaded {} persisted favorites", cache.len());

        Ok(Self {
            api,
            store,
            cache: Mutex::new(cache),
            status: Mutex::new(SyncStatus::default()),
            in_flight: Mutex::new(HashMap::new()),
            persist_lock: Mutex::new(()),
        })
    }

    pub const fn api(&self) -> &A {
        &self.api
    }

    /// Flip the favorite state of a target, returning the new membership.
    ///
    /// Membership is read after the target's guard is held, so back-to-back
    /// toggles always act on the state left by the previous one.
    pub async fn toggle_favorite(&self, kind: TargetKind, target_id: &str) -> Result<bool> {
        let key = TargetKey::parse(kind, target_id)?;
        let guard = self.acquire_guard(&key).await;
        let result = {
            let _permit = guard.lock().await;
            let favorited = self
                .cache
                .lock()
                .await
                .is_favorite(key.kind, &key.target_id);
            if favorited {
                self.remove_guarded(&key).await.map(|()| false)
            } else {
                self.add_guarded(&key).await.map(|()| true)
            }
        };
        self.release_guard(&key, guard).await;
        result
    }

    /// Optimistically favorite a target and confirm it with the server.
    ///
    /// On failure the optimistic entry is removed again and
    /// [`Error::AddFavoriteFailed`] is returned.
    pub async fn add_favorite(&self, kind: TargetKind, target_id: &str) -> Result<()> {
        let key = TargetKey::parse(kind, target_id)?;
        let guard = self.acquire_guard(&key).await;
        let result = {
            let _permit = guard.lock().await;
            self.add_guarded(&key).await
        };
        self.release_guard(&key, guard).await;
        result
    }

    /// Optimistically unfavorite a target and confirm it with the server.
    ///
    /// On failure the exact removed entity is restored and
    /// [`Error::RemoveFavoriteFailed`] is returned.
    pub async fn remove_favorite(&self, kind: TargetKind, target_id: &str) -> Result<()> {
        let key = TargetKey::parse(kind, target_id)?;
        let guard = self.acquire_guard(&key).await;
        let result = {
            let _permit = guard.lock().await;
            self.remove_guarded(&key).await
        };
        self.release_guard(&key, guard).await;
        result
    }

    /// Replace the cache with the server's favorites.
    ///
    /// The cache is only touched after the whole list was fetched and
    /// validated; `loading` is cleared on every path. Returns the number of
    /// favorites now cached.
    pub async fn sync_from_server(&self) -> Result<usize> {
        self.status.lock().await.loading = true;
        let result = self.fetch_and_replace().await;

        let mut status = self.status.lock().await;
        status.loading = false;
        if result.is_ok() {
            status.synced = true;
            status.last_synced_at = Some(Utc::now().timestamp_millis());
        }
        drop(status);

        if let Err(error) = &result {
            tracing::warn!("{}", error);
        }
        result
    }

    /// Whether a target is favorited. Ids are normalized like the mutations
    /// normalize them; a blank id is never a favorite.
    pub async fn is_favorite(&self, kind: TargetKind, target_id: &str) -> bool {
        let Ok(key) = TargetKey::parse(kind, target_id) else {
            return false;
        };
        self.cache.lock().await.is_favorite(key.kind, &key.target_id)
    }

    pub async fn get(&self, kind: TargetKind, target_id: &str) -> Option<Favorite> {
        let key = TargetKey::parse(kind, target_id).ok()?;
        self.cache.lock().await.get(key.kind, &key.target_id).cloned()
    }

    pub async fn list(&self, kind: Option<TargetKind>) -> Vec<Favorite> {
        self.cache.lock().await.list(kind)
    }

    pub async fn status(&self) -> SyncStatus {
        *self.status.lock().await
    }

    /// Read a catalog from the catalog service.
    pub async fn catalog(&self, catalog_id: &str) -> Result<Catalog> {
        let key = TargetKey::parse(TargetKind::Catalog, catalog_id)?;
        Ok(self.api.get_catalog(&key.target_id).await?)
    }

    /// Read a catalog's publication status (never cached locally).
    pub async fn catalog_status(&self, catalog_id: &str) -> Result<CatalogStatus> {
        Ok(self.catalog(catalog_id).await?.status)
    }

    async fn add_guarded(&self, key: &TargetKey) -> Result<()> {
        let optimistic = Favorite::optimistic(key);
        let temporary = optimistic.id.clone();
        let created_at = optimistic.created_at;

        if self.cache.lock().await.insert(optimistic)? == InsertOutcome::AlreadyPresent {
            tracing::debug!("{} is already a favorite", key);
            return Ok(());
        }
        self.persist().await;

        match self.api.create_favorite(key).await {
            Ok(confirmed) => {
                let changed = {
                    let mut cache = self.cache.lock().await;
                    if cache.reconcile_id(&temporary, confirmed.clone()) {
                        tracing::debug!("Confirmed favorite {} as {}", key, confirmed);
                        true
                    } else if cache.is_favorite(key.kind, &key.target_id) {
                        // A sync already brought in the server's entity.
                        tracing::debug!("{} was confirmed by a sync first", key);
                        false
                    } else {
                        // A sync dropped the temporary entity before the server
                        // recorded it.
                        tracing::debug!("Re-applying confirmed favorite {} as {}", key, confirmed);
                        let restored = Favorite {
                            id: confirmed,
                            target_kind: key.kind,
                            target_id: key.target_id.clone(),
                            created_at,
                        };
                        cache.insert(restored)? == InsertOutcome::Inserted
                    }
                };
                if changed {
                    self.persist().await;
                }
                Ok(())
            }
            Err(source) => {
                tracing::warn!("Create failed for {}; rolling back: {}", key, source);
                {
                    let mut cache = self.cache.lock().await;
                    let still_ours = cache
                        .get(key.kind, &key.target_id)
                        .is_some_and(|favorite| favorite.id == temporary);
                    if still_ours {
                        cache.remove(key.kind, &key.target_id);
                    }
                }
                self.persist().await;
                Err(Error::AddFavoriteFailed {
                    target: key.clone(),
                    source,
                })
            }
        }
    }

    async fn remove_guarded(&self, key: &TargetKey) -> Result<()> {
        let removed = self.cache.lock().await.remove_entry(key.kind, &key.target_id);
        let Some((position, removed)) = removed else {
            tracing::debug!("{} is not a favorite; nothing to remove", key);
            return Ok(());
        };
        self.persist().await;

        if removed.id.is_temporary() {
            // Never confirmed, so the server has no id to delete; the next
            // sync brings back anything the server did record.
            tracing::debug!("Dropped unconfirmed favorite {} locally", removed.id);
            return Ok(());
        }

        match self.api.delete_favorite(&removed.id).await {
            Ok(()) => {
                tracing::debug!("Removed favorite {} ({})", key, removed.id);
                // A sync that listed before the delete landed may have brought
                // the entity back.
                let resurrected = {
                    let mut cache = self.cache.lock().await;
                    let stale = cache
                        .get(key.kind, &key.target_id)
                        .is_some_and(|favorite| favorite.id == removed.id);
                    stale && cache.remove(key.kind, &key.target_id).is_some()
                };
                if resurrected {
                    tracing::debug!("Dropped {} restored by an earlier sync", removed.id);
                    self.persist().await;
                }
                Ok(())
            }
            Err(source) => {
                tracing::warn!("Delete failed for {}; restoring: {}", key, source);
                if let Err(error) = self.cache.lock().await.insert_at(position, removed) {
                    tracing::warn!("Could not restore favorite {}: {}", key, error);
                }
                self.persist().await;
                Err(Error::RemoveFavoriteFailed {
                    target: key.clone(),
                    source,
                })
            }
        }
    }

    async fn fetch_and_replace(&self) -> Result<usize> {
        let records = self
            .api
            .list_favorites()
            .await
            .map_err(Error::SyncFailed)?;

        let favorites = records
            .into_iter()
            .map(Favorite::try_from)
            .collect::<Result<Vec<_>>>()
            .map_err(|error| Error::SyncFailed(ApiError::InvalidPayload(error.to_string())))?;

        let count = {
            let mut cache = self.cache.lock().await;
            cache.replace_all(favorites)?;
            cache.len()
        };
        self.persist().await;

        tracing::info!("Synced {} favorites from server", count);
        Ok(count)
    }

    /// Write the current cache contents to the store.
    ///
    /// Failures are logged only: the in-memory cache stays authoritative for
    /// this process and the next successful write catches up.
    async fn persist(&self) {
        let _serialized = self.persist_lock.lock().await;
        let snapshot = self.cache.lock().await.snapshot();
        if let Err(error) = self.store.save(&snapshot).await {
            tracing::warn!("Failed to persist favorites: {}", error);
        }
    }

    async fn acquire_guard(&self, key: &TargetKey) -> TargetGuard {
        self.in_flight
            .lock()
            .await
            .entry(key.clone())
            .or_default()
            .clone()
    }

    async fn release_guard(&self, key: &TargetKey, guard: TargetGuard) {
        let mut in_flight = self.in_flight.lock().await;
        drop(guard);
        // Only the map's own reference left: nobody is running or queued.
        if in_flight
            .get(key)
            .is_some_and(|guard| Arc::strong_count(guard) == 1)
        {
            in_flight.remove(key);
        }
    }
}

#[cfg(test)]
mod tests;
