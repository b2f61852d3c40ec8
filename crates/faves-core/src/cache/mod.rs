//! Local favorites cache
//!
//! Holds the collection callers render from. Entries keep their insertion (or
//! server) order; a key index gives O(1) membership checks. The cache is
//! plain data: persistence and network reconciliation live in
//! [`crate::store`] and [`crate::engine`].

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{Favorite, FavoriteId, TargetKey, TargetKind};

/// Name of the persisted blob holding the cache contents
pub const FAVORITES_BLOB_NAME: &str = "favorites";

/// Schema version of the persisted blob
pub const FAVORITES_BLOB_VERSION: u32 = 1;

/// Result of [`FavoritesCache::insert`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// A favorite for the same target already existed; nothing changed
    AlreadyPresent,
}

/// Persisted subset of the cache (favorites only, no status flags)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoritesSnapshot {
    pub favorites: Vec<Favorite>,
}

#[derive(Debug, Clone, Default)]
pub struct FavoritesCache {
    entries: Vec<Favorite>,
    keys: HashSet<TargetKey>,
}

impl FavoritesCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a cache from a persisted snapshot.
    ///
    /// Invalid or duplicate entries are dropped so a damaged snapshot can
    /// never poison the collection.
    pub fn from_snapshot(snapshot: FavoritesSnapshot) -> Self {
        let mut cache = Self::new();
        for favorite in snapshot.favorites {
            if let Err(error) = cache.insert(favorite) {
                tracing::warn!("Dropping persisted favorite: {}", error);
            }
        }
        cache
    }

    pub fn snapshot(&self) -> FavoritesSnapshot {
        FavoritesSnapshot {
            favorites: self.entries.clone(),
        }
    }

    /// Add a favorite. Inserting a second favorite for the same target is a
    /// no-op reported as [`InsertOutcome::AlreadyPresent`].
    pub fn insert(&mut self, favorite: Favorite) -> Result<InsertOutcome> {
        self.insert_at(self.entries.len(), favorite)
    }

    /// Insert a favorite at `index` (clamped to the current length).
    ///
    /// Used to put a removed entity back where it was.
    pub fn insert_at(&mut self, index: usize, favorite: Favorite) -> Result<InsertOutcome> {
        favorite.validate()?;
        let key = favorite.key();
        if self.keys.contains(&key) {
            tracing::debug!("Favorite for {} already cached; insert ignored", key);
            return Ok(InsertOutcome::AlreadyPresent);
        }
        self.keys.insert(key);
        let index = index.min(self.entries.len());
        self.entries.insert(index, favorite);
        Ok(InsertOutcome::Inserted)
    }

    /// Remove the favorite for a target, returning it when one existed.
    pub fn remove(&mut self, kind: TargetKind, target_id: &str) -> Option<Favorite> {
        self.remove_entry(kind, target_id)
            .map(|(_, favorite)| favorite)
    }

    /// Like [`Self::remove`], but also reports the position the entity held.
    pub fn remove_entry(&mut self, kind: TargetKind, target_id: &str) -> Option<(usize, Favorite)> {
        let key = TargetKey::new(kind, target_id);
        if !self.keys.remove(&key) {
            return None;
        }
        let position = self
            .entries
            .iter()
            .position(|favorite| favorite.matches(kind, target_id))?;
        Some((position, self.entries.remove(position)))
    }

    pub fn get(&self, kind: TargetKind, target_id: &str) -> Option<&Favorite> {
        if !self.is_favorite(kind, target_id) {
            return None;
        }
        self.entries
            .iter()
            .find(|favorite| favorite.matches(kind, target_id))
    }

    pub fn is_favorite(&self, kind: TargetKind, target_id: &str) -> bool {
        self.keys.contains(&TargetKey::new(kind, target_id))
    }

    /// Swap the whole collection for `favorites`.
    ///
    /// Every entity is validated before anything changes, so a failure leaves
    /// the current contents intact. Later duplicates of a target are dropped.
    pub fn replace_all(&mut self, favorites: Vec<Favorite>) -> Result<()> {
        for favorite in &favorites {
            favorite.validate()?;
        }

        let mut keys = HashSet::with_capacity(favorites.len());
        let mut entries = Vec::with_capacity(favorites.len());
        for favorite in favorites {
            if keys.insert(favorite.key()) {
                entries.push(favorite);
            } else {
                tracing::warn!(
                    "Dropping duplicate favorite {} for {}",
                    favorite.id,
                    favorite.key()
                );
            }
        }

        self.entries = entries;
        self.keys = keys;
        Ok(())
    }

    /// Substitute a temporary id with the server-issued one, in place.
    ///
    /// Returns `false` when no entry carries `temporary` any more (for example
    /// after a full sync replaced it).
    pub fn reconcile_id(&mut self, temporary: &FavoriteId, confirmed: FavoriteId) -> bool {
        match self
            .entries
            .iter_mut()
            .find(|favorite| &favorite.id == temporary)
        {
            Some(favorite) => {
                favorite.id = confirmed;
                true
            }
            None => false,
        }
    }

    /// All favorites, optionally restricted to one kind
    pub fn list(&self, kind: Option<TargetKind>) -> Vec<Favorite> {
        self.entries
            .iter()
            .filter(|favorite| kind.map_or(true, |kind| favorite.target_kind == kind))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
