//! Persistence of the favorites cache across process restarts.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::cache::{FavoritesSnapshot, FAVORITES_BLOB_NAME, FAVORITES_BLOB_VERSION};
use crate::db::{BlobRepository, Database, LibSqlBlobRepository};
use crate::error::Result;

/// Storage for the persisted subset of the favorites cache
#[allow(async_fn_in_trait)]
pub trait FavoritesPersistence {
    /// Load the last saved snapshot; `None` when nothing usable is stored
    async fn load(&self) -> Result<Option<FavoritesSnapshot>>;

    /// Overwrite the stored snapshot
    async fn save(&self, snapshot: &FavoritesSnapshot) -> Result<()>;

    /// Forget the stored snapshot
    async fn clear(&self) -> Result<()>;
}

/// Thread-safe favorites store backed by a local libSQL database.
#[derive(Clone)]
pub struct LibSqlFavoritesStore {
    db: Arc<Mutex<Database>>,
    db_path: Option<PathBuf>,
}

impl LibSqlFavoritesStore {
    /// Open a store at the given filesystem path.
    pub async fn open_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::open(&db_path).await?;
        tracing::debug!("Opened favorites store at {}", db_path.display());
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: Some(db_path),
        })
    }

    /// Open an in-memory store (primarily for tests).
    pub async fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory().await?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: None,
        })
    }

    pub fn db_path(&self) -> Option<&PathBuf> {
        self.db_path.as_ref()
    }
}

impl FavoritesPersistence for LibSqlFavoritesStore {
    async fn load(&self) -> Result<Option<FavoritesSnapshot>> {
        let blob = {
            let db = self.db.lock().await;
            let repo = LibSqlBlobRepository::new(db.connection());
            repo.load(FAVORITES_BLOB_NAME).await?
        };

        let Some(blob) = blob else {
            return Ok(None);
        };

        if blob.version != FAVORITES_BLOB_VERSION {
            tracing::warn!(
                "Discarding persisted favorites with unsupported version {} (expected {})",
                blob.version,
                FAVORITES_BLOB_VERSION
            );
            return Ok(None);
        }

        match serde_json::from_str::<FavoritesSnapshot>(&blob.payload) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(error) => {
                tracing::warn!("Discarding unreadable persisted favorites: {}", error);
                Ok(None)
            }
        }
    }

    async fn save(&self, snapshot: &FavoritesSnapshot) -> Result<()> {
        let payload = serde_json::to_string(snapshot)?;
        let db = self.db.lock().await;
        let repo = LibSqlBlobRepository::new(db.connection());
        repo.save(FAVORITES_BLOB_NAME, FAVORITES_BLOB_VERSION, &payload)
            .await
    }

    async fn clear(&self) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlBlobRepository::new(db.connection());
        repo.delete(FAVORITES_BLOB_NAME).await
    }
}
