//! Named blob repository implementation

use crate::error::Result;
use libsql::{params, Connection};

/// A versioned payload stored under a name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub version: u32,
    pub payload: String,
    /// Last write timestamp (Unix ms)
    pub updated_at: i64,
}

/// Trait for named blob storage operations (async)
#[allow(async_fn_in_trait)]
pub trait BlobRepository {
    /// Load the blob stored under `name`
    async fn load(&self, name: &str) -> Result<Option<StoredBlob>>;

    /// Insert or overwrite the blob stored under `name`
    async fn save(&self, name: &str, version: u32, payload: &str) -> Result<()>;

    /// Delete the blob stored under `name`; missing blobs are not an error
    async fn delete(&self, name: &str) -> Result<()>;
}

/// libSQL implementation of `BlobRepository`
pub struct LibSqlBlobRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlBlobRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl BlobRepository for LibSqlBlobRepository<'_> {
    async fn load(&self, name: &str) -> Result<Option<StoredBlob>> {
        let mut rows = self
            .conn
            .query(
                "SELECT version, payload, updated_at FROM persisted_blobs WHERE name = ?",
                [name],
            )
            .await?;

        let Some(row) = rows.next().await? else {
            return Ok(None);
        };

        let version: i64 = row.get(0)?;
        let version = u32::try_from(version).map_err(|_| {
            crate::error::Error::Database(format!("blob '{name}' has invalid version {version}"))
        })?;
        Ok(Some(StoredBlob {
            version,
            payload: row.get(1)?,
            updated_at: row.get(2)?,
        }))
    }

    async fn save(&self, name: &str, version: u32, payload: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp_millis();
        self.conn
            .execute(
                "INSERT OR REPLACE INTO persisted_blobs (name, version, payload, updated_at)
                 VALUES (?, ?, ?, ?)",
                params![name, i64::from(version), payload, now],
            )
            .await?;
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM persisted_blobs WHERE name = ?", [name])
            .await?;
        Ok(())
    }
}
