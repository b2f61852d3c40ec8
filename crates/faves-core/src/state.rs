//! Sync status exposed to front ends.

use serde::Serialize;

/// Observable sync state of the reconciliation engine.
///
/// Not persisted: a freshly started engine is neither loading nor synced,
/// and its cache is provisional until the first successful sync.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    /// A full sync is in flight
    pub loading: bool,
    /// At least one full sync succeeded since start
    pub synced: bool,
    /// Time of the last successful sync (Unix ms)
    pub last_synced_at: Option<i64>,
}

impl SyncStatus {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match (self.loading, self.synced) {
            (true, _) => "syncing",
            (false, true) => "synced",
            (false, false) => "provisional",
        }
    }
}
