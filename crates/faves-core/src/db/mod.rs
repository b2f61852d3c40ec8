//! Database layer for faves

mod blob_repository;
mod connection;
mod migrations;

pub use blob_repository::{BlobRepository, LibSqlBlobRepository, StoredBlob};
pub use connection::Database;
