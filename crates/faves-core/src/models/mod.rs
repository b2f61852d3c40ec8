//! Data models for faves

mod catalog;
mod favorite;

pub use catalog::{Catalog, CatalogStatus};
pub use favorite::{
    validate, CreateFavoriteRequest, Favorite, FavoriteId, FavoriteRecord, TargetKey, TargetKind,
    TEMPORARY_ID_PREFIX,
};
