use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use faves_core::client::ApiResult;
use faves_core::models::{Catalog, FavoriteRecord};
use faves_core::{
    ApiError, ClientConfig, Favorite, FavoriteId, FavoritesApi, HttpFavoritesClient,
    LibSqlFavoritesStore, ReconciliationEngine, SyncStatus, TargetKey,
};
use serde::Serialize;

use crate::auth::TokenStore;
use crate::config_profiles::{CliProfile, CliProfilesConfig};
use crate::error::CliError;

pub type CliEngine = ReconciliationEngine<CliApi, LibSqlFavoritesStore>;

const DB_PATH_ENV_VAR: &str = "FAVES_DB_PATH";

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct FavoriteListItem {
    pub id: String,
    pub target_kind: String,
    pub target_id: String,
    pub created_at: i64,
    pub confirmed: bool,
}

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub profile: String,
    pub api_base_url: Option<String>,
    pub favorites: usize,
    pub state: &'static str,
    pub loading: bool,
    pub synced: bool,
    pub last_synced_at: Option<i64>,
}

pub fn favorite_to_list_item(favorite: &Favorite) -> FavoriteListItem {
    FavoriteListItem {
        id: favorite.id.to_string(),
        target_kind: favorite.target_kind.to_string(),
        target_id: favorite.target_id.clone(),
        created_at: favorite.created_at,
        confirmed: !favorite.id.is_temporary(),
    }
}

pub fn format_favorite_lines(favorites: &[Favorite]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    favorites
        .iter()
        .map(|favorite| {
            let pending = if favorite.id.is_temporary() {
                "  (pending)"
            } else {
                ""
            };
            format!(
                "{:<8} {:<24} {:>8}{}",
                favorite.target_kind,
                favorite.target_id,
                format_relative_time(favorite.created_at, now_ms),
                pending
            )
        })
        .collect()
}

pub fn format_status_lines(report: &StatusReport) -> Vec<String> {
    let last_synced = report
        .last_synced_at
        .map_or_else(|| "never".to_string(), format_timestamp);
    vec![
        format!("Profile:     {}", report.profile),
        format!(
            "API:         {}",
            report.api_base_url.as_deref().unwrap_or("(not configured)")
        ),
        format!("Favorites:   {}", report.favorites),
        format!("State:       {}", report.state),
        format!("Last synced: {last_synced}"),
    ]
}

pub fn status_report(
    profile: &str,
    api_base_url: Option<&str>,
    favorites: usize,
    status: SyncStatus,
) -> StatusReport {
    StatusReport {
        profile: profile.to_string(),
        api_base_url: api_base_url.map(str::to_string),
        favorites,
        state: status.label(),
        loading: status.loading,
        synced: status.synced,
        last_synced_at: status.last_synced_at,
    }
}

pub fn format_catalog_line(catalog: &Catalog, favorited: bool) -> String {
    let marker = if favorited { "*" } else { " " };
    let visibility = if catalog.status.is_public() {
        "public"
    } else {
        "hidden"
    };
    format!(
        "{marker} {}  {}  [{}, {visibility}]  updated {}",
        catalog.id,
        catalog.name,
        catalog.status.label(),
        catalog.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
    )
}

pub fn format_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> Result<PathBuf, CliError> {
    if let Some(path) = cli_db_path.or_else(|| env::var_os(DB_PATH_ENV_VAR).map(PathBuf::from)) {
        return Ok(path);
    }
    default_db_path()
}

pub fn default_db_path() -> Result<PathBuf, CliError> {
    dirs::data_dir()
        .map(|dir| dir.join("faves").join("faves.db"))
        .ok_or_else(|| CliError::Config("Failed to resolve CLI data directory".into()))
}

/// Resolve API settings for a profile.
///
/// The profile's base URL and timeout win over `FAVES_API_BASE_URL` /
/// `FAVES_REQUEST_TIMEOUT_SECS`; a keychain token wins over
/// `FAVES_ACCESS_TOKEN`.
pub fn resolve_client_config(
    profile_name: &str,
    profile: Option<&CliProfile>,
    env_config: Option<ClientConfig>,
) -> Result<ClientConfig, CliError> {
    let base_url = profile
        .and_then(CliProfile::api_base_url)
        .or_else(|| env_config.as_ref().map(|config| config.api_base_url.clone()))
        .ok_or_else(|| CliError::ApiNotConfigured(profile_name.to_string()))?;

    let stored_token = TokenStore::new(profile_name)
        .load()
        .map_err(|error| CliError::Auth(error.to_string()))?;
    let access_token =
        stored_token.or_else(|| env_config.as_ref().and_then(|config| config.access_token.clone()));

    let mut config = ClientConfig::new(&base_url, access_token)?;
    if let Some(secs) = profile.and_then(|profile| profile.request_timeout_secs) {
        config = config.with_request_timeout(Duration::from_secs(secs));
    } else if let Some(env_config) = env_config {
        config = config.with_request_timeout(env_config.request_timeout);
    }
    Ok(config)
}

/// Backend used by the CLI engine.
///
/// Commands that only read the local cache can run without an API base URL;
/// they get [`CliApi::Offline`], which fails every request.
#[derive(Debug)]
pub enum CliApi {
    Http(HttpFavoritesClient),
    Offline { profile: String },
}

impl CliApi {
    pub fn base_url(&self) -> Option<&str> {
        match self {
            Self::Http(client) => Some(client.base_url()),
            Self::Offline { .. } => None,
        }
    }

    fn offline_error(profile: &str) -> ApiError {
        ApiError::NotConfigured(format!("profile '{profile}' has no API base URL"))
    }
}

impl FavoritesApi for CliApi {
    async fn create_favorite(&self, target: &TargetKey) -> ApiResult<FavoriteId> {
        match self {
            Self::Http(client) => client.create_favorite(target).await,
            Self::Offline { profile } => Err(Self::offline_error(profile)),
        }
    }

    async fn delete_favorite(&self, id: &FavoriteId) -> ApiResult<()> {
        match self {
            Self::Http(client) => client.delete_favorite(id).await,
            Self::Offline { profile } => Err(Self::offline_error(profile)),
        }
    }

    async fn list_favorites(&self) -> ApiResult<Vec<FavoriteRecord>> {
        match self {
            Self::Http(client) => client.list_favorites().await,
            Self::Offline { profile } => Err(Self::offline_error(profile)),
        }
    }

    async fn get_catalog(&self, catalog_id: &str) -> ApiResult<Catalog> {
        match self {
            Self::Http(client) => client.get_catalog(catalog_id).await,
            Self::Offline { profile } => Err(Self::offline_error(profile)),
        }
    }
}

/// Whether a command can run against the local cache alone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiAccess {
    Required,
    Optional,
}

/// Build the backend for a profile, falling back to [`CliApi::Offline`]
/// when no base URL is configured and `access` allows it.
pub fn resolve_api(
    profile_name: &str,
    profile: Option<&CliProfile>,
    env_config: Option<ClientConfig>,
    access: ApiAccess,
) -> Result<CliApi, CliError> {
    match resolve_client_config(profile_name, profile, env_config) {
        Ok(config) => {
            tracing::debug!("Using profile '{}': {:?}", profile_name, config);
            Ok(CliApi::Http(HttpFavoritesClient::new(&config)?))
        }
        Err(CliError::ApiNotConfigured(_)) if access == ApiAccess::Optional => {
            tracing::debug!("Profile '{}' has no API; reading the local cache only", profile_name);
            Ok(CliApi::Offline {
                profile: profile_name.to_string(),
            })
        }
        Err(error) => Err(error),
    }
}

/// A ready engine plus where it was resolved from.
pub struct Session {
    pub profile: String,
    pub engine: CliEngine,
}

impl Session {
    pub fn api_base_url(&self) -> Option<&str> {
        self.engine.api().base_url()
    }
}

/// Build the engine for one CLI invocation and load the persisted favorites.
pub async fn open_session(
    db_path: &Path,
    profile: Option<&str>,
    access: ApiAccess,
) -> Result<Session, CliError> {
    let profiles = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = profiles.resolve_profile_name(profile);
    let api = resolve_api(
        &profile_name,
        profiles.profile(&profile_name),
        ClientConfig::from_env()?,
        access,
    )?;

    let store = LibSqlFavoritesStore::open_path(db_path).await?;
    let engine = ReconciliationEngine::init(api, store).await?;

    Ok(Session {
        profile: profile_name,
        engine,
    })
}

/// Sync before reading; on failure keep going with the provisional cache.
pub async fn sync_or_warn(engine: &CliEngine) {
    if let Err(error) = engine.sync_from_server().await {
        eprintln!("Warning: showing provisional favorites ({error})");
    }
}
