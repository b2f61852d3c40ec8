//! Network contract with the favorites/catalog backend.
//!
//! [`FavoritesApi`] is the seam the reconciliation engine talks through;
//! [`HttpFavoritesClient`] is the production implementation over HTTP+JSON.

use std::fmt;

use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use thiserror::Error;

use crate::config::ClientConfig;
use crate::models::{Catalog, CreateFavoriteRequest, FavoriteId, FavoriteRecord, TargetKey};
use crate::util::compact_text;

/// Transport-level failure talking to the backend
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API returned HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Invalid API payload: {0}")]
    InvalidPayload(String),
    /// No backend is configured; only the local cache is available
    #[error("Favorites API is not configured: {0}")]
    NotConfigured(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Operations the favorites core needs from the backend.
#[allow(async_fn_in_trait)]
pub trait FavoritesApi {
    /// Create a favorite for `target`, returning the server-issued id
    async fn create_favorite(&self, target: &TargetKey) -> ApiResult<FavoriteId>;

    /// Delete a favorite by id; an already deleted favorite counts as success
    async fn delete_favorite(&self, id: &FavoriteId) -> ApiResult<()>;

    /// Fetch the current user's authoritative favorites
    async fn list_favorites(&self) -> ApiResult<Vec<FavoriteRecord>>;

    /// Read a catalog, including its publication status
    async fn get_catalog(&self, catalog_id: &str) -> ApiResult<Catalog>;
}

/// HTTP client for the favorites API.
#[derive(Clone)]
pub struct HttpFavoritesClient {
    base_url: String,
    access_token: Option<String>,
    client: reqwest::Client,
}

impl fmt::Debug for HttpFavoritesClient {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("HttpFavoritesClient")
            .field("base_url", &self.base_url)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish_non_exhaustive()
    }
}

impl HttpFavoritesClient {
    /// Builds a client from validated client configuration.
    pub fn new(config: &ClientConfig) -> ApiResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            base_url: config.api_base_url.clone(),
            access_token: config.access_token.clone(),
            client,
        })
    }

    /// Returns the base URL this client was configured with.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, route: &str) -> String {
        format!("{}/v1{}", self.base_url, route)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header(reqwest::header::ACCEPT, "application/json");
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

impl FavoritesApi for HttpFavoritesClient {
    async fn create_favorite(&self, target: &TargetKey) -> ApiResult<FavoriteId> {
        let response = self
            .authorize(self.client.post(self.url("/favorites")))
            .json(&CreateFavoriteRequest::for_target(target))
            .send()
            .await?;
        let response = ensure_success(response).await?;
        let created = response.json::<CreatedFavorite>().await?;
        FavoriteId::server(created.id)
            .map_err(|error| ApiError::InvalidPayload(error.to_string()))
    }

    async fn delete_favorite(&self, id: &FavoriteId) -> ApiResult<()> {
        let route = format!("/favorites/{}", urlencoding::encode(&id.to_string()));
        let response = self
            .authorize(self.client.delete(self.url(&route)))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!("Favorite {} already gone on server", id);
            return Ok(());
        }
        ensure_success(response).await?;
        Ok(())
    }

    async fn list_favorites(&self) -> ApiResult<Vec<FavoriteRecord>> {
        let response = self
            .authorize(self.client.get(self.url("/favorites")))
            .send()
            .await?;
        let response = ensure_success(response).await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|error| {
            ApiError::InvalidPayload(format!("favorites list: {error}"))
        })
    }

    async fn get_catalog(&self, catalog_id: &str) -> ApiResult<Catalog> {
        let route = format!("/catalogs/{}", urlencoding::encode(catalog_id));
        let response = self
            .authorize(self.client.get(self.url(&route)))
            .send()
            .await?;
        let response = ensure_success(response).await?;
        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|error| ApiError::InvalidPayload(format!("catalog: {error}")))
    }
}

#[derive(Debug, Deserialize)]
struct CreatedFavorite {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

async fn ensure_success(response: Response) -> ApiResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ApiError::Status {
        status: status.as_u16(),
        message: parse_api_error(&body),
    })
}

fn parse_api_error(body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return compact_text(&message);
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        "no response body".to_string()
    } else {
        trimmed
    }
}
