use std::sync::Arc;

use axum::extract::{Path, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{delete, get, post};
use axum::{Extension, Json, Router};
use chrono::Utc;
use faves_core::models::{Catalog, CreateFavoriteRequest, FavoriteRecord};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::{extract_bearer_token, AuthenticatedUser, TokenAuthenticator};
use crate::catalogs::CatalogTransition;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::store::AppStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    authenticator: Arc<TokenAuthenticator>,
    store: AppStore,
}

impl AppState {
    pub fn from_config(config: Arc<AppConfig>) -> Self {
        Self {
            authenticator: Arc::new(TokenAuthenticator::new(config.tokens.clone())),
            store: AppStore::with_catalogs(&config.seed_catalogs),
            config,
        }
    }
}

pub fn app_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/favorites", get(list_favorites).post(create_favorite))
        .route("/favorites/{id}", delete(delete_favorite))
        .route("/catalogs", post(create_catalog))
        .route("/catalogs/{id}", get(get_catalog))
        .route("/catalogs/{id}/approve", post(approve_catalog))
        .route("/catalogs/{id}/publish", post(publish_catalog))
        .route("/catalogs/{id}/revert", post(revert_catalog))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/healthz", get(healthz))
        .nest("/v1", protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any),
        )
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: i64,
}

async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().timestamp(),
    })
}

async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(request.headers())?;
    let user = state.authenticator.authenticate(token)?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

async fn list_favorites(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Json<Vec<FavoriteRecord>> {
    Json(state.store.list_favorites(&user.user_id).await)
}

async fn create_favorite(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(request): Json<CreateFavoriteRequest>,
) -> Result<(StatusCode, Json<FavoriteRecord>), AppError> {
    let target = request.target()?;
    let created = state.store.create_favorite(&user.user_id, &target).await;
    if created.created {
        tracing::info!(favorite = %created.record.id, target = %target, "Created favorite");
        Ok((StatusCode::CREATED, Json(created.record)))
    } else {
        tracing::debug!(favorite = %created.record.id, target = %target, "Favorite already exists");
        Ok((StatusCode::OK, Json(created.record)))
    }
}

async fn delete_favorite(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if state.store.delete_favorite(&user.user_id, &id).await {
        tracing::info!(favorite = %id, "Deleted favorite");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found(format!("Favorite '{id}'")))
    }
}

#[derive(Debug, Deserialize)]
struct CreateCatalogRequest {
    id: Option<String>,
    name: String,
}

async fn create_catalog(
    State(state): State<AppState>,
    Json(request): Json<CreateCatalogRequest>,
) -> Result<(StatusCode, Json<Catalog>), AppError> {
    let catalog = state.store.create_catalog(request.id, &request.name).await?;
    tracing::info!(catalog = %catalog.id, "Created catalog");
    Ok((StatusCode::CREATED, Json(catalog)))
}

async fn get_catalog(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Catalog>, AppError> {
    Ok(Json(state.store.get_catalog(&id).await?))
}

async fn approve_catalog(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Catalog>, AppError> {
    transition_catalog(&state, &id, CatalogTransition::Approve).await
}

async fn publish_catalog(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Catalog>, AppError> {
    transition_catalog(&state, &id, CatalogTransition::Publish).await
}

async fn revert_catalog(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Catalog>, AppError> {
    transition_catalog(&state, &id, CatalogTransition::Revert).await
}

async fn transition_catalog(
    state: &AppState,
    id: &str,
    transition: CatalogTransition,
) -> Result<Json<Catalog>, AppError> {
    let catalog = state.store.transition_catalog(id, transition).await?;
    tracing::info!(
        catalog = %catalog.id,
        transition = transition.as_str(),
        status = %catalog.status,
        "Catalog status changed"
    );
    Ok(Json(catalog))
}
