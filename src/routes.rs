use axum::{
    http::HeaderMap,
    routing::{delete, get, post, put},
    Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::ai::AiClient;
use crate::auth::{self, Identity};
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::handlers;
use crate::response::{ApiResponse, ApiResult};
use crate::store::Store;

/// Everything a handler needs, passed explicitly through the router state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub ai: Arc<AiClient>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, ai: AiClient, config: AppConfig) -> Self {
        Self {
            store,
            ai: Arc::new(ai),
            config: Arc::new(config),
        }
    }

    /// Resolve the caller from the bearer token, or fail with 401.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<Identity, ApiError> {
        auth::authenticate(
            self.store.as_ref(),
            &self.config.security.jwt_secret,
            headers,
        )
        .await
    }
}

/// The complete route table, built once at startup.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        // Auth
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/me", get(handlers::auth::me))
        // Properties
        .route("/api/properties", get(handlers::properties::search))
        .route("/api/properties", post(handlers::properties::create))
        .route(
            "/api/properties/user/my-listings",
            get(handlers::properties::my_listings),
        )
        .route("/api/properties/:id", get(handlers::properties::get_by_id))
        .route("/api/properties/:id", put(handlers::properties::update))
        .route("/api/properties/:id", delete(handlers::properties::delete))
        // AI helpers
        .route(
            "/api/ai/generate-description",
            post(handlers::ai::generate_description),
        )
        .route("/api/ai/nl-search", post(handlers::ai::nl_search))
        .route("/api/ai/chat", post(handlers::ai::chat))
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> ApiResult<serde_json::Value> {
    Ok(ApiResponse::success(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now(),
    })))
}
