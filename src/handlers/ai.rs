use axum::{extract::State, http::HeaderMap};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::ai::{ChatTurn, DescriptionFields};
use crate::auth;
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::response::{ApiResponse, ApiResult};
use crate::routes::AppState;

use super::properties::LISTING_ROLES;

/// Newest published listings forwarded as chat context.
const CHAT_CONTEXT_LISTINGS: u64 = 5;

/// POST /api/ai/generate-description — seller/agent/admin only.
pub async fn generate_description(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(fields): ApiJson<DescriptionFields>,
) -> ApiResult<Value> {
    let identity = state.authenticate(&headers).await?;
    auth::authorize(&identity, LISTING_ROLES)?;

    let description = state
        .ai
        .generate_description(&fields)
        .await
        .map_err(|e| e.into_api("Failed to generate description"))?;
    Ok(ApiResponse::success(json!({ "description": description })))
}

#[derive(Debug, Deserialize)]
pub struct NlSearchRequest {
    pub query: Option<String>,
}

/// POST /api/ai/nl-search — natural language to filter set, public.
pub async fn nl_search(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<NlSearchRequest>,
) -> ApiResult<Value> {
    let query = body
        .query
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Search query is required"))?;

    let filters = state
        .ai
        .extract_filters(&query)
        .await
        .map_err(|e| e.into_api("Failed to parse search query"))?;
    Ok(ApiResponse::success(json!({ "filters": filters })))
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: Option<String>,
    pub history: Option<Vec<ChatTurn>>,
}

/// POST /api/ai/chat — one chat turn, public. The caller carries the history.
pub async fn chat(State(state): State<AppState>, ApiJson(body): ApiJson<ChatRequest>) -> ApiResult<Value> {
    let message = body
        .message
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Message is required"))?;

    let context = state.store.recent_published(CHAT_CONTEXT_LISTINGS).await?;
    let reply = state
        .ai
        .chat(&message, body.history.as_deref().unwrap_or_default(), &context)
        .await
        .map_err(|e| e.into_api("Failed to process chat message"))?;
    Ok(ApiResponse::success(json!({ "reply": reply })))
}
