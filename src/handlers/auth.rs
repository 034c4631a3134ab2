use axum::{extract::State, http::HeaderMap};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use uuid::Uuid;

use crate::auth;
use crate::domain::{Role, User};
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::response::{ApiResponse, ApiResult};
use crate::routes::AppState;

const PASSWORD_MIN_LEN: usize = 6;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub phone: Option<String>,
    pub agent_license: Option<String>,
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> ApiResult<Value> {
    let mut errors = HashMap::new();
    if body.name.as_deref().map_or(true, |s| s.trim().is_empty()) {
        errors.insert("name".to_string(), "name is required".to_string());
    }
    if body.email.as_deref().map_or(true, |s| s.trim().is_empty()) {
        errors.insert("email".to_string(), "email is required".to_string());
    }
    match body.password.as_deref() {
        None | Some("") => {
            errors.insert("password".to_string(), "password is required".to_string());
        }
        Some(p) if p.chars().count() < PASSWORD_MIN_LEN => {
            errors.insert(
                "password".to_string(),
                format!("password must be at least {} characters", PASSWORD_MIN_LEN),
            );
        }
        _ => {}
    }
    if !errors.is_empty() {
        return Err(ApiError::validation("Missing required fields", Some(errors)));
    }

    // Self-registration is limited to buyer/seller/agent; admin accounts are
    // provisioned out of band.
    let role = match body.role.as_deref() {
        None | Some("") => Role::Buyer,
        Some(raw) => match raw.parse::<Role>() {
            Ok(Role::Admin) | Err(_) => return Err(ApiError::bad_request("Invalid role")),
            Ok(role) => role,
        },
    };

    let email = body.email.unwrap_or_default().trim().to_string();
    if state.store.user_by_email(&email).await?.is_some() {
        return Err(ApiError::bad_request("Email already registered"));
    }

    let user = User {
        id: Uuid::new_v4(),
        name: body.name.unwrap_or_default().trim().to_string(),
        email,
        password_hash: auth::hash_password(&body.password.unwrap_or_default())?,
        role,
        phone: body.phone.unwrap_or_default(),
        agent_license: body.agent_license.unwrap_or_default(),
        verified: false,
        created_at: Utc::now(),
    };
    let user = state.store.insert_user(user).await?;

    let token = auth::issue_token(
        user.id,
        &state.config.security.jwt_secret,
        state.config.security.token_ttl_days,
    )?;
    Ok(ApiResponse::created(json!({
        "token": token,
        "user": user.public_json(),
    })))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> ApiResult<Value> {
    let (Some(email), Some(password)) = (body.email, body.password) else {
        return Err(ApiError::bad_request("Email and password required"));
    };
    if email.is_empty() || password.is_empty() {
        return Err(ApiError::bad_request("Email and password required"));
    }

    // Same response for unknown email and wrong password
    let user = state
        .store
        .user_by_email(&email)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;
    if !auth::verify_password(&user.password_hash, &password) {
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let token = auth::issue_token(
        user.id,
        &state.config.security.jwt_secret,
        state.config.security.token_ttl_days,
    )?;
    Ok(ApiResponse::success(json!({
        "token": token,
        "user": user.public_json(),
    })))
}

/// GET /api/auth/me
pub async fn me(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Value> {
    let identity = state.authenticate(&headers).await?;
    Ok(ApiResponse::success(json!({
        "user": {
            "id": identity.id,
            "name": identity.name,
            "email": identity.email,
            "role": identity.role,
            "phone": identity.phone,
            "agentLicense": identity.agent_license,
            "verified": identity.verified,
            "createdAt": identity.created_at,
        }
    })))
}
