use std::sync::Arc;

use anyhow::Result;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::util::ServiceExt;

use realty_api::ai::AiClient;
use realty_api::config::{
    AiConfig, AppConfig, DatabaseConfig, Environment, HttpConfig, SearchConfig, SecurityConfig,
};
use realty_api::routes::{app, AppState};
use realty_api::store::memory::MemoryStore;

pub fn test_config() -> AppConfig {
    AppConfig {
        environment: Environment::Development,
        http: HttpConfig { port: 0 },
        database: DatabaseConfig {
            url: None,
            max_connections: 1,
        },
        security: SecurityConfig {
            jwt_secret: "integration-test-secret".to_string(),
            token_ttl_days: 7,
        },
        search: SearchConfig {
            default_page_size: 12,
            max_page_size: 100,
        },
        ai: AiConfig {
            api_key: None,
            model: "gemini-2.5-flash".to_string(),
            base_url: "https://example.invalid/v1beta".to_string(),
            timeout_secs: 1,
        },
    }
}

/// Router over a fresh in-memory store; AI is deliberately unconfigured.
pub fn test_app() -> Router {
    let config = test_config();
    let ai = AiClient::new(&config.ai);
    app(AppState::new(Arc::new(MemoryStore::new()), ai, config))
}

pub async fn request(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Result<(StatusCode, Value)> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))?,
        None => builder.body(Body::empty())?,
    };

    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    Ok((status, value))
}

/// Send a request with a raw (possibly invalid) JSON body.
pub async fn request_raw(
    app: &Router,
    method: &str,
    uri: &str,
    body: &str,
) -> Result<(StatusCode, Value)> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))?;
    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    Ok((status, value))
}

/// Register a user and return (token, user id).
pub async fn register(app: &Router, email: &str, role: &str) -> Result<(String, String)> {
    let (status, body) = request(
        app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "name": format!("{} user", role),
            "email": email,
            "password": "secret1",
            "role": role,
        })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
    let token = body["token"].as_str().expect("token").to_string();
    let id = body["user"]["id"].as_str().expect("user id").to_string();
    Ok((token, id))
}

/// Create a listing with sane defaults merged with `overrides`.
pub async fn create_listing(app: &Router, token: &str, overrides: Value) -> Result<Value> {
    let mut body = json!({
        "title": "T",
        "description": "d",
        "price": 100000,
        "type": "sale",
        "propertyType": "house",
        "address": "1 Main",
        "city": "X",
        "state": "Y",
    });
    if let (Some(base), Some(extra)) = (body.as_object_mut(), overrides.as_object()) {
        for (k, v) in extra {
            base.insert(k.clone(), v.clone());
        }
    }
    let (status, body) = request(app, "POST", "/api/properties", Some(token), Some(body)).await?;
    assert_eq!(status, StatusCode::CREATED, "create failed: {}", body);
    Ok(body["property"].clone())
}

/// Flip a listing to published via the owner's update.
pub async fn publish(app: &Router, token: &str, id: &str) -> Result<()> {
    let (status, body) = request(
        app,
        "PUT",
        &format!("/api/properties/{}", id),
        Some(token),
        Some(json!({ "status": "published" })),
    )
    .await?;
    assert_eq!(status, StatusCode::OK, "publish failed: {}", body);
    Ok(())
}
