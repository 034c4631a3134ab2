mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

#[tokio::test]
async fn register_then_login_round_trip() -> Result<()> {
    let app = common::test_app();
    let (_, user_id) = common::register(&app, "a@x.com", "seller").await?;

    let (status, body) = common::request(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "a@x.com", "password": "secret1" })),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let token = body["token"].as_str().expect("token");
    assert_eq!(body["user"]["role"], "seller");
    assert_eq!(body["user"]["verified"], false);
    assert!(body["user"].get("password").is_none());

    // The fresh token authenticates the same user
    let (status, body) = common::request(&app, "GET", "/api/auth/me", Some(token), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], user_id.as_str());
    assert_eq!(body["user"]["email"], "a@x.com");
    Ok(())
}

#[tokio::test]
async fn wrong_password_is_unauthorized() -> Result<()> {
    let app = common::test_app();
    common::register(&app, "a@x.com", "buyer").await?;

    let (status, body) = common::request(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "a@x.com", "password": "wrong-1" })),
    )
    .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Invalid credentials");

    // Unknown email gets the identical response
    let (status, body) = common::request(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "nobody@x.com", "password": "secret1" })),
    )
    .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid credentials");
    Ok(())
}

#[tokio::test]
async fn duplicate_email_is_rejected() -> Result<()> {
    let app = common::test_app();
    common::register(&app, "a@x.com", "buyer").await?;

    let (status, body) = common::request(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "name": "B", "email": "a@x.com", "password": "secret1" })),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Email already registered");
    Ok(())
}

#[tokio::test]
async fn invalid_or_privileged_roles_are_rejected() -> Result<()> {
    let app = common::test_app();
    for role in ["landlord", "admin"] {
        let (status, body) = common::request(
            &app,
            "POST",
            "/api/auth/register",
            None,
            Some(json!({ "name": "A", "email": "a@x.com", "password": "secret1", "role": role })),
        )
        .await?;
        assert_eq!(status, StatusCode::BAD_REQUEST, "role {} accepted", role);
        assert_eq!(body["message"], "Invalid role");
    }
    Ok(())
}

#[tokio::test]
async fn register_defaults_to_buyer() -> Result<()> {
    let app = common::test_app();
    let (status, body) = common::request(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "name": "A", "email": "a@x.com", "password": "secret1" })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["role"], "buyer");
    Ok(())
}

#[tokio::test]
async fn register_reports_missing_fields() -> Result<()> {
    let app = common::test_app();
    let (status, body) =
        common::request(&app, "POST", "/api/auth/register", None, Some(json!({}))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    for field in ["name", "email", "password"] {
        assert!(body["errors"].get(field).is_some(), "missing error for {}", field);
    }

    let (status, body) = common::request(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "name": "A", "email": "a@x.com", "password": "short" })),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["password"].as_str().unwrap().contains("at least"));
    Ok(())
}

#[tokio::test]
async fn malformed_json_body_gets_the_error_envelope() -> Result<()> {
    let app = common::test_app();
    let (status, body) =
        common::request_raw(&app, "POST", "/api/auth/login", "{not json").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["message"].is_string());
    Ok(())
}

#[tokio::test]
async fn me_requires_a_valid_token() -> Result<()> {
    let app = common::test_app();

    let (status, body) = common::request(&app, "GET", "/api/auth/me", None, None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _) =
        common::request(&app, "GET", "/api/auth/me", Some("not.a.token"), None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn me_returns_full_profile() -> Result<()> {
    let app = common::test_app();
    let (status, body) = common::request(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "name": "Agent A",
            "email": "agent@x.com",
            "password": "secret1",
            "role": "agent",
            "phone": "555-0100",
            "agentLicense": "LIC-1",
        })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    let token = body["token"].as_str().unwrap();

    let (status, body) = common::request(&app, "GET", "/api/auth/me", Some(token), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["phone"], "555-0100");
    assert_eq!(body["user"]["agentLicense"], "LIC-1");
    assert!(body["user"]["createdAt"].is_string());
    Ok(())
}
