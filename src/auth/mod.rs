use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::http::HeaderMap;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Role, User};
use crate::error::ApiError;
use crate::store::Store;

/// Token claims: the bound user id plus the standard time bounds.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(user_id: Uuid, ttl_days: i64) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id,
            iat: now.timestamp(),
            exp: (now + Duration::days(ttl_days)).timestamp(),
        }
    }
}

/// The authenticated caller: a live user record resolved from a verified
/// token, minus the credential.
#[derive(Debug, Clone)]
pub struct Identity {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub phone: String,
    pub agent_license: String,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for Identity {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            phone: user.phone,
            agent_license: user.agent_license,
            verified: user.verified,
            created_at: user.created_at,
        }
    }
}

/// Produce an opaque signed credential bound to a user identity.
pub fn issue_token(user_id: Uuid, secret: &str, ttl_days: i64) -> Result<String, ApiError> {
    if secret.is_empty() {
        tracing::error!("JWT_SECRET is not configured");
        return Err(ApiError::internal("Authentication is not configured"));
    }
    encode(
        &Header::default(),
        &Claims::new(user_id, ttl_days),
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| {
        tracing::error!("token generation failed: {}", e);
        ApiError::internal("Failed to issue token")
    })
}

/// Verify signature and expiry, returning the bound user id.
pub fn verify_token(token: &str, secret: &str) -> Result<Uuid, ApiError> {
    if secret.is_empty() {
        tracing::error!("JWT_SECRET is not configured");
        return Err(ApiError::internal("Authentication is not configured"));
    }
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ApiError::unauthorized("Invalid or expired token"))?;
    Ok(data.claims.sub)
}

/// Resolve the caller's identity from the `Authorization: Bearer` header.
/// Fails with 401 if the header is missing or malformed, the token does not
/// verify, or the referenced user no longer exists.
pub async fn authenticate(
    store: &dyn Store,
    secret: &str,
    headers: &HeaderMap,
) -> Result<Identity, ApiError> {
    let token = bearer_token(headers)?;
    let user_id = verify_token(&token, secret)?;
    let user = store
        .user_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("User no longer exists"))?;
    Ok(Identity::from(user))
}

/// Role gate: 403 unless the caller's role is in the allowed set.
pub fn authorize(identity: &Identity, allowed: &[Role]) -> Result<(), ApiError> {
    if allowed.contains(&identity.role) {
        Ok(())
    } else {
        Err(ApiError::forbidden(format!(
            "Role '{}' is not authorized for this action",
            identity.role.as_str()
        )))
    }
}

fn bearer_token(headers: &HeaderMap) -> Result<String, ApiError> {
    let header = headers
        .get("authorization")
        .ok_or_else(|| ApiError::unauthorized("Missing Authorization header"))?;
    let value = header
        .to_str()
        .map_err(|_| ApiError::unauthorized("Invalid Authorization header"))?;
    match value.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
        _ => Err(ApiError::unauthorized(
            "Authorization header must use Bearer token format",
        )),
    }
}

/// One-way salted password hash. The raw password never leaves this function.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            tracing::error!("password hashing failed: {}", e);
            ApiError::internal("Failed to process credentials")
        })
}

/// Recompute and compare against a stored hash.
pub fn verify_password(stored_hash: &str, password: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}
