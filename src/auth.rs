//! Token issuance and verification.
//!
//! Stateless HS256 JWTs with a 24-hour expiry, the same shape the dashboard
//! front-end already consumes: `sub` (user id), `email`, `role`, `exp`.
//! Password hashes are bcrypt; verification happens in the login handler.

use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::{db::AdminUser, error::AppError};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: i64,
    pub email: String,
    pub role: String,
    /// Expiry, seconds since the epoch.
    pub exp: u64,
}

/// Sign a token for a freshly authenticated admin.
pub fn issue_token(
    user: &AdminUser,
    secret: &str,
    ttl_hours: u64,
) -> Result<String, AppError> {
    let claims = Claims {
        sub: user.id,
        email: user.email.clone(),
        role: user.role.clone(),
        exp: now_secs() + ttl_hours * 3600,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("token signing failed: {e}")))
}

/// Verify a bearer token and return its claims.
///
/// Expired or tampered tokens all collapse into the same 401 message; the
/// caller has no reason to distinguish them.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::Unauthorized("유효하지 않은 토큰입니다.".to_string()))
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
