//! Login, logout, and the current-user lookup.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::{auth, error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// `POST /api/auth/login` — admin accounts only.
///
/// Unknown email and wrong password produce the identical 401 message on
/// purpose, so the endpoint cannot be used to probe which emails exist.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<Value>, AppError> {
    let (email, password) = match (body.email.as_deref(), body.password.as_deref()) {
        (Some(e), Some(p)) if !e.is_empty() && !p.is_empty() => (e, p),
        _ => {
            return Err(AppError::Validation(
                "이메일과 비밀번호를 입력해주세요.".to_string(),
            ))
        }
    };

    let rejected = || AppError::Unauthorized("유효하지 않은 이메일 또는 비밀번호입니다.".to_string());

    let user = state.db.admin_by_email(email).await?.ok_or_else(rejected)?;

    let valid = bcrypt::verify(password, &user.password_hash)
        .map_err(|e| AppError::Internal(format!("bcrypt verify failed: {e}")))?;
    if !valid {
        return Err(rejected());
    }

    let token = auth::issue_token(&user, &state.config.jwt_secret, state.config.token_ttl_hours)?;
    info!("admin login: {}", user.email);

    Ok(Json(json!({
        "success": true,
        "message": "로그인 성공",
        "token": token,
        "user": {
            "id": user.id,
            "email": user.email,
            "name": user.name,
            "role": user.role,
        },
    })))
}

/// `POST /api/auth/logout` — tokens are stateless, so this only acknowledges.
pub async fn logout() -> Json<Value> {
    Json(json!({ "success": true, "message": "로그아웃 성공" }))
}

/// `GET /api/auth/me` — resolve the bearer token to its user row.
pub async fn me(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    let token = bearer_token(&headers)
        .ok_or_else(|| AppError::Unauthorized("토큰이 필요합니다.".to_string()))?;

    let claims = auth::verify_token(token, &state.config.jwt_secret)?;

    let user = state
        .db
        .user_by_id(claims.sub)
        .await?
        .ok_or_else(|| AppError::NotFound("사용자를 찾을 수 없습니다.".to_string()))?;

    Ok(Json(json!({ "success": true, "user": user })))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}
