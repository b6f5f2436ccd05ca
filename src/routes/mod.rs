//! HTTP routing.
//!
//! The API surface: `/api/auth/*`, `/api/universities`, `/api/data/*`
//! reporting, and `/api/pieces/*` worksheet endpoints including the Word
//! export. Success responses are
//! `{ "success": true, ... }` envelopes; every error path goes through
//! [`crate::error::AppError`].

pub mod auth;
pub mod data;
pub mod pieces;
pub mod universities;

use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use axum::{
    http::{header::CONTENT_TYPE, Method},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};

use crate::state::AppState;

/// Build the complete application router.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, axum::http::header::AUTHORIZATION])
        .allow_origin(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me))
        .route("/api/universities", get(universities::list))
        .route("/api/data/lectures", get(data::lectures))
        .route("/api/data/stats", get(data::stats))
        .route("/api/data/lecture-stats", get(data::lecture_stats))
        .route("/api/data/daily-problem-history", get(data::daily_problem_history))
        .route("/api/data/download", get(data::download))
        .route("/api/pieces/user-pieces", get(pieces::user_pieces))
        .route("/api/pieces/{subject}/{piece_id}/images", get(pieces::images))
        .route("/api/pieces/{subject}/{piece_id}/word", post(pieces::export_word))
        .layer(cors)
        .with_state(state)
}

async fn health() -> Json<Value> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    Json(json!({ "status": "OK", "timestamp": now }))
}
