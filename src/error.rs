//! Error types for the campus-api service.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`AppError`] — **Fatal for the request**: the handler cannot produce its
//!   normal response (bad input, nothing found, store failure, document
//!   build failure). Converted into the JSON error envelope the dashboard
//!   front-end expects: `{ "success": false, "message": ... }`.
//!
//! * [`crate::export::normalize`] failures — **Non-fatal**: a single remote
//!   image failed to download or decode. These are contained inside the
//!   export pipeline as an absent result and rendered as a placeholder cell,
//!   so one bad image never aborts a whole document.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// All request-level errors returned by route handlers.
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or malformed client input. Always rejected before any work.
    #[error("{0}")]
    Validation(String),

    /// Valid request shape, but nothing matches (unknown user, empty piece).
    #[error("{0}")]
    NotFound(String),

    /// Missing, expired, or otherwise unusable credentials.
    #[error("{0}")]
    Unauthorized(String),

    /// The relational store failed mid-query.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Building or packing the Word document failed.
    #[error("document build failed: {0}")]
    DocumentBuild(String),

    /// Unexpected internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Database(_) | AppError::DocumentBuild(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// User-facing message. Server-side failures get a generic Korean
    /// message matching the rest of the dashboard; the detail goes to the
    /// log instead.
    fn message(&self) -> String {
        match self {
            AppError::Validation(m) | AppError::NotFound(m) | AppError::Unauthorized(m) => {
                m.clone()
            }
            AppError::Database(_) | AppError::Internal(_) => {
                "요청 처리 중 오류가 발생했습니다.".to_string()
            }
            AppError::DocumentBuild(_) => "Word 문서 생성 중 오류가 발생했습니다.".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("request failed: {self}");
        }

        let mut body = json!({
            "success": false,
            "message": self.message(),
        });

        // Internal detail is only exposed outside production deployments.
        if status.is_server_error() && expose_error_detail() {
            body["error"] = json!(self.to_string());
        }

        (status, Json(body)).into_response()
    }
}

fn expose_error_detail() -> bool {
    std::env::var("APP_ENV").map(|v| v != "production").unwrap_or(false)
}
