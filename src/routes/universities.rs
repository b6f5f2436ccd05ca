//! University reference data.

use std::sync::Arc;

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::{error::AppError, state::AppState};

/// `GET /api/universities` — id/name pairs ordered by name.
pub async fn list(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    let universities = state.db.list_universities().await?;
    Ok(Json(json!({ "success": true, "data": universities })))
}
