//! Worksheet endpoints, including the Word export.

use std::{io::Cursor, sync::Arc};

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{
        header::{CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE},
        HeaderName, Response,
    },
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::{
    error::AppError,
    export::{self, assemble, filename},
    state::AppState,
};

const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

#[derive(Debug, Deserialize)]
pub struct UserPiecesQuery {
    pub email: Option<String>,
}

/// `GET /api/pieces/user-pieces` — every worksheet of one student.
pub async fn user_pieces(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UserPiecesQuery>,
) -> Result<Json<Value>, AppError> {
    let email = query
        .email
        .as_deref()
        .filter(|e| !e.is_empty())
        .ok_or_else(|| AppError::Validation("이메일을 입력해주세요.".to_string()))?;

    let pieces = state.db.user_pieces(email).await?;
    Ok(Json(json!({ "success": true, "data": pieces })))
}

/// `GET /api/pieces/{subject}/{piece_id}/images` — raw URL lists.
pub async fn images(
    State(state): State<Arc<AppState>>,
    Path((subject, piece_id)): Path<(String, i64)>,
) -> Result<Json<Value>, AppError> {
    let rows = state.db.piece_rows(&subject, piece_id).await?;

    let problem_urls: Vec<&String> = rows.iter().filter_map(|r| r.problem_url.as_ref()).collect();
    let solution_urls: Vec<&String> =
        rows.iter().filter_map(|r| r.solution_url.as_ref()).collect();

    Ok(Json(json!({
        "success": true,
        "data": {
            "problem_img_urls": problem_urls,
            "solution_img_urls": solution_urls,
        },
    })))
}

#[derive(Debug, Deserialize)]
pub struct WordRequest {
    pub title: Option<String>,
}

/// `POST /api/pieces/{subject}/{piece_id}/word` — run the export pipeline
/// and emit the packed document as a download.
///
/// The title is validated before any row fetch; an empty piece is a 404
/// distinct from mid-pipeline failures; per-image failures never surface
/// here at all (they become placeholder cells).
pub async fn export_word(
    State(state): State<Arc<AppState>>,
    Path((subject, piece_id)): Path<(String, i64)>,
    Json(body): Json<WordRequest>,
) -> Result<Response<Body>, AppError> {
    let title = body
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Validation("제목을 입력해주세요.".to_string()))?
        .to_string();

    let rows = state.db.piece_rows(&subject, piece_id).await?;
    if rows.is_empty() {
        return Err(AppError::NotFound(
            "문제 또는 해설 이미지가 없습니다.".to_string(),
        ));
    }

    info!("word export: subject={subject} piece={piece_id} rows={}", rows.len());

    let sections = export::prepare_images(&state.http, &rows, &state.config).await;
    let docx = assemble::assemble(&title, &sections);

    let mut buffer = Vec::new();
    docx.build()
        .pack(&mut Cursor::new(&mut buffer))
        .map_err(|e| AppError::DocumentBuild(e.to_string()))?;

    Response::builder()
        .header(CONTENT_TYPE, DOCX_MIME)
        .header(CONTENT_DISPOSITION, filename::content_disposition(&title))
        .header(CACHE_CONTROL, "no-transform")
        .header(HeaderName::from_static("x-content-type-options"), "nosniff")
        .header(CONTENT_LENGTH, buffer.len())
        .body(Body::from(buffer))
        .map_err(|e| AppError::Internal(format!("response build failed: {e}")))
}
