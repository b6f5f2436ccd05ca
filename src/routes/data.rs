//! Reporting endpoints: lectures, aggregate statistics, and study history.
//!
//! These are straightforward projections over the history table. Date
//! parameters are `YYYY-MM-DD` strings compared lexically, as stored.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{db::StatsAggregate, error::AppError, state::AppState};

const SELECT_FIELDS: &str = "대학교, 시작일, 종료일을 모두 선택해주세요.";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LecturesQuery {
    pub university_id: Option<i64>,
    pub subject_group: Option<String>,
}

/// `GET /api/data/lectures`
pub async fn lectures(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LecturesQuery>,
) -> Result<Json<Value>, AppError> {
    let (university_id, subject_group) = match (query.university_id, query.subject_group) {
        (Some(u), Some(s)) if !s.is_empty() => (u, s),
        _ => {
            return Err(AppError::Validation(
                "대학교와 과목군을 선택해주세요.".to_string(),
            ))
        }
    };

    let lectures = state.db.list_lectures(university_id, &subject_group).await?;
    Ok(Json(json!({ "success": true, "data": lectures })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodQuery {
    pub university_id: Option<i64>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub lecture_ids: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

struct Period {
    university_id: i64,
    start_date: String,
    end_date: String,
}

fn require_period(query: &PeriodQuery) -> Result<Period, AppError> {
    match (&query.university_id, &query.start_date, &query.end_date) {
        (Some(u), Some(s), Some(e)) if !s.is_empty() && !e.is_empty() => Ok(Period {
            university_id: *u,
            start_date: s.clone(),
            end_date: e.clone(),
        }),
        _ => Err(AppError::Validation(SELECT_FIELDS.to_string())),
    }
}

/// Comma-separated lecture id list. Whitespace tolerated, junk dropped;
/// an entirely junk list is a validation error.
fn parse_lecture_ids(raw: &str) -> Result<Vec<i64>, AppError> {
    let ids: Vec<i64> = raw
        .split(',')
        .filter_map(|part| part.trim().parse().ok())
        .collect();
    if ids.is_empty() {
        return Err(AppError::Validation("유효한 강의를 선택해주세요.".to_string()));
    }
    Ok(ids)
}

/// `GET /api/data/stats` — period totals for a whole university.
///
/// `averageRate` is derived from the summed counters rather than averaging
/// per-row accuracies, so days with many questions weigh more.
pub async fn stats(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<Value>, AppError> {
    let period = require_period(&query)?;
    let agg = state
        .db
        .period_stats(period.university_id, &period.start_date, &period.end_date, None)
        .await?;

    let average_rate = if agg.total_questions > 0 {
        agg.total_solved as f64 / agg.total_questions as f64 * 100.0
    } else {
        0.0
    };

    Ok(Json(json!({
        "success": true,
        "data": {
            "totalProblems": agg.total_questions,
            "totalSolved": agg.total_solved,
            "totalCorrect": agg.total_correct,
            "averageRate": average_rate,
            "originalRate": agg.avg_original_accuracy,
            "similarRate": agg.avg_similar_accuracy,
        },
    })))
}

/// `GET /api/data/lecture-stats` — same aggregates, restricted to lectures.
pub async fn lecture_stats(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<Value>, AppError> {
    let period = require_period(&query)?;
    let raw_ids = query
        .lecture_ids
        .as_deref()
        .ok_or_else(|| AppError::Validation("모든 필드를 선택해주세요.".to_string()))?;
    let ids = parse_lecture_ids(raw_ids)?;

    let agg = state
        .db
        .period_stats(
            period.university_id,
            &period.start_date,
            &period.end_date,
            Some(&ids),
        )
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": stats_payload(&agg),
    })))
}

fn stats_payload(agg: &StatsAggregate) -> Value {
    json!({
        "totalProblems": agg.total_questions,
        "totalSolved": agg.total_solved,
        "totalCorrect": agg.total_correct,
        "averageRate": agg.avg_accuracy,
        "originalRate": agg.avg_original_accuracy,
        "similarRate": agg.avg_similar_accuracy,
    })
}

/// `GET /api/data/daily-problem-history` — paginated per-day study rows,
/// newest first, optionally restricted to a lecture list.
pub async fn daily_problem_history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<Value>, AppError> {
    let period = require_period(&query)?;
    let lecture_ids = query
        .lecture_ids
        .as_deref()
        .map(parse_lecture_ids)
        .transpose()?;

    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).max(1);
    let offset = (page - 1) * limit;

    let rows = state
        .db
        .history_rows(
            period.university_id,
            &period.start_date,
            &period.end_date,
            lecture_ids.as_deref(),
            Some((limit, offset)),
        )
        .await?;
    let total = state
        .db
        .history_count(
            period.university_id,
            &period.start_date,
            &period.end_date,
            lecture_ids.as_deref(),
        )
        .await?;

    let total_pages = (total + limit - 1) / limit;

    Ok(Json(json!({
        "success": true,
        "data": {
            "history": rows,
            "pagination": {
                "currentPage": page,
                "totalPages": total_pages,
                "totalItems": total,
                "itemsPerPage": limit,
            },
        },
    })))
}

/// `GET /api/data/download` — the full unpaginated projection, consumed by
/// the client-side spreadsheet export.
pub async fn download(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<Value>, AppError> {
    let period = require_period(&query)?;
    let lecture_ids = query
        .lecture_ids
        .as_deref()
        .map(parse_lecture_ids)
        .transpose()?;

    let rows = state
        .db
        .history_rows(
            period.university_id,
            &period.start_date,
            &period.end_date,
            lecture_ids.as_deref(),
            None,
        )
        .await?;

    Ok(Json(json!({ "success": true, "data": rows })))
}
