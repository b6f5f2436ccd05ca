//! Integration tests for the auth, reference-data, and reporting endpoints.

use std::{net::SocketAddr, sync::Arc};

use axum::http::StatusCode;
use campus_api::{routes, AppConfig, AppState, Storage};
use serde_json::{json, Value};
use tokio::net::TcpListener;

async fn spawn_app() -> (SocketAddr, Arc<AppState>) {
    let db = Storage::open_in_memory().expect("open db");
    let state = AppState::with_storage(AppConfig::default(), db).expect("build state");

    let app = routes::router(state.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, state)
}

/// Insert an admin with a real bcrypt hash (minimum cost keeps tests fast).
async fn seed_admin(state: &AppState, email: &str, password: &str) {
    let hash = bcrypt::hash(password, 4).expect("hash");
    state
        .db
        .execute_batch(&format!(
            "INSERT INTO user (email, password, role, name)
                  VALUES ('{email}', '{hash}', 'admin', '관리자');"
        ))
        .await
        .expect("seed admin");
}

async fn login(addr: SocketAddr, email: &str, password: &str) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("http://{addr}/api/auth/login"))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("login request")
}

#[tokio::test]
async fn health_reports_ok() {
    let (addr, _state) = spawn_app().await;
    let body: Value = reqwest::get(format!("http://{addr}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "OK");
}

// ── Auth ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn login_requires_both_fields() {
    let (addr, _state) = spawn_app().await;
    let response = reqwest::Client::new()
        .post(format!("http://{addr}/api/auth/login"))
        .json(&json!({ "email": "admin@example.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn login_rejects_unknown_email_and_wrong_password_identically() {
    let (addr, state) = spawn_app().await;
    seed_admin(&state, "admin@example.com", "correct-horse").await;

    let unknown = login(addr, "nobody@example.com", "whatever").await;
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    let unknown_body: Value = unknown.json().await.unwrap();

    let wrong = login(addr, "admin@example.com", "wrong-password").await;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    let wrong_body: Value = wrong.json().await.unwrap();

    assert_eq!(unknown_body["message"], wrong_body["message"]);
}

#[tokio::test]
async fn login_ignores_non_admin_accounts() {
    let (addr, state) = spawn_app().await;
    let hash = bcrypt::hash("pw", 4).unwrap();
    state
        .db
        .execute_batch(&format!(
            "INSERT INTO user (email, password, role, name)
                  VALUES ('member@example.com', '{hash}', 'member', '학생');"
        ))
        .await
        .unwrap();

    let response = login(addr, "member@example.com", "pw").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_then_me_roundtrip() {
    let (addr, state) = spawn_app().await;
    seed_admin(&state, "admin@example.com", "correct-horse").await;

    let response = login(addr, "admin@example.com", "correct-horse").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["email"], "admin@example.com");
    let token = body["token"].as_str().unwrap().to_string();

    let me: Value = reqwest::Client::new()
        .get(format!("http://{addr}/api/auth/me"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["success"], true);
    assert_eq!(me["user"]["role"], "admin");
}

#[tokio::test]
async fn me_without_or_with_bad_token_is_401() {
    let (addr, _state) = spawn_app().await;

    let missing = reqwest::Client::new()
        .get(format!("http://{addr}/api/auth/me"))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    let garbage = reqwest::Client::new()
        .get(format!("http://{addr}/api/auth/me"))
        .bearer_auth("not.a.jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(garbage.status(), StatusCode::UNAUTHORIZED);
}

// ── Reference data & reporting ───────────────────────────────────────────

#[tokio::test]
async fn universities_listed_by_name() {
    let (addr, state) = spawn_app().await;
    state
        .db
        .execute_batch(
            "INSERT INTO university (id, name) VALUES (1, '한밭대'), (2, '강원대');",
        )
        .await
        .unwrap();

    let body: Value = reqwest::get(format!("http://{addr}/api/universities"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data[0]["name"], "강원대");
}

#[tokio::test]
async fn lectures_require_university_and_subject_group() {
    let (addr, _state) = spawn_app().await;
    let response = reqwest::get(format!("http://{addr}/api/data/lectures?universityId=1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn lectures_filter_deleted() {
    let (addr, state) = spawn_app().await;
    state
        .db
        .execute_batch(
            "INSERT INTO lecture (id, university_id, subject_group, name, is_deleted)
                  VALUES (1, 1, 'math', '미적분', 0),
                         (2, 1, 'math', '삭제됨', 1),
                         (3, 2, 'math', '타대학', 0);",
        )
        .await
        .unwrap();

    let body: Value = reqwest::get(format!(
        "http://{addr}/api/data/lectures?universityId=1&subjectGroup=math"
    ))
    .await
    .unwrap()
    .json()
    .await
    .unwrap();
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["name"], "미적분");
}

async fn seed_history(state: &AppState) {
    state
        .db
        .execute_batch(
            "INSERT INTO daily_history
                  (university_id, university_user_id, study_date, total_questions, total_solved, total_correct, total_accuracy, original_accuracy, similar_accuracy)
                  VALUES (1, 10, '2024-03-01', 10, 8, 6, 60.0, 70.0, 50.0),
                         (1, 11, '2024-03-02', 30, 12, 9, 30.0, 40.0, 20.0);",
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn stats_derive_average_rate_from_totals() {
    let (addr, state) = spawn_app().await;
    seed_history(&state).await;

    let body: Value = reqwest::get(format!(
        "http://{addr}/api/data/stats?universityId=1&startDate=2024-03-01&endDate=2024-03-31"
    ))
    .await
    .unwrap()
    .json()
    .await
    .unwrap();

    let data = &body["data"];
    assert_eq!(data["totalProblems"], 40);
    assert_eq!(data["totalSolved"], 20);
    assert_eq!(data["totalCorrect"], 15);
    // 20 / 40 * 100
    assert_eq!(data["averageRate"], 50.0);
}

#[tokio::test]
async fn stats_with_no_rows_are_all_zero() {
    let (addr, _state) = spawn_app().await;
    let body: Value = reqwest::get(format!(
        "http://{addr}/api/data/stats?universityId=9&startDate=2024-01-01&endDate=2024-01-31"
    ))
    .await
    .unwrap()
    .json()
    .await
    .unwrap();
    assert_eq!(body["data"]["totalProblems"], 0);
    assert_eq!(body["data"]["averageRate"], 0.0);
}

#[tokio::test]
async fn lecture_stats_reject_junk_id_list() {
    let (addr, _state) = spawn_app().await;
    let response = reqwest::get(format!(
        "http://{addr}/api/data/lecture-stats?universityId=1&startDate=2024-03-01&endDate=2024-03-31&lectureIds=a,b"
    ))
    .await
    .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn daily_history_paginates() {
    let (addr, state) = spawn_app().await;
    seed_history(&state).await;

    let body: Value = reqwest::get(format!(
        "http://{addr}/api/data/daily-problem-history?universityId=1&startDate=2024-03-01&endDate=2024-03-31&page=1&limit=1"
    ))
    .await
    .unwrap()
    .json()
    .await
    .unwrap();

    let data = &body["data"];
    assert_eq!(data["history"].as_array().unwrap().len(), 1);
    // Newest first.
    assert_eq!(data["history"][0]["study_date"], "2024-03-02");
    assert_eq!(data["pagination"]["currentPage"], 1);
    assert_eq!(data["pagination"]["totalPages"], 2);
    assert_eq!(data["pagination"]["totalItems"], 2);
    assert_eq!(data["pagination"]["itemsPerPage"], 1);
}

#[tokio::test]
async fn download_returns_everything_unpaginated() {
    let (addr, state) = spawn_app().await;
    seed_history(&state).await;

    let body: Value = reqwest::get(format!(
        "http://{addr}/api/data/download?universityId=1&startDate=2024-03-01&endDate=2024-03-31"
    ))
    .await
    .unwrap()
    .json()
    .await
    .unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

// ── Worksheet listing ────────────────────────────────────────────────────

#[tokio::test]
async fn user_pieces_requires_email() {
    let (addr, _state) = spawn_app().await;
    let response = reqwest::get(format!("http://{addr}/api/pieces/user-pieces"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn user_pieces_unknown_email_is_empty_success() {
    let (addr, _state) = spawn_app().await;
    let body: Value = reqwest::get(format!(
        "http://{addr}/api/pieces/user-pieces?email=nobody@example.com"
    ))
    .await
    .unwrap()
    .json()
    .await
    .unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"].as_array().unwrap().len(), 0);
}
