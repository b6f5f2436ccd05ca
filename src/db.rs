//! Relational store access.
//!
//! A thin, fully parameterized query layer over SQLite. The connection is
//! wrapped in a `tokio::sync::Mutex` because `rusqlite::Connection` is not
//! `Sync`; every query takes the lock for the duration of one statement.
//!
//! Worksheets for all subjects share one table with a `subject` column
//! rather than a table family per subject, so every query stays
//! parameterized end to end.

use std::path::Path;

use rusqlite::{params, types::Value, Connection, OptionalExtension};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::export::Row;

/// Schema applied idempotently on open.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS user (
    id       INTEGER PRIMARY KEY,
    email    TEXT NOT NULL UNIQUE,
    password TEXT NOT NULL,
    role     TEXT NOT NULL DEFAULT 'member',
    name     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS university (
    id   INTEGER PRIMARY KEY,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS university_user (
    id            INTEGER PRIMARY KEY,
    university_id INTEGER NOT NULL REFERENCES university(id),
    email         TEXT,
    account       TEXT,
    name          TEXT,
    student_no    TEXT
);

CREATE TABLE IF NOT EXISTS lecture (
    id                 INTEGER PRIMARY KEY,
    university_id      INTEGER NOT NULL,
    university_user_id INTEGER,
    subject_group      TEXT NOT NULL,
    name               TEXT NOT NULL,
    is_deleted         INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS lecture_student (
    lecture_id         INTEGER NOT NULL,
    university_user_id INTEGER NOT NULL,
    is_deleted         INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS daily_history (
    id                 INTEGER PRIMARY KEY,
    university_id      INTEGER NOT NULL,
    university_user_id INTEGER,
    study_date         TEXT NOT NULL,
    school_name        TEXT,
    account            TEXT,
    student_name       TEXT,
    student_no         TEXT,
    study_type         TEXT,
    piece_name         TEXT,
    subject_group      TEXT,
    total_questions    INTEGER NOT NULL DEFAULT 0,
    original_questions INTEGER NOT NULL DEFAULT 0,
    similar_questions  INTEGER NOT NULL DEFAULT 0,
    total_solved       INTEGER NOT NULL DEFAULT 0,
    original_solved    INTEGER NOT NULL DEFAULT 0,
    similar_solved     INTEGER NOT NULL DEFAULT 0,
    original_correct   INTEGER NOT NULL DEFAULT 0,
    similar_correct    INTEGER NOT NULL DEFAULT 0,
    total_correct      INTEGER NOT NULL DEFAULT 0,
    total_accuracy     REAL NOT NULL DEFAULT 0,
    original_accuracy  REAL NOT NULL DEFAULT 0,
    similar_accuracy   REAL NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS piece_info (
    id    INTEGER PRIMARY KEY,
    title TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS piece (
    id                 INTEGER PRIMARY KEY,
    subject            TEXT NOT NULL,
    piece_info_id      INTEGER,
    university_user_id INTEGER,
    is_deleted         INTEGER NOT NULL DEFAULT 0,
    created_at         TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS piece_problem (
    piece_id   INTEGER NOT NULL,
    problem_id INTEGER NOT NULL,
    seq        INTEGER NOT NULL,
    is_deleted INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS problem (
    id               INTEGER PRIMARY KEY,
    problem_img_url  TEXT,
    solution_img_url TEXT
);
";

/// An admin account row, as needed by the login flow.
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub name: String,
}

/// Public view of a user, returned by `/api/auth/me`.
#[derive(Debug, Clone, Serialize)]
pub struct UserInfo {
    pub id: i64,
    pub email: String,
    pub role: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct University {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Lecture {
    pub id: i64,
    pub university_id: i64,
    pub university_user_id: Option<i64>,
    pub subject_group: String,
    pub name: String,
}

/// One worksheet owned by a student, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct PieceSummary {
    pub subject: String,
    pub id: i64,
    pub title: Option<String>,
    pub created_at: String,
}

/// Aggregate study statistics over a date range.
#[derive(Debug, Clone, Default)]
pub struct StatsAggregate {
    pub total_questions: i64,
    pub total_solved: i64,
    pub total_correct: i64,
    pub avg_accuracy: f64,
    pub avg_original_accuracy: f64,
    pub avg_similar_accuracy: f64,
}

/// One per-student, per-day study record.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryRow {
    pub study_date: String,
    pub university_id: i64,
    pub school_name: Option<String>,
    pub account: Option<String>,
    pub student_name: Option<String>,
    pub student_no: Option<String>,
    pub study_type: Option<String>,
    pub piece_name: Option<String>,
    pub subject_group: Option<String>,
    pub total_questions: i64,
    pub original_questions: i64,
    pub similar_questions: i64,
    pub total_solved: i64,
    pub original_solved: i64,
    pub similar_solved: i64,
    pub original_correct: i64,
    pub similar_correct: i64,
    pub total_correct: i64,
    pub total_accuracy: f64,
    pub original_accuracy: f64,
    pub similar_accuracy: f64,
}

/// Handle to the SQLite store, shared across requests via `AppState`.
pub struct Storage {
    conn: Mutex<Connection>,
}

impl Storage {
    /// Open (or create) the database at `path` and apply the schema.
    pub fn open(path: &Path) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// In-memory store, used by tests.
    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Run raw statements. Used for migrations and test fixtures.
    pub async fn execute_batch(&self, sql: &str) -> Result<(), rusqlite::Error> {
        self.conn.lock().await.execute_batch(sql)
    }

    // ── Auth ────────────────────────────────────────────────────────────

    pub async fn admin_by_email(&self, email: &str) -> Result<Option<AdminUser>, rusqlite::Error> {
        self.conn
            .lock()
            .await
            .query_row(
                "SELECT id, email, password, role, name
                   FROM user
                  WHERE email = ?1 AND role = 'admin'
                  LIMIT 1",
                params![email],
                |r| {
                    Ok(AdminUser {
                        id: r.get(0)?,
                        email: r.get(1)?,
                        password_hash: r.get(2)?,
                        role: r.get(3)?,
                        name: r.get(4)?,
                    })
                },
            )
            .optional()
    }

    pub async fn user_by_id(&self, id: i64) -> Result<Option<UserInfo>, rusqlite::Error> {
        self.conn
            .lock()
            .await
            .query_row(
                "SELECT id, email, role, name FROM user WHERE id = ?1",
                params![id],
                |r| {
                    Ok(UserInfo {
                        id: r.get(0)?,
                        email: r.get(1)?,
                        role: r.get(2)?,
                        name: r.get(3)?,
                    })
                },
            )
            .optional()
    }

    // ── Reference data ──────────────────────────────────────────────────

    pub async fn list_universities(&self) -> Result<Vec<University>, rusqlite::Error> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare("SELECT id, name FROM university ORDER BY name ASC")?;
        let rows = stmt
            .query_map([], |r| Ok(University { id: r.get(0)?, name: r.get(1)? }))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub async fn list_lectures(
        &self,
        university_id: i64,
        subject_group: &str,
    ) -> Result<Vec<Lecture>, rusqlite::Error> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, university_id, university_user_id, subject_group, name
               FROM lecture
              WHERE university_id = ?1 AND subject_group = ?2 AND is_deleted = 0
              ORDER BY id DESC",
        )?;
        let rows = stmt
            .query_map(params![university_id, subject_group], |r| {
                Ok(Lecture {
                    id: r.get(0)?,
                    university_id: r.get(1)?,
                    university_user_id: r.get(2)?,
                    subject_group: r.get(3)?,
                    name: r.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ── Reporting ───────────────────────────────────────────────────────

    pub async fn period_stats(
        &self,
        university_id: i64,
        start_date: &str,
        end_date: &str,
        lecture_ids: Option<&[i64]>,
    ) -> Result<StatsAggregate, rusqlite::Error> {
        let (filter, mut values) = history_filter(university_id, start_date, end_date, lecture_ids);
        let sql = format!(
            "SELECT IFNULL(SUM(h.total_questions), 0),
                    IFNULL(SUM(h.total_solved), 0),
                    IFNULL(SUM(h.total_correct), 0),
                    IFNULL(AVG(h.total_accuracy), 0),
                    IFNULL(AVG(h.original_accuracy), 0),
                    IFNULL(AVG(h.similar_accuracy), 0)
               {filter}"
        );
        values.shrink_to_fit();
        self.conn.lock().await.query_row(
            &sql,
            rusqlite::params_from_iter(values),
            |r| {
                Ok(StatsAggregate {
                    total_questions: r.get(0)?,
                    total_solved: r.get(1)?,
                    total_correct: r.get(2)?,
                    avg_accuracy: r.get(3)?,
                    avg_original_accuracy: r.get(4)?,
                    avg_similar_accuracy: r.get(5)?,
                })
            },
        )
    }

    pub async fn history_count(
        &self,
        university_id: i64,
        start_date: &str,
        end_date: &str,
        lecture_ids: Option<&[i64]>,
    ) -> Result<i64, rusqlite::Error> {
        let (filter, values) = history_filter(university_id, start_date, end_date, lecture_ids);
        let sql = format!("SELECT COUNT(*) {filter}");
        self.conn
            .lock()
            .await
            .query_row(&sql, rusqlite::params_from_iter(values), |r| r.get(0))
    }

    /// Per-day study rows, newest first. `limit = None` returns everything
    /// (the spreadsheet-download projection).
    pub async fn history_rows(
        &self,
        university_id: i64,
        start_date: &str,
        end_date: &str,
        lecture_ids: Option<&[i64]>,
        page: Option<(i64, i64)>,
    ) -> Result<Vec<HistoryRow>, rusqlite::Error> {
        let (filter, mut values) = history_filter(university_id, start_date, end_date, lecture_ids);
        let mut sql = format!(
            "SELECT h.study_date, h.university_id, h.school_name, h.account,
                    h.student_name, h.student_no, h.study_type, h.piece_name,
                    h.subject_group,
                    h.total_questions, h.original_questions, h.similar_questions,
                    h.total_solved, h.original_solved, h.similar_solved,
                    h.original_correct, h.similar_correct, h.total_correct,
                    h.total_accuracy, h.original_accuracy, h.similar_accuracy
               {filter}
              ORDER BY h.study_date DESC, h.account"
        );
        if let Some((limit, offset)) = page {
            sql.push_str(" LIMIT ? OFFSET ?");
            values.push(Value::from(limit));
            values.push(Value::from(offset));
        }

        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(values), |r| {
                Ok(HistoryRow {
                    study_date: r.get(0)?,
                    university_id: r.get(1)?,
                    school_name: r.get(2)?,
                    account: r.get(3)?,
                    student_name: r.get(4)?,
                    student_no: r.get(5)?,
                    study_type: r.get(6)?,
                    piece_name: r.get(7)?,
                    subject_group: r.get(8)?,
                    total_questions: r.get(9)?,
                    original_questions: r.get(10)?,
                    similar_questions: r.get(11)?,
                    total_solved: r.get(12)?,
                    original_solved: r.get(13)?,
                    similar_solved: r.get(14)?,
                    original_correct: r.get(15)?,
                    similar_correct: r.get(16)?,
                    total_correct: r.get(17)?,
                    total_accuracy: r.get(18)?,
                    original_accuracy: r.get(19)?,
                    similar_accuracy: r.get(20)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ── Worksheets ──────────────────────────────────────────────────────

    /// Every non-deleted worksheet of the student with this account email,
    /// across all subjects, newest first. Unknown email yields an empty
    /// list, not an error.
    pub async fn user_pieces(&self, email: &str) -> Result<Vec<PieceSummary>, rusqlite::Error> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT p.subject, p.id, i.title, date(p.created_at)
               FROM piece p
               LEFT JOIN piece_info i ON i.id = p.piece_info_id
               JOIN university_user uu ON uu.id = p.university_user_id
              WHERE p.is_deleted = 0 AND uu.email = ?1
              ORDER BY p.created_at DESC",
        )?;
        let rows = stmt
            .query_map(params![email], |r| {
                Ok(PieceSummary {
                    subject: r.get(0)?,
                    id: r.get(1)?,
                    title: r.get(2)?,
                    created_at: r.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Ordered problem/solution URL pairs for one worksheet.
    ///
    /// This is the row fetcher of the export pipeline: deleted parents and
    /// children are filtered out, order follows the explicit `seq` column,
    /// and an unknown id simply yields an empty vec.
    pub async fn piece_rows(
        &self,
        subject: &str,
        piece_id: i64,
    ) -> Result<Vec<Row>, rusqlite::Error> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT pp.seq, pr.problem_img_url, pr.solution_img_url
               FROM piece p
               JOIN piece_problem pp ON pp.piece_id = p.id
               LEFT JOIN problem pr ON pr.id = pp.problem_id
              WHERE p.is_deleted = 0 AND pp.is_deleted = 0
                AND p.subject = ?1 AND p.id = ?2
              ORDER BY pp.seq",
        )?;
        let rows = stmt
            .query_map(params![subject, piece_id], |r| {
                Ok(Row {
                    seq: r.get(0)?,
                    problem_url: r.get(1)?,
                    solution_url: r.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

/// Shared FROM/WHERE tail for the reporting queries, with bind values.
///
/// When a lecture filter is present the history is joined against the
/// lecture/student mapping, reproducing the lecture-scoped variants of the
/// stats and history endpoints.
fn history_filter(
    university_id: i64,
    start_date: &str,
    end_date: &str,
    lecture_ids: Option<&[i64]>,
) -> (String, Vec<Value>) {
    let mut values = vec![
        Value::from(university_id),
        Value::from(start_date.to_string()),
        Value::from(end_date.to_string()),
    ];

    let mut sql = String::from(
        "FROM daily_history h
          WHERE h.university_id = ?1 AND h.study_date BETWEEN ?2 AND ?3",
    );

    if let Some(ids) = lecture_ids {
        let placeholders = vec!["?"; ids.len()].join(",");
        sql.push_str(&format!(
            " AND EXISTS (SELECT 1 FROM lecture_student m
                           WHERE m.university_user_id = h.university_user_id
                             AND m.is_deleted = 0
                             AND m.lecture_id IN ({placeholders}))"
        ));
        values.extend(ids.iter().copied().map(Value::from));
    }

    (sql, values)
}
