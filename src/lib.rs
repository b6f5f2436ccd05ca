//! # campus-api
//!
//! Backend for a university learning dashboard: JWT-protected admin login,
//! reference-data and reporting endpoints over a relational store, and a
//! Word-document (`.docx`) export that composes a paginated worksheet from
//! externally hosted problem/solution images.
//!
//! ## Export Pipeline Overview
//!
//! ```text
//! POST /api/pieces/{subject}/{piece_id}/word
//!  │
//!  ├─ 1. Fetch    ordered problem/solution URL pairs from the store
//!  ├─ 2. Prepare  download, validate, resize, re-encode each image as PNG
//!  │              (bounded fan-out; failures degrade to placeholders)
//!  ├─ 3. Assemble title page + one two-cell section per row, landscape
//!  └─ 4. Emit     packed .docx as a download with an RFC 5987 filename
//! ```
//!
//! A single bad image never fails an export: the prepare stage returns an
//! optional result per URL and the assembler substitutes a placeholder cell.
//! Only row-fetch and document-build failures surface as request errors.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use campus_api::{AppConfig, AppState};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let state = AppState::new(AppConfig::from_env())?;
//!     let app = campus_api::routes::router(state);
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:10000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod routes;
pub mod state;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::AppConfig;
pub use db::Storage;
pub use error::AppError;
pub use state::AppState;
