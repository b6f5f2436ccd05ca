//! Shared application state.

use std::{sync::Arc, time::Duration};

use crate::{config::AppConfig, db::Storage, error::AppError};

/// Process-scoped state handed to every handler: configuration, the store
/// handle, and one pooled HTTP client for image fetches.
pub struct AppState {
    pub config: AppConfig,
    pub db: Storage,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Arc<Self>, AppError> {
        let db = Storage::open(&config.database_path)?;
        Self::with_storage(config, db)
    }

    /// Build state around an existing store. Tests use this with an
    /// in-memory database.
    pub fn with_storage(config: AppConfig, db: Storage) -> Result<Arc<Self>, AppError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("http client init failed: {e}")))?;

        Ok(Arc::new(Self { config, db, http }))
    }
}
