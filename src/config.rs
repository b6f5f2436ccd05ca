//! Service configuration.
//!
//! Every knob lives in one [`AppConfig`] struct so it can be shared behind
//! the application state, logged at startup, and overridden from the
//! environment. Values fall back to documented defaults with an `info!` log
//! line, so a bare `campus-api` invocation works out of the box against a
//! local database.

use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use tracing::info;

/// Runtime configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// TCP port the HTTP server binds to. Default: 10000.
    pub port: u16,

    /// Path of the SQLite database file. Default: `campus.db`.
    pub database_path: PathBuf,

    /// HMAC secret for signing JWTs. Default is a development-only value;
    /// set `JWT_SECRET` in any real deployment.
    pub jwt_secret: String,

    /// Token lifetime in hours. Default: 24.
    pub token_ttl_hours: u64,

    /// Maximum embedded image width in pixels. Default: 520.
    ///
    /// Together with `max_image_height` this bounds every image placed in a
    /// worksheet cell. Images larger than the bounds are shrunk uniformly
    /// (aspect ratio preserved); smaller images are never upscaled.
    pub max_image_width: u32,

    /// Maximum embedded image height in pixels. Default: 680.
    pub max_image_height: u32,

    /// Hard timeout for a single remote image fetch, in seconds. Default: 15.
    pub fetch_timeout_secs: u64,

    /// Number of image downloads in flight per export request. Default: 4.
    ///
    /// Image hosts are network-bound, not CPU-bound, so a small fan-out cuts
    /// wall-clock time roughly proportionally to the row count without
    /// hammering the host. Results are re-joined by row index, so the
    /// document order never depends on completion order.
    pub fetch_concurrency: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 10000,
            database_path: PathBuf::from("campus.db"),
            jwt_secret: "dev-secret-change-me".to_string(),
            token_ttl_hours: 24,
            max_image_width: 520,
            max_image_height: 680,
            fetch_timeout_secs: 15,
            fetch_concurrency: 4,
        }
    }
}

impl AppConfig {
    /// Load configuration from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: load("PORT", defaults.port),
            database_path: env::var("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            jwt_secret: env::var("JWT_SECRET").unwrap_or(defaults.jwt_secret),
            token_ttl_hours: load("TOKEN_TTL_HOURS", defaults.token_ttl_hours),
            max_image_width: load("MAX_IMAGE_WIDTH", defaults.max_image_width),
            max_image_height: load("MAX_IMAGE_HEIGHT", defaults.max_image_height),
            fetch_timeout_secs: load("FETCH_TIMEOUT_SECS", defaults.fetch_timeout_secs),
            fetch_concurrency: load("FETCH_CONCURRENCY", defaults.fetch_concurrency),
        }
    }
}

fn load<T>(key: &str, default: T) -> T
where
    T: FromStr + Display + Copy,
{
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            info!("invalid {key}={raw}, using default: {default}");
            default
        }),
        Err(_) => default,
    }
}
