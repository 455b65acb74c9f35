//! Centralizes the environment variables `spec.md` §6 scatters across the
//! HTTP surface, persistence, and background tasks, following the shape of
//! the teacher's `RateLimitConfig::from_env` (`rate_limit.rs`) but for the
//! whole server instead of one subsystem.

use crate::rate_limit::RateLimitConfig;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// History replay page size (`spec.md` §9 open question, resolved): a
/// fixed constant, configurable only so tests can shrink it.
pub const DEFAULT_HISTORY_PAGE_SIZE: usize = 200;

pub struct CloudDocumentStoreConfig {
    pub base_url: String,
    pub api_key: String,
}

pub struct Config {
    pub port: u16,
    pub external_url: Option<String>,
    pub static_dir: PathBuf,
    pub uploads_dir: PathBuf,
    pub snapshot_path: PathBuf,
    pub cloud_document_store: Option<CloudDocumentStoreConfig>,
    pub history_page_size: usize,
    pub coalesce_window: Duration,
    pub keepalive_interval: Duration,
    pub rate_limit: RateLimitConfig,
}

impl Config {
    pub fn from_env() -> Self {
        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3000);

        let external_url = env::var("RENDER_EXTERNAL_URL").ok();

        let static_dir = env::var("STATIC_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("frontend/dist"));

        let uploads_dir = env::var("UPLOADS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data/uploads"));

        let snapshot_path = env::var("SNAPSHOT_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data/rooms.json"));

        let cloud_document_store = env::var("FIREBASE_SERVICE_ACCOUNT").ok().map(|api_key| {
            let base_url = env::var("FIREBASE_DOCUMENT_STORE_URL")
                .unwrap_or_else(|_| "https://firestore.googleapis.com/v1".to_string());
            CloudDocumentStoreConfig { base_url, api_key }
        });

        let history_page_size = env::var("HISTORY_PAGE_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_HISTORY_PAGE_SIZE)
            .max(100);

        let coalesce_window_ms: u64 = env::var("SNAPSHOT_COALESCE_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(2_000);

        let keepalive_interval_secs: u64 = env::var("KEEPALIVE_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(600);

        Self {
            port,
            external_url,
            static_dir,
            uploads_dir,
            snapshot_path,
            cloud_document_store,
            history_page_size,
            coalesce_window: Duration::from_millis(coalesce_window_ms),
            keepalive_interval: Duration::from_secs(keepalive_interval_secs),
            rate_limit: RateLimitConfig::from_env(),
        }
    }

    /// Builds a `Config` isolated from the process environment, for
    /// integration tests — a non-existent static/uploads dir (API-only
    /// mode) and a snapshot path the caller owns (usually inside a temp
    /// directory it cleans up itself).
    pub fn for_testing(snapshot_path: PathBuf) -> Self {
        Self {
            port: 0,
            external_url: None,
            static_dir: PathBuf::from("__no_such_frontend_dir__"),
            uploads_dir: snapshot_path.with_file_name("uploads"),
            snapshot_path,
            cloud_document_store: None,
            history_page_size: DEFAULT_HISTORY_PAGE_SIZE,
            coalesce_window: Duration::from_millis(50),
            keepalive_interval: Duration::from_secs(3600),
            rate_limit: RateLimitConfig::default(),
        }
    }
}
