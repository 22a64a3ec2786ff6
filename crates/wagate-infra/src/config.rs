//! Environment-driven gateway configuration.
//!
//! Reads `WAGATE_*` variables with sensible defaults; malformed values
//! fall back with a warning rather than aborting startup.

use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;

/// Runtime settings for the gateway process.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    /// Process-default webhook target; not persisted, resets on restart.
    pub webhook_url: Option<String>,
    pub data_dir: PathBuf,
    /// Hard deadline per webhook delivery attempt.
    pub delivery_timeout: Duration,
}

impl GatewayConfig {
    /// Load configuration from the environment.
    ///
    /// - `WAGATE_HOST` / `WAGATE_PORT`: listen address (default `0.0.0.0:8080`)
    /// - `WAGATE_WEBHOOK_URL`: default webhook target (default: none)
    /// - `WAGATE_DATA_DIR`: data directory (default `~/.wagate`)
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("WAGATE_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string()),
            port: parse_port(std::env::var("WAGATE_PORT").ok()),
            webhook_url: std::env::var("WAGATE_WEBHOOK_URL").ok().filter(|s| !s.is_empty()),
            data_dir: resolve_data_dir(),
            delivery_timeout: crate::webhook::DEFAULT_DELIVERY_TIMEOUT,
        }
    }
}

fn parse_port(value: Option<String>) -> u16 {
    match value {
        None => DEFAULT_PORT,
        Some(raw) => match raw.parse() {
            Ok(port) => port,
            Err(_) => {
                tracing::warn!(value = %raw, "invalid WAGATE_PORT, using default");
                DEFAULT_PORT
            }
        },
    }
}

/// Resolve the data directory: `WAGATE_DATA_DIR`, falling back to
/// `~/.wagate`, falling back to `./.wagate`.
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("WAGATE_DATA_DIR") {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .map(|home| home.join(".wagate"))
        .unwrap_or_else(|| PathBuf::from(".wagate"))
}

/// Database URL for the gateway's SQLite store under `data_dir`.
pub fn database_url(data_dir: &Path) -> String {
    format!("sqlite://{}?mode=rwc", data_dir.join("wagate.db").display())
}
