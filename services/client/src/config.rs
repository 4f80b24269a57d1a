//! services/client/src/config.rs
//!
//! Defines the client's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    /// Base URL of the session service, including the `/api` prefix.
    pub api_base_url: String,
    pub state_path: PathBuf,
    pub refresh_interval: Duration,
    pub http_timeout: Duration,
    pub log_level: Level,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Session Service ---
        let api_base_url = std::env::var("KARAOKE_API_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:5000/api".to_string());
        let api_base_url = api_base_url.trim().trim_end_matches('/').to_string();
        if api_base_url.is_empty() {
            return Err(ConfigError::MissingVar("KARAOKE_API_URL".to_string()));
        }
        if !api_base_url.starts_with("http://") && !api_base_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue(
                "KARAOKE_API_URL".to_string(),
                format!("'{}' is not an http(s) URL", api_base_url),
            ));
        }

        let http_timeout = Duration::from_millis(parse_u64("KARAOKE_HTTP_TIMEOUT_MS", 10_000)?);

        // --- Sync Settings ---
        let refresh_secs = parse_u64("KARAOKE_REFRESH_SECS", 15)?;
        if refresh_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "KARAOKE_REFRESH_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        // --- Local State ---
        let state_path = std::env::var("KARAOKE_STATE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./karaoke_state.json"));

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            api_base_url,
            state_path,
            refresh_interval: Duration::from_secs(refresh_secs),
            http_timeout,
            log_level,
        })
    }
}

fn parse_u64(var: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidValue(var.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}
