//! Configuration for the dinner-picker server and client.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid DP_BIND_ADDR '{value}': {reason}")]
    InvalidBindAddr { value: String, reason: String },
}

/// Log output format of the server binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    pub log_format: LogFormat,
    /// Insert demo users, groups and sessions into an empty database
    pub seed_demo_data: bool,
    /// User recorded as admin of newly created groups
    pub acting_user_id: i64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let db_path = env::var("DP_DB_PATH")
            .unwrap_or_else(|_| "./data/dinner_picker.sqlite".to_string())
            .into();

        let bind_value = env::var("DP_BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let bind_addr = bind_value
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::InvalidBindAddr {
                value: bind_value.clone(),
                reason: e.to_string(),
            })?;

        let log_level = env::var("DP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let log_format = match env::var("DP_LOG_FORMAT") {
            Ok(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Ok(Self {
            db_path,
            bind_addr,
            log_level,
            log_format,
            seed_demo_data: env_or("DP_SEED_DEMO_DATA", true),
            acting_user_id: env_or("DP_ACTING_USER_ID", 1),
        })
    }
}

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_base_url: String,
    /// The member on whose behalf the client acts
    pub user_id: i64,
    pub request_timeout: Duration,
    pub poll_interval: Duration,
    pub vote_cooldown: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080".to_string(),
            user_id: 1,
            request_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_secs(30),
            vote_cooldown: Duration::from_millis(500),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Values that fail to parse fall back to the default.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        Self {
            api_base_url: env::var("DP_API_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base_url),
            user_id: env_or("DP_USER_ID", defaults.user_id),
            request_timeout: Duration::from_secs(env_or(
                "DP_REQUEST_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )),
            poll_interval: Duration::from_secs(env_or(
                "DP_POLL_INTERVAL_SECS",
                defaults.poll_interval.as_secs(),
            )),
            vote_cooldown: Duration::from_millis(env_or(
                "DP_VOTE_COOLDOWN_MS",
                defaults.vote_cooldown.as_millis() as u64,
            )),
        }
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: base_url.into(),
            ..Self::default()
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(key, value = %raw, "Ignoring unparseable configuration value");
                default
            }
        },
        Err(_) => default,
    }
}
