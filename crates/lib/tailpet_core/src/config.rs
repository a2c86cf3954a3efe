//! Client configuration.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Default API base path.
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";

/// Fixed per-request timeout: 10 seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// File name of the persisted token pair inside the data directory.
const TOKEN_FILE_NAME: &str = "tokens.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid TAILPET_API_URL '{value}': {source}")]
    InvalidUrl {
        value: String,
        source: url::ParseError,
    },

    #[error("Invalid TAILPET_TIMEOUT_SECS '{0}': expected a positive integer")]
    InvalidTimeout(String),

    #[error("Data directory not available; set TAILPET_TOKEN_FILE")]
    NoDataDir,
}

/// Configuration for the API client.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Base path every endpoint path is appended to.
    pub api_base_url: Url,
    /// Timeout applied to each outbound call.
    pub request_timeout: Duration,
    /// Where the access/refresh token pair is persisted.
    pub token_file: PathBuf,
}

impl ClientConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable               | Default                                  |
    /// |------------------------|------------------------------------------|
    /// | `TAILPET_API_URL`      | `http://localhost:8000/api`              |
    /// | `TAILPET_TIMEOUT_SECS` | `10`                                     |
    /// | `TAILPET_TOKEN_FILE`   | `<data dir>/tailpet/tokens.json`         |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ClientConfig::from_env`], reading values through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let raw_url = lookup("TAILPET_API_URL")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let api_base_url = Url::parse(&raw_url).map_err(|source| ConfigError::InvalidUrl {
            value: raw_url.clone(),
            source,
        })?;

        let request_timeout = match lookup("TAILPET_TIMEOUT_SECS").filter(|v| !v.is_empty()) {
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => return Err(ConfigError::InvalidTimeout(raw)),
            },
        };

        let token_file = match lookup("TAILPET_TOKEN_FILE").filter(|v| !v.is_empty()) {
            Some(path) => PathBuf::from(path),
            None => default_token_file().ok_or(ConfigError::NoDataDir)?,
        };

        Ok(Self {
            api_base_url,
            request_timeout,
            token_file,
        })
    }

    /// Config pointing at `base_url`, with the default timeout and a token
    /// file path that callers are expected to override when persisting.
    pub fn with_base_url(base_url: Url) -> Self {
        Self {
            api_base_url: base_url,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            token_file: default_token_file().unwrap_or_else(|| PathBuf::from(TOKEN_FILE_NAME)),
        }
    }
}

/// `<data dir>/tailpet/tokens.json`.
fn default_token_file() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("tailpet").join(TOKEN_FILE_NAME))
}
