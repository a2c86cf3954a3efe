//! Error types shared by the gateway, session store and token storage.

use reqwest::StatusCode;
use thiserror::Error;

/// Gateway result alias.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors surfaced by the HTTP gateway.
///
/// Only the 401 case is ever recovered locally; every other variant reaches
/// the caller unchanged.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Connection failure, DNS failure or timeout.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("HTTP {status} from {url}")]
    Status {
        status: StatusCode,
        url: String,
        body: String,
    },

    /// Request body could not be encoded or response body decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl GatewayError {
    /// HTTP status of the failed response, if the server answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            GatewayError::Status { status, .. } => Some(*status),
            GatewayError::Transport(e) => e.status(),
            _ => None,
        }
    }

    /// True for the authorization-expiry class (HTTP 401).
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, GatewayError::Transport(e) if e.is_timeout())
    }

    /// Server-provided `detail` message, when the error body carries one.
    pub fn detail(&self) -> Option<String> {
        let GatewayError::Status { body, .. } = self else {
            return None;
        };
        let value: serde_json::Value = serde_json::from_str(body).ok()?;
        value
            .get("detail")
            .and_then(|d| d.as_str())
            .map(str::to_string)
    }
}

/// Errors surfaced by the session store.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Credential and password are required")]
    MissingCredentials,

    /// Login rejected by the server. Carries a user-displayable message.
    #[error("{0}")]
    InvalidCredentials(String),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors from the durable token store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Token file is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),
}
