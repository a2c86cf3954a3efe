//! Authentication models and token-endpoint wire types.

use std::fmt;

use chrono::{DateTime, Utc};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

/// Authenticated user's profile snapshot, as returned by the server.
///
/// Replaced wholesale on every identity fetch; never patched locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    /// Opaque role tag (see [`crate::models::roles`]).
    #[serde(rename = "rol")]
    pub role: String,
}

impl Identity {
    /// "First Last", falling back to the username when both are blank.
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}

/// Access + refresh token pair. The only state that survives a restart.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

impl TokenPair {
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: access.into(),
            refresh: refresh.into(),
        }
    }

    /// Expiry of the access token read from its `exp` claim.
    ///
    /// The signature is NOT verified; this is for display only.
    pub fn access_expires_at(&self) -> Option<DateTime<Utc>> {
        #[derive(Deserialize)]
        struct ExpClaim {
            exp: i64,
        }

        let mut validation = Validation::default();
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        let key = DecodingKey::from_secret(&[]);
        let data = decode::<ExpClaim>(&self.access, &key, &validation).ok()?;
        DateTime::from_timestamp(data.claims.exp, 0)
    }
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access", &"<redacted>")
            .field("refresh", &"<redacted>")
            .finish()
    }
}

/// `POST /auth/token/` body. The credential may be a username or an email.
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// `POST /auth/token/` response.
#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub access: String,
    pub refresh: String,
    pub user: Identity,
}

/// `POST /auth/token/refresh/` body.
#[derive(Debug, Serialize)]
pub struct RefreshRequest<'a> {
    pub refresh: &'a str,
}

/// `POST /auth/token/refresh/` response.
///
/// `refresh` is present when the server rotates refresh tokens.
#[derive(Debug, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
}
