//! Session store, the single source of truth for who is logged in.
//!
//! Owns the session lifecycle and exposes read-only role predicates. The
//! gateway ends the session through the same cell when a refresh fails.
//! [`SessionStore`] is a cheap clonable handle.

mod bootstrap;
mod cell;
mod state;

use std::sync::Arc;

use reqwest::StatusCode;
use tokio::sync::watch;
use tracing::{info, warn};

pub use state::{Session, SessionState};

use self::cell::SessionCell;
use crate::config::ClientConfig;
use crate::error::{GatewayResult, SessionError};
use crate::gateway::{Gateway, IDENTITY_PATH, Navigator};
use crate::models::{Identity, TokenPair};
use crate::storage::TokenStorage;

const DEFAULT_LOGIN_FAILURE: &str = "Invalid credentials";

#[derive(Clone)]
pub struct SessionStore {
    cell: Arc<SessionCell>,
    gateway: Arc<Gateway>,
}

impl SessionStore {
    /// Build a store in the `Unknown` state together with the gateway that
    /// reads its credentials. Call [`SessionStore::bootstrap`] next.
    pub fn new(
        config: &ClientConfig,
        storage: Arc<dyn TokenStorage>,
        navigator: Arc<dyn Navigator>,
    ) -> GatewayResult<Self> {
        let cell = Arc::new(SessionCell::new(storage));
        let gateway = Arc::new(Gateway::new(config, cell.clone(), navigator)?);
        Ok(Self { cell, gateway })
    }

    /// The gateway every feature call should go through.
    pub fn gateway(&self) -> Arc<Gateway> {
        Arc::clone(&self.gateway)
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> SessionState {
        self.cell.snapshot()
    }

    /// Receiver notified on every state transition.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.cell.subscribe()
    }

    pub fn current_user(&self) -> Option<Identity> {
        self.cell.snapshot().user().cloned()
    }

    pub fn is_authenticated(&self) -> bool {
        self.cell.snapshot().is_authenticated()
    }

    /// Exact-match role check; false unless authenticated.
    pub fn has_role(&self, role: &str) -> bool {
        self.cell.has_role(role)
    }

    pub fn has_any_role(&self, roles: &[&str]) -> bool {
        self.cell.has_any_role(roles)
    }

    /// Restore the session from persisted tokens.
    ///
    /// Ends in `Authenticated` or `Anonymous`; never returns an error. Any
    /// failure along the way clears persisted tokens.
    pub async fn bootstrap(&self) -> SessionState {
        bootstrap::run(&self.cell, &self.gateway).await
    }

    /// Log in with a username-or-email credential.
    ///
    /// On success both tokens are persisted before the identity becomes
    /// visible. On failure the store is `Anonymous` and the error is
    /// returned for display.
    pub async fn login(&self, credential: &str, password: &str) -> Result<Identity, SessionError> {
        let credential = credential.trim();
        if credential.is_empty() || password.is_empty() {
            return Err(SessionError::MissingCredentials);
        }

        // Calls issued meanwhile keep using the current credential.
        self.cell.modify(|state| {
            let pending = state.credentials().cloned();
            *state = SessionState::Authenticating { pending };
            true
        });

        let response = match self.gateway.login(credential, password).await {
            Ok(response) => response,
            Err(err) => {
                warn!(credential, error = %err, "login failed");
                self.cell.clear().await;
                return Err(match err.status() {
                    Some(StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED) => {
                        SessionError::InvalidCredentials(
                            err.detail()
                                .unwrap_or_else(|| DEFAULT_LOGIN_FAILURE.to_string()),
                        )
                    }
                    _ => SessionError::Gateway(err),
                });
            }
        };

        let tokens = TokenPair::new(response.access, response.refresh);
        if let Err(e) = self.cell.storage.save(&tokens).await {
            warn!(error = %e, "failed to persist tokens after login");
            self.cell.clear().await;
            return Err(e.into());
        }

        let user = response.user;
        info!(username = %user.username, role = %user.role, "logged in");
        self.cell.set(SessionState::Authenticated(Session {
            user: user.clone(),
            tokens,
        }));
        Ok(user)
    }

    /// Drop the session. Cannot fail; a storage error is only logged.
    pub async fn logout(&self) {
        if let Some(user) = self.current_user() {
            info!(username = %user.username, "logged out");
        }
        self.cell.clear().await;
    }

    /// Re-fetch the identity through the gateway and replace it wholesale.
    pub async fn refresh_identity(&self) -> Result<Identity, SessionError> {
        let user: Identity = self.gateway.get(IDENTITY_PATH).await?;
        self.cell.modify(|state| match state {
            SessionState::Authenticated(session) => {
                session.user = user.clone();
                true
            }
            _ => false,
        });
        Ok(user)
    }
}
