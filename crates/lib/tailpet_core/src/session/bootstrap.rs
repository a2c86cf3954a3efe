//! Startup verification of persisted tokens.
//!
//! ```text
//! ReadStorage ──(both tokens)──▶ FetchIdentity ──ok──▶ Authenticated
//!      │                              │ failed
//!      │                              ▼
//!      │                           Refresh ──ok──▶ FetchIdentity(after refresh) ──ok──▶ Authenticated
//!      │                              │ failed                 │ failed
//!      └──(missing)──────────────────▶┴──────▶ Anonymous ◀─────┘   (storage cleared)
//! ```

use tracing::{debug, info, warn};

use super::cell::SessionCell;
use super::state::{Session, SessionState};
use crate::gateway::{Gateway, Renewal};
use crate::models::TokenPair;

#[derive(Debug)]
enum Step {
    ReadStorage,
    FetchIdentity { tokens: TokenPair, refreshed: bool },
    Refresh { tokens: TokenPair },
    Authenticated(Session),
    Anonymous { reason: &'static str },
}

/// Drive the bootstrap chain to a terminal state and install it.
pub(super) async fn run(cell: &SessionCell, gateway: &Gateway) -> SessionState {
    cell.set(SessionState::Unknown);
    let mut step = Step::ReadStorage;
    loop {
        step = match step {
            Step::ReadStorage => read_storage(cell).await,
            Step::FetchIdentity { tokens, refreshed } => {
                cell.set(SessionState::Authenticating {
                    pending: Some(tokens.clone()),
                });
                fetch_identity(gateway, tokens, refreshed).await
            }
            Step::Refresh { tokens } => refresh(cell, gateway, tokens).await,
            Step::Authenticated(session) => {
                info!(username = %session.user.username, role = %session.user.role, "session restored");
                let state = SessionState::Authenticated(session);
                cell.set(state.clone());
                return state;
            }
            Step::Anonymous { reason } => {
                debug!(reason, "bootstrap ended anonymous");
                cell.clear().await;
                return SessionState::Anonymous;
            }
        };
    }
}

async fn read_storage(cell: &SessionCell) -> Step {
    match cell.storage.load().await {
        Ok(stored) => match stored.into_pair() {
            Some(tokens) => Step::FetchIdentity {
                tokens,
                refreshed: false,
            },
            None => Step::Anonymous {
                reason: "no stored tokens",
            },
        },
        Err(e) => {
            warn!(error = %e, "could not read persisted tokens");
            Step::Anonymous {
                reason: "token storage unreadable",
            }
        }
    }
}

async fn fetch_identity(gateway: &Gateway, tokens: TokenPair, refreshed: bool) -> Step {
    match gateway.fetch_identity(&tokens.access).await {
        Ok(user) => Step::Authenticated(Session { user, tokens }),
        Err(e) if !refreshed => {
            debug!(error = %e, "stored access token rejected, trying refresh");
            Step::Refresh { tokens }
        }
        Err(e) => {
            warn!(error = %e, "identity fetch failed after refresh");
            Step::Anonymous {
                reason: "identity fetch failed after refresh",
            }
        }
    }
}

/// Refresh through the gateway's serialized path. A business call that hit
/// 401 on the same pending token may already have refreshed it; then the
/// installed tokens are used as they are.
async fn refresh(cell: &SessionCell, gateway: &Gateway, tokens: TokenPair) -> Step {
    match gateway.renew(Some(&tokens.access)).await {
        Renewal::Replaced(_) | Renewal::Refreshed(_) => match cell.snapshot().credentials() {
            Some(current) => Step::FetchIdentity {
                tokens: current.clone(),
                refreshed: true,
            },
            None => Step::Anonymous {
                reason: "session ended during refresh",
            },
        },
        Renewal::Ended => Step::Anonymous {
            reason: "session ended during refresh",
        },
        Renewal::NoRefreshToken => Step::Anonymous {
            reason: "no refresh token",
        },
        Renewal::Failed(e) => {
            debug!(error = %e, "stored refresh token rejected");
            Step::Anonymous {
                reason: "refresh failed",
            }
        }
    }
}
