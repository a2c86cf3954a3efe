//! Shared session cell: the in-memory state plus its durable storage.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::warn;

use super::state::SessionState;
use crate::error::StorageError;
use crate::gateway::CredentialSource;
use crate::models::RefreshResponse;
use crate::storage::TokenStorage;

pub(crate) struct SessionCell {
    state: watch::Sender<SessionState>,
    pub(crate) storage: Arc<dyn TokenStorage>,
}

impl SessionCell {
    pub(crate) fn new(storage: Arc<dyn TokenStorage>) -> Self {
        let (state, _) = watch::channel(SessionState::Unknown);
        Self { state, storage }
    }

    pub(crate) fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub(crate) fn set(&self, next: SessionState) {
        self.state.send_replace(next);
    }

    /// Apply `f` to the current state; subscribers are notified if it
    /// returns true.
    pub(crate) fn modify(&self, f: impl FnOnce(&mut SessionState) -> bool) -> bool {
        self.state.send_if_modified(f)
    }

    pub(crate) fn has_role(&self, role: &str) -> bool {
        self.state.borrow().has_role(role)
    }

    /// Checked against a single snapshot.
    pub(crate) fn has_any_role(&self, roles: &[&str]) -> bool {
        self.state.borrow().has_any_role(roles)
    }

    /// Go to Anonymous, then drop persisted tokens. A storage failure is
    /// logged only.
    pub(crate) async fn clear(&self) {
        self.set(SessionState::Anonymous);
        if let Err(e) = self.storage.clear().await {
            warn!(error = %e, "failed to clear persisted tokens");
        }
    }
}

#[async_trait]
impl CredentialSource for SessionCell {
    fn access_token(&self) -> Option<String> {
        self.state
            .borrow()
            .credentials()
            .map(|tokens| tokens.access.clone())
    }

    fn refresh_token(&self) -> Option<String> {
        self.state
            .borrow()
            .credentials()
            .map(|tokens| tokens.refresh.clone())
    }

    async fn apply_refresh(&self, refreshed: &RefreshResponse) -> Result<(), StorageError> {
        let mut updated = None;
        self.modify(|state| {
            // A session that ended while the refresh was in flight stays ended.
            let Some(tokens) = state.credentials_mut() else {
                return false;
            };
            tokens.access = refreshed.access.clone();
            if let Some(rotated) = &refreshed.refresh {
                tokens.refresh = rotated.clone();
            }
            updated = Some(tokens.clone());
            true
        });
        match updated {
            Some(tokens) => self.storage.save(&tokens).await,
            None => Ok(()),
        }
    }

    async fn expire(&self) {
        self.clear().await;
    }
}
