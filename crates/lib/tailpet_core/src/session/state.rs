//! Session state machine values.

use crate::models::{Identity, TokenPair};

/// An authenticated identity together with its tokens.
///
/// Identity and tokens only ever exist together in this value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: Identity,
    pub tokens: TokenPair,
}

/// Who is logged in.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Durable storage not consulted yet, or the read is in flight.
    #[default]
    Unknown,
    /// No valid tokens; nobody is logged in.
    Anonymous,
    /// A login or bootstrap verification is in flight. `pending` holds the
    /// stored tokens being verified during bootstrap.
    Authenticating { pending: Option<TokenPair> },
    Authenticated(Session),
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Unknown => "unknown",
            SessionState::Anonymous => "anonymous",
            SessionState::Authenticating { .. } => "authenticating",
            SessionState::Authenticated(_) => "authenticated",
        }
    }

    pub fn user(&self) -> Option<&Identity> {
        match self {
            SessionState::Authenticated(session) => Some(&session.user),
            _ => None,
        }
    }

    /// Tokens of an established session.
    pub fn tokens(&self) -> Option<&TokenPair> {
        match self {
            SessionState::Authenticated(session) => Some(&session.tokens),
            _ => None,
        }
    }

    /// Tokens the gateway may present, including ones under verification.
    pub(crate) fn credentials(&self) -> Option<&TokenPair> {
        match self {
            SessionState::Authenticated(session) => Some(&session.tokens),
            SessionState::Authenticating { pending } => pending.as_ref(),
            _ => None,
        }
    }

    pub(crate) fn credentials_mut(&mut self) -> Option<&mut TokenPair> {
        match self {
            SessionState::Authenticated(session) => Some(&mut session.tokens),
            SessionState::Authenticating { pending } => pending.as_mut(),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }

    /// True while the outcome is not known yet; role-gated content should
    /// neither render nor redirect.
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            SessionState::Unknown | SessionState::Authenticating { .. }
        )
    }

    /// Exact, case-sensitive match against the authenticated role.
    pub fn has_role(&self, role: &str) -> bool {
        self.user().is_some_and(|user| user.role == role)
    }

    /// True if any of `roles` matches exactly.
    pub fn has_any_role(&self, roles: &[&str]) -> bool {
        roles.iter().any(|role| self.has_role(role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::roles;

    fn authenticated(role: &str) -> SessionState {
        SessionState::Authenticated(Session {
            user: Identity {
                id: 1,
                username: "recep".into(),
                email: "r@clinic.cl".into(),
                first_name: "Rosa".into(),
                last_name: "Paz".into(),
                role: role.into(),
            },
            tokens: TokenPair::new("a", "r"),
        })
    }

    #[test]
    fn has_role_is_exact_and_case_sensitive() {
        let state = authenticated(roles::RECEPCIONISTA);
        assert!(state.has_role("RECEPCIONISTA"));
        assert!(!state.has_role("recepcionista"));
        assert!(!state.has_role("RECEP"));
        assert!(!state.has_role("RECEPCIONISTA "));
        assert!(!state.has_role(roles::ADMIN));
    }

    #[test]
    fn has_role_is_false_outside_authenticated() {
        let pending = SessionState::Authenticating {
            pending: Some(TokenPair::new("a", "r")),
        };
        for state in [SessionState::Unknown, SessionState::Anonymous, pending] {
            assert!(!state.has_role(roles::ADMIN), "{}", state.name());
            assert!(state.user().is_none());
            assert!(state.tokens().is_none());
        }
    }

    #[test]
    fn has_any_role_is_an_or_over_the_list() {
        let state = authenticated(roles::VETERINARIO);
        assert!(state.has_any_role(&[roles::ADMIN, roles::VETERINARIO]));
        assert!(!state.has_any_role(&[roles::ADMIN, roles::RECEPCIONISTA]));
        assert!(!state.has_any_role(&[]));
    }

    #[test]
    fn pending_states() {
        assert!(SessionState::Unknown.is_pending());
        assert!(SessionState::Authenticating { pending: None }.is_pending());
        assert!(!SessionState::Anonymous.is_pending());
        assert!(!authenticated(roles::ADMIN).is_pending());
    }

    #[test]
    fn credentials_include_tokens_under_verification() {
        let state = SessionState::Authenticating {
            pending: Some(TokenPair::new("stored-a", "stored-r")),
        };
        assert_eq!(state.credentials().unwrap().access, "stored-a");
        assert!(SessionState::Anonymous.credentials().is_none());
    }
}
