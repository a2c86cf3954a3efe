//! Route/action guard over a session snapshot.

use crate::session::SessionState;

/// Outcome of guarding a route or action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Session not resolved yet: render neither the content nor a redirect.
    Pending,
    /// Nobody is logged in.
    RedirectToLogin,
    /// Logged in, but the role is not in the required list.
    Forbidden,
    Granted,
}

/// Decide access for `required_roles` (OR-of-list, exact match).
///
/// An empty list admits any authenticated user.
pub fn authorize(state: &SessionState, required_roles: &[&str]) -> Access {
    if state.is_pending() {
        return Access::Pending;
    }
    if !state.is_authenticated() {
        return Access::RedirectToLogin;
    }
    if required_roles.is_empty() || state.has_any_role(required_roles) {
        Access::Granted
    } else {
        Access::Forbidden
    }
}
