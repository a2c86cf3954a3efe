//! # tailpet_core
//!
//! Client-side core for the Tailpet clinic API: who is logged in, and the
//! single authenticated pipeline every API call goes through.

pub mod config;
pub mod error;
pub mod gateway;
pub mod guard;
pub mod models;
pub mod resources;
pub mod session;
pub mod storage;

pub use config::ClientConfig;
pub use error::{GatewayError, SessionError, StorageError};
pub use gateway::{ApiRequest, Gateway, LogNavigator, Navigator};
pub use guard::{Access, authorize};
pub use session::{SessionState, SessionStore};

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_not_empty() {
        assert!(!version().is_empty());
    }
}
