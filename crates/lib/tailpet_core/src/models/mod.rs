//! Domain and wire models.

pub mod auth;
pub mod page;

pub use auth::{Identity, LoginRequest, LoginResponse, RefreshRequest, RefreshResponse, TokenPair};
pub use page::Page;

/// Role tags assigned by the server. Comparison is exact and case-sensitive.
pub mod roles {
    pub const ADMIN: &str = "ADMIN";
    pub const VETERINARIO: &str = "VETERINARIO";
    pub const RECEPCIONISTA: &str = "RECEPCIONISTA";
}
