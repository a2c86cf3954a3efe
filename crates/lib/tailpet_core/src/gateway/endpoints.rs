//! Auth endpoints. These bypass recovery: a rejected login or refresh must
//! never trigger another refresh or a login redirect.

use super::{ApiRequest, Gateway};
use crate::error::GatewayResult;
use crate::models::{Identity, LoginRequest, LoginResponse, RefreshRequest, RefreshResponse};

pub const LOGIN_PATH: &str = "/auth/token/";
pub const REFRESH_PATH: &str = "/auth/token/refresh/";
pub const IDENTITY_PATH: &str = "/auth/users/me/";

impl Gateway {
    /// `POST /auth/token/` → access, refresh and identity.
    pub async fn login(&self, credential: &str, password: &str) -> GatewayResult<LoginResponse> {
        let request = ApiRequest::post(LOGIN_PATH).json(&LoginRequest {
            username: credential,
            password,
        })?;
        self.dispatch(&request, None).await?.json()
    }

    /// `POST /auth/token/refresh/` → new access token (and a rotated refresh
    /// token when the server rotates).
    pub async fn refresh_tokens(&self, refresh: &str) -> GatewayResult<RefreshResponse> {
        let request = ApiRequest::post(REFRESH_PATH).json(&RefreshRequest { refresh })?;
        self.dispatch(&request, None).await?.json()
    }

    /// `GET /auth/users/me/` with an explicit access token, single shot.
    pub async fn fetch_identity(&self, access: &str) -> GatewayResult<Identity> {
        self.dispatch(&ApiRequest::get(IDENTITY_PATH), Some(access))
            .await?
            .json()
    }
}
