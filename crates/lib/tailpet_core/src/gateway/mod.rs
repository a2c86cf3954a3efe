//! HTTP gateway: the single outbound pipeline for API calls.
//!
//! Every call gets the current access token as a bearer credential. A 401
//! triggers at most one refresh-and-replay cycle per logical request; if
//! the refresh itself fails (or there is nothing to refresh with) the
//! session is ended and the [`Navigator`] is told to show the login entry
//! point. All other failures are logged and returned unchanged.

mod endpoints;
mod request;

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

pub use endpoints::{IDENTITY_PATH, LOGIN_PATH, REFRESH_PATH};
pub use request::{ApiRequest, ApiResponse};

use crate::config::ClientConfig;
use crate::error::{GatewayError, GatewayResult, StorageError};
use crate::models::RefreshResponse;

// =============================================================================
// Seams
// =============================================================================

/// Where the gateway reads and updates credentials.
///
/// Implemented by the session store; tests can inject their own.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    fn access_token(&self) -> Option<String>;

    fn refresh_token(&self) -> Option<String>;

    /// Install refreshed tokens as the default credential and persist them.
    async fn apply_refresh(&self, refreshed: &RefreshResponse) -> Result<(), StorageError>;

    /// End the session: clear in-memory identity and persisted tokens.
    async fn expire(&self);
}

/// Navigation hook invoked when the session is irrecoverably lost.
pub trait Navigator: Send + Sync {
    fn redirect_to_login(&self);
}

/// Navigator that only records the event in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn redirect_to_login(&self) {
        warn!("session expired; login required");
    }
}

/// Result of [`Gateway::renew`].
#[derive(Debug)]
pub(crate) enum Renewal {
    /// The rejected token was already replaced; use this one.
    Replaced(String),
    /// A refresh ran and its access token is installed.
    Refreshed(String),
    /// The session ended while waiting for the lock.
    Ended,
    NoRefreshToken,
    Failed(GatewayError),
}

/// Correlation id of one logical request (shared by its replay).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct RequestId(Uuid);

impl RequestId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

// =============================================================================
// Gateway
// =============================================================================

pub struct Gateway {
    http: Client,
    base_url: Url,
    credentials: Arc<dyn CredentialSource>,
    navigator: Arc<dyn Navigator>,
    /// Requests that already used their single recovery attempt.
    retried: DashMap<RequestId, ()>,
    /// Serializes refresh calls so concurrent 401s share one refresh.
    refresh_lock: Mutex<()>,
}

impl Gateway {
    pub fn new(
        config: &ClientConfig,
        credentials: Arc<dyn CredentialSource>,
        navigator: Arc<dyn Navigator>,
    ) -> GatewayResult<Self> {
        let http = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            http,
            base_url: config.api_base_url.clone(),
            credentials,
            navigator,
            retried: DashMap::new(),
            refresh_lock: Mutex::new(()),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Absolute URL for a path relative to the base path.
    pub fn endpoint_url(&self, path: &str) -> GatewayResult<Url> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }

    /// Run a request through the full pipeline: credential attachment,
    /// single-shot recovery on 401, and pass-through of every other outcome.
    pub async fn execute(&self, request: ApiRequest) -> GatewayResult<ApiResponse> {
        let id = RequestId::new();
        let result = self.execute_tracked(id, &request).await;
        self.retried.remove(&id);
        result
    }

    async fn execute_tracked(
        &self,
        id: RequestId,
        request: &ApiRequest,
    ) -> GatewayResult<ApiResponse> {
        let mut credential = self.credentials.access_token();
        loop {
            match self.dispatch(request, credential.as_deref()).await {
                Ok(response) => return Ok(response),
                Err(err) if err.is_unauthorized() => {
                    if self.retried.insert(id, ()).is_some() {
                        log_failure(request, &err);
                        return Err(err);
                    }
                    let refreshed = self.recover(credential.as_deref(), err).await?;
                    debug!(method = %request.method, path = %request.path, "replaying with refreshed credential");
                    credential = Some(refreshed);
                }
                Err(err) => {
                    log_failure(request, &err);
                    return Err(err);
                }
            }
        }
    }

    /// Obtain a usable access token after `stale` was rejected.
    async fn recover(&self, stale: Option<&str>, original: GatewayError) -> GatewayResult<String> {
        match self.renew(stale).await {
            Renewal::Replaced(access) | Renewal::Refreshed(access) => Ok(access),
            // Already reported by whoever ended it.
            Renewal::Ended => Err(original),
            Renewal::NoRefreshToken => {
                warn!("authorization rejected and no refresh token is available");
                self.end_session().await;
                Err(original)
            }
            Renewal::Failed(err) => {
                warn!(error = %err, "token refresh failed, ending session");
                self.end_session().await;
                Err(err)
            }
        }
    }

    /// Serialized refresh after `stale` was rejected.
    ///
    /// Holds the refresh lock from the credential check until the refreshed
    /// tokens are installed, so a rotated refresh token is never sent twice.
    /// Does not end the session on failure.
    pub(crate) async fn renew(&self, stale: Option<&str>) -> Renewal {
        let _guard = self.refresh_lock.lock().await;

        match (stale, self.credentials.access_token()) {
            (_, Some(current)) if stale != Some(current.as_str()) => {
                debug!("credential already replaced by a concurrent refresh");
                return Renewal::Replaced(current);
            }
            (Some(_), None) => return Renewal::Ended,
            _ => {}
        }

        let Some(refresh) = self.credentials.refresh_token() else {
            return Renewal::NoRefreshToken;
        };

        match self.refresh_tokens(&refresh).await {
            Ok(refreshed) => {
                if let Err(e) = self.credentials.apply_refresh(&refreshed).await {
                    warn!(error = %e, "failed to persist refreshed access token");
                }
                info!(rotated = refreshed.refresh.is_some(), "access token refreshed");
                Renewal::Refreshed(refreshed.access)
            }
            Err(err) => Renewal::Failed(err),
        }
    }

    async fn end_session(&self) {
        self.credentials.expire().await;
        self.navigator.redirect_to_login();
    }

    /// Single-shot dispatch: attach `credential` if given, send, and map
    /// non-2xx responses to [`GatewayError::Status`]. No recovery.
    pub async fn dispatch(
        &self,
        request: &ApiRequest,
        credential: Option<&str>,
    ) -> GatewayResult<ApiResponse> {
        let url = self.endpoint_url(&request.path)?;
        let mut builder = self.http.request(request.method.clone(), url.clone());
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = credential {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        debug!(
            method = %request.method,
            path = %request.path,
            authenticated = credential.is_some(),
            "dispatch"
        );
        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?.to_vec();

        if status.is_success() {
            Ok(ApiResponse { status, body })
        } else {
            Err(GatewayError::Status {
                status,
                url: url.to_string(),
                body: String::from_utf8_lossy(&body).into_owned(),
            })
        }
    }

    // -- typed helpers --------------------------------------------------------

    /// Execute and decode the JSON response body.
    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> GatewayResult<T> {
        self.execute(request).await?.json()
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> GatewayResult<T> {
        self.send_json(ApiRequest::get(path)).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> GatewayResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(ApiRequest::post(path).json(body)?).await
    }

    pub async fn patch<B, T>(&self, path: &str, body: &B) -> GatewayResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(ApiRequest::patch(path).json(body)?).await
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> GatewayResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(ApiRequest::put(path).json(body)?).await
    }

    pub async fn delete(&self, path: &str) -> GatewayResult<()> {
        self.execute(ApiRequest::delete(path)).await.map(|_| ())
    }
}

/// Diagnostics for failures the gateway does not recover.
fn log_failure(request: &ApiRequest, err: &GatewayError) {
    let kind = match err.status() {
        Some(StatusCode::UNAUTHORIZED) => "authorization rejected after refresh",
        Some(StatusCode::FORBIDDEN) => "permission denied",
        Some(StatusCode::NOT_FOUND) => "resource not found",
        Some(status) if status.is_server_error() => "server error",
        Some(_) => "request rejected",
        None if err.is_timeout() => "request timed out",
        None => "connection error",
    };
    warn!(method = %request.method, path = %request.path, error = %err, "{kind}");
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoCredentials;

    #[async_trait]
    impl CredentialSource for NoCredentials {
        fn access_token(&self) -> Option<String> {
            None
        }

        fn refresh_token(&self) -> Option<String> {
            None
        }

        async fn apply_refresh(&self, _refreshed: &RefreshResponse) -> Result<(), StorageError> {
            Ok(())
        }

        async fn expire(&self) {}
    }

    fn gateway_at(base: &str) -> Gateway {
        let config = ClientConfig::with_base_url(Url::parse(base).unwrap());
        Gateway::new(&config, Arc::new(NoCredentials), Arc::new(LogNavigator)).unwrap()
    }

    #[test]
    fn endpoint_url_keeps_base_path() {
        let gateway = gateway_at("http://localhost:8000/api");
        assert_eq!(
            gateway.endpoint_url("/auth/token/").unwrap().as_str(),
            "http://localhost:8000/api/auth/token/"
        );
        assert_eq!(
            gateway.endpoint_url("clientes/clientes/3/").unwrap().as_str(),
            "http://localhost:8000/api/clientes/clientes/3/"
        );
    }

    #[test]
    fn endpoint_url_tolerates_trailing_slash_on_base() {
        let gateway = gateway_at("http://localhost:8000/api/");
        assert_eq!(
            gateway.endpoint_url("/auth/users/me/").unwrap().as_str(),
            "http://localhost:8000/api/auth/users/me/"
        );
    }

    #[test]
    fn request_ids_are_unique() {
        assert_ne!(RequestId::new(), RequestId::new());
    }
}
