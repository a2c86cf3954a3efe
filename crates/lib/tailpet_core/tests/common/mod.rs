//! In-process mock of the clinic API's auth and business endpoints.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header::AUTHORIZATION};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tailpet_core::gateway::Navigator;
use tailpet_core::models::Identity;
use tailpet_core::storage::TokenStorage;
use tailpet_core::{ClientConfig, SessionStore};
use url::Url;

pub const USERNAME: &str = "mvega";
pub const PASSWORD: &str = "correct-horse";

pub fn vet_identity() -> Identity {
    Identity {
        id: 7,
        username: USERNAME.into(),
        email: "mvega@clinic.cl".into(),
        first_name: "Marta".into(),
        last_name: "Vega".into(),
        role: "VETERINARIO".into(),
    }
}

#[derive(Default)]
pub struct Counters {
    pub login: AtomicU32,
    pub refresh: AtomicU32,
    pub me: AtomicU32,
    pub business: AtomicU32,
}

impl Counters {
    pub fn login(&self) -> u32 {
        self.login.load(Ordering::SeqCst)
    }

    pub fn refresh(&self) -> u32 {
        self.refresh.load(Ordering::SeqCst)
    }

    pub fn me(&self) -> u32 {
        self.me.load(Ordering::SeqCst)
    }

    pub fn business(&self) -> u32 {
        self.business.load(Ordering::SeqCst)
    }

    /// All calls that reached the server.
    pub fn total(&self) -> u32 {
        self.login() + self.refresh() + self.me() + self.business()
    }
}

pub struct MockApi {
    pub calls: Counters,
    user: Mutex<Identity>,
    valid_access: Mutex<HashSet<String>>,
    valid_refresh: Mutex<HashSet<String>>,
    next_token: AtomicU32,
    /// Issue a new refresh token on every refresh.
    pub rotate_refresh: AtomicBool,
    /// Business endpoint answers 401 whatever the credential.
    pub always_unauthorized: AtomicBool,
    pub refresh_delay_ms: AtomicU64,
    pub login_delay_ms: AtomicU64,
    /// Bearer tokens seen by the business endpoint, in arrival order.
    business_tokens: Mutex<Vec<Option<String>>>,
}

impl MockApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Counters::default(),
            user: Mutex::new(vet_identity()),
            valid_access: Mutex::new(HashSet::new()),
            valid_refresh: Mutex::new(HashSet::new()),
            next_token: AtomicU32::new(1),
            rotate_refresh: AtomicBool::new(false),
            always_unauthorized: AtomicBool::new(false),
            refresh_delay_ms: AtomicU64::new(0),
            login_delay_ms: AtomicU64::new(0),
            business_tokens: Mutex::new(Vec::new()),
        })
    }

    /// Mint a valid access token.
    pub fn issue_access(&self) -> String {
        let n = self.next_token.fetch_add(1, Ordering::SeqCst);
        let token = format!("access-{n}");
        self.valid_access.lock().unwrap().insert(token.clone());
        token
    }

    /// Mint a valid refresh token.
    pub fn issue_refresh(&self) -> String {
        let n = self.next_token.fetch_add(1, Ordering::SeqCst);
        let token = format!("refresh-{n}");
        self.valid_refresh.lock().unwrap().insert(token.clone());
        token
    }

    /// Simulate expiry of every access token issued so far.
    pub fn expire_all_access(&self) {
        self.valid_access.lock().unwrap().clear();
    }

    pub fn revoke_all_refresh(&self) {
        self.valid_refresh.lock().unwrap().clear();
    }

    pub fn is_valid_access(&self, token: &str) -> bool {
        self.valid_access.lock().unwrap().contains(token)
    }

    pub fn is_valid_refresh(&self, token: &str) -> bool {
        self.valid_refresh.lock().unwrap().contains(token)
    }

    pub fn set_role(&self, role: &str) {
        self.user.lock().unwrap().role = role.to_string();
    }

    pub fn business_tokens(&self) -> Vec<Option<String>> {
        self.business_tokens.lock().unwrap().clone()
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        bearer(headers).is_some_and(|token| self.is_valid_access(&token))
    }
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

fn unauthorized(detail: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "detail": detail }))).into_response()
}

#[derive(Deserialize)]
struct LoginBody {
    username: String,
    password: String,
}

#[derive(Deserialize)]
struct RefreshBody {
    refresh: String,
}

async fn login(State(api): State<Arc<MockApi>>, Json(body): Json<LoginBody>) -> Response {
    api.calls.login.fetch_add(1, Ordering::SeqCst);
    let delay = api.login_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    if body.username != USERNAME || body.password != PASSWORD {
        return unauthorized("No active account found with the given credentials");
    }
    let user = api.user.lock().unwrap().clone();
    Json(json!({
        "access": api.issue_access(),
        "refresh": api.issue_refresh(),
        "user": user,
    }))
    .into_response()
}

async fn refresh(State(api): State<Arc<MockApi>>, Json(body): Json<RefreshBody>) -> Response {
    api.calls.refresh.fetch_add(1, Ordering::SeqCst);
    let delay = api.refresh_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    if !api.is_valid_refresh(&body.refresh) {
        return unauthorized("Token is invalid or expired");
    }
    if api.rotate_refresh.load(Ordering::SeqCst) {
        api.valid_refresh.lock().unwrap().remove(&body.refresh);
        Json(json!({ "access": api.issue_access(), "refresh": api.issue_refresh() }))
            .into_response()
    } else {
        Json(json!({ "access": api.issue_access() })).into_response()
    }
}

async fn me(State(api): State<Arc<MockApi>>, headers: HeaderMap) -> Response {
    api.calls.me.fetch_add(1, Ordering::SeqCst);
    if !api.authorized(&headers) {
        return unauthorized("Given token not valid for any token type");
    }
    let user = api.user.lock().unwrap().clone();
    Json(user).into_response()
}

async fn clients(State(api): State<Arc<MockApi>>, headers: HeaderMap) -> Response {
    api.calls.business.fetch_add(1, Ordering::SeqCst);
    api.business_tokens.lock().unwrap().push(bearer(&headers));
    if api.always_unauthorized.load(Ordering::SeqCst) || !api.authorized(&headers) {
        return unauthorized("Given token not valid for any token type");
    }
    Json(json!({
        "count": 1,
        "next": null,
        "previous": null,
        "results": [{ "id": 1, "nombre": "Ana", "apellido": "Rojas" }],
    }))
    .into_response()
}

async fn status_route(api: &MockApi, status: StatusCode) -> Response {
    api.calls.business.fetch_add(1, Ordering::SeqCst);
    (status, Json(json!({ "detail": status.to_string() }))).into_response()
}

async fn missing(State(api): State<Arc<MockApi>>) -> Response {
    status_route(&api, StatusCode::NOT_FOUND).await
}

async fn forbidden(State(api): State<Arc<MockApi>>) -> Response {
    status_route(&api, StatusCode::FORBIDDEN).await
}

async fn boom(State(api): State<Arc<MockApi>>) -> Response {
    status_route(&api, StatusCode::INTERNAL_SERVER_ERROR).await
}

async fn slow(State(api): State<Arc<MockApi>>) -> Response {
    api.calls.business.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(2)).await;
    Json(json!({ "ok": true })).into_response()
}

/// Serve the mock on an ephemeral port; returns the API base URL.
pub async fn serve(api: Arc<MockApi>) -> Url {
    let app = Router::new()
        .route("/api/auth/token/", post(login))
        .route("/api/auth/token/refresh/", post(refresh))
        .route("/api/auth/users/me/", get(me))
        .route("/api/clientes/clientes/", get(clients))
        .route("/api/missing/", get(missing))
        .route("/api/forbidden/", get(forbidden))
        .route("/api/boom/", get(boom))
        .route("/api/slow/", get(slow))
        .with_state(api);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock api");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock api");
    });
    Url::parse(&format!("http://{addr}/api")).expect("base url")
}

/// Navigator that counts login redirects.
#[derive(Default)]
pub struct CountingNavigator {
    redirects: AtomicU32,
}

impl CountingNavigator {
    pub fn redirects(&self) -> u32 {
        self.redirects.load(Ordering::SeqCst)
    }
}

impl Navigator for CountingNavigator {
    fn redirect_to_login(&self) {
        self.redirects.fetch_add(1, Ordering::SeqCst);
    }
}

/// Session store + navigator over `storage`, talking to `base`.
pub fn client(
    base: &Url,
    storage: Arc<dyn TokenStorage>,
    timeout: Option<Duration>,
) -> (SessionStore, Arc<CountingNavigator>) {
    let mut config = ClientConfig::with_base_url(base.clone());
    if let Some(timeout) = timeout {
        config.request_timeout = timeout;
    }
    let navigator = Arc::new(CountingNavigator::default());
    let store = SessionStore::new(&config, storage, navigator.clone()).expect("session store");
    (store, navigator)
}

/// In-memory log sink for asserting on emitted events.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    /// Route this thread's `tracing` events at WARN and above here until the
    /// guard drops.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let sink = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || sink.clone())
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("tailpet_core=debug")
        .with_test_writer()
        .try_init();
}
