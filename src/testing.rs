// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-process mock of the dashboard API for unit tests.
//!
//! Serves `/auth/*`, `/projects` and `/slow` on an ephemeral localhost port
//! and records the `Authorization` header of every call so tests can assert
//! on what the client actually sent.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};

use crate::client::ApiClient;
use crate::config::ClientConfig;
use crate::navigation::RecordingNavigator;
use crate::session::claims::test_tokens::live_jwt;
use crate::session::store::{MemoryTokenStore, TokenStore};

pub const MOCK_USERNAME: &str = "ada";
pub const MOCK_PASSWORD: &str = "correct-horse";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefreshMode {
    Issue,
    Reject,
    Incomplete,
}

/// Mutable behaviour and call log of the mock server.
#[derive(Debug)]
pub struct MockApi {
    access: Mutex<String>,
    refresh: Mutex<String>,
    issued: AtomicUsize,
    refresh_mode: Mutex<RefreshMode>,
    refresh_delay: Mutex<Duration>,
    refresh_calls: AtomicUsize,
    forbid_next: AtomicBool,
    reject_all: AtomicBool,
    logout_fails: AtomicBool,
    logout_calls: AtomicUsize,
    me_calls: AtomicUsize,
    list_calls: AtomicUsize,
    seen: Mutex<Vec<Option<String>>>,
    seen_refresh: Mutex<Vec<Option<String>>>,
    seen_login: Mutex<Vec<Option<String>>>,
    seen_queries: Mutex<Vec<String>>,
}

impl Default for MockApi {
    fn default() -> Self {
        Self {
            access: Mutex::new(live_jwt("access-0")),
            refresh: Mutex::new("refresh-0".to_string()),
            issued: AtomicUsize::new(0),
            refresh_mode: Mutex::new(RefreshMode::Issue),
            refresh_delay: Mutex::new(Duration::ZERO),
            refresh_calls: AtomicUsize::new(0),
            forbid_next: AtomicBool::new(false),
            reject_all: AtomicBool::new(false),
            logout_fails: AtomicBool::new(false),
            logout_calls: AtomicUsize::new(0),
            me_calls: AtomicUsize::new(0),
            list_calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
            seen_refresh: Mutex::new(Vec::new()),
            seen_login: Mutex::new(Vec::new()),
            seen_queries: Mutex::new(Vec::new()),
        }
    }
}

impl MockApi {
    pub fn accepted_access(&self) -> String {
        self.access.lock().unwrap().clone()
    }

    pub fn accepted_refresh(&self) -> String {
        self.refresh.lock().unwrap().clone()
    }

    pub fn reject_refresh(&self) {
        *self.refresh_mode.lock().unwrap() = RefreshMode::Reject;
    }

    pub fn return_incomplete_refresh(&self) {
        *self.refresh_mode.lock().unwrap() = RefreshMode::Incomplete;
    }

    pub fn set_refresh_delay(&self, delay: Duration) {
        *self.refresh_delay.lock().unwrap() = delay;
    }

    pub fn forbid_next_protected_call(&self) {
        self.forbid_next.store(true, Ordering::SeqCst);
    }

    pub fn reject_all_protected_calls(&self) {
        self.reject_all.store(true, Ordering::SeqCst);
    }

    pub fn fail_logout(&self) {
        self.logout_fails.store(true, Ordering::SeqCst);
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn logout_calls(&self) -> usize {
        self.logout_calls.load(Ordering::SeqCst)
    }

    pub fn me_calls(&self) -> usize {
        self.me_calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Authorization headers seen on protected resource calls.
    pub fn seen_authorization(&self) -> Vec<Option<String>> {
        self.seen.lock().unwrap().clone()
    }

    pub fn seen_refresh_authorization(&self) -> Vec<Option<String>> {
        self.seen_refresh.lock().unwrap().clone()
    }

    pub fn seen_login_authorization(&self) -> Vec<Option<String>> {
        self.seen_login.lock().unwrap().clone()
    }

    pub fn seen_queries(&self) -> Vec<String> {
        self.seen_queries.lock().unwrap().clone()
    }

    fn issue_pair(&self) -> (String, String) {
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let access = live_jwt(&format!("access-{n}"));
        let refresh = format!("refresh-{n}");
        *self.access.lock().unwrap() = access.clone();
        *self.refresh.lock().unwrap() = refresh.clone();
        (access, refresh)
    }

    /// Check a protected call, recording its header.
    fn authorize(&self, headers: &HeaderMap) -> Result<(), Response> {
        let header = authorization(headers);
        self.seen.lock().unwrap().push(header.clone());

        if self.reject_all.load(Ordering::SeqCst) {
            return Err(StatusCode::UNAUTHORIZED.into_response());
        }
        if header != Some(format!("Bearer {}", self.accepted_access())) {
            return Err(StatusCode::UNAUTHORIZED.into_response());
        }
        if self.forbid_next.swap(false, Ordering::SeqCst) {
            return Err(StatusCode::FORBIDDEN.into_response());
        }
        Ok(())
    }
}

fn authorization(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

type Api = Arc<MockApi>;

async fn login(State(api): State<Api>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    api.seen_login.lock().unwrap().push(authorization(&headers));
    if body["username"] != MOCK_USERNAME || body["password"] != MOCK_PASSWORD {
        return (StatusCode::UNAUTHORIZED, "invalid credentials").into_response();
    }
    let (access, refresh) = api.issue_pair();
    Json(json!({ "accessToken": access, "refreshToken": refresh })).into_response()
}

async fn refresh(State(api): State<Api>, headers: HeaderMap) -> Response {
    api.refresh_calls.fetch_add(1, Ordering::SeqCst);
    let header = authorization(&headers);
    api.seen_refresh.lock().unwrap().push(header.clone());

    let delay = *api.refresh_delay.lock().unwrap();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let mode = *api.refresh_mode.lock().unwrap();
    if mode == RefreshMode::Reject
        || header != Some(format!("Bearer {}", api.accepted_refresh()))
    {
        return (StatusCode::UNAUTHORIZED, "refresh rejected").into_response();
    }
    if mode == RefreshMode::Incomplete {
        return Json(json!({ "accessToken": live_jwt("half") })).into_response();
    }

    let (access, refresh) = api.issue_pair();
    Json(json!({ "accessToken": access, "refreshToken": refresh })).into_response()
}

async fn logout(State(api): State<Api>, headers: HeaderMap) -> Response {
    api.logout_calls.fetch_add(1, Ordering::SeqCst);
    if let Err(rejection) = api.authorize(&headers) {
        return rejection;
    }
    if api.logout_fails.load(Ordering::SeqCst) {
        return (StatusCode::SERVICE_UNAVAILABLE, "logout unavailable").into_response();
    }
    Json(json!({ "message": "logged out" })).into_response()
}

async fn me(State(api): State<Api>, headers: HeaderMap) -> Response {
    api.me_calls.fetch_add(1, Ordering::SeqCst);
    if let Err(rejection) = api.authorize(&headers) {
        return rejection;
    }
    Json(json!({
        "id": "u-1",
        "createdAt": "2024-01-15T09:30:00Z",
        "firstName": "Ada",
        "lastName": "Lovelace",
        "username": MOCK_USERNAME,
        "email": "ada@example.com",
        "role": "manager",
        "isGithubMember": true,
        "position": "Engineering Manager"
    }))
    .into_response()
}

async fn list_projects(
    State(api): State<Api>,
    headers: HeaderMap,
    uri: axum::http::Uri,
) -> Response {
    api.list_calls.fetch_add(1, Ordering::SeqCst);
    api.seen_queries
        .lock()
        .unwrap()
        .push(uri.query().unwrap_or_default().to_string());
    if let Err(rejection) = api.authorize(&headers) {
        return rejection;
    }
    Json(json!({
        "data": [
            { "id": "p-1", "name": "Atlas", "repository": "org/atlas" },
            { "id": "p-2", "name": "Borealis" }
        ],
        "total": 2
    }))
    .into_response()
}

async fn create_project(
    State(api): State<Api>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(rejection) = api.authorize(&headers) {
        return rejection;
    }
    let name = body["name"].as_str().unwrap_or("unnamed").to_string();
    (
        StatusCode::CREATED,
        Json(json!({ "id": "p-3", "message": format!("Project {name} created") })),
    )
        .into_response()
}

async fn get_project(
    State(api): State<Api>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if let Err(rejection) = api.authorize(&headers) {
        return rejection;
    }
    if id == "missing" {
        return (StatusCode::NOT_FOUND, "no such project").into_response();
    }
    Json(json!({ "id": id, "name": "Atlas" })).into_response()
}

async fn update_project(
    State(api): State<Api>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if let Err(rejection) = api.authorize(&headers) {
        return rejection;
    }
    Json(json!({ "id": id, "message": "Project updated" })).into_response()
}

async fn delete_project(
    State(api): State<Api>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if let Err(rejection) = api.authorize(&headers) {
        return rejection;
    }
    Json(json!({ "id": id, "message": "Project deleted" })).into_response()
}

async fn slow() -> Response {
    tokio::time::sleep(Duration::from_secs(10)).await;
    StatusCode::OK.into_response()
}

fn router(api: Api) -> Router {
    Router::new()
        .route("/auth/login", axum::routing::post(login))
        .route("/auth/refresh", get(refresh))
        .route("/auth/logout", get(logout))
        .route("/auth/me", get(me))
        .route("/projects", get(list_projects).post(create_project))
        .route(
            "/projects/{id}",
            get(get_project).patch(update_project).delete(delete_project),
        )
        .route("/slow", get(slow))
        .with_state(api)
}

/// Serve `api` on an ephemeral port and return its base URL.
pub async fn serve(api: Api) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind mock API");
    let addr = listener.local_addr().expect("Mock API has no address");
    tokio::spawn(async move {
        axum::serve(listener, router(api))
            .await
            .expect("Mock API server failed");
    });
    format!("http://{addr}")
}

/// A running mock API plus a client wired to it.
pub struct Harness {
    pub api: Api,
    pub store: Arc<MemoryTokenStore>,
    pub navigator: Arc<RecordingNavigator>,
    pub client: ApiClient,
    pub config: ClientConfig,
}

impl Harness {
    pub async fn start(api: MockApi) -> Self {
        let api = Arc::new(api);
        let base_url = serve(Arc::clone(&api)).await;
        let config = ClientConfig::new(&base_url).expect("Mock URL should parse");
        Self::build(api, config)
    }

    /// Start the mock but point the client at `config` instead.
    pub async fn with_config(api: MockApi, config: ClientConfig) -> Self {
        let api = Arc::new(api);
        serve(Arc::clone(&api)).await;
        Self::build(api, config)
    }

    fn build(api: Api, config: ClientConfig) -> Self {
        let store = Arc::new(MemoryTokenStore::new());
        let navigator = Arc::new(RecordingNavigator::new());
        let client = ApiClient::new(
            &config,
            Arc::clone(&store) as Arc<dyn TokenStore>,
            Arc::clone(&navigator) as Arc<dyn crate::navigation::Navigator>,
        )
        .expect("Failed to build client");

        Self {
            api,
            store,
            navigator,
            client,
            config,
        }
    }
}
