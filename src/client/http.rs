// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request clients.
//!
//! - [`PublicClient`] - plain transport, no interceptors. Used for login and
//!   token refresh, which must not carry the access token.
//! - [`ApiClient`] - the only path to protected endpoints. Attaches the
//!   stored access token and recovers once from a 401/403 through the
//!   [`RefreshFlow`].

use std::sync::Arc;

use reqwest::{header::AUTHORIZATION, Client, Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn, Instrument};
use url::Url;
use uuid::Uuid;

use super::auth_api::LOGIN_PATH;
use super::refresh::RefreshFlow;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::navigation::Navigator;
use crate::session::store::{TokenKey, TokenStore};

const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Description of one API call.
///
/// Kept separate from `reqwest::Request` so the exact same call can be
/// rebuilt after a token refresh. The retry flag belongs to the request, not
/// to the client: each request is retried at most once.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    retried: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    /// Attach a JSON body.
    pub fn with_json<B: Serialize + ?Sized>(mut self, body: &B) -> ClientResult<Self> {
        let value = serde_json::to_value(body).map_err(|e| ClientError::Encode {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        self.body = Some(value);
        Ok(self)
    }

    pub fn is_retried(&self) -> bool {
        self.retried
    }

    /// True when this request targets the login endpoint.
    pub fn is_login(&self) -> bool {
        let path = self.path.split('?').next().unwrap_or_default();
        path.trim_matches('/') == LOGIN_PATH.trim_matches('/')
    }
}

/// A response that was received from the server, whatever its status.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub method: Method,
    pub path: String,
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl ApiResponse {
    /// Turn a non-2xx response into [`ClientError::Status`].
    pub fn error_for_status(self) -> ClientResult<Self> {
        if self.status.is_success() {
            return Ok(self);
        }
        Err(ClientError::Status {
            method: self.method,
            path: self.path,
            status: self.status,
            body: String::from_utf8_lossy(&self.body).into_owned(),
        })
    }

    pub fn json<T: DeserializeOwned>(&self) -> ClientResult<T> {
        serde_json::from_slice(&self.body).map_err(|e| ClientError::Decode {
            path: self.path.clone(),
            message: e.to_string(),
        })
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Decides whether a received response should go through the refresh flow.
///
/// All of: not the login endpoint, 401 or 403, not retried yet.
pub fn should_refresh(request: &ApiRequest, status: StatusCode) -> bool {
    !request.is_login()
        && matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
        && !request.is_retried()
}

/// Unauthenticated transport: base URL, timeout and user agent, nothing else.
#[derive(Debug, Clone)]
pub struct PublicClient {
    base_url: Url,
    http: Client,
}

impl PublicClient {
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let http = Client::builder()
            .timeout(config.http_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ClientError::Build(e.to_string()))?;

        Ok(Self {
            base_url: config.base_url.clone(),
            http,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> ClientResult<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ClientError::InvalidUrl(format!("{path}: {e}")))
    }

    /// Send `request`, optionally with a bearer credential.
    ///
    /// Any received response is returned as `Ok`, including error statuses.
    /// `Err` means no response: network failure or cancellation.
    pub async fn send(
        &self,
        request: &ApiRequest,
        bearer: Option<&str>,
        cancel: &CancellationToken,
    ) -> ClientResult<ApiResponse> {
        let request_id = Uuid::new_v4();
        let span = tracing::debug_span!(
            "api_request",
            method = %request.method,
            path = %request.path,
            request_id = %request_id,
            retried = request.retried,
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(path = %request.path, "Request cancelled");
                Err(ClientError::Cancelled)
            }
            result = self.dispatch(request, bearer, request_id).instrument(span) => result,
        }
    }

    async fn dispatch(
        &self,
        request: &ApiRequest,
        bearer: Option<&str>,
        request_id: Uuid,
    ) -> ClientResult<ApiResponse> {
        let url = self.url_for(&request.path)?;
        let network_err = |source| ClientError::Network {
            method: request.method.clone(),
            path: request.path.clone(),
            source,
        };

        let mut builder = self
            .http
            .request(request.method.clone(), url)
            .header(REQUEST_ID_HEADER, request_id.to_string());

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = bearer {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(network_err)?;
        let status = response.status();
        let body = response.bytes().await.map_err(network_err)?.to_vec();

        debug!(status = status.as_u16(), bytes = body.len(), "Response received");

        Ok(ApiResponse {
            method: request.method.clone(),
            path: request.path.clone(),
            status,
            body,
        })
    }

    /// Send without credentials and fail on non-2xx statuses.
    pub async fn execute(
        &self,
        request: ApiRequest,
        cancel: &CancellationToken,
    ) -> ClientResult<ApiResponse> {
        self.send(&request, None, cancel).await?.error_for_status()
    }
}

/// Authenticated client for protected endpoints.
#[derive(Clone)]
pub struct ApiClient {
    transport: PublicClient,
    store: Arc<dyn TokenStore>,
    refresh: Arc<RefreshFlow>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.transport.base_url.as_str())
            .field("store", &self.store)
            .finish()
    }
}

impl ApiClient {
    /// Build a client, its unauthenticated sibling and the refresh flow
    /// sharing `store`.
    pub fn new(
        config: &ClientConfig,
        store: Arc<dyn TokenStore>,
        navigator: Arc<dyn Navigator>,
    ) -> ClientResult<Self> {
        let transport = PublicClient::new(config)?;
        let refresh = Arc::new(RefreshFlow::new(
            transport.clone(),
            Arc::clone(&store),
            navigator,
        ));
        Ok(Self::from_parts(transport, store, refresh))
    }

    pub fn from_parts(
        transport: PublicClient,
        store: Arc<dyn TokenStore>,
        refresh: Arc<RefreshFlow>,
    ) -> Self {
        Self {
            transport,
            store,
            refresh,
        }
    }

    /// The interceptor-free variant sharing this client's configuration.
    pub fn public(&self) -> &PublicClient {
        &self.transport
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    pub fn refresh_flow(&self) -> &Arc<RefreshFlow> {
        &self.refresh
    }

    /// Execute `request` with the stored bearer token.
    ///
    /// On a 401/403 (outside the login endpoint, first attempt only) the
    /// access token is dropped, a refresh is run or joined, and the request is
    /// re-issued once with the new token. When no new token can be obtained
    /// the original status error is returned.
    pub async fn execute(
        &self,
        mut request: ApiRequest,
        cancel: &CancellationToken,
    ) -> ClientResult<ApiResponse> {
        let generation = self.refresh.generation();
        let token = self.store.get(TokenKey::AccessToken);

        let response = self.transport.send(&request, token.as_deref(), cancel).await?;
        if !should_refresh(&request, response.status) {
            return response.error_for_status();
        }

        request.retried = true;
        warn!(
            method = %request.method,
            path = %request.path,
            status = response.status.as_u16(),
            "Access token rejected; refreshing session"
        );

        match self.refresh.refresh(generation, cancel).await? {
            Some(pair) => {
                debug!(path = %request.path, "Retrying request with refreshed token");
                self.transport
                    .send(&request, Some(&pair.access_token), cancel)
                    .await?
                    .error_for_status()
            }
            None => response.error_for_status(),
        }
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Vec<(String, String)>,
        cancel: &CancellationToken,
    ) -> ClientResult<T> {
        let request = ApiRequest::get(path).with_query(query);
        self.execute(request, cancel).await?.json()
    }

    pub async fn post_json<B, T>(
        &self,
        path: &str,
        body: &B,
        cancel: &CancellationToken,
    ) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = ApiRequest::post(path).with_json(body)?;
        self.execute(request, cancel).await?.json()
    }

    pub async fn patch_json<B, T>(
        &self,
        path: &str,
        body: &B,
        cancel: &CancellationToken,
    ) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = ApiRequest::patch(path).with_json(body)?;
        self.execute(request, cancel).await?.json()
    }

    pub async fn put_json<B, T>(
        &self,
        path: &str,
        body: &B,
        cancel: &CancellationToken,
    ) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = ApiRequest::put(path).with_json(body)?;
        self.execute(request, cancel).await?.json()
    }

    pub async fn delete_json<T: DeserializeOwned>(
        &self,
        path: &str,
        cancel: &CancellationToken,
    ) -> ClientResult<T> {
        self.execute(ApiRequest::delete(path), cancel).await?.json()
    }
}
