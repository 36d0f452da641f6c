// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Token Refresh Flow
//!
//! Exchanges the stored refresh token for a new token pair.
//!
//! ## Single flight
//!
//! Several requests can be rejected with the same stale access token at
//! once. Only the first one performs the exchange; the others wait on the
//! gate and reuse its outcome. Each completed exchange (successful or not)
//! bumps a generation counter. A caller records the generation before sending
//! its request; if the counter has moved by the time it holds the gate, a
//! refresh already happened after its request left and its outcome is reused.
//!
//! ## Failure
//!
//! Any failure (no refresh token, network error, rejected or malformed
//! response) ends the session: both tokens and any attached list cache are
//! cleared, the navigator is sent to the login screen and `None` is
//! returned. Only cancellation is reported as an error.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use serde::Deserialize;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::auth_api::REFRESH_PATH;
use super::http::{ApiRequest, PublicClient};
use crate::error::{ClientError, ClientResult};
use crate::navigation::{Navigator, Redirect};
use crate::services::QueryCache;
use crate::session::store::{TokenKey, TokenPair, TokenStore};

/// Body of a `/auth/refresh` response. Fields are optional so a partial body
/// is reported as such instead of as a JSON error.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Debug, thiserror::Error)]
enum RefreshFailure {
    #[error("no refresh token stored")]
    NoRefreshToken,

    #[error("refresh request failed: {0}")]
    Request(ClientError),

    #[error("refresh response did not include both tokens")]
    IncompletePair,
}

pub struct RefreshFlow {
    transport: PublicClient,
    store: Arc<dyn TokenStore>,
    navigator: Arc<dyn Navigator>,
    /// Outcome of the most recent completed exchange.
    gate: Mutex<Option<TokenPair>>,
    generation: AtomicU64,
    exchanges: AtomicU64,
    /// Cache of protected data dropped when the session ends.
    cache: RwLock<Option<Arc<QueryCache>>>,
}

impl RefreshFlow {
    pub fn new(
        transport: PublicClient,
        store: Arc<dyn TokenStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            transport,
            store,
            navigator,
            gate: Mutex::new(None),
            generation: AtomicU64::new(0),
            exchanges: AtomicU64::new(0),
            cache: RwLock::new(None),
        }
    }

    /// Clear `cache` whenever a failed refresh ends the session.
    pub fn attach_cache(&self, cache: Arc<QueryCache>) {
        if let Ok(mut slot) = self.cache.write() {
            *slot = Some(cache);
        }
    }

    /// Number of completed exchanges. Record before sending a request and
    /// pass to [`RefreshFlow::refresh`] if it is rejected.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Number of refresh requests actually sent to the server.
    pub fn exchanges(&self) -> u64 {
        self.exchanges.load(Ordering::Relaxed)
    }

    /// Obtain a fresh token pair, or join the refresh that already replaced
    /// the token observed at `observed_generation`.
    ///
    /// Returns `Ok(None)` when the session could not be renewed.
    pub async fn refresh(
        &self,
        observed_generation: u64,
        cancel: &CancellationToken,
    ) -> ClientResult<Option<TokenPair>> {
        let mut last = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ClientError::Cancelled),
            guard = self.gate.lock() => guard,
        };

        if self.generation() != observed_generation {
            debug!(
                observed_generation,
                current_generation = self.generation(),
                "Reusing outcome of concurrent token refresh"
            );
            return Ok(last.clone());
        }

        // The access token that was just rejected is of no further use.
        self.store.remove(TokenKey::AccessToken);

        let outcome = match self.exchange(cancel).await {
            Err(RefreshFailure::Request(ClientError::Cancelled)) => {
                debug!("Token refresh cancelled");
                return Err(ClientError::Cancelled);
            }
            Ok(pair) => {
                self.store.set_pair(&pair);
                info!("Session refreshed");
                Some(pair)
            }
            Err(failure) => {
                warn!(reason = %failure, "Token refresh failed; ending session");
                self.store.clear();
                if let Some(cache) = self.cache.read().ok().and_then(|c| c.clone()) {
                    cache.clear();
                }
                self.navigator.navigate(Redirect::to_login(None));
                None
            }
        };

        *last = outcome.clone();
        self.generation.fetch_add(1, Ordering::AcqRel);
        Ok(outcome)
    }

    async fn exchange(&self, cancel: &CancellationToken) -> Result<TokenPair, RefreshFailure> {
        let refresh_token = self
            .store
            .get(TokenKey::RefreshToken)
            .filter(|t| !t.trim().is_empty())
            .ok_or(RefreshFailure::NoRefreshToken)?;

        self.exchanges.fetch_add(1, Ordering::Relaxed);
        let response = self
            .transport
            .send(&ApiRequest::get(REFRESH_PATH), Some(&refresh_token), cancel)
            .await
            .and_then(|r| r.error_for_status())
            .map_err(RefreshFailure::Request)?;

        let body: RefreshResponse = response.json().map_err(RefreshFailure::Request)?;

        match (body.access_token, body.refresh_token) {
            (Some(access), Some(refresh)) if !access.is_empty() && !refresh.is_empty() => {
                Ok(TokenPair::new(access, refresh))
            }
            _ => Err(RefreshFailure::IncompletePair),
        }
    }
}
