// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Auth context: who is logged in.
//!
//! [`AuthContext`] is the single source of truth for the current session as
//! seen by the rest of the application. It mirrors the stored access token,
//! loads the current user once per session, answers role checks and
//! performs login/logout.

use std::sync::Arc;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::claims::{has_valid_session, is_token_live, now_secs};
use super::roles::{Role, RoleSet};
use super::store::TokenKey;
use super::user::CurrentUser;
use crate::client::auth_api::{self, Credentials};
use crate::client::ApiClient;
use crate::error::ClientResult;
use crate::navigation::{Navigator, Redirect};
use crate::services::QueryCache;

#[derive(Debug, Default)]
struct ContextState {
    auth_token: Option<String>,
    current_user: Option<CurrentUser>,
    logging_out: bool,
}

/// Point-in-time view of the context, for guards and rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub auth_token: Option<String>,
    pub current_user: Option<CurrentUser>,
    pub is_logged_in: bool,
    pub is_loading: bool,
}

impl SessionSnapshot {
    pub fn role(&self) -> Option<Role> {
        self.current_user.as_ref().map(|u| u.role)
    }

    pub fn has_role<R: RoleSet + ?Sized>(&self, roles: &R) -> bool {
        self.current_user
            .as_ref()
            .is_some_and(|user| user.has_role(roles))
    }
}

pub struct AuthContext {
    api: ApiClient,
    navigator: Arc<dyn Navigator>,
    cache: Option<Arc<QueryCache>>,
    state: RwLock<ContextState>,
}

impl AuthContext {
    pub fn new(api: ApiClient, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            api,
            navigator,
            cache: None,
            state: RwLock::new(ContextState::default()),
        }
    }

    /// Clear `cache` whenever a session starts or ends, including when a
    /// failed refresh ends it.
    pub fn with_cache(mut self, cache: Arc<QueryCache>) -> Self {
        self.api.refresh_flow().attach_cache(Arc::clone(&cache));
        self.cache = Some(cache);
        self
    }

    fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Reconcile with the token store and load the user profile if needed.
    ///
    /// Adopts the stored access token when it is live and differs from the
    /// held one, then fetches `/auth/me` if a token is held and no user is
    /// loaded yet. When the store no longer holds a live token the held
    /// token and user are dropped.
    pub async fn sync(&self, cancel: &CancellationToken) -> ClientResult<()> {
        let stored = self
            .api
            .store()
            .get(TokenKey::AccessToken)
            .filter(|token| is_token_live(token, now_secs()));

        let needs_user = {
            let mut state = self.state.write().await;
            match stored {
                Some(token) => {
                    if state.auth_token.as_deref() != Some(token.as_str()) {
                        debug!("Adopting stored access token");
                        state.auth_token = Some(token);
                    }
                }
                None if state.auth_token.is_some() || state.current_user.is_some() => {
                    debug!("Stored session is gone; dropping local session state");
                    state.auth_token = None;
                    state.current_user = None;
                }
                None => {}
            }
            state.auth_token.is_some() && state.current_user.is_none()
        };

        if needs_user {
            self.load_user(cancel).await?;
        }
        Ok(())
    }

    async fn load_user(&self, cancel: &CancellationToken) -> ClientResult<CurrentUser> {
        let user = auth_api::fetch_current_user(&self.api, cancel).await?;
        debug!(user_id = %user.id, role = %user.role, "Loaded current user");
        self.state.write().await.current_user = Some(user.clone());
        Ok(user)
    }

    /// Log in with `credentials`, persist the token pair and load the user.
    pub async fn login(
        &self,
        credentials: &Credentials,
        cancel: &CancellationToken,
    ) -> ClientResult<CurrentUser> {
        // Lists cached for a previous user must not leak into this session.
        self.clear_cache();
        let pair =
            auth_api::login(self.api.public(), &**self.api.store(), credentials, cancel)
                .await?;
        self.clear_cache();

        {
            let mut state = self.state.write().await;
            state.auth_token = Some(pair.access_token);
            state.current_user = None;
        }
        self.load_user(cancel).await
    }

    /// End the session on the server, then locally.
    ///
    /// If the server call fails while the session is still stored, local
    /// tokens and user state are kept and the error is returned. If the call
    /// failed because a refresh ended the session, local state is dropped
    /// too before the error is returned.
    pub async fn logout(&self, cancel: &CancellationToken) -> ClientResult<()> {
        self.state.write().await.logging_out = true;
        let result = auth_api::logout(&self.api, cancel).await;
        let store = self.api.store();
        let session_gone = store.get(TokenKey::AccessToken).is_none()
            && store.get(TokenKey::RefreshToken).is_none();

        let mut state = self.state.write().await;
        state.logging_out = false;

        if let Err(e) = result {
            if session_gone {
                warn!(error = %e, "Session ended during logout; dropping local session");
                state.auth_token = None;
                state.current_user = None;
                drop(state);
                self.clear_cache();
            } else {
                warn!(error = %e, "Logout failed; keeping local session");
            }
            return Err(e);
        }

        self.api.store().clear();
        state.auth_token = None;
        state.current_user = None;
        drop(state);

        self.clear_cache();
        info!("Logged out");
        self.navigator.navigate(Redirect::to_login(None));
        Ok(())
    }

    pub async fn auth_token(&self) -> Option<String> {
        self.state.read().await.auth_token.clone()
    }

    pub async fn current_user(&self) -> Option<CurrentUser> {
        self.state.read().await.current_user.clone()
    }

    pub async fn role(&self) -> Option<Role> {
        self.state.read().await.current_user.as_ref().map(|u| u.role)
    }

    /// True iff the current user's role is, or is contained in, `roles`.
    pub async fn has_role<R: RoleSet + ?Sized>(&self, roles: &R) -> bool {
        self.state
            .read()
            .await
            .current_user
            .as_ref()
            .is_some_and(|user| user.has_role(roles))
    }

    /// Live access token in the store.
    pub fn is_logged_in(&self) -> bool {
        has_valid_session(&**self.api.store())
    }

    /// A logout is running, or a session exists whose user is not loaded.
    pub async fn is_loading(&self) -> bool {
        let is_logged_in = self.is_logged_in();
        let state = self.state.read().await;
        state.logging_out || (is_logged_in && state.current_user.is_none())
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let is_logged_in = self.is_logged_in();
        let state = self.state.read().await;
        SessionSnapshot {
            auth_token: state.auth_token.clone(),
            current_user: state.current_user.clone(),
            is_logged_in,
            is_loading: state.logging_out || (is_logged_in && state.current_user.is_none()),
        }
    }
}
