// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! `/auth/*` endpoints.
//!
//! | Method | Path | Auth |
//! |--------|------|------|
//! | POST | `/auth/login` | none |
//! | GET | `/auth/logout` | bearer access |
//! | GET | `/auth/me` | bearer access |
//! | GET | `/auth/refresh` | bearer refresh (see [`super::refresh`]) |

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::http::{ApiClient, ApiRequest, PublicClient};
use crate::error::{ClientError, ClientResult};
use crate::session::store::{TokenPair, TokenStore};
use crate::session::user::CurrentUser;

pub const LOGIN_PATH: &str = "/auth/login";
pub const LOGOUT_PATH: &str = "/auth/logout";
pub const ME_PATH: &str = "/auth/me";
pub const REFRESH_PATH: &str = "/auth/refresh";

/// Login form.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Exchange credentials for a token pair and persist it.
///
/// Nothing is stored unless the response carries both tokens.
pub async fn login(
    public: &PublicClient,
    store: &dyn TokenStore,
    credentials: &Credentials,
    cancel: &CancellationToken,
) -> ClientResult<TokenPair> {
    let request = ApiRequest::post(LOGIN_PATH).with_json(credentials)?;
    let body: LoginResponse = public.execute(request, cancel).await?.json()?;

    let pair = match (body.access_token, body.refresh_token) {
        (Some(access), Some(refresh)) if !access.is_empty() && !refresh.is_empty() => {
            TokenPair::new(access, refresh)
        }
        _ => {
            return Err(ClientError::Decode {
                path: LOGIN_PATH.to_string(),
                message: "response did not include both tokens".to_string(),
            })
        }
    };

    store.set_pair(&pair);
    info!(username = %credentials.username, "Logged in");
    Ok(pair)
}

/// Invalidate the server-side session. Local state is left to the caller.
pub async fn logout(api: &ApiClient, cancel: &CancellationToken) -> ClientResult<()> {
    api.execute(ApiRequest::get(LOGOUT_PATH), cancel).await?;
    Ok(())
}

/// Fetch the profile of the logged-in user.
pub async fn fetch_current_user(
    api: &ApiClient,
    cancel: &CancellationToken,
) -> ClientResult<CurrentUser> {
    api.get_json(ME_PATH, Vec::new(), cancel).await
}
