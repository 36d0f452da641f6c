// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Access token claims and the session predicate.
//!
//! ## Trust
//!
//! Tokens are decoded **without** signature verification. The result only
//! decides whether it is worth sending a request or showing a protected
//! screen; the API server remains the sole authority on token validity.

use chrono::Utc;
use serde::Deserialize;

use super::store::{TokenKey, TokenStore};

/// Claims read from an access token.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessClaims {
    /// Expiration timestamp (seconds since epoch)
    pub exp: i64,

    /// Subject (user ID)
    #[serde(default)]
    pub sub: Option<String>,

    /// Issued at timestamp
    #[serde(default)]
    pub iat: Option<i64>,
}

impl AccessClaims {
    /// True iff the token expires strictly after `now`.
    pub fn is_live_at(&self, now: i64) -> bool {
        self.exp > now
    }
}

/// Decode claims from a token without verifying its signature.
///
/// Returns `None` for anything that is not a well-formed JWT carrying an
/// integer `exp` claim.
pub fn decode_claims(token: &str) -> Option<AccessClaims> {
    jsonwebtoken::dangerous::insecure_decode::<AccessClaims>(token.trim())
        .ok()
        .map(|data| data.claims)
}

/// True iff `token` decodes and has not expired at `now`.
pub fn is_token_live(token: &str, now: i64) -> bool {
    decode_claims(token).is_some_and(|claims| claims.is_live_at(now))
}

/// Current time in seconds since epoch.
pub fn now_secs() -> i64 {
    Utc::now().timestamp()
}

/// Whether the store currently holds a usable access token.
pub fn has_valid_session(store: &dyn TokenStore) -> bool {
    has_valid_session_at(store, now_secs())
}

/// [`has_valid_session`] evaluated at a fixed instant.
pub fn has_valid_session_at(store: &dyn TokenStore, now: i64) -> bool {
    store
        .get(TokenKey::AccessToken)
        .is_some_and(|token| is_token_live(&token, now))
}
