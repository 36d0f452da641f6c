// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # HTTP Client
//!
//! ## Request Flow
//!
//! 1. Caller builds an [`ApiRequest`] and hands it to [`ApiClient::execute`]
//! 2. The stored access token is attached as `Authorization: Bearer <token>`
//! 3. On 401/403 (not for `/auth/login`, first attempt only):
//!    - the access token is dropped
//!    - the [`RefreshFlow`] runs, or is joined if another request started it
//!    - the request is re-issued once with the new token
//! 4. If the refresh fails, tokens are cleared, the navigator is sent to
//!    the login screen and the original error is returned
//!
//! Login and refresh go through [`PublicClient`], which never attaches the
//! access token.

pub mod auth_api;
pub mod http;
pub mod refresh;

pub use auth_api::{Credentials, LOGIN_PATH, LOGOUT_PATH, ME_PATH, REFRESH_PATH};
pub use http::{ApiClient, ApiRequest, ApiResponse, PublicClient};
pub use refresh::RefreshFlow;
