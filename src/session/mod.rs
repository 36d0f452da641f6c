// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Session Module
//!
//! Client-side view of the user's authentication state.
//!
//! ## Pieces
//!
//! - `store` - persists the access/refresh token pair
//! - `claims` - decodes the access token and answers "is there a session?"
//! - `context` - current user, roles, login/logout
//! - `guard` - allow/redirect decisions for protected routes
//!
//! ## Trust
//!
//! Nothing here is a security boundary. Tokens are decoded without
//! signature checks purely to avoid requests that are bound to fail; the
//! API server decides what is actually valid.

pub mod claims;
pub mod context;
pub mod guard;
pub mod roles;
pub mod store;
pub mod user;

pub use claims::{has_valid_session, AccessClaims};
pub use context::{AuthContext, SessionSnapshot};
pub use guard::{AuthGuard, GuardDecision};
pub use roles::{Role, RoleSet};
pub use store::{FileTokenStore, MemoryTokenStore, TokenKey, TokenPair, TokenStore};
pub use user::CurrentUser;
