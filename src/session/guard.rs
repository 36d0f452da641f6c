// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Route guarding.

use super::context::{AuthContext, SessionSnapshot};
use super::roles::Role;
use crate::navigation::Redirect;

/// Outcome of guarding a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Render the route.
    Allow,
    /// Session state is still settling; render a placeholder.
    Pending,
    /// Not logged in; go to the login screen, remembering where we were.
    Redirect(Redirect),
    /// Logged in, but the user's role is not allowed here.
    Forbidden,
}

/// Guard for protected routes, optionally restricted to some roles.
#[derive(Debug, Clone, Default)]
pub struct AuthGuard {
    allowed_roles: Option<Vec<Role>>,
}

impl AuthGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only let users holding one of `roles` through.
    pub fn require_roles(roles: impl Into<Vec<Role>>) -> Self {
        Self {
            allowed_roles: Some(roles.into()),
        }
    }

    pub fn check(&self, session: &SessionSnapshot, path: &str) -> GuardDecision {
        if session.is_loading {
            return GuardDecision::Pending;
        }
        if !session.is_logged_in {
            return GuardDecision::Redirect(Redirect::to_login(Some(path)));
        }
        match &self.allowed_roles {
            Some(roles) if !session.has_role(roles) => GuardDecision::Forbidden,
            _ => GuardDecision::Allow,
        }
    }

    pub async fn check_context(&self, ctx: &AuthContext, path: &str) -> GuardDecision {
        self.check(&ctx.snapshot().await, path)
    }
}
