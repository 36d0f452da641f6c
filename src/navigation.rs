// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Navigation sink.
//!
//! The session layer never renders anything; when it decides the user must
//! leave the current screen (refresh failed, logout finished) it hands a
//! [`Redirect`] to the injected [`Navigator`].

use std::sync::Mutex;

use tracing::{info, warn};

/// Path of the login screen.
pub const LOGIN_ROUTE: &str = "/auth/login";

/// Target of a navigation, plus the location to return to afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub to: String,
    /// Original path, kept so the login screen can send the user back.
    pub from: Option<String>,
}

impl Redirect {
    pub fn to_login(from: Option<&str>) -> Self {
        Self {
            to: LOGIN_ROUTE.to_string(),
            from: from.map(str::to_string),
        }
    }
}

pub trait Navigator: Send + Sync {
    fn navigate(&self, redirect: Redirect);
}

/// Navigator that only logs; used by the CLI where "go to login" means
/// "ask the operator to run `login` again".
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNavigator;

impl Navigator for TracingNavigator {
    fn navigate(&self, redirect: Redirect) {
        if redirect.to == LOGIN_ROUTE {
            warn!(from = ?redirect.from, "Session ended; log in again to continue");
        } else {
            info!(to = %redirect.to, from = ?redirect.from, "Navigating");
        }
    }
}

/// Navigator that remembers every redirect it was given.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    redirects: Mutex<Vec<Redirect>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn redirects(&self) -> Vec<Redirect> {
        self.redirects
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn last(&self) -> Option<Redirect> {
        self.redirects.lock().ok()?.last().cloned()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, redirect: Redirect) {
        if let Ok(mut redirects) = self.redirects.lock() {
            redirects.push(redirect);
        }
    }
}
