// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Admin Dashboard - API Client
//!
//! Session handling and typed REST access for the admin dashboard:
//! token persistence, transparent refresh of expired access tokens, the
//! current user and role checks, plus CRUD services over the dashboard's
//! resources.
//!
//! ## Modules
//!
//! - `client` - HTTP transport with bearer auth and single-flight refresh
//! - `session` - token store, claims, auth context and route guard
//! - `services` - resource services and the list query cache
//! - `navigation` - where the session sends the user (login redirects)
//! - `config` - environment-driven configuration
//! - `cli` - the `dashboard` command-line front end

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod navigation;
pub mod services;
pub mod session;
pub mod telemetry;

#[cfg(test)]
mod testing;
