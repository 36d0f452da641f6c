// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Resource Services
//!
//! Typed CRUD wrappers over the dashboard's REST resources. Every call goes
//! through [`ApiClient`], so bearer tokens and the refresh-and-retry flow
//! apply uniformly.
//!
//! | Resource    | Path          | Row type      | Mutations |
//! |-------------|---------------|---------------|-----------|
//! | projects    | `/projects`   | [`Project`]   | yes       |
//! | users       | `/users`      | `CurrentUser` | yes       |
//! | agents      | `/agents`     | [`Agent`]     | yes       |
//! | analysis    | `/analysis`   | [`Analysis`]  | yes       |
//! | user stats  | `/user-stats` | [`UserStats`] | no        |

pub mod cache;
pub mod models;
pub mod resource;

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::client::ApiClient;
use crate::session::CurrentUser;

pub use cache::QueryCache;
pub use models::{Agent, Analysis, ListResponse, MutationResponse, Project, UserStats};
pub use resource::{ListQuery, ReadOnlyService, ResourceService, SortOrder};

/// The dashboard's REST resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum ResourceKind {
    Projects,
    Users,
    Agents,
    Analysis,
    #[value(name = "user-stats")]
    UserStats,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::Projects,
        ResourceKind::Users,
        ResourceKind::Agents,
        ResourceKind::Analysis,
        ResourceKind::UserStats,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            ResourceKind::Projects => "/projects",
            ResourceKind::Users => "/users",
            ResourceKind::Agents => "/agents",
            ResourceKind::Analysis => "/analysis",
            ResourceKind::UserStats => "/user-stats",
        }
    }

    pub fn is_read_only(&self) -> bool {
        matches!(self, ResourceKind::UserStats)
    }

    /// Untyped service, for callers that only pass rows through.
    pub fn raw(&self, api: ApiClient) -> ResourceService<Value> {
        ResourceService::new(api, self.path())
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path().trim_start_matches('/'))
    }
}

/// All resource services, sharing one client and one list cache.
#[derive(Debug, Clone)]
pub struct Services {
    pub projects: ResourceService<Project>,
    pub users: ResourceService<CurrentUser>,
    pub agents: ResourceService<Agent>,
    pub analysis: ResourceService<Analysis>,
    pub user_stats: ReadOnlyService<UserStats>,
    cache: Arc<QueryCache>,
}

impl Services {
    /// The cache is also attached to the client's refresh flow, so a failed
    /// refresh drops every cached list.
    pub fn new(api: ApiClient, cache: Arc<QueryCache>) -> Self {
        api.refresh_flow().attach_cache(Arc::clone(&cache));
        Self {
            projects: ResourceService::new(api.clone(), ResourceKind::Projects.path())
                .with_cache(Arc::clone(&cache)),
            users: ResourceService::new(api.clone(), ResourceKind::Users.path())
                .with_cache(Arc::clone(&cache)),
            agents: ResourceService::new(api.clone(), ResourceKind::Agents.path())
                .with_cache(Arc::clone(&cache)),
            analysis: ResourceService::new(api.clone(), ResourceKind::Analysis.path())
                .with_cache(Arc::clone(&cache)),
            user_stats: ReadOnlyService::new(api, ResourceKind::UserStats.path())
                .with_cache(Arc::clone(&cache)),
            cache,
        }
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }
}
