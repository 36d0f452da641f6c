// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Command-line front end for the `dashboard` binary.
//!
//! Every command prints a single JSON document on stdout. The session is kept
//! in a [`FileTokenStore`] so consecutive invocations share it.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::client::auth_api::{self, Credentials};
use crate::client::ApiClient;
use crate::config::{ClientConfig, ConfigError, API_URL_ENV, TOKEN_FILE_ENV};
use crate::error::ClientError;
use crate::navigation::{Navigator, TracingNavigator};
use crate::services::{ListQuery, QueryCache, ResourceKind, SortOrder};
use crate::session::{AuthContext, FileTokenStore, TokenKey, TokenStore};

#[derive(Debug, Parser)]
#[command(name = "dashboard")]
#[command(about = "Command-line client for the admin dashboard API")]
#[command(version)]
pub struct Cli {
    /// Base URL of the dashboard API (overrides DASHBOARD_API_URL)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// File holding the session tokens (overrides DASHBOARD_TOKEN_FILE)
    #[arg(long, global = true)]
    pub token_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Log in and store the session tokens
    Login {
        #[arg(long, short)]
        username: String,

        #[arg(long, env = "DASHBOARD_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// End the session on the server and forget the local tokens
    Logout,

    /// Show the logged-in user's profile
    Whoami,

    /// Report whether a usable session is stored
    Status,

    /// List rows of a resource
    List {
        #[arg(value_enum)]
        resource: ResourceKind,

        #[arg(long)]
        page: Option<u32>,

        #[arg(long)]
        limit: Option<u32>,

        #[arg(long)]
        sort_by: Option<String>,

        /// Sort direction: asc or desc
        #[arg(long)]
        order: Option<SortOrder>,

        #[arg(long)]
        search: Option<String>,
    },

    /// Fetch one row by id
    Get {
        #[arg(value_enum)]
        resource: ResourceKind,
        id: String,
    },

    /// Delete one row by id
    Delete {
        #[arg(value_enum)]
        resource: ResourceKind,
        id: String,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("{0} is read-only")]
    ReadOnly(ResourceKind),

    #[error("failed to render output: {0}")]
    Output(#[from] serde_json::Error),
}

impl Cli {
    /// Resolve configuration, letting command-line flags win over the
    /// environment.
    pub fn config(&self) -> Result<ClientConfig, ConfigError> {
        let token_file = self
            .token_file
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned());

        ClientConfig::from_lookup(|name| match name {
            API_URL_ENV if self.api_url.is_some() => self.api_url.clone(),
            TOKEN_FILE_ENV if token_file.is_some() => token_file.clone(),
            _ => std::env::var(name).ok(),
        })
    }
}

/// Everything a command needs, wired to one token file.
struct Session {
    config: ClientConfig,
    api: ApiClient,
    cache: Arc<QueryCache>,
    context: AuthContext,
}

impl Session {
    fn open(config: ClientConfig) -> Result<Self, CliError> {
        let store: Arc<dyn TokenStore> = Arc::new(FileTokenStore::new(&config.token_file));
        let navigator: Arc<dyn Navigator> = Arc::new(TracingNavigator);
        let api = ApiClient::new(&config, store, Arc::clone(&navigator))?;
        let cache = Arc::new(QueryCache::new(config.cache_capacity, config.cache_ttl));
        let context = AuthContext::new(api.clone(), navigator).with_cache(Arc::clone(&cache));

        Ok(Self {
            config,
            api,
            cache,
            context,
        })
    }

    /// Fail fast when no token of either kind is stored.
    fn require_session(&self) -> Result<(), CliError> {
        let store = self.api.store();
        if store.get(TokenKey::AccessToken).is_none()
            && store.get(TokenKey::RefreshToken).is_none()
        {
            return Err(ClientError::NoSession.into());
        }
        Ok(())
    }
}

/// Run one command to completion.
pub async fn run(cli: Cli, cancel: &CancellationToken) -> Result<Value, CliError> {
    let session = Session::open(cli.config()?)?;
    debug!(
        base_url = %session.config.base_url,
        token_file = %session.config.token_file.display(),
        "Configuration loaded"
    );

    match cli.command {
        Commands::Login { username, password } => {
            let credentials = Credentials::new(username, password);
            let user = session.context.login(&credentials, cancel).await?;
            Ok(serde_json::to_value(user)?)
        }
        Commands::Logout => {
            session.require_session()?;
            session.context.logout(cancel).await?;
            Ok(json!({ "message": "Logged out" }))
        }
        Commands::Whoami => {
            session.require_session()?;
            let user = auth_api::fetch_current_user(&session.api, cancel).await?;
            Ok(serde_json::to_value(user)?)
        }
        Commands::Status => {
            if let Err(e) = session.context.sync(cancel).await {
                if !e.is_auth_failure() {
                    return Err(e.into());
                }
                warn!(error = %e, "Stored session was rejected");
            }
            let snapshot = session.context.snapshot().await;
            Ok(json!({
                "loggedIn": snapshot.is_logged_in,
                "user": snapshot.current_user,
                "tokenFile": session.config.token_file.display().to_string(),
            }))
        }
        Commands::List {
            resource,
            page,
            limit,
            sort_by,
            order,
            search,
        } => {
            session.require_session()?;
            let query = ListQuery {
                page,
                limit,
                sort_by,
                order,
                search,
            };
            let rows = resource
                .raw(session.api.clone())
                .with_cache(Arc::clone(&session.cache))
                .list(&query, cancel)
                .await?;
            Ok(serde_json::to_value(rows)?)
        }
        Commands::Get { resource, id } => {
            session.require_session()?;
            Ok(resource.raw(session.api.clone()).get(&id, cancel).await?)
        }
        Commands::Delete { resource, id } => {
            if resource.is_read_only() {
                return Err(CliError::ReadOnly(resource));
            }
            session.require_session()?;
            let response = resource.raw(session.api.clone()).delete(&id, cancel).await?;
            Ok(serde_json::to_value(response)?)
        }
    }
}
