// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Environment variable names, defaults and the [`ClientConfig`] loaded from
//! them at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DASHBOARD_API_URL` | Base URL of the dashboard REST API | Required |
//! | `DASHBOARD_TOKEN_FILE` | File holding the persisted token pair | `$HOME/.config/dashboard/session.json` |
//! | `DASHBOARD_HTTP_TIMEOUT_SECS` | Per-request timeout | `15` |
//! | `DASHBOARD_CACHE_TTL_SECS` | Lifetime of cached list responses | `30` |
//! | `DASHBOARD_CACHE_CAPACITY` | Max cached list responses | `64` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

pub const API_URL_ENV: &str = "DASHBOARD_API_URL";
pub const TOKEN_FILE_ENV: &str = "DASHBOARD_TOKEN_FILE";
pub const HTTP_TIMEOUT_ENV: &str = "DASHBOARD_HTTP_TIMEOUT_SECS";
pub const CACHE_TTL_ENV: &str = "DASHBOARD_CACHE_TTL_SECS";
pub const CACHE_CAPACITY_ENV: &str = "DASHBOARD_CACHE_CAPACITY";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(15);
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30);
const DEFAULT_CACHE_CAPACITY: usize = 64;
const DEFAULT_TOKEN_FILE_NAME: &str = "session.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration missing: {0}")]
    Missing(String),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: String, reason: String },
}

/// Connection and session settings shared by every client component.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API base URL; always ends with `/` so relative paths join beneath it.
    pub base_url: Url,
    pub token_file: PathBuf,
    pub http_timeout: Duration,
    pub cache_ttl: Duration,
    pub cache_capacity: usize,
    pub user_agent: String,
}

impl ClientConfig {
    /// Create a configuration for `base_url` with default settings.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            token_file: default_token_file(std::env::var("HOME").ok()),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            cache_ttl: DEFAULT_CACHE_TTL,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            user_agent: format!("dashboard-client/{}", env!("CARGO_PKG_VERSION")),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    pub fn with_token_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_file = path.into();
        self
    }

    pub fn with_cache(mut self, ttl: Duration, capacity: usize) -> Self {
        self.cache_ttl = ttl;
        self.cache_capacity = capacity;
        self
    }

    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Values are trimmed and empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let base_url =
            get(API_URL_ENV).ok_or_else(|| ConfigError::Missing(API_URL_ENV.to_string()))?;
        let mut config = Self::new(&base_url)?;

        config.token_file = match get(TOKEN_FILE_ENV) {
            Some(path) => PathBuf::from(path),
            None => default_token_file(get("HOME")),
        };

        if let Some(raw) = get(HTTP_TIMEOUT_ENV) {
            let secs: u64 = parse_number(HTTP_TIMEOUT_ENV, &raw)?;
            if secs == 0 {
                return Err(ConfigError::Invalid {
                    name: HTTP_TIMEOUT_ENV.to_string(),
                    reason: "timeout must be at least 1 second".to_string(),
                });
            }
            config.http_timeout = Duration::from_secs(secs);
        }
        if let Some(raw) = get(CACHE_TTL_ENV) {
            config.cache_ttl = Duration::from_secs(parse_number(CACHE_TTL_ENV, &raw)?);
        }
        if let Some(raw) = get(CACHE_CAPACITY_ENV) {
            config.cache_capacity = parse_number(CACHE_CAPACITY_ENV, &raw)?;
        }

        Ok(config)
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(raw.trim()).map_err(|e| ConfigError::Invalid {
        name: API_URL_ENV.to_string(),
        reason: e.to_string(),
    })?;

    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Invalid {
            name: API_URL_ENV.to_string(),
            reason: format!("{raw} is not an http(s) base URL"),
        });
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn parse_number<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

fn default_token_file(home: Option<String>) -> PathBuf {
    match home.filter(|h| !h.trim().is_empty()) {
        Some(home) => PathBuf::from(home)
            .join(".config")
            .join("dashboard")
            .join(DEFAULT_TOKEN_FILE_NAME),
        None => PathBuf::from(DEFAULT_TOKEN_FILE_NAME),
    }
}
