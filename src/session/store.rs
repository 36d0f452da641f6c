// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token persistence.
//!
//! The store is the only owner of the access/refresh token pair. It performs
//! no validation and no expiry checks; see [`super::claims`] for that.
//!
//! Two backends are provided:
//!
//! - [`MemoryTokenStore`] - process-local, used by tests and embedders
//! - [`FileTokenStore`] - JSON file that survives restarts, used by the CLI
//!
//! ## File Layout
//!
//! ```text
//! {
//!   "accessToken": "<jwt>",
//!   "refreshToken": "<jwt>"
//! }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Names of the two persisted values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TokenKey {
    AccessToken,
    RefreshToken,
}

impl TokenKey {
    pub const ALL: [TokenKey; 2] = [TokenKey::AccessToken, TokenKey::RefreshToken];

    /// Key under which the value is persisted.
    pub fn storage_name(&self) -> &'static str {
        match self {
            TokenKey::AccessToken => "accessToken",
            TokenKey::RefreshToken => "refreshToken",
        }
    }
}

impl fmt::Display for TokenKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.storage_name())
    }
}

/// Access/refresh token pair as issued by `/auth/login` and `/auth/refresh`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

// Tokens are credentials; keep them out of logs.
impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Durable key-value storage for the token pair.
///
/// Implementations are internally synchronized and never fail from the
/// caller's point of view: `get` yields `None` when a value cannot be read,
/// and write failures are logged.
pub trait TokenStore: Send + Sync + fmt::Debug {
    /// Read one value.
    fn get(&self, key: TokenKey) -> Option<String>;

    /// Overwrite both values.
    fn set(&self, access_token: &str, refresh_token: &str);

    /// Remove one value.
    fn remove(&self, key: TokenKey);

    /// Remove both values. Idempotent.
    fn clear(&self);

    /// Both values, if both are present.
    fn pair(&self) -> Option<TokenPair> {
        Some(TokenPair {
            access_token: self.get(TokenKey::AccessToken)?,
            refresh_token: self.get(TokenKey::RefreshToken)?,
        })
    }

    fn set_pair(&self, pair: &TokenPair) {
        self.set(&pair.access_token, &pair.refresh_token);
    }
}

/// In-process token store.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    values: RwLock<HashMap<TokenKey, String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store already holding `pair`.
    pub fn with_pair(pair: &TokenPair) -> Self {
        let store = Self::new();
        store.set_pair(pair);
        store
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, key: TokenKey) -> Option<String> {
        self.values.read().ok()?.get(&key).cloned()
    }

    fn set(&self, access_token: &str, refresh_token: &str) {
        if let Ok(mut values) = self.values.write() {
            values.insert(TokenKey::AccessToken, access_token.to_string());
            values.insert(TokenKey::RefreshToken, refresh_token.to_string());
        }
    }

    fn remove(&self, key: TokenKey) {
        if let Ok(mut values) = self.values.write() {
            values.remove(&key);
        }
    }

    fn clear(&self) {
        if let Ok(mut values) = self.values.write() {
            values.clear();
        }
    }
}

/// Error type for file-backed store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("corrupt token file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

type StoreResult<T> = Result<T, StoreError>;

/// Token store persisted as a small JSON file.
///
/// Every mutation rewrites the whole file through a temporary sibling and a
/// rename, so readers never observe a half-written file. Removing the last
/// value deletes the file.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> StoreResult<BTreeMap<String, String>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&raw).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })
    }

    fn persist(&self, values: &BTreeMap<String, String>) -> StoreResult<()> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if values.is_empty() {
            return match fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(io_err(e)),
            };
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(io_err)?;
            }
        }

        let body = serde_json::to_vec_pretty(values).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })?;

        let tmp_path = self.path.with_extension("tmp");
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(&tmp_path).map_err(io_err)?;
        file.write_all(&body).map_err(io_err)?;
        file.flush().map_err(io_err)?;
        drop(file);

        fs::rename(&tmp_path, &self.path).map_err(io_err)
    }

    fn update<F>(&self, op: &'static str, mutate: F)
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let Ok(_guard) = self.lock.lock() else {
            warn!(operation = op, "Token store lock poisoned; skipping write");
            return;
        };

        // A corrupt file is replaced rather than blocking every later write.
        let mut values = self.load().unwrap_or_else(|e| {
            warn!(operation = op, error = %e, "Discarding unreadable token file");
            BTreeMap::new()
        });
        mutate(&mut values);

        if let Err(e) = self.persist(&values) {
            warn!(operation = op, error = %e, "Failed to persist token file");
        }
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self, key: TokenKey) -> Option<String> {
        let _guard = self.lock.lock().ok()?;
        match self.load() {
            Ok(mut values) => values.remove(key.storage_name()),
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to read token file");
                None
            }
        }
    }

    fn set(&self, access_token: &str, refresh_token: &str) {
        self.update("set", |values| {
            values.insert(
                TokenKey::AccessToken.storage_name().to_string(),
                access_token.to_string(),
            );
            values.insert(
                TokenKey::RefreshToken.storage_name().to_string(),
                refresh_token.to_string(),
            );
        });
    }

    fn remove(&self, key: TokenKey) {
        self.update("remove", |values| {
            values.remove(key.storage_name());
        });
    }

    fn clear(&self) {
        self.update("clear", |values| values.clear());
    }
}
