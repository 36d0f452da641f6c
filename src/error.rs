// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Client error type.

use reqwest::{Method, StatusCode};

/// Errors surfaced by the request client, the auth endpoints and the
/// resource services.
///
/// Authentication failures that the refresh flow recovers from never reach
/// the caller; a `Status` with 401/403 means recovery was not possible.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// No response was received (DNS, connect, TLS, timeout).
    #[error("{method} {path} failed: {source}")]
    Network {
        method: Method,
        path: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("{method} {path} returned {status}: {body}")]
    Status {
        method: Method,
        path: String,
        status: StatusCode,
        body: String,
    },

    /// The response body did not match the expected shape.
    #[error("{path} returned an invalid response: {message}")]
    Decode { path: String, message: String },

    /// A request body could not be serialized.
    #[error("failed to encode request body for {path}: {message}")]
    Encode { path: String, message: String },

    /// The caller's cancellation token fired before the request completed.
    #[error("request cancelled")]
    Cancelled,

    /// A path could not be joined onto the configured base URL.
    #[error("invalid request URL: {0}")]
    InvalidUrl(String),

    /// The underlying HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Build(String),

    /// The operation requires a session and none is stored.
    #[error("no active session")]
    NoSession,
}

impl ClientError {
    /// Get the HTTP status, if the server produced one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for 401 and 403 responses.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self.status(),
            Some(StatusCode::UNAUTHORIZED) | Some(StatusCode::FORBIDDEN)
        )
    }

    /// Stable machine-readable code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            ClientError::Network { .. } => "network_error",
            ClientError::Status { status, .. } if *status == StatusCode::UNAUTHORIZED => {
                "unauthorized"
            }
            ClientError::Status { status, .. } if *status == StatusCode::FORBIDDEN => "forbidden",
            ClientError::Status { .. } => "http_error",
            ClientError::Decode { .. } => "invalid_response",
            ClientError::Encode { .. } => "invalid_request",
            ClientError::Cancelled => "cancelled",
            ClientError::InvalidUrl(_) => "invalid_url",
            ClientError::Build(_) => "client_build_error",
            ClientError::NoSession => "no_session",
        }
    }
}

/// Result alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;
