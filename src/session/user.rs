// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Current user profile as returned by `GET /auth/me`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::roles::{Role, RoleSet};

/// Profile of the logged-in user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    #[serde(deserialize_with = "crate::services::models::string_or_number")]
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub is_github_member: bool,
    pub position: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl CurrentUser {
    /// True iff the user's role is, or is contained in, `roles`.
    pub fn has_role<R: RoleSet + ?Sized>(&self, roles: &R) -> bool {
        roles.contains_role(self.role)
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

#[cfg(test)]
pub(crate) fn sample_user(role: Role) -> CurrentUser {
    CurrentUser {
        id: "u-1".to_string(),
        created_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap_or_default(),
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        username: "ada".to_string(),
        email: "ada@example.com".to_string(),
        role,
        is_github_member: true,
        position: "Engineer".to_string(),
        avatar_url: None,
    }
}
