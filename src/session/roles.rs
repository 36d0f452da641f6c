// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User roles for capability checks.

use serde::{Deserialize, Serialize};

/// Dashboard roles.
///
/// ## Capabilities
///
/// - `Admin` - Manages users, agents and every project
/// - `Manager` - Manages projects and reads analyses for their teams
/// - `Developer` - Reads their own projects and statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    Developer,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Manager, Role::Developer];

    /// Parse role from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Role> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "manager" => Some(Role::Manager),
            "developer" => Some(Role::Developer),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Developer => "developer",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::parse(s).ok_or_else(|| format!("unknown role: {s}"))
    }
}

/// A role or a set of roles a user may be checked against.
///
/// Lets `has_role` accept either a single [`Role`] or any collection of them.
pub trait RoleSet {
    fn contains_role(&self, role: Role) -> bool;
}

impl RoleSet for Role {
    fn contains_role(&self, role: Role) -> bool {
        *self == role
    }
}

impl RoleSet for [Role] {
    fn contains_role(&self, role: Role) -> bool {
        self.contains(&role)
    }
}

impl<const N: usize> RoleSet for [Role; N] {
    fn contains_role(&self, role: Role) -> bool {
        self.contains(&role)
    }
}

impl RoleSet for Vec<Role> {
    fn contains_role(&self, role: Role) -> bool {
        self.contains(&role)
    }
}

impl<T: RoleSet + ?Sized> RoleSet for &T {
    fn contains_role(&self, role: Role) -> bool {
        (**self).contains_role(role)
    }
}
