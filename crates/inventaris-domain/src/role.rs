//! Role assignment types and the two authorization policies built on them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::id::UserId;

/// Privilege granted by a `user_roles` row.
///
/// Wire format: lowercase string (`"admin"`, `"user"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }

    /// The role an admin toggle switches to.
    pub fn toggled(self) -> Self {
        match self {
            Self::Admin => Self::User,
            Self::User => Self::Admin,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string cannot be parsed as a [`Role`].
#[derive(Debug, Error)]
#[error("unknown role: {0:?}")]
pub struct ParseRoleError(pub String);

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "user" => Ok(Self::User),
            other => Err(ParseRoleError(other.to_owned())),
        }
    }
}

/// One `user_roles` row. Several rows may exist for the same user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub user_id: UserId,
    pub role: Role,
}

/// Authorization policies.
///
/// Base access and admin privilege deliberately default in opposite
/// directions when role data is missing, so they are kept as two policies
/// rather than one "default role".
pub mod policy {
    use super::Role;

    /// Base access fails open: every authenticated identity has it, with or
    /// without role rows.
    pub fn has_base_access(authenticated: bool) -> bool {
        authenticated
    }

    /// Admin privilege fails closed: granted only when at least one `admin`
    /// row is present, regardless of any coexisting `user` rows.
    pub fn has_admin_privilege<'a, I>(roles: I) -> bool
    where
        I: IntoIterator<Item = &'a Role>,
    {
        roles.into_iter().any(|r| *r == Role::Admin)
    }

    /// Effective role for display: `Admin` if any admin row, else `User`.
    pub fn effective_role<'a, I>(roles: I) -> Role
    where
        I: IntoIterator<Item = &'a Role>,
    {
        if has_admin_privilege(roles) {
            Role::Admin
        } else {
            Role::User
        }
    }
}
