//! User domain types: identities, profiles and credential policy.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::id::UserId;
use crate::role::Role;

/// Minimum password length for self-service sign-up.
pub const SIGN_UP_MIN_PASSWORD_LEN: usize = 6;

/// Minimum password length when an admin registers a user.
pub const REGISTER_MIN_PASSWORD_LEN: usize = 8;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

/// Loose email shape check: `local@domain.tld`, no whitespace.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// An authenticated principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: UserId,
    pub email: String,
}

/// Display profile row (`profiles` table).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: UserId,
    pub username: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A profile joined with its effective role, as listed to admins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserWithRole {
    pub id: UserId,
    pub username: Option<String>,
    pub created_at: DateTime<Utc>,
    pub role: Role,
}

impl UserWithRole {
    pub fn display_name(&self) -> &str {
        self.username.as_deref().unwrap_or("No email")
    }
}
