use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use inventaris_core::serde::to_rfc3339_ms;
use inventaris_domain::id::UserId;
use inventaris_domain::inventory::{InlineEdit, InventoryItem, ItemForm};
use inventaris_domain::role::Role;
use inventaris_domain::user::Identity;

/// Sessions this close to expiry (seconds) are refreshed before use.
pub const SESSION_REFRESH_MARGIN_SECS: i64 = 30;

/// An auth-provider session. Tokens are opaque to this crate.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub user: Identity,
}

impl Session {
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - Duration::seconds(SESSION_REFRESH_MARGIN_SECS) <= now
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user", &self.user)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Auth-state change pushed by the provider to its subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    InitialSession(Option<Session>),
    SignedIn(Session),
    SignedOut,
    TokenRefreshed(Session),
}

impl AuthEvent {
    /// The session carried by the event, if it leaves someone signed in.
    pub fn session(&self) -> Option<&Session> {
        match self {
            Self::InitialSession(s) => s.as_ref(),
            Self::SignedIn(s) | Self::TokenRefreshed(s) => Some(s),
            Self::SignedOut => None,
        }
    }
}

/// Where the client navigates after a session operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Landing {
    Auth,
    Home,
    AdminDashboard,
}

impl Landing {
    pub fn for_admin(is_admin: bool) -> Self {
        if is_admin {
            Self::AdminDashboard
        } else {
            Self::Home
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignInOutcome {
    pub identity: Identity,
    pub is_admin: bool,
    pub landing: Landing,
}

/// Snapshot of who is using a view, taken when the view is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    pub identity: Identity,
    pub is_admin: bool,
}

#[derive(Debug, Clone)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub username: Option<String>,
}

impl SignUpRequest {
    /// Display name stored in user metadata; defaults to the email's local part.
    pub fn username(&self) -> String {
        self.username
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(str::to_owned)
            .unwrap_or_else(|| {
                self.email
                    .split('@')
                    .next()
                    .unwrap_or_default()
                    .to_owned()
            })
    }
}

/// Account creation through the privileged admin path.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub role: Option<Role>,
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterOutcome {
    pub identity: Identity,
    pub role: Role,
    /// Set when the account exists but the role row could not be written.
    pub warning: Option<String>,
}

/// `profiles` upsert payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewProfile {
    pub id: UserId,
    pub username: String,
}

/// `inventory_items` insert payload. Id and timestamps come from the backend.
#[derive(Debug, Clone, Serialize)]
pub struct NewInventoryItem {
    #[serde(flatten)]
    pub fields: ItemForm,
    pub created_by: UserId,
}

/// Field subset written by an update.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ItemChanges {
    Full(ItemForm),
    Inline(InlineEdit),
}

/// `inventory_items` update payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemUpdate {
    #[serde(flatten)]
    pub changes: ItemChanges,
    #[serde(serialize_with = "to_rfc3339_ms")]
    pub updated_at: DateTime<Utc>,
}

impl ItemUpdate {
    pub fn full(form: ItemForm) -> Self {
        Self {
            changes: ItemChanges::Full(form),
            updated_at: Utc::now(),
        }
    }

    pub fn inline(edit: InlineEdit) -> Self {
        Self {
            changes: ItemChanges::Inline(edit),
            updated_at: Utc::now(),
        }
    }

    /// Apply to a local copy the way the backend applies it to the row.
    pub fn apply_to(&self, item: &mut InventoryItem) {
        match &self.changes {
            ItemChanges::Full(form) => item.apply_form(form),
            ItemChanges::Inline(edit) => item.apply_inline(edit),
        }
        item.updated_at = self.updated_at;
    }
}
