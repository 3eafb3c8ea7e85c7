//! Ports onto the hosted backend. Futures are `Send` so the session listener
//! can drive them from a spawned task.

use std::future::Future;

use tokio::sync::broadcast;

use inventaris_domain::id::{ItemId, UserId};
use inventaris_domain::inventory::InventoryItem;
use inventaris_domain::role::{Role, RoleAssignment};
use inventaris_domain::user::{Identity, Profile};

use crate::domain::types::{
    AuthEvent, ItemUpdate, NewAccount, NewInventoryItem, NewProfile, Session,
};
use crate::error::InventoryError;

/// Credential checks, token issuance and auth-state events.
pub trait AuthProvider: Send + Sync {
    /// Create an account. `username` is stored as user metadata.
    fn sign_up(
        &self,
        email: &str,
        password: &str,
        username: &str,
    ) -> impl Future<Output = Result<Identity, InventoryError>> + Send;

    fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<Session, InventoryError>> + Send;

    /// Invalidate the current session. Local session state is cleared even
    /// when the backend call fails.
    fn sign_out(&self) -> impl Future<Output = Result<(), InventoryError>> + Send;

    /// The current session, refreshed first if it is about to expire.
    fn get_session(&self) -> impl Future<Output = Result<Option<Session>, InventoryError>> + Send;

    /// Privileged account creation (pre-confirmed email, `full_name` metadata).
    fn create_user(
        &self,
        account: &NewAccount,
    ) -> impl Future<Output = Result<Identity, InventoryError>> + Send;

    /// Subscribe to auth-state changes from now on.
    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;
}

/// `user_roles` table.
pub trait RoleStore: Send + Sync {
    fn roles_for(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<Vec<Role>, InventoryError>> + Send;

    fn list_all(&self) -> impl Future<Output = Result<Vec<RoleAssignment>, InventoryError>> + Send;

    fn insert(
        &self,
        assignment: RoleAssignment,
    ) -> impl Future<Output = Result<(), InventoryError>> + Send;

    /// Set every row of `user_id` to `role`.
    fn set_role(
        &self,
        user_id: UserId,
        role: Role,
    ) -> impl Future<Output = Result<(), InventoryError>> + Send;

    fn delete_for(&self, user_id: UserId) -> impl Future<Output = Result<(), InventoryError>> + Send;
}

/// `profiles` table.
pub trait ProfileStore: Send + Sync {
    fn list_all(&self) -> impl Future<Output = Result<Vec<Profile>, InventoryError>> + Send;

    /// Insert, or overwrite the username of an existing row.
    fn upsert(&self, profile: &NewProfile) -> impl Future<Output = Result<(), InventoryError>> + Send;

    fn delete(&self, id: UserId) -> impl Future<Output = Result<(), InventoryError>> + Send;
}

/// `inventory_items` table.
pub trait InventoryStore: Send + Sync {
    /// All rows, newest `created_at` first.
    fn list_all(&self) -> impl Future<Output = Result<Vec<InventoryItem>, InventoryError>> + Send;

    fn insert(
        &self,
        item: &NewInventoryItem,
    ) -> impl Future<Output = Result<InventoryItem, InventoryError>> + Send;

    /// Returns the row as stored. `ItemNotFound` when no row matched.
    fn update(
        &self,
        id: ItemId,
        update: &ItemUpdate,
    ) -> impl Future<Output = Result<InventoryItem, InventoryError>> + Send;

    /// `ItemNotFound` when no row matched.
    fn delete(&self, id: ItemId) -> impl Future<Output = Result<(), InventoryError>> + Send;
}

/// Photo bucket.
pub trait ObjectStore: Send + Sync {
    fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> impl Future<Output = Result<(), InventoryError>> + Send;

    fn remove(&self, paths: &[String]) -> impl Future<Output = Result<(), InventoryError>> + Send;

    /// Public URL of an object; no network call.
    fn public_url(&self, path: &str) -> String;
}
