use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::debug;

use inventaris_domain::id::{ItemId, UserId};
use inventaris_domain::inventory::InventoryItem;
use inventaris_domain::role::{Role, RoleAssignment};
use inventaris_domain::user::Profile;

use super::{Credential, SupabaseClient, read_json};
use crate::domain::repository::{InventoryStore, ProfileStore, RoleStore};
use crate::domain::types::{ItemUpdate, NewInventoryItem, NewProfile};
use crate::error::InventoryError;

const INVENTORY: &str = "/rest/v1/inventory_items";
const USER_ROLES: &str = "/rest/v1/user_roles";
const PROFILES: &str = "/rest/v1/profiles";

const RETURN_ROWS: &str = "return=representation";
const RETURN_NOTHING: &str = "return=minimal";
const UPSERT: &str = "resolution=merge-duplicates,return=minimal";

/// PostgREST-backed table stores.
#[derive(Clone)]
pub struct SupabaseRest {
    client: SupabaseClient,
    credential: Credential,
}

impl SupabaseRest {
    /// Requests run as the signed-in user, subject to row-level security.
    pub fn new(client: SupabaseClient) -> Self {
        Self {
            client,
            credential: Credential::User,
        }
    }

    /// Requests run with the service-role key.
    pub fn privileged(client: SupabaseClient) -> Self {
        Self {
            client,
            credential: Credential::Service,
        }
    }

    async fn select<T: for<'de> Deserialize<'de>>(
        &self,
        table: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, InventoryError> {
        let url = self.client.url(table, query)?;
        let request = self.client.authorized(Method::GET, url, self.credential).await?;
        Ok(read_json(self.client.send(request).await?).await?)
    }

    /// Write and return the affected rows.
    async fn write<B: Serialize + ?Sized, T: for<'de> Deserialize<'de>>(
        &self,
        method: Method,
        table: &str,
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> Result<Vec<T>, InventoryError> {
        let url = self.client.url(table, query)?;
        let mut request = self
            .client
            .authorized(method, url, self.credential)
            .await?
            .header("Prefer", RETURN_ROWS);
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(read_json(self.client.send(request).await?).await?)
    }

    /// Write without reading rows back.
    async fn execute<B: Serialize + ?Sized>(
        &self,
        method: Method,
        table: &str,
        query: &[(&str, &str)],
        prefer: &str,
        body: Option<&B>,
    ) -> Result<(), InventoryError> {
        let url = self.client.url(table, query)?;
        let mut request = self
            .client
            .authorized(method, url, self.credential)
            .await?
            .header("Prefer", prefer);
        if let Some(body) = body {
            request = request.json(body);
        }
        self.client.send(request).await?;
        Ok(())
    }
}

fn eq(value: impl ToString) -> String {
    format!("eq.{}", value.to_string())
}

// ── inventory_items ──────────────────────────────────────────────────────────

impl InventoryStore for SupabaseRest {
    async fn list_all(&self) -> Result<Vec<InventoryItem>, InventoryError> {
        self.select(INVENTORY, &[("select", "*"), ("order", "created_at.desc")])
            .await
    }

    async fn insert(&self, item: &NewInventoryItem) -> Result<InventoryItem, InventoryError> {
        let rows: Vec<InventoryItem> = self
            .write(Method::POST, INVENTORY, &[("select", "*")], Some(item))
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("insert into inventory_items returned no row").into())
    }

    async fn update(&self, id: ItemId, update: &ItemUpdate) -> Result<InventoryItem, InventoryError> {
        let filter = eq(id);
        let rows: Vec<InventoryItem> = self
            .write(
                Method::PATCH,
                INVENTORY,
                &[("id", filter.as_str()), ("select", "*")],
                Some(update),
            )
            .await?;
        rows.into_iter().next().ok_or(InventoryError::ItemNotFound(id))
    }

    async fn delete(&self, id: ItemId) -> Result<(), InventoryError> {
        let filter = eq(id);
        let rows: Vec<serde_json::Value> = self
            .write::<(), _>(Method::DELETE, INVENTORY, &[("id", filter.as_str())], None)
            .await?;
        if rows.is_empty() {
            return Err(InventoryError::ItemNotFound(id));
        }
        debug!(item_id = %id, "row deleted");
        Ok(())
    }
}

// ── user_roles ───────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct RoleRow {
    role: Role,
}

#[derive(Serialize)]
struct RolePatch {
    role: Role,
}

impl RoleStore for SupabaseRest {
    async fn roles_for(&self, user_id: UserId) -> Result<Vec<Role>, InventoryError> {
        let filter = eq(user_id);
        let rows: Vec<RoleRow> = self
            .select(USER_ROLES, &[("select", "role"), ("user_id", filter.as_str())])
            .await?;
        Ok(rows.into_iter().map(|r| r.role).collect())
    }

    async fn list_all(&self) -> Result<Vec<RoleAssignment>, InventoryError> {
        self.select(USER_ROLES, &[("select", "user_id,role")]).await
    }

    async fn insert(&self, assignment: RoleAssignment) -> Result<(), InventoryError> {
        self.execute(Method::POST, USER_ROLES, &[], RETURN_NOTHING, Some(&assignment))
            .await
    }

    async fn set_role(&self, user_id: UserId, role: Role) -> Result<(), InventoryError> {
        let filter = eq(user_id);
        self.execute(
            Method::PATCH,
            USER_ROLES,
            &[("user_id", filter.as_str())],
            RETURN_NOTHING,
            Some(&RolePatch { role }),
        )
        .await
    }

    async fn delete_for(&self, user_id: UserId) -> Result<(), InventoryError> {
        let filter = eq(user_id);
        self.execute::<()>(Method::DELETE, USER_ROLES, &[("user_id", filter.as_str())], RETURN_NOTHING, None)
            .await
    }
}

// ── profiles ─────────────────────────────────────────────────────────────────

impl ProfileStore for SupabaseRest {
    async fn list_all(&self) -> Result<Vec<Profile>, InventoryError> {
        self.select(
            PROFILES,
            &[("select", "id,username,created_at"), ("order", "created_at.desc")],
        )
        .await
    }

    async fn upsert(&self, profile: &NewProfile) -> Result<(), InventoryError> {
        self.execute(Method::POST, PROFILES, &[], UPSERT, Some(profile)).await
    }

    async fn delete(&self, id: UserId) -> Result<(), InventoryError> {
        let filter = eq(id);
        self.execute::<()>(Method::DELETE, PROFILES, &[("id", filter.as_str())], RETURN_NOTHING, None)
            .await
    }
}
