use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};
use tokio::sync::broadcast;
use uuid::Uuid;

use inventaris_core::error::BackendError;
use inventaris_domain::id::{ItemId, UserId};
use inventaris_domain::inventory::InventoryItem;
use inventaris_domain::role::{Role, RoleAssignment};
use inventaris_domain::user::{Identity, Profile};
use inventaris_inventory::domain::repository::{
    AuthProvider, InventoryStore, ObjectStore, ProfileStore, RoleStore,
};
use inventaris_inventory::domain::types::{
    AuthEvent, ItemUpdate, NewAccount, NewInventoryItem, NewProfile, Session,
};
use inventaris_inventory::error::InventoryError;
use inventaris_testing::builders::{admin_identity, user_identity};
use inventaris_testing::fixture::Fixture;

pub const ADMIN_PASSWORD: &str = "admin-password";
pub const STAFF_PASSWORD: &str = "staff-password";
pub const PUBLIC_BASE: &str = "http://fake.test/storage/v1/object/public/inventory_images";

// ── FakeBackend ──────────────────────────────────────────────────────────────

/// In-memory backend implementing every port, seeded from `contracts/`.
///
/// Account creation mirrors the sign-up trigger: a `user` role row and a
/// profile are written for every new account.
#[derive(Clone)]
pub struct FakeBackend {
    pub state: Arc<Mutex<BackendState>>,
    events: broadcast::Sender<AuthEvent>,
}

#[derive(Default)]
pub struct BackendState {
    pub accounts: Vec<(Identity, String)>,
    pub session: Option<Session>,
    pub roles: Vec<RoleAssignment>,
    pub profiles: Vec<Profile>,
    pub items: Vec<InventoryItem>,
    pub next_item_id: i64,
    pub objects: BTreeMap<String, usize>,
    pub fail_role_insert: bool,
    pub fail_uploads_under: Option<&'static str>,
    /// Counts every table write (insert, update, delete).
    pub table_writes: usize,
}

impl FakeBackend {
    pub fn empty() -> Self {
        Self {
            state: Arc::new(Mutex::new(BackendState {
                next_item_id: 1,
                ..Default::default()
            })),
            events: broadcast::channel(16).0,
        }
    }

    /// Two accounts (admin, staff), three records and the golden role and
    /// profile rows.
    pub fn seeded() -> Self {
        let backend = Self::empty();
        {
            let mut state = backend.state.lock().unwrap();
            state.accounts = vec![
                (admin_identity(), ADMIN_PASSWORD.to_owned()),
                (user_identity(), STAFF_PASSWORD.to_owned()),
            ];
            state.roles = Fixture::rows("contracts/supabase/user_roles.json");
            state.profiles = Fixture::rows("contracts/supabase/profiles.json");
            state.items = Fixture::rows("contracts/supabase/inventory_items.json");
            state.next_item_id = state.items.iter().map(|i| i.id.0).max().unwrap_or(0) + 1;
        }
        backend
    }

    pub fn with_session(self, identity: &Identity) -> Self {
        self.state.lock().unwrap().session = Some(session_for(identity));
        self
    }

    pub fn events(&self) -> broadcast::Sender<AuthEvent> {
        self.events.clone()
    }

    pub fn item(&self, id: i64) -> Option<InventoryItem> {
        self.state
            .lock()
            .unwrap()
            .items
            .iter()
            .find(|i| i.id == ItemId(id))
            .cloned()
    }

    pub fn item_count(&self) -> usize {
        self.state.lock().unwrap().items.len()
    }

    pub fn object_paths(&self) -> Vec<String> {
        self.state.lock().unwrap().objects.keys().cloned().collect()
    }

    pub fn table_writes(&self) -> usize {
        self.state.lock().unwrap().table_writes
    }

    fn create_account(&self, email: &str, password: &str, name: Option<&str>) -> Result<Identity, InventoryError> {
        let mut state = self.state.lock().unwrap();
        if state.accounts.iter().any(|(i, _)| i.email == email) {
            return Err(BackendError::from_response(422, r#"{"msg":"User already registered"}"#).into());
        }
        let identity = Identity {
            id: UserId(Uuid::new_v4()),
            email: email.to_owned(),
        };
        state.accounts.push((identity.clone(), password.to_owned()));
        state.roles.push(RoleAssignment {
            user_id: identity.id,
            role: Role::User,
        });
        state.profiles.push(Profile {
            id: identity.id,
            username: name.map(str::to_owned),
            created_at: Utc::now(),
        });
        Ok(identity)
    }
}

pub fn session_for(identity: &Identity) -> Session {
    Session {
        access_token: format!("access-{}", identity.id),
        refresh_token: format!("refresh-{}", identity.id),
        expires_at: Utc::now() + Duration::hours(1),
        user: identity.clone(),
    }
}

fn not_found(table: &str) -> InventoryError {
    BackendError::from_response(404, &format!(r#"{{"message":"no rows in {table}"}}"#)).into()
}

// ── Auth ─────────────────────────────────────────────────────────────────────

impl AuthProvider for FakeBackend {
    async fn sign_up(&self, email: &str, password: &str, username: &str) -> Result<Identity, InventoryError> {
        self.create_account(email, password, Some(username))
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, InventoryError> {
        let session = {
            let mut state = self.state.lock().unwrap();
            let identity = state
                .accounts
                .iter()
                .find(|(i, p)| i.email == email && p == password)
                .map(|(i, _)| i.clone())
                .ok_or_else(|| {
                    InventoryError::from(BackendError::from_response(
                        400,
                        r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#,
                    ))
                })?;
            let session = session_for(&identity);
            state.session = Some(session.clone());
            session
        };
        let _ = self.events.send(AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), InventoryError> {
        self.state.lock().unwrap().session = None;
        let _ = self.events.send(AuthEvent::SignedOut);
        Ok(())
    }

    async fn get_session(&self) -> Result<Option<Session>, InventoryError> {
        Ok(self.state.lock().unwrap().session.clone())
    }

    async fn create_user(&self, account: &NewAccount) -> Result<Identity, InventoryError> {
        self.create_account(&account.email, &account.password, account.full_name.as_deref())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

// ── Tables ───────────────────────────────────────────────────────────────────

impl RoleStore for FakeBackend {
    async fn roles_for(&self, user_id: UserId) -> Result<Vec<Role>, InventoryError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .roles
            .iter()
            .filter(|r| r.user_id == user_id)
            .map(|r| r.role)
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<RoleAssignment>, InventoryError> {
        Ok(self.state.lock().unwrap().roles.clone())
    }

    async fn insert(&self, assignment: RoleAssignment) -> Result<(), InventoryError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_role_insert {
            return Err(BackendError::from_response(
                403,
                r#"{"code":"42501","message":"permission denied for table user_roles"}"#,
            )
            .into());
        }
        state.roles.push(assignment);
        Ok(())
    }

    async fn set_role(&self, user_id: UserId, role: Role) -> Result<(), InventoryError> {
        let mut state = self.state.lock().unwrap();
        for row in state.roles.iter_mut().filter(|r| r.user_id == user_id) {
            row.role = role;
        }
        Ok(())
    }

    async fn delete_for(&self, user_id: UserId) -> Result<(), InventoryError> {
        self.state.lock().unwrap().roles.retain(|r| r.user_id != user_id);
        Ok(())
    }
}

impl ProfileStore for FakeBackend {
    async fn list_all(&self) -> Result<Vec<Profile>, InventoryError> {
        let mut profiles = self.state.lock().unwrap().profiles.clone();
        profiles.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(profiles)
    }

    async fn upsert(&self, profile: &NewProfile) -> Result<(), InventoryError> {
        let mut state = self.state.lock().unwrap();
        match state.profiles.iter_mut().find(|p| p.id == profile.id) {
            Some(row) => row.username = Some(profile.username.clone()),
            None => state.profiles.push(Profile {
                id: profile.id,
                username: Some(profile.username.clone()),
                created_at: Utc::now(),
            }),
        }
        Ok(())
    }

    async fn delete(&self, id: UserId) -> Result<(), InventoryError> {
        self.state.lock().unwrap().profiles.retain(|p| p.id != id);
        Ok(())
    }
}

impl InventoryStore for FakeBackend {
    async fn list_all(&self) -> Result<Vec<InventoryItem>, InventoryError> {
        let mut items = self.state.lock().unwrap().items.clone();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    async fn insert(&self, item: &NewInventoryItem) -> Result<InventoryItem, InventoryError> {
        let mut state = self.state.lock().unwrap();
        let now = Utc::now();
        let form = &item.fields;
        let row = InventoryItem {
            id: ItemId(state.next_item_id),
            asset_number: form.asset_number.clone(),
            nama_asset_1: form.nama_asset_1.clone(),
            nama_asset_2: form.nama_asset_2.clone(),
            alamat: form.alamat.clone(),
            kota: form.kota.clone(),
            keterangan_lokasi: form.keterangan_lokasi.clone(),
            foto_depan: form.foto_depan.clone(),
            foto_kiri: form.foto_kiri.clone(),
            foto_kanan: form.foto_kanan.clone(),
            kondisi: form.kondisi,
            created_at: now,
            updated_at: now,
            created_by: Some(item.created_by),
        };
        state.next_item_id += 1;
        state.table_writes += 1;
        state.items.push(row.clone());
        Ok(row)
    }

    async fn update(&self, id: ItemId, update: &ItemUpdate) -> Result<InventoryItem, InventoryError> {
        let mut state = self.state.lock().unwrap();
        state.table_writes += 1;
        let row = state
            .items
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or(InventoryError::ItemNotFound(id))?;
        update.apply_to(row);
        Ok(row.clone())
    }

    async fn delete(&self, id: ItemId) -> Result<(), InventoryError> {
        let mut state = self.state.lock().unwrap();
        state.table_writes += 1;
        let before = state.items.len();
        state.items.retain(|i| i.id != id);
        if state.items.len() == before {
            return Err(InventoryError::ItemNotFound(id));
        }
        Ok(())
    }
}

// ── Objects ──────────────────────────────────────────────────────────────────

impl ObjectStore for FakeBackend {
    async fn upload(&self, path: &str, bytes: Vec<u8>, _content_type: &str) -> Result<(), InventoryError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_uploads_under.is_some_and(|seg| path.starts_with(seg)) {
            return Err(not_found("bucket inventory_images"));
        }
        state.objects.insert(path.to_owned(), bytes.len());
        Ok(())
    }

    async fn remove(&self, paths: &[String]) -> Result<(), InventoryError> {
        let mut state = self.state.lock().unwrap();
        for path in paths {
            state.objects.remove(path);
        }
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!("{PUBLIC_BASE}/{path}")
    }
}
