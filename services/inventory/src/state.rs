use crate::config::InventoryConfig;
use crate::domain::types::Viewer;
use crate::error::InventoryError;
use crate::infra::supabase::{SupabaseAuth, SupabaseClient, SupabaseRest, SupabaseStorage};
use crate::usecase::inventory::InventoryService;
use crate::usecase::session::SessionStore;
use crate::usecase::users::UserDirectory;

pub type Sessions = SessionStore<SupabaseAuth, SupabaseRest>;
pub type Inventory = InventoryService<SupabaseRest, SupabaseStorage>;
pub type Users = UserDirectory<SupabaseRest, SupabaseRest, SupabaseAuth>;

/// Wiring of the backend adapters into the use cases.
#[derive(Clone)]
pub struct AppState {
    pub config: InventoryConfig,
    pub client: SupabaseClient,
}

impl AppState {
    pub async fn from_config(config: InventoryConfig) -> Result<Self, InventoryError> {
        let client = SupabaseClient::connect(&config).await?;
        Ok(Self { config, client })
    }

    pub fn auth(&self) -> SupabaseAuth {
        SupabaseAuth::new(self.client.clone())
    }

    /// Start the session store on the saved session, if any.
    pub async fn session_store(&self) -> Sessions {
        SessionStore::init(self.auth(), SupabaseRest::new(self.client.clone())).await
    }

    pub fn inventory(&self, viewer: Viewer) -> Inventory {
        InventoryService::new(
            SupabaseRest::new(self.client.clone()),
            SupabaseStorage::new(self.client.clone(), self.config.storage_bucket.clone()),
            viewer,
        )
    }

    /// Directory tables go through the service-role key when one is
    /// configured, otherwise through the admin's own session.
    pub fn users(&self, viewer: Viewer) -> Users {
        let tables = if self.client.has_service_key() {
            SupabaseRest::privileged(self.client.clone())
        } else {
            SupabaseRest::new(self.client.clone())
        };
        UserDirectory::new(tables.clone(), tables, self.auth(), viewer)
    }
}
