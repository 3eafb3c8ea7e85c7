use std::path::PathBuf;

use serde::Deserialize;

use inventaris_core::config::Config;

/// Inventory client configuration loaded from environment variables
/// (after `.env`, if present).
#[derive(Debug, Clone, Deserialize)]
pub struct InventoryConfig {
    /// Project base URL, e.g. `https://xyz.supabase.co`. Env var: `SUPABASE_URL`.
    pub supabase_url: String,
    /// Public anon key sent as `apikey` on every request. Env var: `SUPABASE_ANON_KEY`.
    pub supabase_anon_key: String,
    /// Service-role key for privileged account creation. Env var: `SUPABASE_SERVICE_ROLE_KEY`.
    #[serde(default)]
    pub supabase_service_role_key: Option<String>,
    /// Photo bucket (default `inventory_images`). Env var: `STORAGE_BUCKET`.
    #[serde(default = "default_bucket")]
    pub storage_bucket: String,
    /// Where the signed-in session is kept between runs. Env var: `SESSION_FILE`.
    #[serde(default)]
    pub session_file: Option<PathBuf>,
    /// HTTP request timeout in seconds (default 30). Env var: `HTTP_TIMEOUT_SECS`.
    #[serde(default = "default_timeout")]
    pub http_timeout_secs: u64,
}

fn default_bucket() -> String {
    "inventory_images".to_owned()
}

fn default_timeout() -> u64 {
    30
}

impl Config for InventoryConfig {}

impl InventoryConfig {
    pub fn base_url(&self) -> &str {
        self.supabase_url.trim_end_matches('/')
    }

    /// Explicit `SESSION_FILE`, else `<data dir>/inventaris/session.json`.
    pub fn session_path(&self) -> Option<PathBuf> {
        self.session_file
            .clone()
            .or_else(|| dirs::data_dir().map(|d| d.join("inventaris").join("session.json")))
    }
}
