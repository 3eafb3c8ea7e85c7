//! Contract fixture loader.
//!
//! Loads golden backend rows from `contracts/supabase/` so unit tests, the
//! in-memory fakes and the HTTP stub all agree on the wire shape.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Load a JSON fixture file relative to the workspace root.
///
/// # Example
/// ```no_run
/// use inventaris_testing::fixture::Fixture;
/// let rows = Fixture::load("contracts/supabase/inventory_items.json");
/// ```
pub struct Fixture;

impl Fixture {
    /// Load and parse a fixture JSON file at `workspace_root/path`.
    ///
    /// Panics if the file is missing or invalid JSON.
    pub fn load(relative_path: &str) -> Value {
        let full_path = workspace_root().join(relative_path);
        let contents = std::fs::read_to_string(&full_path)
            .unwrap_or_else(|e| panic!("fixture not found at {}: {}", full_path.display(), e));
        serde_json::from_str(&contents)
            .unwrap_or_else(|e| panic!("invalid JSON in fixture {}: {}", relative_path, e))
    }

    /// Load a fixture holding a JSON array and deserialize every element.
    ///
    /// Panics if any row does not match `T`, which is the point: the golden
    /// rows pin the wire shape of the domain types.
    pub fn rows<T: DeserializeOwned>(relative_path: &str) -> Vec<T> {
        serde_json::from_value(Self::load(relative_path))
            .unwrap_or_else(|e| panic!("fixture {} does not match row type: {}", relative_path, e))
    }
}

/// Walk up from the calling crate's manifest dir to the directory holding
/// `contracts/`.
fn workspace_root() -> PathBuf {
    let start = std::env::var("CARGO_MANIFEST_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| std::env::current_dir().unwrap());
    start
        .ancestors()
        .find(|p| p.join("contracts").is_dir())
        .map(Path::to_path_buf)
        .unwrap_or(start)
}
