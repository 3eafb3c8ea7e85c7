use clap::Parser;
use tracing::error;

use inventaris_core::config::Config;
use inventaris_core::tracing::init_tracing;

use inventaris_inventory::cli::{Cli, commands};
use inventaris_inventory::config::InventoryConfig;
use inventaris_inventory::error::InventoryError;
use inventaris_inventory::state::AppState;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        error!(kind = e.kind(), error = %e, "command failed");
        eprintln!("error: {e}");
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<(), InventoryError> {
    let config = InventoryConfig::from_env()?;
    let state = AppState::from_config(config).await?;
    commands::run(cli, state).await
}
