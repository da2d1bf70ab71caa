#![allow(missing_docs)]

use std::path::PathBuf;

use anyhow::Result;
use order_sync_lib::infrastructure::ConfigManager;
use order_sync_lib::infrastructure::logging::{init_logging_with_config, log_system_info};
use tracing::error;

/// `order-sync [CONFIG_PATH]`; without a path the per-user config file is used
#[tokio::main]
async fn main() -> Result<()> {
    let manager = match std::env::args_os().nth(1) {
        Some(path) => ConfigManager::with_path(PathBuf::from(path)),
        None => ConfigManager::new()?,
    };
    let config = manager.load_config().await?;

    init_logging_with_config(config.logging.clone())?;
    log_system_info();
    config.validate()?;

    if let Err(e) = order_sync_lib::run(config).await {
        error!("❌ Sync failed: {:#}", e);
        return Err(e);
    }
    Ok(())
}
