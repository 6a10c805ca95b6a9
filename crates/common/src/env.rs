//! Environment/runtime helpers
//!
//! Sanity checks run once at startup, before the trip store is opened.

use std::path::Path;

use tracing::{info, warn};

/// Warn when the config file is missing and make sure the data directory exists.
pub async fn ensure_env(config_path: &str, data_dir: &str) -> anyhow::Result<()> {
    if tokio::fs::metadata(config_path).await.is_err() {
        warn!(%config_path, "config file not found; falling back to built-in defaults");
    }
    ensure_data_dir(data_dir).await?;
    Ok(())
}

/// Create the data directory (and parents) if it does not exist yet.
pub async fn ensure_data_dir(data_dir: &str) -> anyhow::Result<()> {
    if Path::new(data_dir).is_dir() {
        return Ok(());
    }
    tokio::fs::create_dir_all(data_dir)
        .await
        .map_err(|e| anyhow::anyhow!("cannot create {data_dir}: {e}"))?;
    info!(%data_dir, "created data directory");
    Ok(())
}
