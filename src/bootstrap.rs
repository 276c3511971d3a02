use anyhow::{Context, Result};
use std::path::Path;

use crate::client::NoteClient;
use crate::config::Config;

/// Load `.env` if present. A missing file is not an error.
pub fn load_env() {
    match dotenv::dotenv() {
        Ok(path) => log::info!("Loaded environment from {}", path.display()),
        Err(e) => {
            log::warn!("Could not load .env file: {}", e);
            log::warn!("Will try to use environment variables directly");
        }
    }
}

/// Shared startup for both binaries: environment, configuration, client.
pub fn init_client(config_path: Option<&Path>) -> Result<(Config, NoteClient)> {
    load_env();

    let config = Config::load(config_path)?;
    log::info!("Using flomo API URL: {}", config.api_url);

    let client = NoteClient::new(&config).context("Failed to create flomo client")?;
    Ok((config, client))
}
