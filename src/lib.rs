pub mod analytics;
pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod server;
pub mod state;
pub mod sync;

use anyhow::Context;
use std::path::Path;
use std::sync::Arc;

use api::{BrokerClient, KiteClient};
use config::Config;
use db::Database;
use state::AppState;

/// Open the database, wire up the brokerage client and serve the API
pub async fn run(config: Config) -> anyhow::Result<()> {
    if config.uses_default_secret() {
        log::warn!("SECRET_KEY is not set; tokens are signed with the default development key");
    }

    if let Some(parent) = Path::new(&config.database_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create data directory {:?}", parent))?;
        }
    }
    log::info!("Database path: {}", config.database_path);

    let database = match Database::new(&config.database_path) {
        Ok(db) => db,
        Err(e) => {
            let backups = Path::new(&config.database_path)
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join("backups");
            log::error!("Database initialization failed: {}", e);
            log::error!("This might be due to a failed migration or database corruption.");
            log::error!("Backups taken before migrations are in {:?}", backups);
            log::error!("To recover, stop the server, replace the database with the newest backup, and restart.");
            return Err(e).context("Database initialization failed");
        }
    };

    let broker: Option<Arc<dyn BrokerClient>> = match &config.broker {
        Some(creds) => {
            log::info!("Zerodha Kite integration enabled");
            Some(Arc::new(KiteClient::new(
                creds.api_key.clone(),
                creds.api_secret.clone(),
            )))
        }
        None => {
            log::info!("ZERODHA_API_KEY/ZERODHA_API_SECRET not set; broker routes disabled");
            None
        }
    };

    let addr = config.bind_addr();
    let state = AppState::new(database, config, broker);
    server::serve(state, &addr).await
}
