use std::sync::Arc;

use crate::api::client::BrokerClient;
use crate::config::Config;
use crate::db::Database;

/// Shared handler state. Cloned per request; everything heavy sits behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub config: Arc<Config>,
    /// None when no brokerage credentials are configured
    pub broker: Option<Arc<dyn BrokerClient>>,
}

impl AppState {
    pub fn new(db: Database, config: Config, broker: Option<Arc<dyn BrokerClient>>) -> Self {
        Self {
            db: Arc::new(db),
            config: Arc::new(config),
            broker,
        }
    }
}
