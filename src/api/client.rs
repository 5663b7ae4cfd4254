use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::error::ApiError;
use crate::models::BrokerProfile;

/// Result of exchanging a login request token for an access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionGrant {
    pub access_token: String,
    /// Broker-side account id, when the broker reports one
    pub user_id: Option<String>,
}

/// Order record from a broker API, normalized but not yet a journal trade
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawOrder {
    pub order_id: String,
    pub symbol: String,
    /// "BUY" or "SELL"
    pub side: String,
    pub status: String,
    pub quantity: f64,
    pub average_price: f64,
    /// None when the broker has not stamped the order yet
    pub timestamp: Option<NaiveDateTime>,
    /// Stable per-order key used to skip re-imports
    pub fingerprint: String,
}

impl RawOrder {
    pub fn is_complete(&self) -> bool {
        self.status.eq_ignore_ascii_case("COMPLETE")
    }
}

/// Core trait that every brokerage integration implements
#[async_trait]
pub trait BrokerClient: Send + Sync {
    /// Broker name (e.g., "kite")
    fn broker_name(&self) -> &str;

    /// URL the user visits to authorize the app and obtain a request token
    fn login_url(&self) -> String;

    async fn generate_session(&self, request_token: &str) -> Result<SessionGrant, ApiError>;

    /// Order book of the account behind `access_token`
    async fn fetch_orders(&self, access_token: &str) -> Result<Vec<RawOrder>, ApiError>;

    async fn profile(&self, access_token: &str) -> Result<BrokerProfile, ApiError>;
}
