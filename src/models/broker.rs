use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Access token obtained from the brokerage session exchange
#[derive(Debug, Clone)]
pub struct BrokerSession {
    pub user_id: i64,
    pub access_token: String,
    pub broker_user_id: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerProfile {
    pub user_id: String,
    pub user_name: String,
    pub email: Option<String>,
    pub broker: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionRequest {
    pub request_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub connected: bool,
    pub profile: Option<BrokerProfile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginUrlResponse {
    pub login_url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImportParams {
    pub days: Option<i64>,
}

/// Outcome of a brokerage import
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportResult {
    pub imported: usize,
    pub duplicates: usize,
    pub errors: Vec<String>,
    pub message: String,
}

impl ImportResult {
    pub fn no_trades() -> Self {
        Self {
            imported: 0,
            duplicates: 0,
            errors: Vec::new(),
            message: "No trades found".to_string(),
        }
    }
}
