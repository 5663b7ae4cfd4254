use serde::{Deserialize, Serialize};

/// Kite Connect response envelope.
///
/// Success: `{"status": "success", "data": ...}`.
/// Failure: `{"status": "error", "message": ..., "error_type": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KiteResponse<T> {
    pub status: String,
    pub data: Option<T>,
    pub message: Option<String>,
    pub error_type: Option<String>,
}

/// `data` of `POST /session/token`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KiteSession {
    pub user_id: String,
    pub access_token: String,
    pub user_name: Option<String>,
    pub email: Option<String>,
}

/// One entry of `GET /orders`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KiteOrder {
    pub order_id: String,

    /// "COMPLETE", "OPEN", "CANCELLED", "REJECTED", ...
    pub status: String,

    /// Exchange symbol (e.g., "INFY", "NIFTY24JANFUT")
    pub tradingsymbol: String,

    pub exchange: Option<String>,

    /// "BUY" or "SELL"
    pub transaction_type: String,

    #[serde(default)]
    pub quantity: f64,

    #[serde(default)]
    pub average_price: f64,

    /// Exchange-local time, `YYYY-MM-DD HH:MM:SS`
    pub order_timestamp: Option<String>,
}

/// `data` of `GET /user/profile`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KiteProfile {
    pub user_id: String,
    pub user_name: String,
    pub email: Option<String>,
    pub broker: Option<String>,
}
