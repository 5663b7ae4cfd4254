pub mod auth;
pub mod broker;
pub mod stats;
pub mod trades;

use axum::Json;
use serde_json::{json, Value};

pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
