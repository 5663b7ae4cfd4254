use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::auth::AuthUser;
use crate::db::trades;
use crate::error::{AppError, Result};
use crate::models::{Trade, TradeFilters, TradeInput};
use crate::state::AppState;

const DEFAULT_LIMIT: i64 = 100;

fn trade_not_found() -> AppError {
    AppError::NotFound("Trade not found".to_string())
}

/// Writes run in a transaction; any failure is reported as a 400 after rollback
fn write_failed(err: rusqlite::Error) -> AppError {
    log::warn!("Trade write rolled back: {}", err);
    AppError::WriteFailed(err.to_string())
}

pub async fn create_trade(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(payload): Json<TradeInput>,
) -> Result<Json<Trade>> {
    let conn = state.db.conn.lock()?;
    let trade = trades::insert_trade(&conn, user.id, &payload, None).map_err(write_failed)?;
    log::debug!("User {} created trade {}", user.id, trade.id);
    Ok(Json(trade))
}

pub async fn list_trades(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(filters): Query<TradeFilters>,
) -> Result<Json<Vec<Trade>>> {
    let skip = filters.skip.unwrap_or(0).max(0);
    let limit = filters.limit.unwrap_or(DEFAULT_LIMIT).max(0);

    let conn = state.db.conn.lock()?;
    let trades = trades::list_trades(&conn, user.id, &filters.tag_list(), skip, limit)?;
    Ok(Json(trades))
}

pub async fn get_trade(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(trade_id): Path<i64>,
) -> Result<Json<Trade>> {
    let conn = state.db.conn.lock()?;
    trades::get_trade(&conn, user.id, trade_id)?
        .map(Json)
        .ok_or_else(trade_not_found)
}

pub async fn update_trade(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(trade_id): Path<i64>,
    Json(payload): Json<TradeInput>,
) -> Result<Json<Trade>> {
    let conn = state.db.conn.lock()?;
    trades::update_trade(&conn, user.id, trade_id, &payload)
        .map_err(write_failed)?
        .map(Json)
        .ok_or_else(trade_not_found)
}

pub async fn delete_trade(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(trade_id): Path<i64>,
) -> Result<Json<Value>> {
    let conn = state.db.conn.lock()?;
    if !trades::delete_trade(&conn, user.id, trade_id).map_err(write_failed)? {
        return Err(trade_not_found());
    }
    Ok(Json(json!({ "message": "Trade deleted successfully" })))
}

/// `GET /tags`: sorted distinct tags across the user's trades
pub async fn list_tags(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<String>>> {
    let conn = state.db.conn.lock()?;
    Ok(Json(trades::distinct_tags(&conn, user.id)?))
}

#[derive(Serialize)]
struct TradeCsvRow<'a> {
    id: i64,
    asset: &'a str,
    direction: &'static str,
    entry_price: f64,
    exit_price: f64,
    position_size: f64,
    entry_date: String,
    exit_date: String,
    pnl: f64,
    strategy: &'a str,
    tags: String,
    notes: &'a str,
    screenshot_path: &'a str,
}

impl<'a> From<&'a Trade> for TradeCsvRow<'a> {
    fn from(trade: &'a Trade) -> Self {
        Self {
            id: trade.id,
            asset: &trade.asset,
            direction: trade.direction.as_str(),
            entry_price: trade.entry_price,
            exit_price: trade.exit_price,
            position_size: trade.position_size,
            entry_date: trade.entry_date.format("%Y-%m-%dT%H:%M:%S").to_string(),
            exit_date: trade.exit_date.format("%Y-%m-%dT%H:%M:%S").to_string(),
            pnl: trade.pnl(),
            strategy: trade.strategy.as_deref().unwrap_or(""),
            tags: trade.tags.join(";"),
            notes: trade.notes.as_deref().unwrap_or(""),
            screenshot_path: trade.screenshot_path.as_deref().unwrap_or(""),
        }
    }
}

/// `GET /trades/export`: every trade as CSV, ordered by exit date
pub async fn export_trades(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<impl IntoResponse> {
    let trades = {
        let conn = state.db.conn.lock()?;
        trades::list_all_trades(&conn, user.id)?
    };

    let body = trades_to_csv(&trades)?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"trades.csv\""),
        ],
        body,
    ))
}

fn trades_to_csv(trades: &[Trade]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for trade in trades {
        writer
            .serialize(TradeCsvRow::from(trade))
            .map_err(|e| AppError::Internal(format!("Failed to write CSV row: {}", e)))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("Failed to flush CSV: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| AppError::Internal(e.to_string()))
}
