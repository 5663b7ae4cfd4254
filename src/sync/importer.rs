use chrono::NaiveDateTime;
use rusqlite::Connection;

use crate::api::client::RawOrder;
use crate::db::trades;
use crate::models::{Direction, ImportResult, TradeInput};

pub const IMPORT_STRATEGY: &str = "Zerodha Import";

/// Journal entry for a filled order. A single fill has no separate exit, so
/// entry and exit share the average price and the order timestamp.
///
/// Returns None for orders that are not complete or carry no timestamp.
pub fn order_to_trade_input(order: &RawOrder) -> Option<TradeInput> {
    if !order.is_complete() {
        return None;
    }
    let stamped = order.timestamp?;

    let direction = if order.side == "BUY" {
        Direction::Long
    } else {
        Direction::Short
    };

    Some(TradeInput {
        asset: order.symbol.clone(),
        entry_price: order.average_price,
        exit_price: order.average_price,
        position_size: order.quantity,
        entry_date: stamped,
        exit_date: stamped,
        direction,
        strategy: Some(IMPORT_STRATEGY.to_string()),
        tags: None,
        screenshot_path: None,
        notes: Some(format!("Order ID: {}", order.order_id)),
    })
}

/// Insert every complete order stamped at or after `since` for `owner_id`.
///
/// Orders already imported (same fingerprint) are counted as duplicates.
/// A failed insert is recorded in `errors` and does not stop the batch.
pub fn import_orders(
    conn: &Connection,
    owner_id: i64,
    orders: &[RawOrder],
    since: NaiveDateTime,
) -> rusqlite::Result<ImportResult> {
    let mut imported = 0;
    let mut duplicates = 0;
    let mut errors = Vec::new();

    for order in orders {
        let Some(input) = order_to_trade_input(order) else {
            continue;
        };
        if input.exit_date < since {
            continue;
        }

        if trades::fingerprint_exists(conn, owner_id, &order.fingerprint)? {
            duplicates += 1;
            continue;
        }

        match trades::insert_trade(conn, owner_id, &input, Some(&order.fingerprint)) {
            Ok(_) => imported += 1,
            Err(e) => {
                log::warn!("Failed to import order {}: {}", order.order_id, e);
                errors.push(format!("Failed to import {}: {}", order.order_id, e));
            }
        }
    }

    if imported == 0 && duplicates == 0 && errors.is_empty() {
        return Ok(ImportResult::no_trades());
    }

    log::info!(
        "Imported {} trades for user {} ({} duplicates, {} errors)",
        imported,
        owner_id,
        duplicates,
        errors.len()
    );

    Ok(ImportResult {
        imported,
        duplicates,
        message: format!("Imported {} trades ({} duplicates skipped)", imported, duplicates),
        errors,
    })
}
