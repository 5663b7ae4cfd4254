use rusqlite::{params, Connection, OptionalExtension, Result};
use std::collections::BTreeSet;

use super::{from_micros, now_micros, to_micros};
use crate::models::{Direction, Trade, TradeInput};

const TRADE_COLUMNS: &str = "id, asset, entry_price, exit_price, position_size, entry_date, exit_date, \
     direction, strategy, tags, screenshot_path, notes, created_at, owner_id";

/// Helper function to map a database row to a Trade struct
fn map_row_to_trade(row: &rusqlite::Row) -> Result<Trade> {
    let direction: String = row.get(7)?;
    let tags: String = row.get(9)?;

    Ok(Trade {
        id: row.get(0)?,
        asset: row.get(1)?,
        entry_price: row.get(2)?,
        exit_price: row.get(3)?,
        position_size: row.get(4)?,
        entry_date: from_micros(row.get(5)?),
        exit_date: from_micros(row.get(6)?),
        direction: Direction::from_db(&direction),
        strategy: row.get(8)?,
        tags: serde_json::from_str(&tags).unwrap_or_default(),
        screenshot_path: row.get(10)?,
        notes: row.get(11)?,
        created_at: from_micros(row.get(12)?),
        owner_id: row.get(13)?,
    })
}

fn tags_json(input: &TradeInput) -> String {
    serde_json::to_string(&input.normalized_tags()).unwrap_or_else(|_| "[]".to_string())
}

/// One page of the owner's trades in insertion order.
/// A non-empty `tags` keeps trades carrying at least one of them.
pub fn list_trades(
    conn: &Connection,
    owner_id: i64,
    tags: &[String],
    skip: i64,
    limit: i64,
) -> Result<Vec<Trade>> {
    let mut query = format!("SELECT {} FROM trades WHERE owner_id = ?", TRADE_COLUMNS);
    let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(owner_id)];

    if !tags.is_empty() {
        let placeholders = vec!["?"; tags.len()].join(", ");
        query.push_str(&format!(
            " AND EXISTS (SELECT 1 FROM json_each(trades.tags) WHERE json_each.value IN ({}))",
            placeholders
        ));
        for tag in tags {
            params.push(Box::new(tag.clone()));
        }
    }

    query.push_str(" ORDER BY id ASC LIMIT ? OFFSET ?");
    params.push(Box::new(limit));
    params.push(Box::new(skip));

    let mut stmt = conn.prepare(&query)?;
    let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let trades = stmt
        .query_map(param_refs.as_slice(), map_row_to_trade)?
        .collect::<Result<Vec<_>>>()?;
    Ok(trades)
}

/// Every trade of the owner, ordered by exit date (ties by id)
pub fn list_all_trades(conn: &Connection, owner_id: i64) -> Result<Vec<Trade>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM trades WHERE owner_id = ? ORDER BY exit_date ASC, id ASC",
        TRADE_COLUMNS
    ))?;
    let trades = stmt
        .query_map([owner_id], map_row_to_trade)?
        .collect::<Result<Vec<_>>>()?;
    Ok(trades)
}

pub fn get_trade(conn: &Connection, owner_id: i64, id: i64) -> Result<Option<Trade>> {
    conn.query_row(
        &format!("SELECT {} FROM trades WHERE id = ? AND owner_id = ?", TRADE_COLUMNS),
        params![id, owner_id],
        map_row_to_trade,
    )
    .optional()
}

/// Insert inside a transaction; nothing is written if any step fails
pub fn insert_trade(
    conn: &Connection,
    owner_id: i64,
    trade: &TradeInput,
    import_fingerprint: Option<&str>,
) -> Result<Trade> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO trades (
            asset, entry_price, exit_price, position_size, entry_date, exit_date,
            direction, strategy, tags, screenshot_path, notes, created_at, owner_id,
            import_fingerprint
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            trade.asset,
            trade.entry_price,
            trade.exit_price,
            trade.position_size,
            to_micros(&trade.entry_date),
            to_micros(&trade.exit_date),
            trade.direction.as_str(),
            trade.strategy,
            tags_json(trade),
            trade.screenshot_path,
            trade.notes,
            now_micros(),
            owner_id,
            import_fingerprint,
        ],
    )?;
    let id = tx.last_insert_rowid();
    let created = tx.query_row(
        &format!("SELECT {} FROM trades WHERE id = ?", TRADE_COLUMNS),
        [id],
        map_row_to_trade,
    )?;
    tx.commit()?;
    Ok(created)
}

/// Replace every editable field. Returns None when the owner has no such trade.
pub fn update_trade(
    conn: &Connection,
    owner_id: i64,
    id: i64,
    trade: &TradeInput,
) -> Result<Option<Trade>> {
    let tx = conn.unchecked_transaction()?;
    let changed = tx.execute(
        "UPDATE trades SET
            asset = ?, entry_price = ?, exit_price = ?, position_size = ?,
            entry_date = ?, exit_date = ?, direction = ?, strategy = ?, tags = ?,
            screenshot_path = ?, notes = ?
         WHERE id = ? AND owner_id = ?",
        params![
            trade.asset,
            trade.entry_price,
            trade.exit_price,
            trade.position_size,
            to_micros(&trade.entry_date),
            to_micros(&trade.exit_date),
            trade.direction.as_str(),
            trade.strategy,
            tags_json(trade),
            trade.screenshot_path,
            trade.notes,
            id,
            owner_id,
        ],
    )?;
    tx.commit()?;

    if changed == 0 {
        return Ok(None);
    }
    get_trade(conn, owner_id, id)
}

pub fn delete_trade(conn: &Connection, owner_id: i64, id: i64) -> Result<bool> {
    let tx = conn.unchecked_transaction()?;
    let deleted = tx.execute(
        "DELETE FROM trades WHERE id = ? AND owner_id = ?",
        params![id, owner_id],
    )?;
    tx.commit()?;
    Ok(deleted > 0)
}

pub fn fingerprint_exists(conn: &Connection, owner_id: i64, fingerprint: &str) -> Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM trades WHERE owner_id = ? AND import_fingerprint = ?)",
        params![owner_id, fingerprint],
        |row| row.get(0),
    )
}

/// Sorted distinct tags used across the owner's trades
pub fn distinct_tags(conn: &Connection, owner_id: i64) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT tags FROM trades WHERE owner_id = ?")?;
    let rows = stmt.query_map([owner_id], |row| row.get::<_, String>(0))?;

    let mut tags = BTreeSet::new();
    for raw in rows {
        let parsed: Vec<String> = serde_json::from_str(&raw?).unwrap_or_default();
        tags.extend(parsed);
    }
    Ok(tags.into_iter().collect())
}
