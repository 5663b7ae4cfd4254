use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::analytics::{
    calculate_metrics, equity_curve, generate_insights, hour_stats, monthly_metrics, rr_scatter,
    strategy_stats, tag_stats, weekday_stats, EquityCurvePoint, HourStats, Insight, Metrics,
    MonthlyMetrics, RrPoint, StrategyStats, TagStats, WeekdayStats,
};
use crate::auth::AuthUser;
use crate::db::trades;
use crate::error::Result;
use crate::models::{parse_tag_list, Trade};
use crate::state::AppState;

/// Optional `?tags=a,b` narrowing every stats view to trades carrying any of the tags
#[derive(Debug, Default, Deserialize)]
pub struct StatsQuery {
    pub tags: Option<String>,
}

impl StatsQuery {
    pub fn tag_list(&self) -> Vec<String> {
        parse_tag_list(self.tags.as_deref())
    }
}

/// Snapshot of the user's trades, taken under the lock and released before any analytics run
fn load_trades(state: &AppState, owner_id: i64, query: &StatsQuery) -> Result<Vec<Trade>> {
    let all = {
        let conn = state.db.conn.lock()?;
        trades::list_all_trades(&conn, owner_id)?
    };

    let wanted = query.tag_list();
    if wanted.is_empty() {
        return Ok(all);
    }

    Ok(all
        .into_iter()
        .filter(|t| wanted.iter().any(|tag| t.has_tag(tag)))
        .collect())
}

pub async fn get_stats(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(query): Query<StatsQuery>,
) -> Result<Json<Metrics>> {
    let trades = load_trades(&state, user.id, &query)?;
    Ok(Json(calculate_metrics(&trades)))
}

pub async fn get_monthly_stats(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(query): Query<StatsQuery>,
) -> Result<Json<Vec<MonthlyMetrics>>> {
    let trades = load_trades(&state, user.id, &query)?;
    Ok(Json(monthly_metrics(&trades)))
}

pub async fn get_tag_stats(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(query): Query<StatsQuery>,
) -> Result<Json<Vec<TagStats>>> {
    let trades = load_trades(&state, user.id, &query)?;
    Ok(Json(tag_stats(&trades)))
}

pub async fn get_strategy_stats(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(query): Query<StatsQuery>,
) -> Result<Json<Vec<StrategyStats>>> {
    let trades = load_trades(&state, user.id, &query)?;
    Ok(Json(strategy_stats(&trades)))
}

pub async fn get_weekday_stats(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(query): Query<StatsQuery>,
) -> Result<Json<Vec<WeekdayStats>>> {
    let trades = load_trades(&state, user.id, &query)?;
    Ok(Json(weekday_stats(&trades)))
}

pub async fn get_hour_stats(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(query): Query<StatsQuery>,
) -> Result<Json<Vec<HourStats>>> {
    let trades = load_trades(&state, user.id, &query)?;
    Ok(Json(hour_stats(&trades)))
}

pub async fn get_equity_curve(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(query): Query<StatsQuery>,
) -> Result<Json<Vec<EquityCurvePoint>>> {
    let trades = load_trades(&state, user.id, &query)?;
    Ok(Json(equity_curve(&trades)))
}

pub async fn get_rr_scatter(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(query): Query<StatsQuery>,
) -> Result<Json<Vec<RrPoint>>> {
    let trades = load_trades(&state, user.id, &query)?;
    Ok(Json(rr_scatter(&trades)))
}

pub async fn get_insights(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(query): Query<StatsQuery>,
) -> Result<Json<Vec<Insight>>> {
    let trades = load_trades(&state, user.id, &query)?;
    Ok(Json(generate_insights(&trades)))
}
