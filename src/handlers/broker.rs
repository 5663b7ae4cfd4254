use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{NaiveDateTime, TimeDelta, Utc};
use std::sync::Arc;

use crate::api::client::BrokerClient;
use crate::auth::AuthUser;
use crate::config::MAX_IMPORT_DAYS;
use crate::db::broker_sessions;
use crate::error::{AppError, Result};
use crate::models::{
    BrokerProfile, ImportParams, ImportResult, LoginUrlResponse, SessionRequest, SessionResponse,
};
use crate::state::AppState;
use crate::sync::import_orders;

fn broker(state: &AppState) -> Result<&Arc<dyn BrokerClient>> {
    state.broker.as_ref().ok_or(AppError::BrokerUnavailable)
}

fn stored_access_token(state: &AppState, user_id: i64) -> Result<Option<String>> {
    let conn = state.db.conn.lock()?;
    Ok(broker_sessions::get_session(&conn, user_id)?.map(|s| s.access_token))
}

/// Start of the import window, `days` before now. Negative values mean today.
fn import_window_start(days: i64) -> Result<NaiveDateTime> {
    let days = days.max(0);
    if days > MAX_IMPORT_DAYS {
        return Err(AppError::Validation(format!(
            "days must be at most {}",
            MAX_IMPORT_DAYS
        )));
    }
    TimeDelta::try_days(days)
        .and_then(|window| Utc::now().checked_sub_signed(window))
        .map(|since| since.naive_utc())
        .ok_or_else(|| AppError::Validation("days is out of range".to_string()))
}

pub async fn login_url(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
) -> Result<Json<LoginUrlResponse>> {
    let broker = broker(&state)?;
    Ok(Json(LoginUrlResponse {
        login_url: broker.login_url(),
    }))
}

/// Exchange a request token for an access token. Broker failures report
/// `connected: false` instead of an error status.
pub async fn create_session(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(payload): Json<SessionRequest>,
) -> Result<Json<SessionResponse>> {
    let broker = broker(&state)?.clone();

    let grant = match broker.generate_session(payload.request_token.trim()).await {
        Ok(grant) => grant,
        Err(e) => {
            log::warn!("{} session exchange failed for user {}: {}", broker.broker_name(), user.id, e);
            return Ok(Json(SessionResponse {
                connected: false,
                profile: None,
            }));
        }
    };

    {
        let conn = state.db.conn.lock()?;
        broker_sessions::save_session(&conn, user.id, &grant.access_token, grant.user_id.as_deref())?;
    }

    let profile = match broker.profile(&grant.access_token).await {
        Ok(profile) => Some(profile),
        Err(e) => {
            log::warn!("Failed to fetch {} profile: {}", broker.broker_name(), e);
            None
        }
    };

    Ok(Json(SessionResponse {
        connected: true,
        profile,
    }))
}

/// Profile of the connected account, or null when not connected or the broker errors
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Option<BrokerProfile>>> {
    let broker = broker(&state)?.clone();
    let Some(access_token) = stored_access_token(&state, user.id)? else {
        return Ok(Json(None));
    };

    match broker.profile(&access_token).await {
        Ok(profile) => Ok(Json(Some(profile))),
        Err(e) => {
            log::warn!("Failed to fetch {} profile: {}", broker.broker_name(), e);
            Ok(Json(None))
        }
    }
}

/// Pull completed orders from the last `days` days into the journal
pub async fn import_trades(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(params): Query<ImportParams>,
) -> Result<Json<ImportResult>> {
    let broker = broker(&state)?.clone();
    let since = import_window_start(params.days.unwrap_or(state.config.broker_import_days))?;

    let Some(access_token) = stored_access_token(&state, user.id)? else {
        log::info!("User {} has no broker session; nothing to import", user.id);
        return Ok(Json(ImportResult::no_trades()));
    };

    let orders = match broker.fetch_orders(&access_token).await {
        Ok(orders) => orders,
        Err(e) => {
            log::warn!("Failed to fetch {} orders: {}", broker.broker_name(), e);
            return Ok(Json(ImportResult::no_trades()));
        }
    };

    let conn = state.db.conn.lock()?;
    let result = import_orders(&conn, user.id, &orders, since)?;
    Ok(Json(result))
}
