use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::handlers::{self, auth, broker, stats, trades};
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/register", post(auth::register))
        .route("/token", post(auth::login))
        .route("/trades", post(trades::create_trade).get(trades::list_trades))
        .route("/trades/export", get(trades::export_trades))
        .route(
            "/trades/:trade_id",
            get(trades::get_trade)
                .put(trades::update_trade)
                .delete(trades::delete_trade),
        )
        .route("/tags", get(trades::list_tags))
        .route("/stats", get(stats::get_stats))
        .route("/stats/monthly", get(stats::get_monthly_stats))
        .route("/stats/tags", get(stats::get_tag_stats))
        .route("/stats/strategies", get(stats::get_strategy_stats))
        .route("/stats/weekdays", get(stats::get_weekday_stats))
        .route("/stats/hours", get(stats::get_hour_stats))
        .route("/stats/equity-curve", get(stats::get_equity_curve))
        .route("/stats/rr-scatter", get(stats::get_rr_scatter))
        .route("/stats/insights", get(stats::get_insights))
        .route("/broker/login-url", get(broker::login_url))
        .route("/broker/session", post(broker::create_session))
        .route("/broker/profile", get(broker::get_profile))
        .route("/broker/import", post(broker::import_trades))
        .layer(cors)
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(state: AppState, addr: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("Tradeverse API listening on {}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
    }
}
