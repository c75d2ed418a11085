//! Route Definitions
//!
//! Maps URLs to handlers.

use super::handlers::*;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Build the API router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))

        // Player context
        .route(
            "/api/session",
            post(create_session_handler)
                .get(session_snapshot_handler)
                .delete(end_session_handler),
        )
        .route("/api/balance", get(balance_handler))
        .route("/api/history", get(history_handler))
        .route("/api/fairness", get(fairness_handler))

        // Round transitions
        .route("/api/crash/start", post(start_round_handler))
        .route("/api/crash/cashout", post(cash_out_handler))
        .route("/api/crash/forfeit", post(forfeit_handler))

        .with_state(state)
}
