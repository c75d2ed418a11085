//! Request Handlers
//!
//! Every game action locks exactly one session for its duration.

use super::{
    errors::ApiError,
    middleware::{RequestId, SESSION_ID_HEADER},
    models::*,
};
use crate::{
    errors::GameError,
    games::{session::SessionSnapshot, types::Amount},
    metrics::GameMetrics,
    session_store::{lock_session, SessionStore, SharedSession},
};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap},
    response::IntoResponse,
    Extension, Json,
};
use std::sync::Arc;
use tracing::debug;

pub const CRASH_FORMULA: &str = "max(1, round((1 - house_edge) / (1 - u), 2))";

/// Shared application state
pub struct AppState {
    pub sessions: SessionStore,
    pub metrics: Arc<GameMetrics>,
    pub version: String,
}

impl AppState {
    pub fn new(sessions: SessionStore) -> Self {
        Self {
            metrics: sessions.metrics().clone(),
            sessions,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Find the caller's session. Only read paths and settlement use this,
    /// so a request without an id never allocates one.
    fn existing_session(
        &self,
        headers: &HeaderMap,
        request_id: &RequestId,
    ) -> Result<(String, SharedSession), ApiError> {
        let id = session_header(headers)
            .ok_or_else(|| ApiError::session_required(request_id.0.clone()))?;
        self.sessions
            .get(id)
            .map(|session| (id.to_string(), session))
            .ok_or_else(|| ApiError::session_not_found(request_id.0.clone(), id))
    }

    /// Starting a round without an id opens a fresh session for it
    fn session_or_open(
        &self,
        headers: &HeaderMap,
        request_id: &RequestId,
    ) -> Result<(String, SharedSession), ApiError> {
        if session_header(headers).is_some() {
            self.existing_session(headers, request_id)
        } else {
            Ok(self.sessions.create())
        }
    }

    fn rejected(&self, request_id: &RequestId, error: &GameError) -> ApiError {
        self.metrics.record_rejection();
        debug!(request_id = %request_id.0, code = error.code(), "Game action rejected");
        ApiError::from_game(request_id.0.clone(), error)
    }
}

/// Response carrying the session id header
pub type SessionReply<T> = ([(&'static str, String); 1], Json<T>);

fn reply<T>(session_id: String, body: T) -> SessionReply<T> {
    ([(SESSION_ID_HEADER, session_id)], Json(body))
}

/// Unwrap a JSON body, turning extractor rejections into the API error shape
fn json_body<T>(
    request_id: &RequestId,
    payload: Result<Json<T>, JsonRejection>,
) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| ApiError::bad_request(request_id.0.clone(), e.body_text()))
}

fn session_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(SESSION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

/// GET /health
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "Running".to_string(),
        version: state.version.clone(),
    })
}

/// GET /metrics
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        state.metrics.to_prometheus_format(),
    )
}

/// POST /api/session
pub async fn create_session_handler(
    State(state): State<Arc<AppState>>,
) -> SessionReply<SessionResponse> {
    let (session_id, session) = state.sessions.create();
    let balance = lock_session(&session, |s| s.balance());
    reply(
        session_id.clone(),
        SessionResponse {
            session_id,
            balance,
        },
    )
}

/// GET /api/session
pub async fn session_snapshot_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<SessionReply<SessionSnapshot>, ApiError> {
    let (session_id, session) = state.existing_session(&headers, &request_id)?;
    let snapshot = lock_session(&session, |s| s.snapshot());
    Ok(reply(session_id, snapshot))
}

/// DELETE /api/session
pub async fn end_session_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<SessionResponse>, ApiError> {
    let session_id = session_header(&headers)
        .ok_or_else(|| ApiError::session_required(request_id.0.clone()))?;

    let session = state
        .sessions
        .remove(session_id)
        .ok_or_else(|| ApiError::session_not_found(request_id.0.clone(), session_id))?;

    let balance = lock_session(&session, |s| s.balance());
    Ok(Json(SessionResponse {
        session_id: session_id.to_string(),
        balance,
    }))
}

/// POST /api/crash/start
pub async fn start_round_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<StartRoundRequest>, JsonRejection>,
) -> Result<SessionReply<StartRoundResponse>, ApiError> {
    let request = json_body(&request_id, payload)?;
    let (session_id, session) = state.session_or_open(&headers, &request_id)?;

    // Unrepresentable wagers become a zero bet, which the session rejects
    let bet = Amount::from_decimal(request.bet).unwrap_or(Amount::ZERO);

    let started = lock_session(&session, |s| {
        let balance = s.start_round(bet)?;
        Ok::<_, GameError>(StartRoundResponse {
            round_id: s.active_round_id().unwrap_or_default().to_string(),
            balance,
            status: s.status(),
        })
    });

    match started {
        Ok(body) => {
            state.metrics.record_round_started(bet);
            Ok(reply(session_id, body))
        }
        Err(e) => Err(state.rejected(&request_id, &e)),
    }
}

/// POST /api/crash/cashout
pub async fn cash_out_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<CashOutRequest>, JsonRejection>,
) -> Result<SessionReply<CashOutResponse>, ApiError> {
    let request = json_body(&request_id, payload)?;
    let (session_id, session) = state.existing_session(&headers, &request_id)?;

    let cash = lock_session(&session, |s| s.cash_out(request.multiplier))
        .map_err(|e| state.rejected(&request_id, &e))?;
    state.metrics.record_cash_out(&cash);

    Ok(reply(
        session_id,
        CashOutResponse {
            winnings: cash.winnings,
            balance: cash.balance,
            multiplier: cash.multiplier,
        },
    ))
}

/// POST /api/crash/forfeit
pub async fn forfeit_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<SessionReply<ForfeitResponse>, ApiError> {
    let (session_id, session) = state.existing_session(&headers, &request_id)?;

    let body = lock_session(&session, |s| {
        let balance = s.forfeit()?;
        Ok::<_, GameError>(ForfeitResponse {
            balance,
            round: s.last_round().cloned(),
        })
    })
    .map_err(|e| state.rejected(&request_id, &e))?;
    state.metrics.record_forfeit();

    Ok(reply(session_id, body))
}

/// GET /api/balance
pub async fn balance_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<SessionReply<BalanceResponse>, ApiError> {
    let (session_id, session) = state.existing_session(&headers, &request_id)?;
    let body = lock_session(&session, |s| BalanceResponse {
        balance: s.balance(),
        status: s.status(),
    });
    Ok(reply(session_id, body))
}

/// GET /api/history
pub async fn history_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<SessionReply<HistoryResponse>, ApiError> {
    let (session_id, session) = state.existing_session(&headers, &request_id)?;
    let rounds = lock_session(&session, |s| s.history().cloned().collect());
    Ok(reply(session_id, HistoryResponse { rounds }))
}

/// GET /api/fairness
pub async fn fairness_handler(State(state): State<Arc<AppState>>) -> Json<FairnessResponse> {
    let engine = state.sessions.engine();
    Json(FairnessResponse {
        house_edge: engine.house_edge().value(),
        source: engine.source().name().to_string(),
        public_key: engine.source().public_key_hex(),
        formula: CRASH_FORMULA.to_string(),
    })
}
