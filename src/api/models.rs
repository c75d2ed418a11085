//! API Request and Response Models

use crate::games::types::{Amount, RoundRecord, RoundStatus};
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub session_id: String,
    pub balance: Amount,
}

/// POST /api/crash/start
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartRoundRequest {
    /// Decimal wager; anything that does not round to a positive amount is rejected
    pub bet: f64,
}

/// Never carries the crash point
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartRoundResponse {
    pub round_id: String,
    pub balance: Amount,
    pub status: RoundStatus,
}

/// POST /api/crash/cashout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashOutRequest {
    pub multiplier: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashOutResponse {
    pub winnings: Amount,
    pub balance: Amount,
    pub multiplier: f64,
}

/// Forfeit reveals the resolved round
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForfeitResponse {
    pub balance: Amount,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round: Option<RoundRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub balance: Amount,
    pub status: RoundStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub rounds: Vec<RoundRecord>,
}

/// Parameters players need to audit rounds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FairnessResponse {
    pub house_edge: f64,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    pub formula: String,
}
