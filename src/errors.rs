//! Error types for the Ascent crash-game engine
//!
//! Every rejection is local to a single call: a failed transition leaves the
//! session exactly as it was.

use crate::games::types::Amount;

/// Root error type for all Ascent operations
#[derive(Debug, thiserror::Error)]
pub enum AscentError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Game error: {0}")]
    Game(#[from] GameError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration and validation errors, raised at startup only
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),
}

/// Rejections produced by the round engine and the session state machine
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GameError {
    /// Bad house-edge configuration or a draw outside [0, 1)
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid bet {bet}: must be positive and at most the balance {balance}")]
    InvalidBet { bet: Amount, balance: Amount },

    #[error("A round is already in progress")]
    RoundInProgress,

    #[error("No active round")]
    NoActiveRound,

    /// Never carries the crash point, the round may still be live
    #[error("Cash-out at {multiplier}x is not a valid exit point")]
    BustedOrInvalid { multiplier: f64 },

    #[error("Amount overflow while settling {bet} at {multiplier}x")]
    AmountOverflow { bet: Amount, multiplier: f64 },

    #[error("Randomness source unavailable: {0}")]
    EntropyUnavailable(String),
}

impl GameError {
    /// Stable machine-readable code used in API error bodies
    pub fn code(&self) -> &'static str {
        match self {
            GameError::InvalidParameter(_) => "INVALID_PARAMETER",
            GameError::InvalidBet { .. } => "INVALID_BET",
            GameError::RoundInProgress => "ROUND_IN_PROGRESS",
            GameError::NoActiveRound => "NO_ACTIVE_ROUND",
            GameError::BustedOrInvalid { .. } => "BUSTED_OR_INVALID",
            GameError::AmountOverflow { .. } => "AMOUNT_OVERFLOW",
            GameError::EntropyUnavailable(_) => "ENTROPY_UNAVAILABLE",
        }
    }

    /// Whether the caller can simply carry on with the session
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            GameError::InvalidParameter(_) | GameError::EntropyUnavailable(_)
        )
    }
}

/// Errors raised while auditing a resolved round
#[derive(Debug, thiserror::Error)]
pub enum FairnessError {
    #[error("Invalid VRF proof: {0}")]
    InvalidProof(String),

    #[error("VRF input '{actual}' does not match round (expected '{expected}')")]
    InputMismatch { expected: String, actual: String },

    #[error("Recorded crash point {recorded}x does not match recomputed {computed}x")]
    CrashPointMismatch { recorded: f64, computed: f64 },

    #[error("Malformed round seed: {0}")]
    MalformedSeed(String),

    #[error(transparent)]
    Engine(#[from] GameError),
}

pub type AscentResult<T> = Result<T, AscentError>;
pub type GameResult<T> = Result<T, GameError>;
