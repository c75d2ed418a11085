//! Per-player game session and its round state machine
//!
//! `Idle --start_round--> Active --cash_out | forfeit--> Idle`
//!
//! A rejected call never touches the balance or the state. A cash-out at or
//! past the crash point leaves the round open; the caller's timing loop is
//! expected to follow up with `forfeit`.

use crate::errors::{GameError, GameResult};
use crate::games::round_engine::RoundEngine;
use crate::games::types::{
    Amount, CashOut, RoundRecord, RoundResolution, RoundSeed, RoundStatus,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Resolved rounds kept per session unless configured otherwise
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Open round. The crash point lives here and nowhere a caller can reach it.
#[derive(Debug, Clone)]
struct ActiveRound {
    round_id: String,
    bet: Amount,
    crash_point: f64,
    seed: RoundSeed,
    started_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
enum RoundState {
    Idle,
    Active(ActiveRound),
}

/// Running totals used to check money conservation
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct SessionStats {
    pub initial_balance: Amount,
    pub rounds_played: u64,
    pub rounds_cashed_out: u64,
    pub total_wagered: Amount,
    pub total_paid_out: Amount,
}

/// Caller-safe view of a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub balance: Amount,
    pub status: RoundStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_bet: Option<Amount>,
    pub stats: SessionStats,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct GameSession {
    id: String,
    engine: Arc<RoundEngine>,
    balance: Amount,
    state: RoundState,
    stats: SessionStats,
    history: VecDeque<RoundRecord>,
    history_limit: usize,
    created_at: DateTime<Utc>,
}

impl GameSession {
    pub fn new(id: impl Into<String>, starting_balance: Amount, engine: Arc<RoundEngine>) -> Self {
        Self {
            id: id.into(),
            engine,
            balance: starting_balance,
            state: RoundState::Idle,
            stats: SessionStats {
                initial_balance: starting_balance,
                ..SessionStats::default()
            },
            history: VecDeque::new(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            created_at: Utc::now(),
        }
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit.max(1);
        self
    }

    /// Open a round: debit the bet and draw a hidden crash point.
    /// Returns the balance after the debit.
    pub fn start_round(&mut self, bet: Amount) -> GameResult<Amount> {
        if let RoundState::Active(_) = self.state {
            return Err(GameError::RoundInProgress);
        }
        if bet.is_zero() || bet > self.balance {
            return Err(GameError::InvalidBet {
                bet,
                balance: self.balance,
            });
        }
        let remaining = self.balance.checked_sub(bet).ok_or(GameError::InvalidBet {
            bet,
            balance: self.balance,
        })?;
        let total_wagered = self
            .stats
            .total_wagered
            .checked_add(bet)
            .ok_or(GameError::AmountOverflow { bet, multiplier: 1.0 })?;

        // Draw before mutating anything so a source failure debits nothing.
        let round_id = Uuid::new_v4().to_string();
        let outcome = self.engine.generate_crash_point(&round_id)?;

        self.balance = remaining;
        self.stats.total_wagered = total_wagered;
        self.stats.rounds_played += 1;
        self.state = RoundState::Active(ActiveRound {
            round_id: round_id.clone(),
            bet,
            crash_point: outcome.crash_point,
            seed: outcome.seed,
            started_at: Utc::now(),
        });

        info!(
            session_id = %self.id,
            round_id = %round_id,
            bet = %bet,
            balance = %self.balance,
            "Round started"
        );
        Ok(self.balance)
    }

    /// Exit the open round at `multiplier` and credit `round(bet * multiplier, 2)`.
    /// Any multiplier below the crash point is a valid exit, including values
    /// under 1.0. Negative and non-finite values would break the non-negative
    /// balance and are rejected with the busts.
    pub fn cash_out(&mut self, multiplier: f64) -> GameResult<CashOut> {
        let RoundState::Active(round) = &self.state else {
            return Err(GameError::NoActiveRound);
        };

        if !multiplier.is_finite() || multiplier < 0.0 || multiplier >= round.crash_point {
            debug!(
                session_id = %self.id,
                round_id = %round.round_id,
                multiplier,
                "Cash-out rejected"
            );
            return Err(GameError::BustedOrInvalid { multiplier });
        }

        let overflow = GameError::AmountOverflow {
            bet: round.bet,
            multiplier,
        };
        let winnings = round.bet.scaled(multiplier).ok_or_else(|| overflow.clone())?;
        let balance = self.balance.checked_add(winnings).ok_or_else(|| overflow.clone())?;
        let total_paid_out = self
            .stats
            .total_paid_out
            .checked_add(winnings)
            .ok_or(overflow)?;

        self.balance = balance;
        self.stats.total_paid_out = total_paid_out;
        self.stats.rounds_cashed_out += 1;
        self.resolve(RoundResolution::CashedOut {
            multiplier,
            winnings,
        });

        Ok(CashOut {
            winnings,
            balance: self.balance,
            multiplier,
        })
    }

    /// Close the open round as a loss. The bet was already debited.
    pub fn forfeit(&mut self) -> GameResult<Amount> {
        if let RoundState::Idle = self.state {
            return Err(GameError::NoActiveRound);
        }
        self.resolve(RoundResolution::Forfeited);
        Ok(self.balance)
    }

    /// Move an active round into history and return to Idle
    fn resolve(&mut self, resolution: RoundResolution) {
        let RoundState::Active(round) = std::mem::replace(&mut self.state, RoundState::Idle) else {
            return;
        };

        info!(
            session_id = %self.id,
            round_id = %round.round_id,
            bet = %round.bet,
            crash_point = round.crash_point,
            payout = %resolution.payout(),
            balance = %self.balance,
            "Round resolved"
        );

        self.history.push_back(RoundRecord {
            round_id: round.round_id,
            bet: round.bet,
            crash_point: round.crash_point,
            resolution,
            seed: round.seed,
            started_at: round.started_at,
            resolved_at: Utc::now(),
        });
        while self.history.len() > self.history_limit {
            self.history.pop_front();
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn balance(&self) -> Amount {
        self.balance
    }

    pub fn status(&self) -> RoundStatus {
        match self.state {
            RoundState::Idle => RoundStatus::Idle,
            RoundState::Active(_) => RoundStatus::Active,
        }
    }

    pub fn current_bet(&self) -> Option<Amount> {
        match &self.state {
            RoundState::Idle => None,
            RoundState::Active(round) => Some(round.bet),
        }
    }

    pub fn active_round_id(&self) -> Option<&str> {
        match &self.state {
            RoundState::Idle => None,
            RoundState::Active(round) => Some(&round.round_id),
        }
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Resolved rounds, oldest first
    pub fn history(&self) -> impl Iterator<Item = &RoundRecord> {
        self.history.iter()
    }

    pub fn last_round(&self) -> Option<&RoundRecord> {
        self.history.back()
    }

    /// `balance + in_play == initial + paid_out - wagered + in_play`
    pub fn conservation_holds(&self) -> bool {
        let in_play = self.current_bet().unwrap_or(Amount::ZERO).minor() as i128;
        let lhs = self.balance.minor() as i128 + in_play;
        let rhs = self.stats.initial_balance.minor() as i128
            + self.stats.total_paid_out.minor() as i128
            - self.stats.total_wagered.minor() as i128
            + in_play;
        lhs == rhs
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id.clone(),
            balance: self.balance,
            status: self.status(),
            round_id: self.active_round_id().map(str::to_string),
            current_bet: self.current_bet(),
            stats: self.stats,
            created_at: self.created_at,
        }
    }
}
