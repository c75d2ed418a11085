//! Ascent - single-player crash game settlement
//!
//! A round draws a hidden crash point from a uniform random value and a
//! house edge. The player either cashes out below that point and is paid
//! `bet * multiplier`, or forfeits the bet. [`games::GameSession`] owns the
//! balance and the Idle/Active state machine, [`games::RoundEngine`] owns
//! the draw, and [`api`] exposes sessions over HTTP.

pub mod api;
pub mod config;
pub mod errors;
pub mod games;
pub mod metrics;
pub mod session_store;

pub use config::{AscentConfig, ConfigLoader};
pub use errors::{AscentError, AscentResult, FairnessError, GameError, GameResult};
pub use games::{Amount, GameSession, HouseEdge, RoundEngine, RoundRecord, RoundStatus};
pub use session_store::SessionStore;
