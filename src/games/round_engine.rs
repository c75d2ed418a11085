//! Crash-point generation
//!
//! `crash = max(1.00, round((1 - edge) / (1 - u), 2))` for a fresh uniform
//! draw `u` in [0, 1). No upper clamp.

use crate::errors::{FairnessError, GameError, GameResult};
use crate::games::randomness::{uniform_from_bytes, RandomSource};
use crate::games::types::{RoundOutcome, RoundRecord, RoundSeed};
use crate::games::vrf_engine::verify_vrf_bundle;
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

/// Fractional house edge, strictly inside (0, 1)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HouseEdge(f64);

impl HouseEdge {
    pub fn new(edge: f64) -> GameResult<Self> {
        if !(edge > 0.0 && edge < 1.0) {
            return Err(GameError::InvalidParameter(format!(
                "house edge must be in (0, 1), got {}",
                edge
            )));
        }
        Ok(Self(edge))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for HouseEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for HouseEdge {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.0)
    }
}

/// Round a multiplier to two decimal places
pub fn round_multiplier(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Pure fairness transform for a single draw
pub fn crash_point_from_draw(edge: HouseEdge, u: f64) -> GameResult<f64> {
    if !(0.0..1.0).contains(&u) {
        return Err(GameError::InvalidParameter(format!(
            "draw must be in [0, 1), got {}",
            u
        )));
    }
    let raw = (1.0 - edge.value()) / (1.0 - u);
    Ok(round_multiplier(raw).max(1.0))
}

/// Turns draws from an injected source into crash points
pub struct RoundEngine {
    edge: HouseEdge,
    source: Arc<dyn RandomSource>,
}

impl RoundEngine {
    /// Fails with `InvalidParameter` for an edge outside (0, 1)
    pub fn new(house_edge: f64, source: Arc<dyn RandomSource>) -> GameResult<Self> {
        Ok(Self {
            edge: HouseEdge::new(house_edge)?,
            source,
        })
    }

    pub fn house_edge(&self) -> HouseEdge {
        self.edge
    }

    pub fn source(&self) -> &dyn RandomSource {
        self.source.as_ref()
    }

    /// Consume one draw and derive the round's crash point
    pub fn generate_crash_point(&self, round_id: &str) -> GameResult<RoundOutcome> {
        let draw = self.source.draw(round_id)?;
        let crash_point = crash_point_from_draw(self.edge, draw.value)?;
        Ok(RoundOutcome {
            crash_point,
            seed: draw.seed,
        })
    }
}

impl fmt::Debug for RoundEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoundEngine")
            .field("edge", &self.edge)
            .field("source", &self.source.name())
            .finish()
    }
}

/// Recompute a resolved round's crash point from its seed. Returns the
/// recomputed value when it matches the record.
pub fn verify_round(record: &RoundRecord, edge: HouseEdge) -> Result<f64, FairnessError> {
    let u = match &record.seed {
        RoundSeed::Entropy { bytes } => {
            let raw = hex::decode(bytes).map_err(|e| FairnessError::MalformedSeed(e.to_string()))?;
            uniform_from_bytes(&raw)?
        }
        RoundSeed::Vrf(bundle) => {
            let output = verify_vrf_bundle(bundle, &record.round_id)?;
            uniform_from_bytes(&output)?
        }
        RoundSeed::Scripted { value } => *value,
    };

    let computed = crash_point_from_draw(edge, u)?;
    if computed != record.crash_point {
        return Err(FairnessError::CrashPointMismatch {
            recorded: record.crash_point,
            computed,
        });
    }
    Ok(computed)
}
