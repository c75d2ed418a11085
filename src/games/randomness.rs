//! Per-round randomness sources
//!
//! A source hands the round engine one uniform draw in [0, 1) per round,
//! together with the seed material needed to audit it later.

use crate::errors::{GameError, GameResult};
use crate::games::types::RoundSeed;
use rand::{rngs::StdRng, RngCore, SeedableRng};
use rand_core::OsRng;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// Bytes consumed per draw
pub const DRAW_BYTES: usize = 8;

/// A single uniform draw plus its audit seed
#[derive(Debug, Clone)]
pub struct Draw {
    pub value: f64,
    pub seed: RoundSeed,
}

/// Injected source of independent draws, one per round
pub trait RandomSource: Send + Sync {
    fn draw(&self, round_id: &str) -> GameResult<Draw>;

    /// Short label for logs and the fairness endpoint
    fn name(&self) -> &'static str;

    /// Hex public key for sources whose draws can be verified by players
    fn public_key_hex(&self) -> Option<String> {
        None
    }
}

/// Map the first 8 bytes (big-endian) onto [0, 1) with 53 bits of precision
pub fn uniform_from_bytes(bytes: &[u8]) -> GameResult<f64> {
    let chunk: [u8; DRAW_BYTES] = bytes
        .get(..DRAW_BYTES)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| {
            GameError::InvalidParameter(format!(
                "need {} bytes of randomness, got {}",
                DRAW_BYTES,
                bytes.len()
            ))
        })?;
    let v = u64::from_be_bytes(chunk) >> 11;
    Ok(v as f64 / (1u64 << 53) as f64)
}

fn entropy_draw(bytes: [u8; DRAW_BYTES]) -> GameResult<Draw> {
    Ok(Draw {
        value: uniform_from_bytes(&bytes)?,
        seed: RoundSeed::Entropy {
            bytes: hex::encode(bytes),
        },
    })
}

/// Operating-system CSPRNG
#[derive(Debug, Default, Clone, Copy)]
pub struct OsEntropySource;

impl RandomSource for OsEntropySource {
    fn draw(&self, _round_id: &str) -> GameResult<Draw> {
        let mut bytes = [0u8; DRAW_BYTES];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| GameError::EntropyUnavailable(e.to_string()))?;
        entropy_draw(bytes)
    }

    fn name(&self) -> &'static str {
        "os"
    }
}

/// Reproducible generator for simulations. Not for production play.
pub struct SeededSource {
    rng: Mutex<StdRng>,
}

impl SeededSource {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededSource {
    fn draw(&self, _round_id: &str) -> GameResult<Draw> {
        let mut bytes = [0u8; DRAW_BYTES];
        self.rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .fill_bytes(&mut bytes);
        entropy_draw(bytes)
    }

    fn name(&self) -> &'static str {
        "seeded"
    }
}

/// Deterministic stub replaying a fixed list of draws
#[derive(Default)]
pub struct ScriptedSource {
    values: Mutex<VecDeque<f64>>,
}

impl ScriptedSource {
    pub fn new(values: impl IntoIterator<Item = f64>) -> Self {
        Self {
            values: Mutex::new(values.into_iter().collect()),
        }
    }

    pub fn push(&self, value: f64) {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(value);
    }

    pub fn remaining(&self) -> usize {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl RandomSource for ScriptedSource {
    fn draw(&self, _round_id: &str) -> GameResult<Draw> {
        let value = self
            .values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .ok_or_else(|| GameError::EntropyUnavailable("scripted draws exhausted".to_string()))?;
        Ok(Draw {
            value,
            seed: RoundSeed::Scripted { value },
        })
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
