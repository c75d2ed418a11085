use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Minor units per currency unit (two decimal places)
pub const MINOR_PER_UNIT: u64 = 100;

/// Non-negative monetary amount held as integer hundredths
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(u64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn from_minor(minor: u64) -> Self {
        Self(minor)
    }

    /// Round a decimal to the nearest hundredth. Negative, non-finite and
    /// out-of-range values have no representation.
    pub fn from_decimal(value: f64) -> Option<Self> {
        if !value.is_finite() || value < 0.0 {
            return None;
        }
        let minor = (value * MINOR_PER_UNIT as f64).round();
        if minor >= u64::MAX as f64 {
            return None;
        }
        Some(Self(minor as u64))
    }

    pub const fn minor(self) -> u64 {
        self.0
    }

    pub fn to_decimal(self) -> f64 {
        self.0 as f64 / MINOR_PER_UNIT as f64
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }

    /// `round(self * multiplier, 2)`, `None` if the product does not fit
    pub fn scaled(self, multiplier: f64) -> Option<Amount> {
        let product = (self.0 as f64 * multiplier).round();
        if !product.is_finite() || product < 0.0 || product >= u64::MAX as f64 {
            return None;
        }
        Some(Amount(product as u64))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:02}",
            self.0 / MINOR_PER_UNIT,
            self.0 % MINOR_PER_UNIT
        )
    }
}

// On the wire amounts are plain decimals.
impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_decimal())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Amount::from_decimal(value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid amount: {}", value)))
    }
}

/// Round status as seen by callers
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RoundStatus {
    Idle,
    Active,
}

impl fmt::Display for RoundStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundStatus::Idle => write!(f, "idle"),
            RoundStatus::Active => write!(f, "active"),
        }
    }
}

/// VRF bundle containing cryptographic proof
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VrfBundle {
    /// Hex-encoded VRF output (32 bytes)
    pub vrf_output: String,
    /// Hex-encoded VRF proof (64-byte schnorrkel signature)
    pub vrf_proof: String,
    /// Hex-encoded public key (32 bytes)
    pub public_key: String,
    /// Input message used for VRF
    pub input_message: String,
}

/// Audit record of the randomness behind one round
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RoundSeed {
    /// Raw generator bytes, hex-encoded
    Entropy { bytes: String },
    Vrf(VrfBundle),
    /// Draw supplied verbatim by a scripted source
    Scripted { value: f64 },
}

/// Transient result of the round engine, consumed straight into a session
#[derive(Debug, Clone)]
pub struct RoundOutcome {
    pub crash_point: f64,
    pub seed: RoundSeed,
}

/// How a round ended
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoundResolution {
    CashedOut { multiplier: f64, winnings: Amount },
    Forfeited,
}

impl RoundResolution {
    pub fn payout(&self) -> Amount {
        match self {
            RoundResolution::CashedOut { winnings, .. } => *winnings,
            RoundResolution::Forfeited => Amount::ZERO,
        }
    }
}

/// A resolved round. Only ever built after resolution, so exposing the crash
/// point here is safe.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoundRecord {
    pub round_id: String,
    pub bet: Amount,
    pub crash_point: f64,
    pub resolution: RoundResolution,
    pub seed: RoundSeed,
    pub started_at: DateTime<Utc>,
    pub resolved_at: DateTime<Utc>,
}

/// Successful cash-out settlement
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CashOut {
    pub winnings: Amount,
    pub balance: Amount,
    pub multiplier: f64,
}
