//! Bounded score primitives shared by every component.
//!
//! All emotional quantities in this system live on fixed numeric ranges
//! (levels 0–100, intensities 0–10, VAD axes -1–1, confidence 0–1).
//! `Bounded` clamps on construction so an out-of-range value can never
//! propagate into scoring logic; only non-finite input is an error.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tolerance before an out-of-range clamp is considered noteworthy.
pub const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ScoreError {
    /// NaN or infinite input. There is no sensible recovery.
    #[error("score value is not finite")]
    NotFinite,
    /// Strict construction rejected a finite value outside the range.
    #[error("score value {value} outside [{lo}, {hi}]")]
    OutOfRange { value: f64, lo: f64, hi: f64 },
}

/// A finite `f64` clamped to `[LO, HI]` at construction.
///
/// Serialized as a plain number; deserialization goes through `try_from`
/// so corrupt persisted values cannot re-enter the domain unchecked.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Bounded<const LO: i16, const HI: i16>(f64);

/// 0–10 intensity (emotional significance, memory weight, felt intensity).
pub type Intensity = Bounded<0, 10>;
/// 0–100 consciousness level (care, attachment).
pub type Level = Bounded<0, 100>;
/// -1–1 emotional dimension axis (valence, arousal, dominance).
pub type Axis = Bounded<-1, 1>;
/// 0–1 unit score (pattern confidence, adaptation effectiveness).
pub type Unit = Bounded<0, 1>;

impl<const LO: i16, const HI: i16> Bounded<LO, HI> {
    pub const MIN: f64 = LO as f64;
    pub const MAX: f64 = HI as f64;

    /// Clamp `value` into range. Fails only on non-finite input.
    pub fn new(value: f64) -> Result<Self, ScoreError> {
        if !value.is_finite() {
            return Err(ScoreError::NotFinite);
        }
        if value > Self::MAX + EPSILON || value < Self::MIN - EPSILON {
            tracing::debug!(
                "clamping out-of-range score {value} into [{}, {}]",
                Self::MIN,
                Self::MAX
            );
        }
        Ok(Self(value.clamp(Self::MIN, Self::MAX)))
    }

    /// Reject instead of clamping when the value leaves the range by more
    /// than `EPSILON`. Used at trust boundaries (e.g. VAD re-validation of
    /// extractor output) where silent clamping would hide an upstream bug.
    pub fn strict(value: f64) -> Result<Self, ScoreError> {
        if !value.is_finite() {
            return Err(ScoreError::NotFinite);
        }
        if value > Self::MAX + EPSILON || value < Self::MIN - EPSILON {
            return Err(ScoreError::OutOfRange {
                value,
                lo: Self::MIN,
                hi: Self::MAX,
            });
        }
        Ok(Self(value.clamp(Self::MIN, Self::MAX)))
    }

    pub fn get(self) -> f64 {
        self.0
    }

    /// Add a delta and clamp back into range. The delta must be finite.
    pub fn saturating_add(self, delta: f64) -> Result<Self, ScoreError> {
        Self::new(self.0 + delta)
    }

    pub fn zero() -> Self {
        Self(0.0f64.clamp(Self::MIN, Self::MAX))
    }
}

impl<const LO: i16, const HI: i16> Default for Bounded<LO, HI> {
    fn default() -> Self {
        Self::zero()
    }
}

impl<const LO: i16, const HI: i16> TryFrom<f64> for Bounded<LO, HI> {
    type Error = ScoreError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl<const LO: i16, const HI: i16> From<Bounded<LO, HI>> for f64 {
    fn from(b: Bounded<LO, HI>) -> f64 {
        b.0
    }
}

impl<const LO: i16, const HI: i16> std::fmt::Display for Bounded<LO, HI> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// Exponential half-life decay.
///
/// Reduces scar strength and pattern relevance as interactions pass
/// without reinforcement. `half_life` and `elapsed` are both measured in
/// interactions. A non-positive half-life disables decay.
pub fn decay(value: f64, half_life: f64, elapsed: f64) -> f64 {
    if half_life <= 0.0 || elapsed <= 0.0 {
        return value;
    }
    value * 0.5f64.powf(elapsed / half_life)
}

/// Smoothed confidence from confirmation counters.
///
/// `confirmed / (confirmed + contradicted + smoothing)`. The smoothing
/// constant keeps early observations from swinging confidence to the
/// extremes and guards the division. Always in [0, 1).
pub fn confidence(confirmed: u32, contradicted: u32, smoothing: f64) -> f64 {
    let smoothing = if smoothing.is_finite() && smoothing > 0.0 {
        smoothing
    } else {
        1.0
    };
    f64::from(confirmed) / (f64::from(confirmed) + f64::from(contradicted) + smoothing)
}
