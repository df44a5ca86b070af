//! Fade curves for track-to-track crossfades
//!
//! A crossfade ramps the outgoing output down and the incoming output up
//! over the same normalized position `t` in `[0.0, 1.0]`. The gain at `t`
//! is `target * fade_in(t)` for the incoming side and
//! `target * fade_out(t)` for the outgoing side.

use serde::{Deserialize, Serialize};
use std::f32::consts::{FRAC_PI_2, PI};
use std::str::FromStr;

/// Fade curve used by the crossfade volume schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FadeCurve {
    /// Linear: v(t) = t
    ///
    /// Outgoing and incoming gains always sum to the target.
    #[default]
    Linear,

    /// S-Curve: v(t) = 0.5 × (1 - cos(π × t))
    ///
    /// Gentle start and finish; gains still sum to the target.
    SCurve,

    /// Equal-Power: v(t) = sin(t × π/2)
    ///
    /// Constant perceived loudness; gains sum to more than the target
    /// mid-fade (squares sum to one instead).
    EqualPower,
}

impl FadeCurve {
    /// Fade-in multiplier at normalized position `position`
    pub fn fade_in(&self, position: f32) -> f32 {
        let t = position.clamp(0.0, 1.0);

        match self {
            FadeCurve::Linear => t,
            FadeCurve::SCurve => 0.5 * (1.0 - (PI * t).cos()),
            FadeCurve::EqualPower => (t * FRAC_PI_2).sin(),
        }
    }

    /// Fade-out multiplier at normalized position `position`
    ///
    /// 1.0 at the start of the fade, 0.0 at the end.
    pub fn fade_out(&self, position: f32) -> f32 {
        let t = position.clamp(0.0, 1.0);

        match self {
            FadeCurve::Linear => 1.0 - t,
            FadeCurve::SCurve => 0.5 * (1.0 + (PI * t).cos()),
            FadeCurve::EqualPower => (t * FRAC_PI_2).cos(),
        }
    }

    /// True when `fade_in(t) + fade_out(t) == 1` for every `t`
    pub fn preserves_sum(&self) -> bool {
        matches!(self, FadeCurve::Linear | FadeCurve::SCurve)
    }

    /// Canonical config-file spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            FadeCurve::Linear => "linear",
            FadeCurve::SCurve => "s_curve",
            FadeCurve::EqualPower => "equal_power",
        }
    }

    pub fn all_variants() -> &'static [FadeCurve] {
        &[FadeCurve::Linear, FadeCurve::SCurve, FadeCurve::EqualPower]
    }
}

impl FromStr for FadeCurve {
    type Err = crate::Error;

    /// Accepts the canonical names plus `cosine`, `scurve`, `s-curve`
    /// and `equalpower`, case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "linear" => Ok(FadeCurve::Linear),
            "cosine" | "scurve" | "s-curve" | "s_curve" => Ok(FadeCurve::SCurve),
            "equal_power" | "equalpower" => Ok(FadeCurve::EqualPower),
            other => Err(crate::Error::InvalidInput(format!(
                "unknown fade curve '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for FadeCurve {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
