//! Volume ramp shapes
//!
//! A session fade moves the element volume between two levels in discrete
//! steps; the curve maps step progress (0.0 → 1.0) onto that range. Rising
//! ramps use the curve's attack shape and falling ramps its release shape, so
//! a fade always starts exactly at `from` and lands exactly on `to`.

use serde::{Deserialize, Serialize};
use std::f32::consts::{FRAC_PI_2, PI};
use std::fmt;

/// Shape of a volume ramp
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FadeCurve {
    #[default]
    Linear,

    /// Quadratic: gentle start when rising, quick drop when falling
    Exponential,

    /// Square root on the way up, quadratic on the way down
    Logarithmic,

    /// Raised cosine
    #[serde(alias = "cosine")]
    SCurve,

    /// Quarter sine; keeps perceived loudness even
    EqualPower,
}

impl FadeCurve {
    pub const ALL: [FadeCurve; 5] = [
        FadeCurve::Linear,
        FadeCurve::Exponential,
        FadeCurve::Logarithmic,
        FadeCurve::SCurve,
        FadeCurve::EqualPower,
    ];

    /// Level at `progress` of a ramp from `from` to `to`
    pub fn ramp(&self, from: f32, to: f32, progress: f32) -> f32 {
        let p = progress.clamp(0.0, 1.0);
        if to >= from {
            from + (to - from) * self.attack(p)
        } else {
            to + (from - to) * self.release(p)
        }
    }

    /// Rising gain, 0.0 at p=0 and 1.0 at p=1
    fn attack(&self, p: f32) -> f32 {
        match self {
            FadeCurve::Linear => p,
            FadeCurve::Exponential => p * p,
            FadeCurve::Logarithmic => p.sqrt(),
            FadeCurve::SCurve => 0.5 * (1.0 - (PI * p).cos()),
            FadeCurve::EqualPower => (p * FRAC_PI_2).sin(),
        }
    }

    /// Remaining gain, 1.0 at p=0 and 0.0 at p=1
    fn release(&self, p: f32) -> f32 {
        let rest = 1.0 - p;
        match self {
            FadeCurve::Linear => rest,
            FadeCurve::Exponential | FadeCurve::Logarithmic => rest * rest,
            FadeCurve::SCurve => 0.5 * (1.0 + (PI * p).cos()),
            FadeCurve::EqualPower => (p * FRAC_PI_2).cos(),
        }
    }

    /// Curve from a settings or CLI name
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "linear" => Some(FadeCurve::Linear),
            "exponential" => Some(FadeCurve::Exponential),
            "logarithmic" => Some(FadeCurve::Logarithmic),
            "s_curve" | "scurve" | "cosine" => Some(FadeCurve::SCurve),
            "equal_power" | "equalpower" => Some(FadeCurve::EqualPower),
            _ => None,
        }
    }
}

impl fmt::Display for FadeCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FadeCurve::Linear => "linear",
            FadeCurve::Exponential => "exponential",
            FadeCurve::Logarithmic => "logarithmic",
            FadeCurve::SCurve => "s_curve",
            FadeCurve::EqualPower => "equal_power",
        };
        f.write_str(name)
    }
}
