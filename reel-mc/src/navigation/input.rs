//! Wheel and keyboard input

use serde::{Deserialize, Serialize};

/// Accumulated wheel delta that triggers one step
pub const WHEEL_STEP_THRESHOLD: f64 = 50.0;

/// Quiet gap after which a partial accumulation is discarded
pub const WHEEL_RESET_GAP_MS: f64 = 200.0;

/// Navigation step requested by input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavStep {
    Forward,
    Backward,
    First,
    Last,
}

/// Keys the navigator reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavKey {
    Down,
    Up,
    PageDown,
    PageUp,
    Space,
    Home,
    End,
    J,
    K,
}

impl NavKey {
    pub fn step(&self) -> NavStep {
        match self {
            NavKey::Down | NavKey::PageDown | NavKey::Space | NavKey::J => NavStep::Forward,
            NavKey::Up | NavKey::PageUp | NavKey::K => NavStep::Backward,
            NavKey::Home => NavStep::First,
            NavKey::End => NavStep::Last,
        }
    }

    /// Parse a key name as the presentation layer reports it
    pub fn parse(s: &str) -> Option<Self> {
        if s == " " {
            return Some(NavKey::Space);
        }
        match s.trim() {
            "ArrowDown" | "down" => Some(NavKey::Down),
            "ArrowUp" | "up" => Some(NavKey::Up),
            "PageDown" | "page_down" => Some(NavKey::PageDown),
            "PageUp" | "page_up" => Some(NavKey::PageUp),
            "Space" | "space" => Some(NavKey::Space),
            "Home" | "home" => Some(NavKey::Home),
            "End" | "end" => Some(NavKey::End),
            "j" | "J" => Some(NavKey::J),
            "k" | "K" => Some(NavKey::K),
            _ => None,
        }
    }
}

/// Turns a stream of wheel deltas into discrete steps
#[derive(Debug, Clone, Default)]
pub struct WheelAccumulator {
    accumulated: f64,
    last_event_ms: Option<f64>,
}

impl WheelAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a delta; returns a step once the threshold is crossed
    pub fn push(&mut self, delta: f64, timestamp_ms: f64) -> Option<NavStep> {
        if !delta.is_finite() {
            return None;
        }
        if let Some(last) = self.last_event_ms {
            if timestamp_ms - last > WHEEL_RESET_GAP_MS {
                self.accumulated = 0.0;
            }
        }
        self.last_event_ms = Some(timestamp_ms);

        // A direction change starts over
        if self.accumulated != 0.0 && self.accumulated.signum() != delta.signum() {
            self.accumulated = 0.0;
        }
        self.accumulated += delta;

        if self.accumulated.abs() < WHEEL_STEP_THRESHOLD {
            return None;
        }
        let step = if self.accumulated > 0.0 {
            NavStep::Forward
        } else {
            NavStep::Backward
        };
        self.accumulated = 0.0;
        Some(step)
    }

    pub fn accumulated(&self) -> f64 {
        self.accumulated
    }
}
