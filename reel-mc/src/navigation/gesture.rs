//! Swipe gesture classification
//!
//! `classify_swipe` is a pure function of the measured metrics; the
//! `GestureTracker` only turns pointer samples into those metrics.

use serde::{Deserialize, Serialize};

/// One pointer sample along the feed axis
///
/// `position` grows toward later items; `timestamp_ms` is monotonic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerSample {
    pub position: f64,
    pub timestamp_ms: f64,
}

impl PointerSample {
    pub fn new(position: f64, timestamp_ms: f64) -> Self {
        Self {
            position,
            timestamp_ms,
        }
    }
}

/// Thresholds a swipe must cross to navigate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwipeThresholds {
    /// Quick flick: shorter than this...
    pub quick_duration_ms: f64,
    /// ...and faster than this on average (units/ms)
    pub quick_velocity: f64,
    /// Instantaneous velocity that always navigates
    pub fling_velocity: f64,
    /// Displacement that always navigates
    pub long_distance: f64,
    /// Moderate displacement...
    pub medium_distance: f64,
    /// ...at this average velocity
    pub medium_velocity: f64,
}

impl Default for SwipeThresholds {
    fn default() -> Self {
        Self {
            quick_duration_ms: 300.0,
            quick_velocity: 0.5,
            fling_velocity: 1.5,
            long_distance: 80.0,
            medium_distance: 40.0,
            medium_velocity: 0.8,
        }
    }
}

/// Measured swipe
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SwipeMetrics {
    /// End minus start position
    pub displacement: f64,
    pub duration_ms: f64,
    /// Last observed |Δposition/Δtime|
    pub instantaneous_velocity: f64,
}

impl SwipeMetrics {
    pub fn new(displacement: f64, duration_ms: f64, instantaneous_velocity: f64) -> Self {
        Self {
            displacement,
            duration_ms,
            instantaneous_velocity,
        }
    }

    /// |displacement| / duration, 0 for a non-positive duration
    pub fn average_velocity(&self) -> f64 {
        if self.duration_ms > 0.0 {
            self.displacement.abs() / self.duration_ms
        } else {
            0.0
        }
    }
}

/// Outcome of a swipe
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwipeDecision {
    #[default]
    None,
    /// Toward later items
    Forward,
    /// Toward earlier items
    Backward,
}

/// Classify a finished swipe
pub fn classify_swipe(metrics: SwipeMetrics, thresholds: &SwipeThresholds) -> SwipeDecision {
    let distance = metrics.displacement.abs();
    if distance == 0.0 || metrics.displacement.is_nan() {
        return SwipeDecision::None;
    }

    let average = metrics.average_velocity();
    let quick = metrics.duration_ms < thresholds.quick_duration_ms && average > thresholds.quick_velocity;
    let fling = metrics.instantaneous_velocity > thresholds.fling_velocity;
    let long = distance > thresholds.long_distance;
    let medium = distance > thresholds.medium_distance && average > thresholds.medium_velocity;

    if !(quick || fling || long || medium) {
        return SwipeDecision::None;
    }

    if metrics.displacement > 0.0 {
        SwipeDecision::Forward
    } else {
        SwipeDecision::Backward
    }
}

/// Accumulates pointer samples for one gesture at a time
#[derive(Debug, Clone, Default)]
pub struct GestureTracker {
    start: Option<PointerSample>,
    last: Option<PointerSample>,
    instantaneous_velocity: f64,
}

impl GestureTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, sample: PointerSample) {
        self.start = Some(sample);
        self.last = Some(sample);
        self.instantaneous_velocity = 0.0;
    }

    /// Record a move; ignored without a preceding `start`
    pub fn update(&mut self, sample: PointerSample) {
        let Some(last) = self.last else {
            return;
        };
        let dt = sample.timestamp_ms - last.timestamp_ms;
        if dt > 0.0 {
            self.instantaneous_velocity = ((sample.position - last.position) / dt).abs();
        }
        self.last = Some(sample);
    }

    /// Finish the gesture and return its metrics
    pub fn finish(&mut self, sample: PointerSample) -> Option<SwipeMetrics> {
        self.update(sample);
        let start = self.start.take()?;
        self.last = None;

        Some(SwipeMetrics {
            displacement: sample.position - start.position,
            duration_ms: sample.timestamp_ms - start.timestamp_ms,
            instantaneous_velocity: std::mem::take(&mut self.instantaneous_velocity),
        })
    }

    pub fn is_tracking(&self) -> bool {
        self.start.is_some()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
