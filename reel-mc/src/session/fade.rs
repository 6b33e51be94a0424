//! Stepped volume ramps
//!
//! A fade is a fixed number of discrete volume steps spread evenly over the
//! fade duration. Each step's level comes from the configured `FadeCurve`.

use crate::media::AudioElement;
use reel_common::FadeCurve;
use std::time::Duration;
use tokio::time;

/// One volume ramp
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadeRamp {
    pub from: f32,
    pub to: f32,
    pub duration: Duration,
    pub steps: u32,
    pub curve: FadeCurve,
}

impl FadeRamp {
    pub fn new(from: f32, to: f32, duration: Duration, steps: u32, curve: FadeCurve) -> Self {
        Self {
            from,
            to,
            duration,
            steps: steps.max(1),
            curve,
        }
    }

    /// Time between two steps
    pub fn step_interval(&self) -> Duration {
        self.duration / self.steps
    }

    /// Level after `step` steps (step 0 is `from`, the last step is `to`)
    pub fn level_at(&self, step: u32) -> f32 {
        if step >= self.steps {
            return self.to;
        }
        let progress = step as f32 / self.steps as f32;
        self.curve.ramp(self.from, self.to, progress).clamp(0.0, 1.0)
    }

    /// Levels applied by `run`, in order
    pub fn levels(&self) -> Vec<f32> {
        (1..=self.steps).map(|step| self.level_at(step)).collect()
    }

    /// Apply the ramp to `element`, one step per interval
    ///
    /// Cancellation between steps leaves the element at the last applied level.
    pub async fn run(&self, element: &dyn AudioElement) {
        if self.duration.is_zero() {
            element.set_volume(self.to);
            return;
        }

        let interval = self.step_interval();
        for step in 1..=self.steps {
            time::sleep(interval).await;
            element.set_volume(self.level_at(step));
        }
    }
}
