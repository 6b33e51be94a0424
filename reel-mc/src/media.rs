//! Media element seams
//!
//! The coordinator never touches a platform media API directly. The
//! presentation layer implements these traits over whatever actually plays
//! audio and video; the `reel-mc` binary ships logging implementations and
//! the tests use in-memory mocks.

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Opens audio elements for a locator
#[async_trait]
pub trait AudioBackend: Send + Sync {
    /// Fetch/decode enough of `locator` to produce a startable element
    async fn open(&self, locator: &str) -> Result<Arc<dyn AudioElement>>;

    /// Run a silent play/pause cycle to unlock autoplay after a user gesture
    async fn unlock(&self) -> Result<()> {
        Ok(())
    }
}

/// One audio element (the resource behind an audio session)
#[async_trait]
pub trait AudioElement: Send + Sync {
    /// Begin playback; rejects when decoding fails or autoplay is blocked
    async fn start(&self) -> Result<()>;

    fn pause(&self);

    fn is_paused(&self) -> bool;

    fn set_volume(&self, volume: f32);

    fn volume(&self) -> f32;

    fn set_looping(&self, looping: bool);

    /// Seek to `position` seconds
    fn seek(&self, position: f64);

    /// Current position in seconds
    fn position(&self) -> f64;

    /// Total duration in seconds, when known
    fn duration(&self) -> Option<f64>;

    /// Drop the source so the element holds no media data
    fn release(&self);
}

/// Preload hint for a video element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreloadHint {
    /// Load nothing ahead of playback
    None,
    /// Load headers only
    #[default]
    Metadata,
    /// Load as much as the platform wants
    Auto,
}

/// A heavyweight video resource owned by the presentation layer
///
/// The coordinator pauses and hints these elements but never clears their
/// source, so a descriptor dropped and re-registered resumes without reload.
#[async_trait]
pub trait VideoElement: Send + Sync {
    /// Attempt playback; rejects when autoplay is blocked
    async fn play(&self) -> Result<()>;

    fn pause(&self);

    fn is_paused(&self) -> bool;

    fn set_muted(&self, muted: bool);

    fn is_muted(&self) -> bool;

    /// Apply a preload hint; fails when the element is not ready for hints
    fn set_preload(&self, hint: PreloadHint) -> Result<()>;

    fn preload(&self) -> PreloadHint;
}
