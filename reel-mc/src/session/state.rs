//! Session state types

use reel_common::ItemId;
use serde::{Deserialize, Serialize};

/// Fade sub-state of the audio session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FadePhase {
    #[default]
    Idle,
    FadingIn,
    FadingOut,
}

impl std::fmt::Display for FadePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FadePhase::Idle => write!(f, "idle"),
            FadePhase::FadingIn => write!(f, "fading-in"),
            FadePhase::FadingOut => write!(f, "fading-out"),
        }
    }
}

/// Options for `SessionController::play`
#[derive(Debug, Clone, Default)]
pub struct PlayOptions {
    /// Feed item that owns the session
    pub affinity: Option<ItemId>,
    /// Loop forever instead of auto-pausing
    pub looping: bool,
    /// Target volume; the configured default when unset
    pub volume: Option<f32>,
    /// Start offset in seconds
    pub start_time: Option<f64>,
}

impl PlayOptions {
    pub fn for_item(affinity: impl Into<ItemId>) -> Self {
        Self {
            affinity: Some(affinity.into()),
            ..Self::default()
        }
    }

    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn volume(mut self, volume: f32) -> Self {
        self.volume = Some(volume);
        self
    }

    pub fn start_time(mut self, seconds: f64) -> Self {
        self.start_time = Some(seconds);
        self
    }
}

/// Point-in-time view of the audio session for the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub is_playing: bool,
    pub is_looping: bool,
    /// Seconds
    pub current_time: f64,
    /// Seconds, when known
    pub duration: Option<f64>,
    pub volume: f32,
    pub affinity: Option<ItemId>,
    pub locator: Option<String>,
    pub fade: FadePhase,
}

impl SessionSnapshot {
    /// Snapshot with no session
    pub fn empty() -> Self {
        Self {
            is_playing: false,
            is_looping: false,
            current_time: 0.0,
            duration: None,
            volume: 0.0,
            affinity: None,
            locator: None,
            fade: FadePhase::Idle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_play_options_builder() {
        let options = PlayOptions::for_item("post-1")
            .looping(true)
            .volume(0.4)
            .start_time(2.5);

        assert_eq!(options.affinity, Some(ItemId::from("post-1")));
        assert!(options.looping);
        assert_eq!(options.volume, Some(0.4));
        assert_eq!(options.start_time, Some(2.5));
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = SessionSnapshot::empty();
        assert!(!snapshot.is_playing);
        assert!(snapshot.affinity.is_none());
        assert_eq!(snapshot.fade, FadePhase::Idle);
    }
}
