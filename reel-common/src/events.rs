//! Event types for the Reel event system
//!
//! Provides the shared `MediaEvent` definitions and the `EventBus` used by the
//! coordinator to publish observable state changes to the presentation layer.

use crate::config::ProfileTier;
use crate::feed::ItemId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Why an audio session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Explicit `stop()` call
    Stopped,
    /// Replaced by a newer `play()`
    Superseded,
    /// Coordinator shut down
    Shutdown,
}

/// Media coordination events
///
/// Events are broadcast via EventBus and serialize with a `type` tag so the
/// presentation layer can forward them verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MediaEvent {
    /// Audio session started and is fading in
    AudioStarted {
        locator: String,
        affinity: Option<ItemId>,
        looping: bool,
        timestamp: DateTime<Utc>,
    },

    /// Audio session faded out and paused (explicit pause or auto-pause window)
    AudioPaused {
        affinity: Option<ItemId>,
        /// Position kept for resume (seconds)
        position: f64,
        /// True when the auto-pause window elapsed
        automatic: bool,
        timestamp: DateTime<Utc>,
    },

    /// Audio session torn down
    AudioStopped {
        affinity: Option<ItemId>,
        reason: StopReason,
        timestamp: DateTime<Utc>,
    },

    /// Audio could not be opened or started; feed navigation continues
    AudioFailed {
        locator: String,
        affinity: Option<ItemId>,
        error: String,
        timestamp: DateTime<Utc>,
    },

    /// Navigation committed a new active item
    ActiveIndexChanged {
        old_index: usize,
        new_index: usize,
        item_id: ItemId,
        timestamp: DateTime<Utc>,
    },

    /// A video resource was activated (autoplay attempted or preload raised)
    ResourceActivated {
        item_id: ItemId,
        option_id: String,
        autoplay: bool,
        muted: bool,
        timestamp: DateTime<Utc>,
    },

    /// A video resource was paused
    ResourceDeactivated {
        item_id: ItemId,
        option_id: String,
        timestamp: DateTime<Utc>,
    },

    /// Autoplay was rejected twice (unmuted and muted); resource left inert
    AutoplayBlocked {
        item_id: ItemId,
        option_id: String,
        timestamp: DateTime<Utc>,
    },

    /// A sweep evicted descriptors
    ResourcesEvicted {
        idle: usize,
        overflow: usize,
        remaining: usize,
        timestamp: DateTime<Utc>,
    },

    /// Performance profile detected or overridden
    ProfileChanged {
        tier: ProfileTier,
        threshold: usize,
        timestamp: DateTime<Utc>,
    },

    /// Prefetch threshold crossed; loader invoked
    LoadMoreRequested {
        remaining: usize,
        timestamp: DateTime<Utc>,
    },

    /// Loader finished (successfully or not)
    LoadMoreCompleted {
        added: usize,
        has_more: bool,
        success: bool,
        timestamp: DateTime<Utc>,
    },
}

impl MediaEvent {
    /// Event name as serialized in the `type` tag
    pub fn event_type(&self) -> &'static str {
        match self {
            MediaEvent::AudioStarted { .. } => "AudioStarted",
            MediaEvent::AudioPaused { .. } => "AudioPaused",
            MediaEvent::AudioStopped { .. } => "AudioStopped",
            MediaEvent::AudioFailed { .. } => "AudioFailed",
            MediaEvent::ActiveIndexChanged { .. } => "ActiveIndexChanged",
            MediaEvent::ResourceActivated { .. } => "ResourceActivated",
            MediaEvent::ResourceDeactivated { .. } => "ResourceDeactivated",
            MediaEvent::AutoplayBlocked { .. } => "AutoplayBlocked",
            MediaEvent::ResourcesEvicted { .. } => "ResourcesEvicted",
            MediaEvent::ProfileChanged { .. } => "ProfileChanged",
            MediaEvent::LoadMoreRequested { .. } => "LoadMoreRequested",
            MediaEvent::LoadMoreCompleted { .. } => "LoadMoreCompleted",
        }
    }
}

/// Central event distribution bus
///
/// Uses tokio::broadcast internally:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use reel_common::events::{EventBus, MediaEvent};
///
/// let bus = EventBus::new(64);
/// let mut rx = bus.subscribe();
///
/// bus.emit_lossy(MediaEvent::LoadMoreRequested {
///     remaining: 3,
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert!(matches!(rx.try_recv(), Ok(MediaEvent::LoadMoreRequested { remaining: 3, .. })));
/// ```
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<MediaEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<MediaEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: MediaEvent) -> Result<usize, broadcast::error::SendError<MediaEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: MediaEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_without_subscribers_is_err() {
        let bus = EventBus::new(8);
        let result = bus.emit(MediaEvent::LoadMoreRequested {
            remaining: 1,
            timestamp: Utc::now(),
        });
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let bus = EventBus::new(8);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.emit_lossy(MediaEvent::ActiveIndexChanged {
            old_index: 0,
            new_index: 1,
            item_id: ItemId::from("b"),
            timestamp: Utc::now(),
        });

        for rx in [&mut rx1, &mut rx2] {
            match rx.recv().await.unwrap() {
                MediaEvent::ActiveIndexChanged { new_index, item_id, .. } => {
                    assert_eq!(new_index, 1);
                    assert_eq!(item_id.as_str(), "b");
                }
                other => panic!("unexpected event {:?}", other),
            }
        }
    }

    #[test]
    fn test_serialized_tag_matches_event_type() {
        let event = MediaEvent::AudioStopped {
            affinity: Some(ItemId::from(7u64)),
            reason: StopReason::Superseded,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], event.event_type());
        assert_eq!(json["reason"], "superseded");
        assert_eq!(json["affinity"], "7");
    }
}
