//! Test helper modules for reel-mc integration tests
//!
//! Provides reusable test infrastructure components:
//! - MockAudioBackend / MockAudioElement: scriptable audio with inspection
//! - MockVideoElement: video element recording play/pause/preload calls
//! - MockFeedLoader: counting loader with queued results
//! - Feed builders

#![allow(dead_code)]

pub mod feed_builder;
pub mod mock_loader;
pub mod mock_media;

// Re-export commonly used types
pub use feed_builder::{audio_item, page, silent_item, video_feed};
pub use mock_loader::MockFeedLoader;
pub use mock_media::{MockAudioBackend, MockAudioElement, MockVideoElement, VideoBehavior};

use reel_common::events::MediaEvent;
use tokio::sync::broadcast;

/// Drain every event currently queued on `rx`
pub fn drain_events(rx: &mut broadcast::Receiver<MediaEvent>) -> Vec<MediaEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
