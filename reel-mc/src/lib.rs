//! # Reel Media Coordinator Library (reel-mc)
//!
//! Media coordination engine for a vertically-scrolling short-content feed.
//!
//! **Purpose:** Keep at most one audio session alive with fade transitions,
//! bound the number of live video elements according to a device profile,
//! and turn feed navigation input into audio/visibility/prefetch effects.
//!
//! **Architecture:** Three components behind one `MediaCoordinator`:
//! - `session`: single audio session with fades and an auto-pause window
//! - `resources`: video descriptor pool, autoplay policy and eviction sweep
//! - `navigation`: active index, swipe/wheel/key input and prefetching
//!
//! Platform media stays behind the `media` traits; the presentation layer
//! implements them and consumes the `MediaEvent` stream.

pub mod coordinator;
pub mod error;
pub mod media;
pub mod navigation;
pub mod resources;
pub mod session;
pub mod sim;
pub mod timer;

pub use coordinator::MediaCoordinator;
pub use error::{Error, Result};
pub use timer::TimerHandle;
