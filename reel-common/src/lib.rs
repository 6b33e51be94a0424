//! # Reel Common Library
//!
//! Shared code for the Reel feed media coordinator:
//! - Feed model (items, media options, audio tracks)
//! - Event types (MediaEvent enum) and the EventBus
//! - Engine settings loading (TOML + environment + overrides)
//! - Fade curve definitions and calculations
//! - Utility functions

pub mod config;
pub mod error;
pub mod events;
pub mod fade_curves;
pub mod feed;
pub mod time;

pub use error::{Error, Result};
pub use fade_curves::FadeCurve;
pub use feed::{AudioTrack, FeedItem, FeedPage, ItemId, MediaKind, MediaOption};
