//! Error types for reel-mc
//!
//! These errors travel between internal seams (backends, loader, settings).
//! The coordination API itself never surfaces them: session, resource and
//! navigation operations log the failure and answer with a boolean or a
//! state field instead.

use thiserror::Error;

/// Main error type for reel-mc
#[derive(Error, Debug)]
pub enum Error {
    /// Media could not be fetched or decoded
    #[error("Media error: {0}")]
    Media(String),

    /// The platform refused to start playback without a user gesture
    #[error("Autoplay blocked: {0}")]
    Autoplay(String),

    /// A media operation did not complete in time
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Feed loader failed to supply a page
    #[error("Loader error: {0}")]
    Loader(String),

    /// Errors from the shared library
    #[error(transparent)]
    Common(#[from] reel_common::Error),
}

/// Convenience Result type using reel-mc Error
pub type Result<T> = std::result::Result<T, Error>;
