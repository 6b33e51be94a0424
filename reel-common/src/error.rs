//! Common error types for Reel

use thiserror::Error;

/// Common result type for Reel operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the Reel crates
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed TOML or JSON input
    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Parse(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Parse(err.to_string())
    }
}
