//! Error types for the Sirius gateway

use thiserror::Error;

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the Sirius gateway
///
/// Device failures are deliberately absent: they are reported as data in
/// [`crate::device::CommandResult`] so callers always get a readable message.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error (missing API key, unknown provider, ...)
    #[error("configuration error: {0}")]
    Config(String),

    /// Rejected user input (empty utterance, malformed request)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Device address could not be parsed
    #[error("invalid device address: {0}")]
    InvalidAddress(String),

    /// Language model unreachable or returned a non-success status
    #[error("language model error: {0}")]
    Model(String),

    /// Language model did not answer in time
    #[error("language model timed out after {0:?}")]
    ModelTimeout(std::time::Duration),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Whether this error came from the language model transport
    #[must_use]
    pub const fn is_upstream(&self) -> bool {
        matches!(self, Self::Model(_) | Self::ModelTimeout(_) | Self::Http(_))
    }
}
