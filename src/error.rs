//! Error types for the Parley widget

use thiserror::Error;

/// Result type alias for Parley operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the Parley widget
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Speech recognition error
    #[error("recognition error: {0}")]
    Recognition(String),

    /// Speech synthesis error
    #[error("synthesis error: {0}")]
    Synthesis(String),

    /// Audio device error
    #[error("audio error: {0}")]
    Audio(String),

    /// Responder error
    #[error("responder error: {0}")]
    Responder(String),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}
