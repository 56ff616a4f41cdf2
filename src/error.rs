//! Error types for rfc-autopilot.

use thiserror::Error;

/// Top-level error type for decomposition and workflow operations.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error while reading documents or configuration.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// GitHub operation failed.
    #[error("GitHub operation failed: {0}")]
    GitHub(String),

    /// A workflow could not complete.
    #[error("workflow error: {0}")]
    Workflow(String),

    /// JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML configuration could not be parsed.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result type alias for rfc-autopilot operations.
pub type Result<T> = std::result::Result<T, Error>;
