//! Error types for nudge.

use crate::config::ConfigError;
use crate::source::QueryError;

/// Top-level error type for the nudge system.
#[derive(Debug, thiserror::Error)]
pub enum NudgeError {
    /// Configuration could not be loaded or written.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// A query source failed.
    #[error("query error: {0}")]
    Query(#[from] QueryError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error (writing a config file).
    #[error("serialization error: {0}")]
    Serialize(String),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, NudgeError>;
