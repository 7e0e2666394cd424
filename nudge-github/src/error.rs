//! Error types for the nudge-github crate.
//!
//! All errors use stable string messages suitable for display to users
//! and programmatic handling. Tokens never appear in error messages.

/// Errors that can occur while searching GitHub.
#[derive(Debug, thiserror::Error)]
pub enum GitHubError {
    /// No personal access token was supplied.
    #[error("missing GitHub token")]
    MissingToken,

    /// The request could not be constructed (bad base URL, empty query).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The response body was not the expected JSON shape.
    #[error("parse error: {0}")]
    Parse(String),

    /// GitHub answered with a non-success status code.
    #[error("unexpected status {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// `message` field from the error body, or the canonical reason.
        message: String,
    },

    /// Invalid client configuration.
    #[error("config error: {0}")]
    Config(String),
}

/// Convenience type alias for nudge-github results.
pub type Result<T> = std::result::Result<T, GitHubError>;
