//! Client configuration with sensible defaults.
//!
//! [`GitHubConfig`] controls where requests go and how long they may take.
//! The defaults target the public `api.github.com` endpoint.

use crate::error::GitHubError;

/// Public GitHub REST API endpoint.
pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";

/// GitHub caps `per_page` on search endpoints at 100.
const MAX_PER_PAGE: u32 = 100;

/// Configuration for a [`crate::GitHubClient`].
#[derive(Debug, Clone)]
pub struct GitHubConfig {
    /// Base URL of the REST API. Override for GitHub Enterprise or tests.
    pub api_base_url: String,
    /// HTTP request timeout in seconds.
    pub timeout_seconds: u64,
    /// Number of search results requested per call (1..=100).
    pub per_page: u32,
    /// User-Agent header. GitHub rejects requests without one.
    pub user_agent: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_owned(),
            timeout_seconds: 15,
            per_page: 50,
            user_agent: format!("nudge-github/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl GitHubConfig {
    /// Validates this configuration, returning an error if any field is invalid.
    pub fn validate(&self) -> Result<(), GitHubError> {
        if self.api_base_url.trim().is_empty() {
            return Err(GitHubError::Config("api_base_url must not be empty".into()));
        }
        if self.timeout_seconds == 0 {
            return Err(GitHubError::Config(
                "timeout_seconds must be greater than 0".into(),
            ));
        }
        if self.per_page == 0 || self.per_page > MAX_PER_PAGE {
            return Err(GitHubError::Config(format!(
                "per_page must be between 1 and {MAX_PER_PAGE}"
            )));
        }
        if self.user_agent.trim().is_empty() {
            return Err(GitHubError::Config("user_agent must not be empty".into()));
        }
        Ok(())
    }
}
