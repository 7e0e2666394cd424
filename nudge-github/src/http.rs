//! Shared HTTP client construction and request URL helpers.

use crate::config::GitHubConfig;
use crate::error::GitHubError;
use std::time::Duration;
use url::Url;

/// Build a [`reqwest::Client`] configured for the GitHub REST API.
///
/// # Errors
///
/// Returns [`GitHubError::Http`] if the client cannot be constructed.
pub fn build_client(config: &GitHubConfig) -> Result<reqwest::Client, GitHubError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .user_agent(config.user_agent.clone())
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .map_err(|e| GitHubError::Http(format!("failed to build HTTP client: {e}")))
}

/// Resolve the issue search endpoint below `api_base_url`.
///
/// A base with a path prefix (GitHub Enterprise `https://host/api/v3`) keeps
/// that prefix.
pub fn search_issues_url(api_base_url: &str) -> Result<Url, GitHubError> {
    let trimmed = api_base_url.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_owned()
    } else {
        format!("{trimmed}/")
    };
    let base = Url::parse(&with_slash)
        .map_err(|e| GitHubError::InvalidRequest(format!("invalid API base URL: {e}")))?;
    base.join("search/issues")
        .map_err(|e| GitHubError::InvalidRequest(format!("cannot build search URL: {e}")))
}
