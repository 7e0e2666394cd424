//! # nudge-github
//!
//! GitHub issue and pull request search for Nudge poll watchers.
//!
//! This crate wraps the `GET /search/issues` endpoint of the GitHub REST API
//! and nothing else. It knows how to authenticate with a personal access
//! token, encode a search query, and classify failures. Building the query
//! and turning results into nudges is the caller's job.
//!
//! ## Security
//!
//! - Tokens are sent only in the `Authorization` header
//! - Tokens never appear in logs or error messages
//! - Search queries are logged only at trace level

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod types;

pub use client::GitHubClient;
pub use config::GitHubConfig;
pub use error::{GitHubError, Result};
pub use types::{IssueItem, SearchResponse};

/// Search GitHub issues and pull requests with the default configuration.
///
/// Convenience wrapper that builds a [`GitHubClient`] for a single call.
/// Long-lived callers should keep a client instead.
///
/// # Errors
///
/// Same as [`GitHubClient::search_issues`].
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> nudge_github::Result<()> {
/// let items = nudge_github::search_issues("ghp_xxx", "is:open is:pr review-requested:me").await?;
/// for item in &items {
///     println!("{}: {}", item.title, item.html_url);
/// }
/// # Ok(())
/// # }
/// ```
pub async fn search_issues(token: &str, query: &str) -> Result<Vec<IssueItem>> {
    GitHubClient::new(GitHubConfig::default())?
        .search_issues(token, query)
        .await
}
