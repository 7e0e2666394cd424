//! GitHub issue search client.
//!
//! Issues a single authenticated `GET /search/issues` call per query and
//! classifies every failure into a [`GitHubError`] variant so callers can
//! tell transport problems from bad responses.

use crate::config::GitHubConfig;
use crate::error::GitHubError;
use crate::http;
use crate::types::{ErrorBody, IssueItem, SearchResponse};
use reqwest::header::{ACCEPT, AUTHORIZATION};

/// Media type for the v3 REST API.
const GITHUB_V3_ACCEPT: &str = "application/vnd.github.v3+json";

/// Client for the GitHub search API.
///
/// Cheap to clone; the underlying connection pool is shared.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    config: GitHubConfig,
}

impl GitHubClient {
    /// Create a client after validating `config`.
    ///
    /// # Errors
    ///
    /// Returns [`GitHubError::Config`] for an invalid configuration or
    /// [`GitHubError::Http`] if the HTTP client cannot be built.
    pub fn new(config: GitHubConfig) -> Result<Self, GitHubError> {
        config.validate()?;
        let http = http::build_client(&config)?;
        Ok(Self { http, config })
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &GitHubConfig {
        &self.config
    }

    /// Search issues and pull requests matching `query`.
    ///
    /// `query` is raw GitHub search syntax (`is:open is:pr review-requested:me`);
    /// URL encoding is handled here.
    ///
    /// # Errors
    ///
    /// - [`GitHubError::MissingToken`] when `token` is blank (no request is sent)
    /// - [`GitHubError::InvalidRequest`] for a blank query or unusable base URL
    /// - [`GitHubError::Http`] when the request fails in transit
    /// - [`GitHubError::Status`] for a non-2xx response
    /// - [`GitHubError::Parse`] when the body is not a search response
    pub async fn search_issues(
        &self,
        token: &str,
        query: &str,
    ) -> Result<Vec<IssueItem>, GitHubError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(GitHubError::MissingToken);
        }
        let query = query.trim();
        if query.is_empty() {
            return Err(GitHubError::InvalidRequest("query is empty".into()));
        }

        let url = http::search_issues_url(&self.config.api_base_url)?;
        tracing::trace!(query, "GitHub issue search");

        let per_page = self.config.per_page.to_string();
        let response = self
            .http
            .get(url)
            .query(&[("q", query), ("per_page", per_page.as_str())])
            .header(AUTHORIZATION, format!("token {token}"))
            .header(ACCEPT, GITHUB_V3_ACCEPT)
            .send()
            .await
            .map_err(|e| GitHubError::Http(format!("GitHub request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GitHubError::Http(format!("GitHub response read failed: {e}")))?;

        if !status.is_success() {
            return Err(GitHubError::Status {
                status: status.as_u16(),
                message: error_message(&body)
                    .or_else(|| status.canonical_reason().map(str::to_owned))
                    .unwrap_or_else(|| "unknown error".to_owned()),
            });
        }

        tracing::trace!(bytes = body.len(), "GitHub response received");
        parse_search_response(&body)
    }
}

/// Parse a search response body into items, preserving server order.
pub fn parse_search_response(body: &str) -> Result<Vec<IssueItem>, GitHubError> {
    let parsed: SearchResponse = serde_json::from_str(body)
        .map_err(|e| GitHubError::Parse(format!("invalid search response: {e}")))?;
    if parsed.incomplete_results {
        tracing::debug!(
            total = parsed.total_count,
            returned = parsed.items.len(),
            "GitHub reported incomplete search results"
        );
    }
    Ok(parsed.items)
}

fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .map(|b| b.message)
        .filter(|m| !m.trim().is_empty())
}
