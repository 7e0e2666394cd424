//! Response types for the GitHub issue search endpoint.

use serde::{Deserialize, Serialize};

/// Top-level body of `GET /search/issues`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Total number of matches on the server (may exceed `items.len()`).
    #[serde(default)]
    pub total_count: u64,
    /// Whether GitHub timed out and returned a partial result set.
    #[serde(default)]
    pub incomplete_results: bool,
    /// Matching issues and pull requests, in server order.
    pub items: Vec<IssueItem>,
}

/// A single issue or pull request returned by search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueItem {
    /// Global numeric identifier.
    pub id: u64,
    /// Repository-local number (`#123`).
    #[serde(default)]
    pub number: Option<u64>,
    /// Issue or pull request title.
    pub title: String,
    /// Browser URL for the item.
    pub html_url: String,
    /// Author, when present.
    #[serde(default)]
    pub user: Option<IssueUser>,
}

/// Minimal author record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueUser {
    /// Login name.
    pub login: String,
}

/// Error body GitHub returns alongside non-2xx statuses.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorBody {
    pub message: String,
}
