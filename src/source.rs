//! Remote query sources used by poll watchers.
//!
//! [`QuerySource`] is the seam between a poll watcher and whatever answers
//! its searches. [`GitHubQuerySource`] adapts the `nudge-github` client.

use async_trait::async_trait;
use nudge_github::{GitHubClient, GitHubConfig, GitHubError};

/// One result of a remote search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// Source-specific identifier.
    pub id: String,
    pub title: String,
    /// Something an [`crate::opener::ItemOpener`] can open, normally a URL.
    pub reference: String,
}

/// Classified failure of a remote search.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("credential missing")]
    CredentialMissing,

    /// The request could not be built (query construction, bad endpoint).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Network failure before a response arrived.
    #[error("request failed: {0}")]
    Transport(String),

    /// A response arrived but could not be decoded.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("unexpected status {status}: {message}")]
    UnexpectedStatus { status: u16, message: String },
}

/// Answers poll watcher searches.
///
/// Implementations must be `Send + Sync`; many watchers share one source and
/// their checks run concurrently.
#[async_trait]
pub trait QuerySource: Send + Sync {
    /// Run `query` authenticated with `credential`, returning items in the
    /// order the remote reports them.
    async fn search(&self, credential: &str, query: &str) -> Result<Vec<Item>, QueryError>;
}

/// [`QuerySource`] backed by the GitHub issue search API.
#[derive(Debug, Clone)]
pub struct GitHubQuerySource {
    client: GitHubClient,
}

impl GitHubQuerySource {
    /// Build a source with the given client configuration.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidRequest`] if the configuration is invalid
    /// or the HTTP client cannot be created.
    pub fn new(config: GitHubConfig) -> Result<Self, QueryError> {
        let client = GitHubClient::new(config).map_err(QueryError::from)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl QuerySource for GitHubQuerySource {
    async fn search(&self, credential: &str, query: &str) -> Result<Vec<Item>, QueryError> {
        let issues = self.client.search_issues(credential, query).await?;
        Ok(issues
            .into_iter()
            .map(|issue| Item {
                id: issue.id.to_string(),
                title: issue.title,
                reference: issue.html_url,
            })
            .collect())
    }
}

impl From<GitHubError> for QueryError {
    fn from(err: GitHubError) -> Self {
        match err {
            GitHubError::MissingToken => Self::CredentialMissing,
            GitHubError::InvalidRequest(msg) | GitHubError::Config(msg) => {
                Self::InvalidRequest(msg)
            }
            GitHubError::Http(msg) => Self::Transport(msg),
            GitHubError::Parse(msg) => Self::MalformedResponse(msg),
            GitHubError::Status { status, message } => Self::UnexpectedStatus { status, message },
        }
    }
}
