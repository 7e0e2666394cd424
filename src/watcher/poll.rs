//! Remote query watcher.
//!
//! A [`PollWatcher`] turns the results of a [`QuerySource`] search into
//! nudges, one per item, each opening the item's reference. Every check runs
//! as its own tokio task; results of checks begun before the latest
//! `start()`/`stop()` are dropped.

use super::machine::{Acknowledge, WatcherCore, WatcherSnapshot, WhenEmptied};
use super::{WatcherId, WatcherState};
use crate::config::WatcherSpec;
use crate::nudge::{Nudge, NudgeAction, NudgeId};
use crate::source::{QueryError, QuerySource};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

/// Display name used when the spec does not provide one.
pub const DEFAULT_POLL_NAME: &str = "GitHub PRs";

/// Longest free text the remote search accepts. Qualifiers such as
/// `repo:owner/name` do not count toward it.
pub const MAX_QUERY_LEN: usize = 256;

const BASE_TERMS: &str = "is:open is:pr";

/// Inputs to a poll watcher's query.
#[derive(Clone, Default)]
pub struct PollParams {
    pub credential: Option<String>,
    pub user: Option<String>,
    pub collections: Vec<String>,
    pub custom_query: Option<String>,
}

impl fmt::Debug for PollParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollParams")
            .field("credential", &self.credential.as_ref().map(|_| "<redacted>"))
            .field("user", &self.user)
            .field("collections", &self.collections)
            .field("custom_query", &self.custom_query)
            .finish()
    }
}

impl PollParams {
    /// Read parameters from a spec, resolving `token_env` against the
    /// process environment.
    pub fn from_spec(spec: &WatcherSpec) -> Self {
        Self::from_spec_with(spec, |name| std::env::var(name).ok())
    }

    /// Like [`Self::from_spec`] with a custom environment lookup.
    ///
    /// A non-blank inline token wins over the environment variable.
    pub fn from_spec_with<F>(spec: &WatcherSpec, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let credential = non_blank(spec.token.as_deref()).or_else(|| {
            let var = non_blank(spec.token_env.as_deref())?;
            non_blank(lookup(&var).as_deref())
        });
        Self {
            credential,
            user: non_blank(spec.user.as_deref()),
            collections: spec
                .repositories
                .iter()
                .filter_map(|r| non_blank(Some(r.as_str())))
                .collect(),
            custom_query: non_blank(spec.query.as_deref()),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

/// Build the search query for `params`.
///
/// A custom query is used as given. Otherwise the query is `is:open is:pr`,
/// then `review-requested:<user>`, then one `repo:<name>` per collection.
///
/// # Errors
///
/// Returns [`QueryError::InvalidRequest`] when the text outside qualifiers
/// exceeds [`MAX_QUERY_LEN`] characters.
pub fn build_query(params: &PollParams) -> Result<String, QueryError> {
    let query = match params.custom_query.as_deref().map(str::trim) {
        Some(custom) if !custom.is_empty() => custom.to_owned(),
        _ => {
            let mut terms = vec![BASE_TERMS.to_owned()];
            if let Some(user) = params.user.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
                terms.push(format!("review-requested:{user}"));
            }
            terms.extend(
                params
                    .collections
                    .iter()
                    .map(|c| c.trim())
                    .filter(|c| !c.is_empty())
                    .map(|c| format!("repo:{c}")),
            );
            terms.join(" ")
        }
    };

    let len = free_text_len(&query);
    if len > MAX_QUERY_LEN {
        return Err(QueryError::InvalidRequest(format!(
            "query text is {len} characters, limit is {MAX_QUERY_LEN}"
        )));
    }
    Ok(query)
}

/// Characters of `query` outside `key:value` qualifiers, counting one space
/// between the remaining words.
fn free_text_len(query: &str) -> usize {
    let words: Vec<&str> = query.split_whitespace().filter(|w| !is_qualifier(w)).collect();
    let chars: usize = words.iter().map(|w| w.chars().count()).sum();
    chars + words.len().saturating_sub(1)
}

fn is_qualifier(word: &str) -> bool {
    let word = word.strip_prefix('-').unwrap_or(word);
    match word.split_once(':') {
        Some((key, value)) => {
            !key.is_empty()
                && !value.is_empty()
                && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        }
        None => false,
    }
}

/// Watches a remote search and raises one nudge per result.
pub struct PollWatcher {
    core: Arc<WatcherCore>,
    params: PollParams,
    source: Arc<dyn QuerySource>,
}

impl fmt::Debug for PollWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollWatcher")
            .field("core", &self.core)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl PollWatcher {
    pub fn new(name: impl Into<String>, params: PollParams, source: Arc<dyn QuerySource>) -> Self {
        Self {
            core: Arc::new(WatcherCore::new(name.into())),
            params,
            source,
        }
    }

    pub fn from_spec(spec: &WatcherSpec, source: Arc<dyn QuerySource>) -> Self {
        let name = spec.display_name().unwrap_or(DEFAULT_POLL_NAME);
        Self::new(name, PollParams::from_spec(spec), source)
    }

    pub fn params(&self) -> &PollParams {
        &self.params
    }

    pub fn id(&self) -> WatcherId {
        self.core.id()
    }

    pub fn name(&self) -> &str {
        self.core.name()
    }

    pub fn state(&self) -> WatcherState {
        self.core.state()
    }

    pub fn snapshot(&self) -> WatcherSnapshot {
        self.core.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<WatcherSnapshot> {
        self.core.subscribe()
    }

    /// Begin a cycle with an immediate check. No-op while active.
    pub fn start(&self) {
        if let Some(generation) = self.core.begin_start() {
            info!("{}: started", self.core.name());
            self.run_check(generation);
        }
    }

    pub fn stop(&self) {
        self.core.stop();
        info!("{}: stopped", self.core.name());
    }

    /// Run one check unless stopped or a check is already in flight.
    pub fn check_now(&self) {
        if let Some(generation) = self.core.begin_check() {
            self.run_check(generation);
        }
    }

    pub fn acknowledge_nudge(&self, id: NudgeId) {
        self.core.acknowledge(Acknowledge::One(id), WhenEmptied::Idle);
    }

    pub fn acknowledge_all_nudges(&self) {
        self.core.acknowledge(Acknowledge::All, WhenEmptied::Idle);
    }

    fn run_check(&self, generation: u64) {
        let Some(credential) = self.params.credential.clone() else {
            warn!("{}: no credential configured", self.core.name());
            self.core
                .settle(generation, Err(QueryError::CredentialMissing.to_string()));
            return;
        };

        let query = match build_query(&self.params) {
            Ok(query) => query,
            Err(e) => {
                warn!("{}: {e}", self.core.name());
                self.core.settle(generation, Err(e.to_string()));
                return;
            }
        };

        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                self.core.fail(format!("cannot schedule check: {e}"));
                return;
            }
        };

        let core = Arc::clone(&self.core);
        let source = Arc::clone(&self.source);
        handle.spawn(async move {
            trace!("{}: searching `{query}`", core.name());
            let outcome = match source.search(&credential, &query).await {
                Ok(items) => {
                    debug!("{}: {} items", core.name(), items.len());
                    Ok(items
                        .into_iter()
                        .map(|item| {
                            Nudge::new(
                                item.title,
                                core.name(),
                                NudgeAction::OpenReference(item.reference),
                            )
                        })
                        .collect())
                }
                Err(e) => {
                    warn!("{}: check failed: {e}", core.name());
                    Err(e.to_string())
                }
            };
            core.settle(generation, outcome);
        });
    }
}
