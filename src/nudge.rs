//! Nudges: actionable notifications raised by watchers.
//!
//! A [`Nudge`] is immutable once created. Watchers replace or remove nudges,
//! they never edit them. The action is a command value the consumer
//! dispatches, so no nudge carries captured state.

use std::fmt;
use uuid::Uuid;

/// Unique nudge identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NudgeId(Uuid);

impl NudgeId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for NudgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// What happens when the user acts on a nudge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NudgeAction {
    /// Open the referenced item (e.g. a pull request URL) in the browser.
    OpenReference(String),
    /// Acknowledge every nudge of the owning watcher.
    AcknowledgeSelf,
}

/// One actionable event raised by a watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nudge {
    id: NudgeId,
    title: String,
    source: String,
    action: NudgeAction,
}

impl Nudge {
    /// Create a nudge with a fresh id.
    pub fn new(title: impl Into<String>, source: impl Into<String>, action: NudgeAction) -> Self {
        Self {
            id: NudgeId::new(),
            title: title.into(),
            source: source.into(),
            action,
        }
    }

    pub fn id(&self) -> NudgeId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Name of the watcher that raised this nudge.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn action(&self) -> &NudgeAction {
        &self.action
    }
}
