//! Watchers: one state machine per monitored source.
//!
//! Every variant implements [`Watcher`]. The manager holds them as
//! [`AnyWatcher`] and never looks past the trait.

mod machine;
pub mod poll;
pub mod state;
pub mod timer;

pub use machine::WatcherSnapshot;
pub use poll::{PollParams, PollWatcher};
pub use state::{OverallState, WatcherState, aggregate};
pub use timer::TimerWatcher;

use crate::config::{WatcherKind, WatcherSpec};
use crate::nudge::NudgeId;
use crate::source::QuerySource;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;
use tracing::warn;

static NEXT_WATCHER_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique watcher identifier, assigned at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatcherId(u64);

impl WatcherId {
    pub(crate) fn next() -> Self {
        Self(NEXT_WATCHER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for WatcherId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "watcher-{}", self.0)
    }
}

/// Capabilities shared by every watcher.
///
/// All operations return immediately. Work they start (countdowns, remote
/// searches) continues on the tokio runtime and is reported through
/// [`Watcher::subscribe`].
pub trait Watcher: Send + Sync {
    fn id(&self) -> WatcherId;

    fn name(&self) -> &str;

    /// Begin a cycle. No-op while `Checking`, `Idle` or `Alert`.
    fn start(&self);

    /// Stop, clearing nudges and error. Any in-flight result is dropped.
    fn stop(&self);

    /// Run one check. No-op when stopped.
    fn check_now(&self);

    fn acknowledge_nudge(&self, id: NudgeId);

    fn acknowledge_all_nudges(&self);

    fn snapshot(&self) -> WatcherSnapshot;

    fn state(&self) -> WatcherState {
        self.snapshot().state
    }

    /// Receiver of every published snapshot, starting from the current one.
    fn subscribe(&self) -> watch::Receiver<WatcherSnapshot>;
}

/// The closed set of watcher variants.
#[derive(Debug)]
pub enum AnyWatcher {
    Timer(TimerWatcher),
    Poll(PollWatcher),
}

impl AnyWatcher {
    /// Build the watcher a spec describes.
    ///
    /// Disabled specs and unknown types yield `None`.
    pub fn from_spec(spec: &WatcherSpec, source: &Arc<dyn QuerySource>) -> Option<Self> {
        if !spec.enabled {
            return None;
        }
        match spec.kind {
            WatcherKind::Timer => Some(Self::Timer(TimerWatcher::from_spec(spec))),
            WatcherKind::Poll => Some(Self::Poll(PollWatcher::from_spec(spec, Arc::clone(source)))),
            WatcherKind::Unknown => {
                warn!("skipping watcher {}: unknown type", spec.label());
                None
            }
        }
    }
}

impl From<TimerWatcher> for AnyWatcher {
    fn from(watcher: TimerWatcher) -> Self {
        Self::Timer(watcher)
    }
}

impl From<PollWatcher> for AnyWatcher {
    fn from(watcher: PollWatcher) -> Self {
        Self::Poll(watcher)
    }
}

macro_rules! delegate {
    ($self:ident, $w:ident => $call:expr) => {
        match $self {
            AnyWatcher::Timer($w) => $call,
            AnyWatcher::Poll($w) => $call,
        }
    };
}

impl Watcher for AnyWatcher {
    fn id(&self) -> WatcherId {
        delegate!(self, w => w.id())
    }

    fn name(&self) -> &str {
        delegate!(self, w => w.name())
    }

    fn start(&self) {
        delegate!(self, w => w.start())
    }

    fn stop(&self) {
        delegate!(self, w => w.stop())
    }

    fn check_now(&self) {
        delegate!(self, w => w.check_now())
    }

    fn acknowledge_nudge(&self, id: NudgeId) {
        delegate!(self, w => w.acknowledge_nudge(id))
    }

    fn acknowledge_all_nudges(&self) {
        delegate!(self, w => w.acknowledge_all_nudges())
    }

    fn snapshot(&self) -> WatcherSnapshot {
        delegate!(self, w => w.snapshot())
    }

    fn state(&self) -> WatcherState {
        delegate!(self, w => w.state())
    }

    fn subscribe(&self) -> watch::Receiver<WatcherSnapshot> {
        delegate!(self, w => w.subscribe())
    }
}
