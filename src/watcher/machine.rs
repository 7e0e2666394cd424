//! State shared by every watcher variant.
//!
//! [`WatcherCore`] is the single mutation path of a watcher. Every transition
//! happens under one mutex and is published to subscribers before the lock is
//! released, so observers see transitions in the order they happened.
//!
//! Each check is tagged with the generation current when it began. `start()`
//! and `stop()` bump the generation; a result carrying an older generation is
//! discarded.

use super::{WatcherId, WatcherState};
use crate::nudge::{Nudge, NudgeId};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::watch;
use tracing::debug;

/// Point-in-time view of a watcher, as published to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatcherSnapshot {
    pub id: WatcherId,
    pub name: String,
    pub state: WatcherState,
    /// Outstanding nudges in the order they were raised. Empty unless `Alert`.
    pub nudges: Vec<Nudge>,
    /// Failure description. Set exactly when `state` is `Error`.
    pub last_error: Option<String>,
}

/// Which nudges an acknowledgement removes.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Acknowledge {
    One(NudgeId),
    All,
}

/// Where a watcher goes once its last nudge is acknowledged.
#[derive(Debug, Clone, Copy)]
pub(crate) enum WhenEmptied {
    /// Settle in `Idle` until the next check.
    Idle,
    /// Begin a new cycle under a new generation.
    Restart,
}

#[derive(Debug)]
struct Inner {
    state: WatcherState,
    nudges: Vec<Nudge>,
    last_error: Option<String>,
    generation: u64,
}

#[derive(Debug)]
pub(crate) struct WatcherCore {
    id: WatcherId,
    name: String,
    inner: Mutex<Inner>,
    tx: watch::Sender<WatcherSnapshot>,
}

impl WatcherCore {
    pub(crate) fn new(name: String) -> Self {
        let id = WatcherId::next();
        let (tx, _rx) = watch::channel(WatcherSnapshot {
            id,
            name: name.clone(),
            state: WatcherState::Stopped,
            nudges: Vec::new(),
            last_error: None,
        });
        Self {
            id,
            name,
            inner: Mutex::new(Inner {
                state: WatcherState::Stopped,
                nudges: Vec::new(),
                last_error: None,
                generation: 0,
            }),
            tx,
        }
    }

    pub(crate) fn id(&self) -> WatcherId {
        self.id
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn state(&self) -> WatcherState {
        self.lock().state
    }

    pub(crate) fn snapshot(&self) -> WatcherSnapshot {
        self.tx.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<WatcherSnapshot> {
        self.tx.subscribe()
    }

    /// Whether `generation` is still the live one.
    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.lock().generation == generation
    }

    /// Enter a new cycle unless one is already active.
    ///
    /// Returns the generation of the new cycle, already in `Checking`.
    pub(crate) fn begin_start(&self) -> Option<u64> {
        let mut inner = self.lock();
        if inner.state.is_active() {
            debug!("{}: start ignored, already {}", self.name, inner.state);
            return None;
        }
        inner.generation += 1;
        inner.nudges.clear();
        inner.last_error = None;
        self.transition(&mut inner, WatcherState::Checking);
        Some(inner.generation)
    }

    /// Enter `Checking` for a check within the current cycle.
    ///
    /// Stopped watchers are not checked, and a check already in flight is not
    /// duplicated.
    pub(crate) fn begin_check(&self) -> Option<u64> {
        let mut inner = self.lock();
        match inner.state {
            WatcherState::Stopped => {
                debug!("{}: check skipped, watcher is stopped", self.name);
                None
            }
            WatcherState::Checking => {
                debug!("{}: check skipped, one is already in flight", self.name);
                None
            }
            _ => {
                inner.nudges.clear();
                inner.last_error = None;
                self.transition(&mut inner, WatcherState::Checking);
                Some(inner.generation)
            }
        }
    }

    /// Apply the result of a check begun under `generation`.
    ///
    /// `Ok` with no nudges settles `Idle`, `Ok` with nudges settles `Alert`
    /// holding exactly those nudges, `Err` settles `Error`. Returns `false`
    /// when the result is stale and was dropped.
    pub(crate) fn settle(&self, generation: u64, outcome: Result<Vec<Nudge>, String>) -> bool {
        let mut inner = self.lock();
        if inner.generation != generation || inner.state != WatcherState::Checking {
            debug!(
                "{}: discarding stale check result (generation {generation}, current {}, state {})",
                self.name, inner.generation, inner.state
            );
            return false;
        }
        match outcome {
            Ok(nudges) if nudges.is_empty() => {
                inner.nudges.clear();
                inner.last_error = None;
                self.transition(&mut inner, WatcherState::Idle);
            }
            Ok(nudges) => {
                inner.nudges = nudges;
                inner.last_error = None;
                self.transition(&mut inner, WatcherState::Alert);
            }
            Err(message) => {
                inner.nudges.clear();
                inner.last_error = Some(message);
                self.transition(&mut inner, WatcherState::Error);
            }
        }
        true
    }

    /// Move an `Idle` watcher to `Alert` without a check, for watchers whose
    /// findings arrive on their own schedule.
    pub(crate) fn raise(&self, generation: u64, nudges: Vec<Nudge>) -> bool {
        let mut inner = self.lock();
        if nudges.is_empty()
            || inner.generation != generation
            || inner.state != WatcherState::Idle
        {
            return false;
        }
        inner.nudges = nudges;
        self.transition(&mut inner, WatcherState::Alert);
        true
    }

    /// Unconditionally stop, invalidating any in-flight check.
    pub(crate) fn stop(&self) {
        let mut inner = self.lock();
        inner.generation += 1;
        inner.nudges.clear();
        inner.last_error = None;
        self.transition(&mut inner, WatcherState::Stopped);
    }

    /// Enter `Error` after a local failure that no check can recover from.
    pub(crate) fn fail(&self, message: String) {
        let mut inner = self.lock();
        inner.generation += 1;
        inner.nudges.clear();
        inner.last_error = Some(message);
        self.transition(&mut inner, WatcherState::Error);
    }

    /// Remove acknowledged nudges. When that empties an `Alert` watcher it
    /// leaves `Alert` in the same step.
    ///
    /// Returns the new generation when `WhenEmptied::Restart` began a cycle.
    pub(crate) fn acknowledge(&self, which: Acknowledge, when_emptied: WhenEmptied) -> Option<u64> {
        let mut inner = self.lock();
        let removed = match which {
            Acknowledge::One(id) => match inner.nudges.iter().position(|n| n.id() == id) {
                Some(index) => {
                    inner.nudges.remove(index);
                    1
                }
                None => 0,
            },
            Acknowledge::All => {
                let count = inner.nudges.len();
                inner.nudges.clear();
                count
            }
        };

        if removed == 0 {
            debug!("{}: nothing to acknowledge", self.name);
            return None;
        }
        if !inner.nudges.is_empty() || inner.state != WatcherState::Alert {
            debug!("{}: {} nudges remaining", self.name, inner.nudges.len());
            self.publish(&inner);
            return None;
        }

        match when_emptied {
            WhenEmptied::Idle => {
                self.transition(&mut inner, WatcherState::Idle);
                None
            }
            WhenEmptied::Restart => {
                inner.generation += 1;
                inner.last_error = None;
                self.transition(&mut inner, WatcherState::Checking);
                self.transition(&mut inner, WatcherState::Idle);
                Some(inner.generation)
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn transition(&self, inner: &mut Inner, next: WatcherState) {
        if inner.state != next {
            debug!("{}: {} -> {}", self.name, inner.state, next);
        }
        inner.state = next;
        self.publish(inner);
    }

    fn publish(&self, inner: &Inner) {
        let snapshot = WatcherSnapshot {
            id: self.id,
            name: self.name.clone(),
            state: inner.state,
            nudges: inner.nudges.clone(),
            last_error: inner.last_error.clone(),
        };
        self.tx.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::nudge::NudgeAction;

    fn nudges(titles: &[&str]) -> Vec<Nudge> {
        titles
            .iter()
            .map(|t| Nudge::new(*t, "test", NudgeAction::AcknowledgeSelf))
            .collect()
    }

    fn assert_invariants(core: &WatcherCore) {
        let snap = core.snapshot();
        if snap.state != WatcherState::Alert {
            assert!(snap.nudges.is_empty(), "nudges outside Alert: {snap:?}");
        } else {
            assert!(!snap.nudges.is_empty(), "Alert without nudges: {snap:?}");
        }
        assert_eq!(snap.last_error.is_some(), snap.state == WatcherState::Error);
    }

    #[test]
    fn start_is_idempotent_while_active() {
        let core = WatcherCore::new("w".into());
        let generation = core.begin_start().expect("first start");
        assert!(core.begin_start().is_none());
        assert_eq!(core.state(), WatcherState::Checking);
        assert!(core.settle(generation, Ok(vec![])));
        assert!(core.begin_start().is_none());
        assert_eq!(core.state(), WatcherState::Idle);
    }

    #[test]
    fn start_recovers_from_error() {
        let core = WatcherCore::new("w".into());
        let generation = core.begin_start().unwrap();
        core.settle(generation, Err("boom".into()));
        assert_eq!(core.state(), WatcherState::Error);
        assert_invariants(&core);

        let next = core.begin_start().expect("restart from error");
        assert!(next > generation);
        assert!(core.snapshot().last_error.is_none());
    }

    #[test]
    fn settle_replaces_nudges_and_sets_state() {
        let core = WatcherCore::new("w".into());
        let generation = core.begin_start().unwrap();
        core.settle(generation, Ok(nudges(&["a", "b"])));
        assert_eq!(core.state(), WatcherState::Alert);
        assert_invariants(&core);

        let generation = core.begin_check().unwrap();
        assert_invariants(&core);
        core.settle(generation, Ok(nudges(&["c"])));
        let titles: Vec<String> = core
            .snapshot()
            .nudges
            .iter()
            .map(|n| n.title().to_owned())
            .collect();
        assert_eq!(titles, vec!["c"]);
    }

    #[test]
    fn stale_results_are_discarded() {
        let core = WatcherCore::new("w".into());
        let generation = core.begin_start().unwrap();
        core.stop();
        assert!(!core.settle(generation, Ok(nudges(&["late"]))));
        assert_eq!(core.state(), WatcherState::Stopped);
        assert!(core.snapshot().nudges.is_empty());

        let newer = core.begin_start().unwrap();
        assert!(!core.settle(generation, Err("late failure".into())));
        assert!(core.settle(newer, Ok(vec![])));
        assert_eq!(core.state(), WatcherState::Idle);
    }

    #[test]
    fn check_is_skipped_when_stopped_or_in_flight() {
        let core = WatcherCore::new("w".into());
        assert!(core.begin_check().is_none());
        core.begin_start().unwrap();
        assert!(core.begin_check().is_none());
    }

    #[test]
    fn acknowledging_last_nudge_goes_idle() {
        let core = WatcherCore::new("w".into());
        let generation = core.begin_start().unwrap();
        core.settle(generation, Ok(nudges(&["a", "b"])));
        let ids: Vec<NudgeId> = core.snapshot().nudges.iter().map(Nudge::id).collect();

        assert!(core.acknowledge(Acknowledge::One(ids[0]), WhenEmptied::Idle).is_none());
        assert_eq!(core.state(), WatcherState::Alert);
        assert_eq!(core.snapshot().nudges.len(), 1);

        core.acknowledge(Acknowledge::One(ids[1]), WhenEmptied::Idle);
        assert_eq!(core.state(), WatcherState::Idle);
        assert_invariants(&core);
    }

    #[test]
    fn acknowledging_unknown_nudge_is_noop() {
        let core = WatcherCore::new("w".into());
        let generation = core.begin_start().unwrap();
        core.settle(generation, Ok(nudges(&["a"])));
        let stranger = Nudge::new("x", "other", NudgeAction::AcknowledgeSelf).id();
        assert!(core.acknowledge(Acknowledge::One(stranger), WhenEmptied::Idle).is_none());
        assert_eq!(core.state(), WatcherState::Alert);
        assert_eq!(core.snapshot().nudges.len(), 1);
    }

    #[test]
    fn restart_policy_begins_new_generation() {
        let core = WatcherCore::new("w".into());
        let generation = core.begin_start().unwrap();
        core.settle(generation, Ok(vec![]));
        assert!(core.raise(generation, nudges(&["done"])));

        let next = core
            .acknowledge(Acknowledge::All, WhenEmptied::Restart)
            .expect("restart");
        assert!(next > generation);
        assert_eq!(core.state(), WatcherState::Idle);
        assert!(!core.is_current(generation));
        assert!(core.is_current(next));
    }

    #[test]
    fn raise_requires_idle_and_current_generation() {
        let core = WatcherCore::new("w".into());
        assert!(!core.raise(0, nudges(&["x"])));
        let generation = core.begin_start().unwrap();
        assert!(!core.raise(generation, nudges(&["x"])));
        core.settle(generation, Ok(vec![]));
        assert!(!core.raise(generation, vec![]));
        assert!(!core.raise(generation + 1, nudges(&["x"])));
        assert!(core.raise(generation, nudges(&["x"])));
    }

    #[test]
    fn fail_sets_error_and_invalidates_checks() {
        let core = WatcherCore::new("w".into());
        let generation = core.begin_start().unwrap();
        core.fail("no runtime".into());
        assert_eq!(core.state(), WatcherState::Error);
        assert_eq!(core.snapshot().last_error.as_deref(), Some("no runtime"));
        assert!(!core.settle(generation, Ok(vec![])));
    }

    #[tokio::test]
    async fn subscribers_see_published_transitions() {
        let core = WatcherCore::new("w".into());
        let mut rx = core.subscribe();
        let generation = core.begin_start().unwrap();
        core.settle(generation, Ok(nudges(&["a"])));

        rx.changed().await.expect("sender alive");
        let snap = rx.borrow_and_update().clone();
        assert_eq!(snap.state, WatcherState::Alert);
        assert_eq!(snap.nudges.len(), 1);
        assert_eq!(snap.id, core.id());
    }
}
