//! Local countdown watcher.

use super::machine::{Acknowledge, WatcherCore, WatcherSnapshot, WhenEmptied};
use super::{WatcherId, WatcherState};
use crate::config::{DEFAULT_TIMER_DURATION_SECS, WatcherSpec};
use crate::nudge::{Nudge, NudgeAction, NudgeId};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Display name used when the spec does not provide one.
pub const DEFAULT_TIMER_NAME: &str = "Timer";

/// Title of the nudge raised when the countdown completes.
pub const TIMER_FINISHED_TITLE: &str = "Timer Finished!";

const TICK: Duration = Duration::from_secs(1);

/// Counts down a fixed duration while `Idle`, then raises a single
/// "Timer Finished!" nudge. Acknowledging it restarts the countdown.
#[derive(Debug)]
pub struct TimerWatcher {
    core: Arc<WatcherCore>,
    duration: Duration,
    countdown: Arc<Mutex<Countdown>>,
}

#[derive(Debug, Default)]
struct Countdown {
    remaining_secs: Option<u64>,
    cancel: Option<CancellationToken>,
}

impl TimerWatcher {
    /// Create a stopped timer. Durations below one second are raised to one.
    pub fn new(name: impl Into<String>, duration: Duration) -> Self {
        Self {
            core: Arc::new(WatcherCore::new(name.into())),
            duration: duration.max(TICK),
            countdown: Arc::new(Mutex::new(Countdown::default())),
        }
    }

    pub fn from_spec(spec: &WatcherSpec) -> Self {
        let name = spec.display_name().unwrap_or(DEFAULT_TIMER_NAME);
        let secs = spec
            .timer_duration_secs
            .unwrap_or(DEFAULT_TIMER_DURATION_SECS);
        Self::new(name, Duration::from_secs(secs))
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Time left on the running countdown, `None` when no countdown runs.
    pub fn remaining(&self) -> Option<Duration> {
        lock(&self.countdown).remaining_secs.map(Duration::from_secs)
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

    /// Begin a countdown. No-op while one is already running or pending
    /// acknowledgement. Must be called within a tokio runtime.
    pub fn start(&self) {
        let Some(generation) = self.core.begin_start() else {
            return;
        };
        info!(
            "{}: starting {}s countdown",
            self.core.name(),
            self.duration.as_secs()
        );
        self.core.settle(generation, Ok(Vec::new()));
        self.spawn_countdown(generation);
    }

    pub fn stop(&self) {
        self.cancel_countdown();
        self.core.stop();
        info!("{}: stopped", self.core.name());
    }

    /// Report progress. The countdown is not reset.
    pub fn check_now(&self) {
        match self.core.state() {
            WatcherState::Stopped => debug!("{}: check skipped, watcher is stopped", self.core.name()),
            WatcherState::Alert => debug!("{}: finished, awaiting acknowledgement", self.core.name()),
            state => match self.remaining() {
                Some(left) => debug!("{}: {state}, {}s remaining", self.core.name(), left.as_secs()),
                None => debug!("{}: {state}, no countdown running", self.core.name()),
            },
        }
    }

    pub fn acknowledge_nudge(&self, id: NudgeId) {
        self.acknowledge(Acknowledge::One(id));
    }

    pub fn acknowledge_all_nudges(&self) {
        self.acknowledge(Acknowledge::All);
    }

    fn acknowledge(&self, which: Acknowledge) {
        if let Some(generation) = self.core.acknowledge(which, WhenEmptied::Restart) {
            debug!("{}: acknowledged, restarting countdown", self.core.name());
            self.spawn_countdown(generation);
        }
    }

    fn cancel_countdown(&self) {
        let mut countdown = lock(&self.countdown);
        if let Some(token) = countdown.cancel.take() {
            token.cancel();
        }
        countdown.remaining_secs = None;
    }

    fn spawn_countdown(&self, generation: u64) {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                self.cancel_countdown();
                self.core.fail(format!("cannot schedule countdown: {e}"));
                return;
            }
        };

        let token = CancellationToken::new();
        {
            let mut countdown = lock(&self.countdown);
            if let Some(previous) = countdown.cancel.replace(token.clone()) {
                previous.cancel();
            }
            countdown.remaining_secs = Some(self.duration.as_secs());
        }

        let core = Arc::clone(&self.core);
        let countdown = Arc::clone(&self.countdown);
        handle.spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + TICK, TICK);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);
            loop {
                tokio::select! {
                    _ = token.cancelled() => return,
                    _ = ticker.tick() => {}
                }
                if !core.is_current(generation) {
                    return;
                }

                let left = {
                    let mut countdown = lock(&countdown);
                    let left = countdown.remaining_secs.unwrap_or(0).saturating_sub(1);
                    countdown.remaining_secs = Some(left);
                    left
                };
                if left > 0 {
                    continue;
                }

                let nudge = Nudge::new(TIMER_FINISHED_TITLE, core.name(), NudgeAction::AcknowledgeSelf);
                if core.raise(generation, vec![nudge]) {
                    info!("{}: countdown finished", core.name());
                }
                return;
            }
        });
    }
}

impl Drop for TimerWatcher {
    fn drop(&mut self) {
        self.cancel_countdown();
    }
}

fn lock(countdown: &Mutex<Countdown>) -> std::sync::MutexGuard<'_, Countdown> {
    countdown.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::config::WatcherKind;

    async fn advance(by: Duration) {
        tokio::time::advance(by).await;
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn two_second_timer_alerts_then_restarts() {
        let timer = TimerWatcher::new("tea", Duration::from_secs(2));
        timer.start();
        assert_eq!(timer.state(), WatcherState::Idle);
        assert_eq!(timer.remaining(), Some(Duration::from_secs(2)));

        advance(Duration::from_secs(1)).await;
        assert_eq!(timer.state(), WatcherState::Idle);
        assert_eq!(timer.remaining(), Some(Duration::from_secs(1)));

        advance(Duration::from_secs(1)).await;
        let snap = timer.snapshot();
        assert_eq!(snap.state, WatcherState::Alert);
        assert_eq!(snap.nudges.len(), 1);
        assert_eq!(snap.nudges[0].title(), TIMER_FINISHED_TITLE);
        assert_eq!(snap.nudges[0].source(), "tea");
        assert_eq!(snap.nudges[0].action(), &NudgeAction::AcknowledgeSelf);

        timer.acknowledge_nudge(snap.nudges[0].id());
        assert_eq!(timer.state(), WatcherState::Idle);
        assert!(timer.snapshot().nudges.is_empty());
        assert_eq!(timer.remaining(), Some(Duration::from_secs(2)));

        advance(Duration::from_secs(2)).await;
        assert_eq!(timer.state(), WatcherState::Alert);
    }

    #[tokio::test(start_paused = true)]
    async fn check_now_does_not_reset_countdown() {
        let timer = TimerWatcher::new("t", Duration::from_secs(3));
        timer.start();
        advance(Duration::from_secs(2)).await;
        timer.check_now();
        timer.start();
        assert_eq!(timer.remaining(), Some(Duration::from_secs(1)));
        advance(Duration::from_secs(1)).await;
        assert_eq!(timer.state(), WatcherState::Alert);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_countdown() {
        let timer = TimerWatcher::new("t", Duration::from_secs(1));
        timer.start();
        timer.stop();
        assert_eq!(timer.remaining(), None);
        advance(Duration::from_secs(5)).await;
        assert_eq!(timer.state(), WatcherState::Stopped);
        assert!(timer.snapshot().nudges.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn restart_after_stop_begins_fresh_countdown() {
        let timer = TimerWatcher::new("t", Duration::from_secs(2));
        timer.start();
        advance(Duration::from_secs(1)).await;
        timer.stop();
        timer.start();
        assert_eq!(timer.remaining(), Some(Duration::from_secs(2)));
        advance(Duration::from_secs(1)).await;
        assert_eq!(timer.state(), WatcherState::Idle);
        advance(Duration::from_secs(1)).await;
        assert_eq!(timer.state(), WatcherState::Alert);
        assert_eq!(timer.snapshot().nudges.len(), 1);
    }

    #[test]
    fn from_spec_applies_defaults() {
        let mut spec = WatcherSpec::new(WatcherKind::Timer);
        let timer = TimerWatcher::from_spec(&spec);
        assert_eq!(timer.name(), DEFAULT_TIMER_NAME);
        assert_eq!(timer.duration(), Duration::from_secs(DEFAULT_TIMER_DURATION_SECS));

        spec.name = Some("Stretch".into());
        spec.timer_duration_secs = Some(0);
        let timer = TimerWatcher::from_spec(&spec);
        assert_eq!(timer.name(), "Stretch");
        assert_eq!(timer.duration(), Duration::from_secs(1));
    }

    #[test]
    fn start_outside_runtime_settles_error() {
        let timer = TimerWatcher::new("t", Duration::from_secs(1));
        timer.start();
        let snap = timer.snapshot();
        assert_eq!(snap.state, WatcherState::Error);
        assert!(snap.last_error.is_some());
    }
}
