//! Watcher registry, scheduler and aggregate state.
//!
//! [`WatcherManager`] builds one watcher per enabled spec, starts them, and
//! drives one shared interval that asks every watcher to check. It subscribes
//! to each watcher at registration and recomputes the overall state after
//! every published change.
//!
//! # Usage
//!
//! ```rust,ignore
//! let manager = WatcherManager::from_provider(&provider, deps);
//! let scheduler = manager.run();
//! tokio::signal::ctrl_c().await?;
//! manager.stop_all_watchers();
//! manager.shutdown();
//! ```

use crate::config::{AppConfig, ConfigError, ConfigProvider};
use crate::nudge::{NudgeAction, NudgeId};
use crate::opener::ItemOpener;
use crate::sink::StatusSink;
use crate::source::QuerySource;
use crate::watcher::{
    AnyWatcher, OverallState, Watcher, WatcherId, WatcherSnapshot, WatcherState, aggregate,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Collaborators the manager hands to watchers and calls on their behalf.
#[derive(Clone)]
pub struct ManagerDeps {
    pub source: Arc<dyn QuerySource>,
    pub opener: Arc<dyn ItemOpener>,
    pub sink: Arc<dyn StatusSink>,
}

impl ManagerDeps {
    pub fn new(
        source: Arc<dyn QuerySource>,
        opener: Arc<dyn ItemOpener>,
        sink: Arc<dyn StatusSink>,
    ) -> Self {
        Self {
            source,
            opener,
            sink,
        }
    }
}

struct Registration {
    watcher: Arc<AnyWatcher>,
    cancel: CancellationToken,
}

/// Owns the watcher set and publishes its aggregate state.
pub struct WatcherManager {
    registrations: RwLock<Vec<Registration>>,
    overall: watch::Sender<OverallState>,
    config_failed: bool,
    interval: Option<Duration>,
    running: AtomicBool,
    deps: ManagerDeps,
    cancel: CancellationToken,
}

impl WatcherManager {
    /// Load configuration from `provider` and build the manager.
    ///
    /// Must be called within a tokio runtime.
    pub fn from_provider(provider: &dyn ConfigProvider, deps: ManagerDeps) -> Arc<Self> {
        Self::new(provider.load(), deps)
    }

    /// Build the manager from a loaded configuration.
    ///
    /// A failed load leaves the manager with no watchers and an overall state
    /// of `Error`. It is not retried. Must be called within a tokio runtime.
    pub fn new(config: Result<AppConfig, ConfigError>, deps: ManagerDeps) -> Arc<Self> {
        let (config, config_failed) = match config {
            Ok(config) => (config, false),
            Err(e) => {
                error!("configuration failed, no watchers will run: {e}");
                (AppConfig::default(), true)
            }
        };

        let interval = match u64::try_from(config.watch_interval_sec) {
            Ok(secs) if secs > 0 => Some(Duration::from_secs(secs)),
            _ => {
                info!(
                    "periodic checks disabled (interval {}s)",
                    config.watch_interval_sec
                );
                None
            }
        };

        let initial = if config_failed {
            WatcherState::Error
        } else {
            WatcherState::Stopped
        };
        let (overall, _rx) = watch::channel(initial);

        let manager = Arc::new(Self {
            registrations: RwLock::new(Vec::new()),
            overall,
            config_failed,
            interval,
            running: AtomicBool::new(false),
            deps,
            cancel: CancellationToken::new(),
        });
        manager.spawn_overall_forwarder();

        for spec in &config.watchers {
            if let Some(watcher) = AnyWatcher::from_spec(spec, &manager.deps.source) {
                debug!("registering {} from spec {}", watcher.name(), spec.label());
                manager.add_watcher(watcher);
            }
        }
        info!(
            "manager ready with {} watchers",
            manager.read_registrations().len()
        );
        manager
    }

    /// Register a watcher and subscribe to its changes. The watcher is not
    /// started.
    pub fn add_watcher(self: &Arc<Self>, watcher: impl Into<AnyWatcher>) -> WatcherId {
        let watcher = Arc::new(watcher.into());
        let id = watcher.id();
        let cancel = self.cancel.child_token();
        self.spawn_watcher_forwarder(&watcher, cancel.clone());
        self.write_registrations().push(Registration { watcher, cancel });
        self.recompute();
        id
    }

    /// Stop and unregister a watcher. Returns `false` for an unknown id.
    pub fn remove_watcher(&self, id: WatcherId) -> bool {
        let registration = {
            let mut registrations = self.write_registrations();
            let Some(index) = registrations.iter().position(|r| r.watcher.id() == id) else {
                return false;
            };
            registrations.remove(index)
        };
        registration.cancel.cancel();
        registration.watcher.stop();
        info!("removed {}", registration.watcher.name());
        self.recompute();
        true
    }

    /// Start every watcher, then spawn the periodic scheduler.
    ///
    /// The scheduler runs until [`Self::shutdown`]. Its first tick fires one
    /// interval after the watchers' initial checks. Returns `None` when
    /// periodic checks are disabled or `run` was already called.
    pub fn run(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if self.running.swap(true, Ordering::AcqRel) {
            warn!("run called twice, keeping the existing scheduler");
            return None;
        }
        self.start_all_watchers();
        let period = self.interval?;
        let manager = Arc::clone(self);
        Some(tokio::spawn(async move {
            info!("scheduler started, interval {}s", period.as_secs());
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = manager.cancel.cancelled() => {
                        info!("scheduler stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        debug!("scheduler tick");
                        manager.check_all_watchers_now();
                    }
                }
            }
        }))
    }

    pub fn start_all_watchers(&self) {
        for watcher in self.watchers() {
            watcher.start();
        }
        self.recompute();
    }

    pub fn stop_all_watchers(&self) {
        for watcher in self.watchers() {
            watcher.stop();
        }
        self.recompute();
    }

    /// Ask every watcher to check. Does not wait for results; the aggregate
    /// follows as watchers publish.
    pub fn check_all_watchers_now(&self) {
        for watcher in self.watchers() {
            watcher.check_now();
        }
    }

    /// Dispatch a nudge's action. Returns `false` when the watcher or nudge
    /// is unknown.
    pub fn perform_nudge(&self, watcher_id: WatcherId, nudge_id: NudgeId) -> bool {
        let Some(watcher) = self.watcher(watcher_id) else {
            warn!("perform_nudge: unknown watcher {watcher_id}");
            return false;
        };
        let snapshot = watcher.snapshot();
        let Some(nudge) = snapshot.nudges.iter().find(|n| n.id() == nudge_id) else {
            warn!("perform_nudge: {} has no nudge {nudge_id}", watcher.name());
            return false;
        };

        match nudge.action() {
            NudgeAction::OpenReference(reference) => {
                debug!("opening {reference}");
                self.deps.opener.open(reference);
            }
            NudgeAction::AcknowledgeSelf => watcher.acknowledge_all_nudges(),
        }
        true
    }

    pub fn watcher(&self, id: WatcherId) -> Option<Arc<AnyWatcher>> {
        self.read_registrations()
            .iter()
            .find(|r| r.watcher.id() == id)
            .map(|r| Arc::clone(&r.watcher))
    }

    /// Registered watchers in registration order.
    pub fn watchers(&self) -> Vec<Arc<AnyWatcher>> {
        self.read_registrations()
            .iter()
            .map(|r| Arc::clone(&r.watcher))
            .collect()
    }

    pub fn snapshots(&self) -> Vec<WatcherSnapshot> {
        self.read_registrations()
            .iter()
            .map(|r| r.watcher.snapshot())
            .collect()
    }

    pub fn overall_state(&self) -> OverallState {
        *self.overall.borrow()
    }

    pub fn subscribe_overall(&self) -> watch::Receiver<OverallState> {
        self.overall.subscribe()
    }

    /// Whether configuration failed to load.
    pub fn config_failed(&self) -> bool {
        self.config_failed
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    /// Stop the scheduler and drop every subscription. Watchers keep their
    /// current state.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    fn recompute(&self) {
        if self.config_failed {
            return;
        }
        let registrations = self.read_registrations();
        self.overall.send_if_modified(|current| {
            let next = aggregate(registrations.iter().map(|r| r.watcher.state()));
            if *current == next {
                return false;
            }
            debug!("overall state {current} -> {next}");
            *current = next;
            true
        });
    }

    fn spawn_watcher_forwarder(self: &Arc<Self>, watcher: &AnyWatcher, cancel: CancellationToken) {
        let mut rx = watcher.subscribe();
        rx.mark_changed();
        let manager: Weak<Self> = Arc::downgrade(self);
        let sink = Arc::clone(&self.deps.sink);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    changed = rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
                let snapshot = rx.borrow_and_update().clone();
                sink.watcher_changed(&snapshot);
                match manager.upgrade() {
                    Some(manager) => manager.recompute(),
                    None => break,
                }
            }
        });
    }

    fn spawn_overall_forwarder(&self) {
        let mut rx = self.overall.subscribe();
        rx.mark_changed();
        let cancel = self.cancel.clone();
        let sink = Arc::clone(&self.deps.sink);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    changed = rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
                let state = *rx.borrow_and_update();
                sink.overall_changed(state);
            }
        });
    }

    fn read_registrations(&self) -> RwLockReadGuard<'_, Vec<Registration>> {
        self.registrations.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_registrations(&self) -> RwLockWriteGuard<'_, Vec<Registration>> {
        self.registrations.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for WatcherManager {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
