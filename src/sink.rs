//! Status consumers notified by the manager.

use crate::watcher::{OverallState, WatcherSnapshot};
use tracing::{info, warn};

/// Receives manager status changes.
///
/// Updates may be coalesced; the latest value is always delivered. Calls
/// arrive from runtime tasks, so implementations must not block.
pub trait StatusSink: Send + Sync {
    fn overall_changed(&self, state: OverallState);

    fn watcher_changed(&self, snapshot: &WatcherSnapshot);
}

/// Writes status changes to the tracing log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl StatusSink for LogSink {
    fn overall_changed(&self, state: OverallState) {
        info!(symbol = state.symbol_name(), "overall state: {state}");
    }

    fn watcher_changed(&self, snapshot: &WatcherSnapshot) {
        match &snapshot.last_error {
            Some(error) => warn!("{} ({}): {} - {error}", snapshot.name, snapshot.id, snapshot.state),
            None if snapshot.nudges.is_empty() => {
                info!("{} ({}): {}", snapshot.name, snapshot.id, snapshot.state)
            }
            None => {
                info!(
                    "{} ({}): {} with {} nudges",
                    snapshot.name,
                    snapshot.id,
                    snapshot.state,
                    snapshot.nudges.len()
                );
                for nudge in &snapshot.nudges {
                    info!("  - {}", nudge.title());
                }
            }
        }
    }
}

/// Ignores every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl StatusSink for NullSink {
    fn overall_changed(&self, _state: OverallState) {}

    fn watcher_changed(&self, _snapshot: &WatcherSnapshot) {}
}
