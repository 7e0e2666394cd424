//! Watcher states and the aggregate priority rule.

use std::fmt;

/// State of one watcher, also used for the manager's overall state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum WatcherState {
    /// Not running. Initial state.
    #[default]
    Stopped,
    /// A check is in progress.
    Checking,
    /// Running and nothing needs attention.
    Idle,
    /// Running with at least one outstanding nudge.
    Alert,
    /// The last check failed.
    Error,
}

/// The manager-wide summary of every watcher's state.
pub type OverallState = WatcherState;

impl WatcherState {
    /// Aggregation rank. Higher wins.
    pub fn priority(self) -> u8 {
        match self {
            Self::Stopped => 0,
            Self::Idle => 1,
            Self::Checking => 2,
            Self::Alert => 3,
            Self::Error => 4,
        }
    }

    /// Whether the watcher is in a running cycle that `start()` must not
    /// restart.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Checking | Self::Idle | Self::Alert)
    }

    /// SF Symbol a status-bar UI shows for this state.
    pub fn symbol_name(self) -> &'static str {
        match self {
            Self::Stopped => "stop.circle",
            Self::Checking => "arrow.triangle.2.circlepath",
            Self::Idle => "checkmark.circle",
            Self::Alert => "bell.circle.fill",
            Self::Error => "exclamationmark.triangle.fill",
        }
    }
}

impl fmt::Display for WatcherState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => write!(f, "stopped"),
            Self::Checking => write!(f, "checking"),
            Self::Idle => write!(f, "idle"),
            Self::Alert => write!(f, "alert"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Fold watcher states into one: `Error > Alert > Checking > Idle > Stopped`.
///
/// An empty set aggregates to `Stopped`.
pub fn aggregate<I>(states: I) -> OverallState
where
    I: IntoIterator<Item = WatcherState>,
{
    states
        .into_iter()
        .max_by_key(|s| s.priority())
        .unwrap_or(WatcherState::Stopped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use WatcherState::*;

    #[test]
    fn empty_set_is_stopped() {
        assert_eq!(aggregate([]), Stopped);
    }

    #[test]
    fn alert_beats_checking_and_idle() {
        assert_eq!(aggregate([Idle, Checking, Alert]), Alert);
    }

    #[test]
    fn error_beats_everything() {
        assert_eq!(aggregate([Idle, Error]), Error);
        assert_eq!(aggregate([Alert, Error, Checking, Stopped]), Error);
    }

    #[test]
    fn checking_beats_idle_and_stopped() {
        assert_eq!(aggregate([Stopped, Idle, Checking]), Checking);
        assert_eq!(aggregate([Stopped, Idle]), Idle);
        assert_eq!(aggregate([Stopped, Stopped]), Stopped);
    }

    #[test]
    fn active_states() {
        assert!(Checking.is_active());
        assert!(Idle.is_active());
        assert!(Alert.is_active());
        assert!(!Stopped.is_active());
        assert!(!Error.is_active());
    }

    #[test]
    fn display_and_symbols() {
        assert_eq!(Alert.to_string(), "alert");
        assert_eq!(Error.symbol_name(), "exclamationmark.triangle.fill");
        assert_eq!(WatcherState::default(), Stopped);
    }
}
