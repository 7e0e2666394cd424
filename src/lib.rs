//! Nudge: watches triggers and surfaces actionable nudges.
//!
//! A set of independently configured watchers (a countdown timer, a GitHub
//! review-request search) each run their own state machine. The manager
//! schedules them, aggregates their states into one overall status, and
//! forwards changes to a status sink.
//!
//! # Architecture
//!
//! - **Config**: [`config::FileConfigProvider`] loads the interval and watcher specs
//! - **Watchers**: [`watcher::TimerWatcher`] and [`watcher::PollWatcher`] behind [`watcher::Watcher`]
//! - **Manager**: [`manager::WatcherManager`] owns the watchers and the scheduler
//! - **Collaborators**: [`source::QuerySource`], [`opener::ItemOpener`], [`sink::StatusSink`]

pub mod config;
pub mod error;
pub mod manager;
pub mod nudge;
pub mod opener;
pub mod sink;
pub mod source;
pub mod watcher;

pub use config::{AppConfig, ConfigError, ConfigProvider, FileConfigProvider, WatcherSpec};
pub use error::{NudgeError, Result};
pub use manager::{ManagerDeps, WatcherManager};
pub use nudge::{Nudge, NudgeAction, NudgeId};
pub use source::{GitHubQuerySource, Item, QueryError, QuerySource};
pub use watcher::{AnyWatcher, OverallState, Watcher, WatcherId, WatcherSnapshot, WatcherState};
