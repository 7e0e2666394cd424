//! Watcher configuration: file format, defaults, and the loading seam.
//!
//! The manager never touches the file system itself; it is handed a
//! [`ConfigProvider`]. [`FileConfigProvider`] is the stock implementation
//! reading `~/.config/nudge/config.toml`. Files ending in `.json` are read as
//! JSON and accept the camelCase keys of the original config layout.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Seconds between scheduler ticks when the file does not say.
const DEFAULT_WATCH_INTERVAL_SECS: i64 = 60;

/// Countdown used when a timer spec omits its duration.
pub const DEFAULT_TIMER_DURATION_SECS: u64 = 10;

/// Failure to produce a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The directory that should hold the config file does not exist.
    #[error("config directory not found: {}", .0.display())]
    DirectoryMissing(PathBuf),

    /// The directory exists but the file does not.
    #[error("config file not found: {}", .0.display())]
    FileMissing(PathBuf),

    /// The file exists but could not be read.
    #[error("cannot read config {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file was read but is not a valid config.
    #[error("malformed config {}: {message}", .path.display())]
    Malformed { path: PathBuf, message: String },
}

/// Source of the startup configuration.
///
/// Called once when the manager is built. There is no automatic retry.
pub trait ConfigProvider: Send + Sync {
    fn load(&self) -> Result<AppConfig, ConfigError>;
}

/// Root of the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Seconds between manager-wide checks. Zero or negative disables
    /// periodic checks.
    #[serde(alias = "watchIntervalSec")]
    pub watch_interval_sec: i64,
    /// Watcher definitions, in display order.
    pub watchers: Vec<WatcherSpec>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            watch_interval_sec: DEFAULT_WATCH_INTERVAL_SECS,
            watchers: Vec::new(),
        }
    }
}

/// Which watcher implementation a spec asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WatcherKind {
    /// Local countdown.
    Timer,
    /// Remote search polled on every tick (`github` in config files).
    Poll,
    /// Anything else. Skipped at startup.
    Unknown,
}

impl From<String> for WatcherKind {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "timer" => Self::Timer,
            "github" | "poll" => Self::Poll,
            _ => Self::Unknown,
        }
    }
}

impl From<WatcherKind> for String {
    fn from(kind: WatcherKind) -> Self {
        kind.to_string()
    }
}

impl std::fmt::Display for WatcherKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timer => write!(f, "timer"),
            Self::Poll => write!(f, "github"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// One watcher definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatcherSpec {
    /// Caller-supplied identifier, informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Display name overriding the per-type default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: WatcherKind,
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Personal access token for poll watchers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Environment variable holding the token, used when `token` is unset.
    #[serde(
        default,
        alias = "githubPATFromEnv",
        skip_serializing_if = "Option::is_none"
    )]
    pub token_env: Option<String>,
    /// Review-requested user filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// `owner/repo` filters, one search term each.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub repositories: Vec<String>,
    /// Raw search query replacing the synthesized one.
    #[serde(
        default,
        alias = "githubQuery",
        skip_serializing_if = "Option::is_none"
    )]
    pub query: Option<String>,

    /// Countdown length for timer watchers.
    #[serde(
        default,
        alias = "timerDurationSeconds",
        skip_serializing_if = "Option::is_none"
    )]
    pub timer_duration_secs: Option<u64>,
}

fn default_enabled() -> bool {
    true
}

impl WatcherSpec {
    /// A bare enabled spec of the given kind.
    pub fn new(kind: WatcherKind) -> Self {
        Self {
            id: None,
            name: None,
            kind,
            enabled: true,
            token: None,
            token_env: None,
            user: None,
            repositories: Vec::new(),
            query: None,
            timer_duration_secs: None,
        }
    }

    /// Non-blank display name, if configured.
    pub fn display_name(&self) -> Option<&str> {
        self.name.as_deref().map(str::trim).filter(|n| !n.is_empty())
    }

    /// Label for log lines: the caller id, else the name, else the kind.
    pub fn label(&self) -> String {
        self.id
            .clone()
            .or_else(|| self.display_name().map(str::to_owned))
            .unwrap_or_else(|| self.kind.to_string())
    }
}

impl AppConfig {
    /// Parse config text. `json` selects the JSON parser, otherwise TOML.
    pub fn parse(content: &str, json: bool) -> Result<Self, String> {
        if json {
            serde_json::from_str(content).map_err(|e| e.to_string())
        } else {
            toml::from_str(content).map_err(|e| e.to_string())
        }
    }

    /// The starter config written on first run: one enabled timer and one
    /// disabled GitHub watcher with placeholder values.
    pub fn starter() -> Self {
        let mut timer = WatcherSpec::new(WatcherKind::Timer);
        timer.id = Some("default-timer".to_owned());
        timer.name = Some("Default Timer".to_owned());
        timer.timer_duration_secs = Some(600);

        let mut github = WatcherSpec::new(WatcherKind::Poll);
        github.id = Some("default-github".to_owned());
        github.name = Some("Default GitHub PRs".to_owned());
        github.enabled = false;
        github.token_env = Some("GITHUB_TOKEN".to_owned());
        github.user = Some("your_github_username".to_owned());
        github.repositories = vec!["owner/repository".to_owned()];

        Self {
            watch_interval_sec: DEFAULT_WATCH_INTERVAL_SECS,
            watchers: vec![timer, github],
        }
    }

    /// Returns the default config file path: `~/.config/nudge/config.toml`.
    pub fn default_config_path() -> PathBuf {
        if let Some(config) = std::env::var_os("XDG_CONFIG_HOME") {
            PathBuf::from(config).join("nudge").join("config.toml")
        } else if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("nudge")
                .join("config.toml")
        } else {
            PathBuf::from("/tmp/nudge-config/config.toml")
        }
    }
}

/// Reads the config from a file path chosen by the caller.
#[derive(Debug, Clone)]
pub struct FileConfigProvider {
    path: PathBuf,
}

impl FileConfigProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write [`AppConfig::starter`] to the path unless a file already exists.
    ///
    /// Returns `true` when a file was created.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub fn write_default(&self) -> crate::Result<bool> {
        if self.path.exists() {
            return Ok(false);
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let starter = AppConfig::starter();
        let content = if is_json(&self.path) {
            serde_json::to_string_pretty(&starter)
                .map_err(|e| crate::NudgeError::Serialize(e.to_string()))?
        } else {
            toml::to_string_pretty(&starter)
                .map_err(|e| crate::NudgeError::Serialize(e.to_string()))?
        };
        std::fs::write(&self.path, content)?;
        tracing::info!("wrote starter config to {}", self.path.display());
        Ok(true)
    }
}

impl ConfigProvider for FileConfigProvider {
    fn load(&self) -> Result<AppConfig, ConfigError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let dir_exists = self
                    .path
                    .parent()
                    .is_none_or(|p| p.as_os_str().is_empty() || p.is_dir());
                return Err(if dir_exists {
                    ConfigError::FileMissing(self.path.clone())
                } else {
                    ConfigError::DirectoryMissing(
                        self.path.parent().map(Path::to_path_buf).unwrap_or_default(),
                    )
                });
            }
            Err(source) => {
                return Err(ConfigError::Unreadable {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let config = AppConfig::parse(&content, is_json(&self.path)).map_err(|message| {
            ConfigError::Malformed {
                path: self.path.clone(),
                message,
            }
        })?;

        tracing::debug!(
            "loaded config from {} ({} watchers, interval {}s)",
            self.path.display(),
            config.watchers.len(),
            config.watch_interval_sec
        );
        Ok(config)
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn toml_config_parses() {
        let text = r#"
            watch_interval_sec = 30

            [[watchers]]
            type = "timer"
            timer_duration_secs = 5

            [[watchers]]
            id = "reviews"
            name = "Reviews"
            type = "github"
            enabled = false
            token = "ghp_x"
            user = "octocat"
            repositories = ["o/a", "o/b"]
        "#;
        let config = AppConfig::parse(text, false).expect("parse");
        assert_eq!(config.watch_interval_sec, 30);
        assert_eq!(config.watchers.len(), 2);
        assert_eq!(config.watchers[0].kind, WatcherKind::Timer);
        assert!(config.watchers[0].enabled);
        assert_eq!(config.watchers[0].timer_duration_secs, Some(5));
        assert_eq!(config.watchers[1].kind, WatcherKind::Poll);
        assert!(!config.watchers[1].enabled);
        assert_eq!(config.watchers[1].repositories, vec!["o/a", "o/b"]);
    }

    #[test]
    fn legacy_json_keys_parse() {
        let text = r#"{
            "watchIntervalSec": 45,
            "watchers": [
                {"id": "t", "type": "timer", "enabled": true, "timerDurationSeconds": 12},
                {"type": "github", "enabled": true, "githubQuery": "is:pr author:me",
                 "githubPATFromEnv": "GH_PAT", "repo": "ignored/field"}
            ]
        }"#;
        let config = AppConfig::parse(text, true).expect("parse");
        assert_eq!(config.watch_interval_sec, 45);
        assert_eq!(config.watchers[0].timer_duration_secs, Some(12));
        assert_eq!(config.watchers[1].query.as_deref(), Some("is:pr author:me"));
        assert_eq!(config.watchers[1].token_env.as_deref(), Some("GH_PAT"));
    }

    #[test]
    fn unknown_type_is_not_an_error() {
        let text = r#"
            [[watchers]]
            type = "calendar"
        "#;
        let config = AppConfig::parse(text, false).expect("parse");
        assert_eq!(config.watchers[0].kind, WatcherKind::Unknown);
    }

    #[test]
    fn missing_interval_uses_default() {
        let config = AppConfig::parse("watchers = []", false).expect("parse");
        assert_eq!(config.watch_interval_sec, 60);
    }

    #[test]
    fn negative_interval_is_accepted() {
        let text = r#"{"watchIntervalSec": -1, "watchers": [{"type": "timer", "enabled": true}]}"#;
        let config = AppConfig::parse(text, true).expect("parse");
        assert_eq!(config.watch_interval_sec, -1);
        assert_eq!(config.watchers.len(), 1);
    }

    #[test]
    fn watcher_without_type_is_malformed() {
        let text = r#"
            [[watchers]]
            name = "nameless"
        "#;
        assert!(AppConfig::parse(text, false).is_err());
    }

    #[test]
    fn display_name_ignores_blank() {
        let mut spec = WatcherSpec::new(WatcherKind::Timer);
        spec.name = Some("   ".into());
        assert!(spec.display_name().is_none());
        assert_eq!(spec.label(), "timer");
    }

    #[test]
    fn starter_round_trips_through_toml() {
        let starter = AppConfig::starter();
        let text = toml::to_string_pretty(&starter).expect("serialize");
        let parsed = AppConfig::parse(&text, false).expect("parse");
        assert_eq!(parsed, starter);
    }

    #[test]
    fn default_config_path_ends_with_config_toml() {
        let path = AppConfig::default_config_path();
        let path_str = path.to_string_lossy();
        assert!(path_str.ends_with("config.toml"));
        assert!(path_str.contains("nudge"));
    }
}
