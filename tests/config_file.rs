//! File-backed config provider tests.
//!
//! Each test writes into its own temp directory.

use nudge::config::{ConfigError, ConfigProvider, FileConfigProvider, WatcherKind};

#[test]
fn missing_directory_is_reported_as_directory_missing() {
    let dir = tempfile::tempdir().unwrap();
    let provider = FileConfigProvider::new(dir.path().join("absent").join("config.toml"));
    match provider.load() {
        Err(ConfigError::DirectoryMissing(path)) => assert!(path.ends_with("absent")),
        other => panic!("expected DirectoryMissing, got {other:?}"),
    }
}

#[test]
fn missing_file_is_reported_as_file_missing() {
    let dir = tempfile::tempdir().unwrap();
    let provider = FileConfigProvider::new(dir.path().join("config.toml"));
    assert!(matches!(provider.load(), Err(ConfigError::FileMissing(_))));
}

#[test]
fn directory_in_place_of_file_is_unreadable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::create_dir(&path).unwrap();
    let provider = FileConfigProvider::new(&path);
    assert!(matches!(provider.load(), Err(ConfigError::Unreadable { .. })));
}

#[test]
fn malformed_toml_is_reported_with_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "watch_interval_sec = \"soon\"\n").unwrap();
    match FileConfigProvider::new(&path).load() {
        Err(ConfigError::Malformed { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("expected Malformed, got {other:?}"),
    }
}

#[test]
fn toml_file_loads_watchers_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
watch_interval_sec = 120

[[watchers]]
type = "timer"
name = "Stretch"
timer_duration_secs = 1500

[[watchers]]
type = "github"
token_env = "GITHUB_TOKEN"
user = "octocat"
repositories = ["rust-lang/rust"]
"#,
    )
    .unwrap();

    let config = FileConfigProvider::new(&path).load().unwrap();
    assert_eq!(config.watch_interval_sec, 120);
    assert_eq!(config.watchers.len(), 2);
    assert_eq!(config.watchers[0].kind, WatcherKind::Timer);
    assert_eq!(config.watchers[0].timer_duration_secs, Some(1500));
    assert_eq!(config.watchers[1].kind, WatcherKind::Poll);
    assert_eq!(config.watchers[1].repositories, vec!["rust-lang/rust"]);
}

#[test]
fn json_file_accepts_legacy_keys() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{
  "watchIntervalSec": 30,
  "watchers": [
    {"type": "github", "githubPATFromEnv": "PAT", "githubQuery": "is:pr author:me"},
    {"type": "timer", "timerDurationSeconds": 5, "enabled": false}
  ]
}"#,
    )
    .unwrap();

    let config = FileConfigProvider::new(&path).load().unwrap();
    assert_eq!(config.watch_interval_sec, 30);
    assert_eq!(config.watchers[0].token_env.as_deref(), Some("PAT"));
    assert_eq!(config.watchers[0].query.as_deref(), Some("is:pr author:me"));
    assert!(!config.watchers[1].enabled);
}

#[test]
fn json_file_with_negative_interval_still_loads_watchers() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{"watchIntervalSec": -1, "watchers": [{"type": "timer", "enabled": true}]}"#,
    )
    .unwrap();

    let config = FileConfigProvider::new(&path).load().unwrap();
    assert_eq!(config.watch_interval_sec, -1);
    assert_eq!(config.watchers.len(), 1);
    assert_eq!(config.watchers[0].kind, WatcherKind::Timer);
}

#[test]
fn write_default_creates_loadable_starter_once() {
    let dir = tempfile::tempdir().unwrap();
    let provider = FileConfigProvider::new(dir.path().join("nudge").join("config.toml"));

    assert!(provider.write_default().unwrap());
    assert!(!provider.write_default().unwrap());

    let config = provider.load().unwrap();
    assert_eq!(config.watchers.len(), 2);
    assert!(config.watchers[0].enabled);
    assert_eq!(config.watchers[0].kind, WatcherKind::Timer);
    assert!(!config.watchers[1].enabled);
    assert_eq!(config.watchers[1].kind, WatcherKind::Poll);
}

#[test]
fn write_default_json_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let provider = FileConfigProvider::new(dir.path().join("config.json"));
    assert!(provider.write_default().unwrap());
    let text = std::fs::read_to_string(provider.path()).unwrap();
    assert!(text.trim_start().starts_with('{'));
    assert_eq!(provider.load().unwrap().watchers.len(), 2);
}
