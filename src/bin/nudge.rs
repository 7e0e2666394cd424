//! Headless nudge runner.
//!
//! Loads the config file, starts every watcher, and logs status changes to
//! stderr until interrupted.

use anyhow::Context;
use nudge::config::{AppConfig, FileConfigProvider};
use nudge::manager::{ManagerDeps, WatcherManager};
use nudge::opener::SystemOpener;
use nudge::sink::LogSink;
use nudge::source::GitHubQuerySource;
use nudge_github::GitHubConfig;
use std::path::PathBuf;
use std::sync::Arc;

struct Args {
    config: PathBuf,
    write_default: bool,
}

fn parse_args() -> anyhow::Result<Option<Args>> {
    let mut config = None;
    let mut write_default = false;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let path = args.next().context("--config requires a path")?;
                config = Some(PathBuf::from(path));
            }
            "--write-default-config" => write_default = true,
            "help" | "--help" | "-h" => {
                print_usage();
                return Ok(None);
            }
            other => anyhow::bail!("unknown argument `{other}`"),
        }
    }
    Ok(Some(Args {
        config: config.unwrap_or_else(AppConfig::default_config_path),
        write_default,
    }))
}

fn print_usage() {
    println!("usage: nudge [--config <path>] [--write-default-config]");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let Some(args) = parse_args()? else {
        return Ok(());
    };

    let provider = FileConfigProvider::new(args.config);
    if args.write_default && provider.write_default()? {
        println!("wrote {}", provider.path().display());
    }

    tracing::info!("nudge starting with {}", provider.path().display());

    let source = GitHubQuerySource::new(GitHubConfig::default())
        .map_err(|e| anyhow::anyhow!("cannot build GitHub client: {e}"))?;
    let deps = ManagerDeps::new(
        Arc::new(source),
        Arc::new(SystemOpener),
        Arc::new(LogSink),
    );

    let manager = WatcherManager::from_provider(&provider, deps);
    let scheduler = manager.run();

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;

    tracing::info!("interrupted, stopping watchers");
    manager.stop_all_watchers();
    manager.shutdown();
    if let Some(handle) = scheduler {
        if let Err(e) = handle.await {
            tracing::warn!("scheduler task failed: {e}");
        }
    }

    tracing::info!("nudge shut down cleanly");
    Ok(())
}
