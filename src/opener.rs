//! Opening nudge references outside the process.

use tracing::{debug, warn};

/// Opens an item reference. Fire-and-forget; failures are the opener's to log.
pub trait ItemOpener: Send + Sync {
    fn open(&self, reference: &str);
}

/// Opens web references with the platform's default handler.
///
/// Only `http` and `https` references are accepted; anything else is logged
/// and ignored. Must be called from within a tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemOpener;

impl ItemOpener for SystemOpener {
    fn open(&self, reference: &str) {
        if !is_web_reference(reference) {
            warn!("refusing to open non-web reference: {reference}");
            return;
        }

        let mut command = platform_command(reference);
        match command.spawn() {
            Ok(_child) => debug!("opened {reference}"),
            Err(e) => warn!("cannot open {reference}: {e}"),
        }
    }
}

fn is_web_reference(reference: &str) -> bool {
    let lower = reference.trim_start().to_ascii_lowercase();
    lower.starts_with("https://") || lower.starts_with("http://")
}

fn platform_command(reference: &str) -> tokio::process::Command {
    #[cfg(target_os = "macos")]
    {
        let mut command = tokio::process::Command::new("open");
        command.arg(reference);
        command
    }
    #[cfg(target_os = "windows")]
    {
        let mut command = tokio::process::Command::new("rundll32");
        command.arg("url.dll,FileProtocolHandler").arg(reference);
        command
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        let mut command = tokio::process::Command::new("xdg-open");
        command.arg(reference);
        command
    }
}
