//! Logging setup.
//!
//! Both binaries prefer systemd's journal on Linux. When it is missing the
//! CLI writes a daily-rolling file and the daemon writes to stderr, where
//! its supervisor picks it up.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding the filter directive.
pub const LOG_ENV: &str = "PROOFER_LOG";

/// Where log lines go when journald is not available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fallback {
    /// `proofer.log.<date>` under the given directory.
    File(PathBuf),
    Stderr,
}

// Dropping the guard stops the writer thread.
static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Install the global subscriber. The level comes from `PROOFER_LOG`
/// (`trace` .. `error`, or any `EnvFilter` directive), defaulting to `info`.
pub fn init(fallback: Fallback) -> Result<()> {
    #[cfg(target_os = "linux")]
    {
        if let Ok(journald_layer) = tracing_journald::layer() {
            tracing_subscriber::registry()
                .with(env_filter())
                .with(journald_layer)
                .try_init()?;

            tracing::info!("Logging initialized with journald backend");
            return Ok(());
        }
    }

    match fallback {
        Fallback::File(log_dir) => {
            init_file(&log_dir)?;
            tracing::info!("Logging initialized with file backend at {:?}", log_dir);
        }
        Fallback::Stderr => {
            tracing_subscriber::registry()
                .with(env_filter())
                .with(fmt::layer().with_writer(std::io::stderr))
                .try_init()?;
        }
    }
    Ok(())
}

fn init_file(log_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(log_dir)?;

    let file_appender = tracing_appender::rolling::daily(log_dir, "proofer.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = FILE_GUARD.set(guard);

    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .try_init()?;
    Ok(())
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// `<data_local_dir>/proofer/logs`
pub fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("proofer")
        .join("logs")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_log_dir() {
        let dir = default_log_dir();
        assert!(dir.ends_with("proofer/logs"));
    }
}
