//! File-backed tracing setup. Logs go to `~/.kestrel/log/kestrel.log`, never
//! to stdout, since stdout is the terminal's own alt-screen buffer once the
//! TUI is running.

use std::fs::OpenOptions;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Must be kept alive for the duration of the program or the non-blocking
/// writer drops its background flush thread.
pub struct LoggingGuard(#[allow(dead_code)] WorkerGuard);

pub fn init(verbose: bool) -> anyhow::Result<LoggingGuard> {
    let log_dir = kestrel_config::paths::log_dir();
    std::fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join("kestrel.log");

    let mut opts = OpenOptions::new();
    opts.create(true).append(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.mode(0o600);
    }
    let file = opts.open(&log_path)?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    let default_filter = if verbose { "info,kestrel=debug" } else { "warn,kestrel=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt().with_writer(non_blocking).with_ansi(false).with_env_filter(filter).init();

    Ok(LoggingGuard(guard))
}
