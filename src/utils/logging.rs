use std::fs::OpenOptions;
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;
use tracing::Level;

use crate::error::Result;

/// Pick the log level: `--verbose` wins, then the configured level, then INFO.
pub fn resolve_level(verbose: bool, configured: &str) -> Level {
    if verbose {
        return Level::DEBUG;
    }
    Level::from_str(configured).unwrap_or(Level::INFO)
}

/// Install the global `tracing` subscriber, writing to stderr or appending to
/// `log_file`. Calling it again after a subscriber is installed is a no-op.
pub fn init_logging(level: Level, log_file: Option<&Path>) -> Result<()> {
    let builder = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false);

    let installed = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    };

    if installed.is_err() {
        tracing::debug!("logging already initialized");
    }
    Ok(())
}
