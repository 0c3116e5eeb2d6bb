//! Logging system setup and configuration
//!
//! Each role appends to its own log file. Console output is produced by the
//! event sink, not by the subscriber, so the terminal only ever shows
//! lifecycle transitions.

use crate::config::LoggingSettings;
use anyhow::{Context, Result};
use chrono::Local;
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::fmt::{self, format::Writer, time::FormatTime};
use tracing_subscriber::{prelude::*, EnvFilter};

pub const SERVER_LOG_FILE: &str = "server_log.txt";
pub const CLIENT_LOG_FILE: &str = "client_log.txt";

/// Local wall-clock timestamps with millisecond precision.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalMillis;

impl FormatTime for LocalMillis {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

/// Initialize the logging system
///
/// Installs a global subscriber that appends to `settings.file_path`, or to
/// `default_file` when no path is configured. `RUST_LOG` overrides the
/// configured level.
pub fn setup_logging(settings: &LoggingSettings, default_file: &str) -> Result<()> {
    let path = settings.file_path.as_deref().unwrap_or(default_file);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {path}"))?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.level));

    let layer = fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .with_timer(LocalMillis);

    if settings.json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer.json())
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer)
            .try_init()?;
    }

    info!("Logging to {} at level {}", path, settings.level);
    Ok(())
}
