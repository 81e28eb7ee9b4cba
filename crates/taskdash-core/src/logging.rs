//! tracing subscriber setup.
//!
//! Logs go to `${TASKDASH_HOME}/logs/taskdash.log` through a non-blocking
//! writer. `TASKDASH_LOG` overrides the configured filter. Nothing is written
//! to stdout/stderr so command output stays clean.

use std::fs;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{LogConfig, paths};

/// Environment variable holding a filter directive.
pub const LOG_ENV: &str = "TASKDASH_LOG";

const LOG_FILE: &str = "taskdash.log";

/// Installs the global subscriber.
///
/// Returns the appender guard; dropping it flushes and stops the writer, so
/// the binary keeps it alive for the whole run. Returns `None` when file
/// logging is disabled.
///
/// # Errors
/// Returns an error if the log directory cannot be created or the filter
/// directive is invalid.
pub fn init(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    if !config.file {
        return Ok(None);
    }

    let filter = build_filter(std::env::var(LOG_ENV).ok().as_deref(), &config.filter)?;

    let dir = paths::logs_dir();
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let appender = tracing_appender::rolling::never(&dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    // A subscriber may already be installed (tests, embedding apps).
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .try_init();

    Ok(Some(guard))
}

fn build_filter(env_directive: Option<&str>, configured: &str) -> Result<EnvFilter> {
    let directive = env_directive
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or(configured);
    EnvFilter::try_new(directive).with_context(|| format!("Invalid log filter: {directive}"))
}
