//! Process-wide tracing subscriber
//!
//! Events go to a rolling file through a non-blocking writer. Text mode also
//! mirrors to stdout; JSON mode writes JSON lines only. `RUST_LOG` overrides
//! the configured level.

use anyhow::{Result, bail};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::AppConfig;

/// Map the `rotation` config value onto an appender policy
fn rotation(name: &str) -> Result<Rotation> {
    Ok(match name {
        "never" => Rotation::NEVER,
        "hourly" => Rotation::HOURLY,
        "daily" => Rotation::DAILY,
        other => bail!("unknown log rotation '{}' (never|hourly|daily)", other),
    })
}

/// Configured level for the crate; sqlx statement logs only at warn
fn default_directives(level: &str) -> String {
    format!("{},sqlx=warn", level)
}

/// Install the global subscriber; keep the guard alive until shutdown
pub fn init_logging(config: &AppConfig) -> Result<WorkerGuard> {
    let appender = RollingFileAppender::new(
        rotation(&config.rotation)?,
        &config.log_dir,
        &config.log_file,
    );
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&config.log_level)));
    let registry = tracing_subscriber::registry().with(filter);

    if config.use_json {
        let file_layer = fmt::layer()
            .json()
            .with_target(true)
            .with_writer(writer)
            .with_ansi(false);
        registry.with(file_layer).try_init()?;
    } else {
        let file_layer = fmt::layer()
            .with_target(false)
            .with_writer(writer)
            .with_ansi(false);
        let stdout_layer = fmt::layer().with_target(false);
        registry.with(file_layer).with(stdout_layer).try_init()?;
    }

    Ok(guard)
}
