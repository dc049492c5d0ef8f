// src/logging.rs

//! Logging setup using `tracing` + `tracing-subscriber`.
//!
//! The filter comes from `--log-level` when given, otherwise from the
//! `UNITJOB_LOG` environment variable (full `EnvFilter` directives, e.g.
//! `unitjob=debug,zbus=warn`), otherwise `info`.
//!
//! Logs go to STDERR; STDOUT carries only the job's log lines.

use anyhow::Result;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogLevel;

pub const LOG_ENV_VAR: &str = "UNITJOB_LOG";

/// Initialise global logging subscriber. Call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    fmt()
        .with_env_filter(filter_for(cli_level))
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;

    Ok(())
}

fn filter_for(cli_level: Option<LogLevel>) -> EnvFilter {
    match cli_level {
        Some(lvl) => EnvFilter::default().add_directive(tracing::Level::from(lvl).into()),
        None => EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("info")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn cli_level_sets_the_max_level() {
        assert_eq!(
            filter_for(Some(LogLevel::Debug)).max_level_hint(),
            Some(LevelFilter::DEBUG)
        );
        assert_eq!(
            filter_for(Some(LogLevel::Error)).max_level_hint(),
            Some(LevelFilter::ERROR)
        );
    }
}
