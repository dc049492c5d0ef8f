// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod job;
pub mod logging;
pub mod manager;
pub mod unit;

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use tracing::{info, warn};

use crate::cli::CliArgs;
use crate::config::load_or_default;
use crate::job::{JobLauncher, StartOptions};
use crate::manager::{BusKind, DbusServiceManager};

pub use crate::errors::UnitJobError;
pub use crate::job::{Job, JobLogStream, LogLine};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the D-Bus manager connection and the launcher
/// - following the job's log to stdout until it ends or Ctrl-C
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_or_default(args.config.as_deref().map(Path::new))?;

    let bus = if args.user {
        BusKind::Session
    } else {
        cfg.manager.bus
    };
    let manager = DbusServiceManager::connect(bus).await?;

    let launcher = JobLauncher::new(manager)
        .with_log_command(cfg.log_command())
        .with_properties(cfg.properties.clone());

    let options = StartOptions::new().with_env(job_environment(&args));
    let job = launcher
        .start(&args.name, args.argv.clone(), options)
        .await?;

    info!(unit = %job.unit_name(), handle = %job.handle(), "job started");

    if args.no_follow {
        return Ok(());
    }

    let mut logs = job.logs();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let outcome = loop {
        tokio::select! {
            next = logs.next_line() => match next {
                Some(Ok(line)) => println!("{line}"),
                Some(Err(err)) => break Err(err),
                None => break Ok(()),
            },
            signal = &mut ctrl_c => {
                if let Err(e) = signal {
                    warn!(error = %e, "failed to listen for Ctrl+C");
                }
                info!(unit = %job.unit_name(), "stopping log follow; the unit keeps running");
                break Ok(());
            }
        }
    };

    logs.close().await;
    outcome?;
    Ok(())
}

/// Environment for the launched job. The caller's environment is only
/// included when explicitly requested; `--env` entries take precedence.
fn job_environment(args: &CliArgs) -> BTreeMap<String, String> {
    let mut env = BTreeMap::new();
    if args.inherit_env {
        env.extend(std::env::vars());
    }
    env.extend(args.env.iter().cloned());
    env
}
