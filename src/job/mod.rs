// src/job/mod.rs

//! Jobs: transient units launched on behalf of a caller.
//!
//! - [`launcher`] turns `(name, argv, env)` into a transient unit via a
//!   [`ServiceManager`](crate::manager::ServiceManager).
//! - [`logs`] follows a unit's journal as a [`JobLogStream`].

pub mod launcher;
pub mod logs;

use crate::manager::UnitHandle;

pub use launcher::{JobLauncher, POLICY_PROPERTIES, StartOptions};
pub use logs::{DEFAULT_LOG_BUFFER, JobLogStream, LogCommand, LogLine, decode_record};

/// A transient unit created by [`JobLauncher::start`].
///
/// The manager owns the process; dropping a `Job` does not stop it.
#[derive(Debug, Clone)]
pub struct Job {
    unit_name: String,
    handle: UnitHandle,
    log_command: LogCommand,
}

impl Job {
    pub fn new(unit_name: impl Into<String>, handle: UnitHandle, log_command: LogCommand) -> Self {
        Self {
            unit_name: unit_name.into(),
            handle,
            log_command,
        }
    }

    /// Full unit name, e.g. `test-23.service`.
    pub fn unit_name(&self) -> &str {
        &self.unit_name
    }

    pub fn handle(&self) -> &UnitHandle {
        &self.handle
    }

    /// Start following this unit's log. Every call spawns its own follower
    /// process with its own cursor.
    pub fn logs(&self) -> JobLogStream {
        JobLogStream::spawn(&self.log_command, &self.unit_name)
    }
}
