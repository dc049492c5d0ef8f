// src/job/launcher.rs

//! Submitting jobs to the service manager.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::errors::{Result, UnitJobError};
use crate::manager::{CONFLICT_MODE_FAIL, ServiceManager};
use crate::unit::{
    ExecStartValue, PropertyName, UnitProperty, encode, flatten_environment, unit_name_for,
};

use super::{Job, LogCommand};

/// Properties the launcher always sets itself. Extra properties may not
/// redefine them.
pub const POLICY_PROPERTIES: [PropertyName; 3] = [
    PropertyName::ExecStart,
    PropertyName::RemainAfterExit,
    PropertyName::Environment,
];

/// Per-launch options.
#[derive(Debug, Clone, Default)]
pub struct StartOptions {
    /// Environment of the job. Nothing is inherited implicitly.
    pub env: BTreeMap<String, String>,
    /// Additional unit properties for this launch only.
    pub properties: Vec<UnitProperty>,
}

impl StartOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = env;
        self
    }

    pub fn with_property(mut self, property: UnitProperty) -> Self {
        self.properties.push(property);
        self
    }
}

/// Launches commands as transient service units.
///
/// `start` takes `&self`, so one launcher (and its manager connection) can be
/// shared between concurrent callers.
pub struct JobLauncher<M> {
    manager: M,
    log_command: LogCommand,
    extra_properties: Vec<UnitProperty>,
}

impl<M: ServiceManager> JobLauncher<M> {
    pub fn new(manager: M) -> Self {
        Self {
            manager,
            log_command: LogCommand::default(),
            extra_properties: Vec::new(),
        }
    }

    /// Follower command handed to every [`Job`] this launcher creates.
    pub fn with_log_command(mut self, log_command: LogCommand) -> Self {
        self.log_command = log_command;
        self
    }

    /// Properties added to every unit after the policy properties.
    pub fn with_properties(mut self, properties: Vec<UnitProperty>) -> Self {
        self.extra_properties = properties;
        self
    }

    pub fn manager(&self) -> &M {
        &self.manager
    }

    /// Launch `argv` as the transient unit `<job_name>.service`.
    ///
    /// Fails if a unit with that name already exists; never retries.
    pub async fn start(
        &self,
        job_name: &str,
        argv: Vec<String>,
        options: StartOptions,
    ) -> Result<Job> {
        let unit = unit_name_for(job_name)?;
        if argv.is_empty() {
            return Err(UnitJobError::InvalidJob(format!(
                "argv for job '{job_name}' must not be empty"
            )));
        }
        validate_env(&options.env)?;

        let mut properties = vec![
            UnitProperty::ExecStart(vec![ExecStartValue::new(argv)?]),
            UnitProperty::RemainAfterExit(true),
            UnitProperty::Environment(flatten_environment(&options.env)),
        ];
        for extra in self.extra_properties.iter().chain(&options.properties) {
            if POLICY_PROPERTIES.contains(&extra.name()) {
                return Err(UnitJobError::InvalidJob(format!(
                    "property {} is set by the launcher and cannot be overridden",
                    extra.name()
                )));
            }
            properties.push(extra.clone());
        }

        let encoded = encode(&properties);
        debug!(unit = %unit, ?encoded, "encoded unit properties");

        info!(unit = %unit, properties = encoded.len(), "starting transient unit");
        self.manager
            .start_transient_unit(&unit, CONFLICT_MODE_FAIL, &encoded)
            .await?;

        let handle = self.manager.get_unit(&unit).await?;
        info!(unit = %unit, handle = %handle, "transient unit started");

        Ok(Job::new(unit, handle, self.log_command.clone()))
    }
}

fn validate_env(env: &BTreeMap<String, String>) -> Result<()> {
    for key in env.keys() {
        if key.is_empty() {
            return Err(UnitJobError::InvalidJob(
                "environment variable names must not be empty".to_string(),
            ));
        }
        if key.contains('=') || key.contains('\0') {
            return Err(UnitJobError::InvalidJob(format!(
                "invalid environment variable name '{key}'"
            )));
        }
    }
    Ok(())
}
