// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::job::{DEFAULT_LOG_BUFFER, LogCommand};
use crate::manager::BusKind;
use crate::unit::{RawPropertyValue, UnitProperty};

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [manager]
/// bus = "system"
///
/// [journal]
/// program = "journalctl"
/// extra_args = []
/// buffer = 64
///
/// [properties]
/// Description = "launched by unitjob"
/// After = ["network.target"]
/// ```
///
/// All sections are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub manager: ManagerSection,

    #[serde(default)]
    pub journal: JournalSection,

    /// Extra unit properties applied to every job, keyed by systemd name.
    #[serde(default)]
    pub properties: BTreeMap<String, RawPropertyValue>,
}

/// `[manager]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ManagerSection {
    #[serde(default)]
    pub bus: BusKind,
}

/// `[journal]` section: how job logs are followed.
#[derive(Debug, Clone, Deserialize)]
pub struct JournalSection {
    #[serde(default = "default_program")]
    pub program: String,

    #[serde(default)]
    pub extra_args: Vec<String>,

    /// Lines buffered between the follower and the consumer.
    #[serde(default = "default_buffer")]
    pub buffer: usize,
}

fn default_program() -> String {
    "journalctl".to_string()
}

fn default_buffer() -> usize {
    DEFAULT_LOG_BUFFER
}

impl Default for JournalSection {
    fn default() -> Self {
        Self {
            program: default_program(),
            extra_args: Vec::new(),
            buffer: default_buffer(),
        }
    }
}

/// Validated configuration. Build it with `ConfigFile::try_from(raw)` or
/// [`load_and_validate`](crate::config::load_and_validate).
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub manager: ManagerSection,
    pub journal: JournalSection,
    /// `[properties]` coerced against the property table.
    pub properties: Vec<UnitProperty>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        manager: ManagerSection,
        journal: JournalSection,
        properties: Vec<UnitProperty>,
    ) -> Self {
        Self {
            manager,
            journal,
            properties,
        }
    }

    /// Follower command described by `[journal]`.
    pub fn log_command(&self) -> LogCommand {
        LogCommand::new(&self.journal.program)
            .with_extra_args(self.journal.extra_args.clone())
            .with_buffer(self.journal.buffer)
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self::new_unchecked(ManagerSection::default(), JournalSection::default(), Vec::new())
    }
}
