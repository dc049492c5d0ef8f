// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum UnitJobError {
    /// A property name outside the fixed property table. Never sent to the
    /// service manager.
    #[error("Unsupported unit property: {0}")]
    UnsupportedProperty(String),

    /// A known property name carrying a value of the wrong shape.
    #[error("Invalid value for unit property {name}: expected {expected}")]
    InvalidPropertyValue { name: String, expected: &'static str },

    /// The launch request was rejected locally before anything was sent.
    #[error("Invalid job: {0}")]
    InvalidJob(String),

    /// The service manager refused to create the unit (name conflict,
    /// validation failure, permission failure). `message` is the manager's.
    #[error("Failed to create unit {unit}: {message}")]
    JobCreation { unit: String, message: String },

    #[error("Service manager connection error: {0}")]
    Connection(String),

    #[error("Log stream for {unit} failed: {reason}")]
    LogStream { unit: String, reason: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl UnitJobError {
    pub(crate) fn log_stream(unit: &str, reason: impl Into<String>) -> Self {
        UnitJobError::LogStream {
            unit: unit.to_string(),
            reason: reason.into(),
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, UnitJobError>;
