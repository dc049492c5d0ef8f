// src/manager/mod.rs

//! Service manager abstraction.
//!
//! The launcher talks to a `ServiceManager` instead of a raw D-Bus proxy.
//! Production code uses [`DbusServiceManager`] (systemd over `zbus`); tests
//! provide a fake that records requests and simulates conflicts.
//!
//! Implementations take `&self` so one connection can serve several
//! concurrent `start` calls; request isolation is the transport's job.

pub mod dbus;

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use serde::Deserialize;

use crate::errors::Result;
use crate::unit::EncodedProperty;

pub use dbus::DbusServiceManager;

/// Conflict mode for `StartTransientUnit`: fail if the unit already exists.
pub const CONFLICT_MODE_FAIL: &str = "fail";

pub type ManagerFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// The two manager calls the launcher needs.
pub trait ServiceManager: Send + Sync {
    /// Create a transient unit. No auxiliary units are ever requested.
    fn start_transient_unit<'a>(
        &'a self,
        unit: &'a str,
        mode: &'a str,
        properties: &'a [EncodedProperty],
    ) -> ManagerFuture<'a, ()>;

    /// Resolve the handle of an existing unit.
    fn get_unit<'a>(&'a self, unit: &'a str) -> ManagerFuture<'a, UnitHandle>;
}

/// Opaque reference to a unit, as returned by the manager (a D-Bus object
/// path for systemd).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnitHandle(String);

impl UnitHandle {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnitHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which bus the systemd manager is reached on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusKind {
    /// System manager (PID 1).
    #[default]
    System,
    /// Per-user manager (`systemd --user`).
    Session,
}

