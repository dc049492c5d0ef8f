// src/manager/dbus.rs

//! systemd manager over D-Bus.

use tracing::{debug, info};
use zbus::zvariant::{OwnedObjectPath, Value};
use zbus::{Connection, proxy};

use crate::errors::{Result, UnitJobError};
use crate::unit::{EncodedProperty, PropertyValue};

use super::{BusKind, ManagerFuture, ServiceManager, UnitHandle};

#[proxy(
    interface = "org.freedesktop.systemd1.Manager",
    default_service = "org.freedesktop.systemd1",
    default_path = "/org/freedesktop/systemd1",
    gen_blocking = false
)]
trait SystemdManager {
    fn start_transient_unit(
        &self,
        name: &str,
        mode: &str,
        properties: &[(&str, Value<'_>)],
        aux: &[(&str, &[(&str, Value<'_>)])],
    ) -> zbus::Result<OwnedObjectPath>;

    fn get_unit(&self, name: &str) -> zbus::Result<OwnedObjectPath>;
}

/// `ServiceManager` backed by a shared `zbus` connection.
///
/// The proxy is cheap to clone and safe to use from concurrent tasks; zbus
/// correlates replies by serial.
#[derive(Clone)]
pub struct DbusServiceManager {
    proxy: SystemdManagerProxy<'static>,
}

impl DbusServiceManager {
    /// Connect to the systemd manager on the given bus.
    pub async fn connect(bus: BusKind) -> Result<Self> {
        let connection = match bus {
            BusKind::System => Connection::system().await,
            BusKind::Session => Connection::session().await,
        }
        .map_err(|e| UnitJobError::Connection(e.to_string()))?;

        let proxy = SystemdManagerProxy::new(&connection)
            .await
            .map_err(|e| UnitJobError::Connection(e.to_string()))?;

        info!(?bus, "connected to systemd manager");
        Ok(Self { proxy })
    }
}

impl ServiceManager for DbusServiceManager {
    fn start_transient_unit<'a>(
        &'a self,
        unit: &'a str,
        mode: &'a str,
        properties: &'a [EncodedProperty],
    ) -> ManagerFuture<'a, ()> {
        Box::pin(async move {
            let wire: Vec<(&str, Value<'static>)> = properties
                .iter()
                .map(|p| (p.name, to_variant(&p.value)))
                .collect();
            let aux: Vec<(&str, &[(&str, Value<'_>)])> = Vec::new();

            let job = self
                .proxy
                .start_transient_unit(unit, mode, &wire, &aux)
                .await
                .map_err(|e| classify(unit, e))?;

            debug!(unit, job = %job.as_str(), "StartTransientUnit accepted");
            Ok(())
        })
    }

    fn get_unit<'a>(&'a self, unit: &'a str) -> ManagerFuture<'a, UnitHandle> {
        Box::pin(async move {
            let path = self
                .proxy
                .get_unit(unit)
                .await
                .map_err(|e| classify(unit, e))?;

            Ok(UnitHandle::new(path.as_str()))
        })
    }
}

fn to_variant(value: &PropertyValue) -> Value<'static> {
    match value {
        PropertyValue::Bool(b) => Value::from(*b),
        PropertyValue::String(s) => Value::from(s.clone()),
        PropertyValue::StringArray(items) => Value::from(items.clone()),
        PropertyValue::UIntArray(items) => Value::from(items.clone()),
        PropertyValue::ExecCommandArray(commands) => Value::from(commands.clone()),
    }
}

/// Split manager replies into "the manager said no" and "the bus broke".
fn classify(unit: &str, err: zbus::Error) -> UnitJobError {
    match err {
        zbus::Error::MethodError(name, detail, _) => UnitJobError::JobCreation {
            unit: unit.to_string(),
            message: match detail {
                Some(detail) => format!("{}: {detail}", name.as_str()),
                None => name.to_string(),
            },
        },
        zbus::Error::FDO(fdo) => UnitJobError::JobCreation {
            unit: unit.to_string(),
            message: fdo.to_string(),
        },
        other => UnitJobError::Connection(other.to_string()),
    }
}
