use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use unitjob::errors::UnitJobError;
use unitjob::manager::{CONFLICT_MODE_FAIL, ManagerFuture, ServiceManager, UnitHandle};
use unitjob::unit::JobProperties;

/// One recorded `start_transient_unit` call.
#[derive(Debug, Clone)]
pub struct StartRequest {
    pub unit: String,
    pub mode: String,
    pub properties: JobProperties,
}

#[derive(Default)]
struct FakeState {
    units: BTreeMap<String, JobProperties>,
    requests: Vec<StartRequest>,
    get_unit_calls: usize,
    disconnected: bool,
    reject_with: Option<String>,
}

/// A fake service manager that:
/// - records every creation request
/// - keeps created units in memory and refuses duplicates in "fail" mode,
///   with the same error name systemd uses
/// - can be switched to a disconnected or rejecting state.
#[derive(Clone, Default)]
pub struct FakeServiceManager {
    state: Arc<Mutex<FakeState>>,
}

impl FakeServiceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails with a connection error.
    pub fn disconnect(&self) {
        self.state.lock().unwrap().disconnected = true;
    }

    /// Every creation request is rejected with `message`.
    pub fn reject_with(&self, message: &str) {
        self.state.lock().unwrap().reject_with = Some(message.to_string());
    }

    pub fn requests(&self) -> Vec<StartRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn units(&self) -> Vec<String> {
        self.state.lock().unwrap().units.keys().cloned().collect()
    }

    pub fn properties_of(&self, unit: &str) -> Option<JobProperties> {
        self.state.lock().unwrap().units.get(unit).cloned()
    }

    pub fn get_unit_calls(&self) -> usize {
        self.state.lock().unwrap().get_unit_calls
    }
}

impl ServiceManager for FakeServiceManager {
    fn start_transient_unit<'a>(
        &'a self,
        unit: &'a str,
        mode: &'a str,
        properties: &'a [unitjob::unit::EncodedProperty],
    ) -> ManagerFuture<'a, ()> {
        let state = Arc::clone(&self.state);

        Box::pin(async move {
            // Yield once so concurrent callers actually interleave.
            tokio::task::yield_now().await;

            let mut guard = state.lock().unwrap();
            guard.requests.push(StartRequest {
                unit: unit.to_string(),
                mode: mode.to_string(),
                properties: properties.to_vec(),
            });

            if guard.disconnected {
                return Err(UnitJobError::Connection(
                    "fake bus is disconnected".to_string(),
                ));
            }
            if let Some(message) = guard.reject_with.clone() {
                return Err(UnitJobError::JobCreation {
                    unit: unit.to_string(),
                    message,
                });
            }
            if mode == CONFLICT_MODE_FAIL && guard.units.contains_key(unit) {
                return Err(UnitJobError::JobCreation {
                    unit: unit.to_string(),
                    message: format!(
                        "org.freedesktop.systemd1.UnitExists: Unit {unit} was already loaded or has a fragment file."
                    ),
                });
            }

            guard.units.insert(unit.to_string(), properties.to_vec());
            Ok(())
        })
    }

    fn get_unit<'a>(&'a self, unit: &'a str) -> ManagerFuture<'a, UnitHandle> {
        let state = Arc::clone(&self.state);

        Box::pin(async move {
            let mut guard = state.lock().unwrap();
            guard.get_unit_calls += 1;

            if guard.disconnected {
                return Err(UnitJobError::Connection(
                    "fake bus is disconnected".to_string(),
                ));
            }
            if !guard.units.contains_key(unit) {
                return Err(UnitJobError::JobCreation {
                    unit: unit.to_string(),
                    message: format!("org.freedesktop.systemd1.NoSuchUnit: Unit {unit} not loaded."),
                });
            }

            Ok(UnitHandle::new(unit_object_path(unit)))
        })
    }
}

/// systemd's object path for a unit: every byte that is not ASCII
/// alphanumeric is escaped as `_xx`.
pub fn unit_object_path(unit: &str) -> String {
    let mut path = String::from("/org/freedesktop/systemd1/unit/");
    for byte in unit.bytes() {
        if byte.is_ascii_alphanumeric() {
            path.push(byte as char);
        } else {
            path.push_str(&format!("_{byte:02x}"));
        }
    }
    path
}
