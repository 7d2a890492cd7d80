//! Device registry — logical device name to device record.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use udin2mqtt_domain::device::{Device, DeviceKind, DeviceSpec};
use udin2mqtt_domain::error::{BridgeError, NotFoundError};
use udin2mqtt_domain::name::sanitize;
use udin2mqtt_domain::relay::RelayAddress;

/// Thread-safe registry of logical devices.
///
/// The relay catalog is fixed at construction from the attached controllers;
/// device records are guarded by a single lock that is only held for the map
/// operation itself. Callers get copies, never references into the map.
///
/// Names are keyed in sanitized form; lookups sanitize their argument the
/// same way, so `blind-1` and `blind_1` address the same device.
#[derive(Debug)]
pub struct DeviceRegistry {
    relays: BTreeSet<RelayAddress>,
    devices: Mutex<HashMap<String, Device>>,
}

impl DeviceRegistry {
    /// Create an empty registry offering `relays` as wiring vocabulary.
    pub fn new(relays: impl IntoIterator<Item = RelayAddress>) -> Self {
        Self {
            relays: relays.into_iter().collect(),
            devices: Mutex::new(HashMap::new()),
        }
    }

    /// Validate `spec` and store it, replacing any device with the same name.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Validation`] when the name is empty or the
    /// wiring does not fit the kind or the relay catalog. The registry is
    /// left unchanged on error.
    #[tracing::instrument(skip(self, spec), fields(device = %spec.name, kind = %spec.kind))]
    pub fn create(&self, spec: DeviceSpec) -> Result<Device, BridgeError> {
        let device = spec.into_device(|relay| self.relays.contains(relay))?;
        let replaced = self
            .lock()
            .insert(device.name.clone(), device.clone())
            .is_some();
        if replaced {
            tracing::debug!(device = %device.name, "device definition replaced");
        }
        Ok(device)
    }

    /// Set the enabled flag of an existing device and return the new record.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::NotFound`] if no device is called `name`.
    #[tracing::instrument(skip(self))]
    pub fn set_enabled(&self, name: &str, enabled: bool) -> Result<Device, BridgeError> {
        let mut devices = self.lock();
        let device = devices.get_mut(&sanitize(name)).ok_or_else(|| NotFoundError {
            entity: "Device",
            id: name.to_string(),
        })?;
        device.enabled = enabled;
        Ok(device.clone())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Device> {
        self.lock().get(&sanitize(name)).cloned()
    }

    /// Snapshot of every device, sorted by name.
    #[must_use]
    pub fn list(&self) -> Vec<Device> {
        let mut devices: Vec<Device> = self.lock().values().cloned().collect();
        devices.sort_by(|a, b| a.name.cmp(&b.name));
        devices
    }

    /// Every relay on every attached controller, sorted by controller then index.
    #[must_use]
    pub fn relay_catalog(&self) -> Vec<RelayAddress> {
        self.relays.iter().cloned().collect()
    }

    /// The supported device kinds.
    #[must_use]
    pub fn kind_catalog(&self) -> &'static [DeviceKind] {
        &DeviceKind::ALL
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Device>> {
        self.devices.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
