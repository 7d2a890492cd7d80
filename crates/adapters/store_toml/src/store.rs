//! [`DeviceStore`] backed by the configuration file.

use std::io;
use std::path::PathBuf;

use tokio::sync::Mutex;
use toml::{Table, Value};

use udin2mqtt_app::ports::DeviceStore;
use udin2mqtt_domain::device::Device;
use udin2mqtt_domain::error::BridgeError;
use udin2mqtt_domain::name::sanitize;

use crate::error::StoreError;
use crate::record::StoredDevice;

const DEVICE_SECTION: &str = "device";

/// Rewrites `[device.<name>]` in a TOML file on every save.
///
/// A missing file is treated as empty and created on first save. Saves are
/// serialized so concurrent read-modify-write cycles cannot interleave.
/// Tables whose key sanitizes to the saved name (`[device."blind-1"]` for
/// `blind_1`) are replaced rather than left behind.
#[derive(Debug)]
pub struct TomlDeviceStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl TomlDeviceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<Table, StoreError> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Table::new()),
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        text.parse::<Table>().map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    /// Write through a sibling temporary file so a crash never leaves a
    /// truncated configuration behind.
    async fn write(&self, table: &Table) -> Result<(), StoreError> {
        let write_error = |source| StoreError::Write {
            path: self.path.clone(),
            source,
        };
        let text = toml::to_string_pretty(table).map_err(StoreError::Render)?;
        let mut staging = self.path.clone().into_os_string();
        staging.push(".tmp");
        tokio::fs::write(&staging, text).await.map_err(write_error)?;
        tokio::fs::rename(&staging, &self.path)
            .await
            .map_err(write_error)
    }

    async fn save(&self, device: &Device) -> Result<(), StoreError> {
        let _guard = self.guard.lock().await;
        let mut table = self.load().await?;
        let record =
            Value::try_from(StoredDevice::from(device)).map_err(|source| StoreError::Serialize {
                name: device.name.clone(),
                source,
            })?;
        let devices = table
            .entry(DEVICE_SECTION)
            .or_insert_with(|| Value::Table(Table::new()))
            .as_table_mut()
            .ok_or(StoreError::NotATable(DEVICE_SECTION))?;
        let stale: Vec<String> = devices
            .keys()
            .filter(|key| **key != device.name && sanitize(key) == device.name)
            .cloned()
            .collect();
        for key in stale {
            devices.remove(&key);
        }
        devices.insert(device.name.clone(), record);
        self.write(&table).await?;
        tracing::debug!(device = %device.name, path = %self.path.display(), "device persisted");
        Ok(())
    }
}

impl DeviceStore for TomlDeviceStore {
    async fn save_device(&self, device: &Device) -> Result<(), BridgeError> {
        self.save(device).await.map_err(StoreError::into_domain)
    }
}
