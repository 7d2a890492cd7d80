//! Store port — durable record of device registry changes.

use std::future::Future;

use udin2mqtt_domain::device::Device;
use udin2mqtt_domain::error::BridgeError;

/// Records device definitions so they survive a restart.
///
/// Called by the dispatch loop after every registry mutation, with the full
/// resulting record (name, kind, wiring, enabled flag, icon).
pub trait DeviceStore: Send + Sync {
    /// Persist `device`, replacing any earlier record with the same name.
    fn save_device(&self, device: &Device) -> impl Future<Output = Result<(), BridgeError>> + Send;
}

impl<T: DeviceStore> DeviceStore for std::sync::Arc<T> {
    fn save_device(&self, device: &Device) -> impl Future<Output = Result<(), BridgeError>> + Send {
        (**self).save_device(device)
    }
}
