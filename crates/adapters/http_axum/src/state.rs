//! Shared application state for axum handlers.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;

use udin2mqtt_app::dispatcher::ControlEvent;
use udin2mqtt_app::registry::DeviceRegistry;

/// Static facts about the running bridge, served by `/api/info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BridgeInfo {
    pub name: String,
    pub version: String,
    /// Process start, in seconds since the Unix epoch.
    pub start_time: u64,
}

/// Application state shared across all axum handlers.
///
/// Queries read the registry directly; mutations go through the dispatch
/// loop's control channel so that it stays the only writer.
#[derive(Debug, Clone)]
pub struct AppState {
    pub registry: Arc<DeviceRegistry>,
    pub control: mpsc::Sender<ControlEvent>,
    pub info: Arc<BridgeInfo>,
}

impl AppState {
    pub fn new(
        registry: Arc<DeviceRegistry>,
        control: mpsc::Sender<ControlEvent>,
        info: BridgeInfo,
    ) -> Self {
        Self {
            registry,
            control,
            info: Arc::new(info),
        }
    }
}
