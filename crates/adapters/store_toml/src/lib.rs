//! # udin2mqtt-adapter-store-toml
//!
//! Storage adapter — keeps the `[device.<name>]` tables of the configuration
//! file in step with the device registry.
//!
//! ## Responsibilities
//! - Define the persisted shape of a device ([`StoredDevice`])
//! - Implement the [`DeviceStore`](udin2mqtt_app::ports::DeviceStore) port by
//!   rewriting one device table at a time, leaving every other section of the
//!   file as it was
//!
//! ## Dependency rule
//! Same as other adapters: depends on `udin2mqtt-app` and `udin2mqtt-domain`.

pub mod error;
pub mod record;
pub mod store;

pub use error::StoreError;
pub use record::StoredDevice;
pub use store::TomlDeviceStore;
