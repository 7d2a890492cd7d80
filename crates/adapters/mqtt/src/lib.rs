//! # udin2mqtt-adapter-mqtt
//!
//! MQTT adapter — the bridge's connection to the message bus.
//!
//! ## Responsibilities
//! - Connect to an MQTT broker, reconnecting after a delay on failure
//! - Subscribe to `<bridge>/+/set` and forward commands to the dispatch loop
//! - Publish discovery announcements produced by the dispatch loop
//! - Maintain `<bridge>/bridge/availability` (`online`, last-will `offline`)
//!
//! ## Dependency rule
//! Same as other adapters: depends on `udin2mqtt-app` and `udin2mqtt-domain`.

pub mod bus;
pub mod config;
pub mod error;

pub use bus::MqttBus;
pub use config::MqttConfig;
pub use error::MqttError;
