//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `udin2mqtt.toml` in the working directory, or at the path in
//! `UDIN2MQTT_CONFIG`. Every field has a sensible default so the file is
//! optional. Environment variables take precedence over file values.
//!
//! The same file holds the persisted `[device.<name>]` tables, which the
//! TOML store rewrites at runtime.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use udin2mqtt_adapter_mqtt::MqttConfig;
use udin2mqtt_adapter_serial::SerialConfig;
use udin2mqtt_adapter_store_toml::StoredDevice;
use udin2mqtt_domain::device::DeviceSpec;
use udin2mqtt_domain::discovery::DiscoverySettings;

/// Name used in logs, discovery payloads and defaults.
pub const APP_NAME: &str = "udin2mqtt";

const DEFAULT_CONFIG_PATH: &str = "udin2mqtt.toml";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP control surface settings.
    pub server: ServerConfig,
    /// Broker connection settings.
    pub mqtt: MqttConfig,
    /// Topic naming and timing.
    pub bridge: BridgeConfig,
    /// Controller boards to attach.
    pub serial: SerialConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Persisted device definitions, keyed by name.
    pub device: BTreeMap<String, StoredDevice>,
}

/// HTTP listener configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// `host:port` announced as the configuration URL. Defaults to the bind
    /// address.
    pub advertise: Option<String>,
}

/// Bridge behaviour.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Prefix of command and availability topics.
    pub topic: String,
    /// Prefix the hub listens on for discovery.
    pub discovery_prefix: String,
    /// Re-announce enabled devices this often; `0` disables.
    pub announce_interval_secs: u64,
    /// How long a relay is held on during a pulse.
    pub pulse_duration_ms: u64,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

impl Config {
    /// Location of the configuration file.
    #[must_use]
    pub fn path() -> PathBuf {
        std::env::var_os("UDIN2MQTT_CONFIG").map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
    }

    /// Load configuration from `path` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// result fails validation.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("UDIN2MQTT_BIND") {
            if let Some((host, port)) = val.rsplit_once(':') {
                self.server.host = host.to_string();
                if let Ok(port) = port.parse() {
                    self.server.port = port;
                }
            }
        }
        if let Some(val) = var("UDIN2MQTT_BROKER") {
            match val.rsplit_once(':') {
                Some((host, port)) => {
                    self.mqtt.broker_host = host.to_string();
                    if let Ok(port) = port.parse() {
                        self.mqtt.broker_port = port;
                    }
                }
                None => self.mqtt.broker_host = val,
            }
        }
        if let Some(val) = var("UDIN2MQTT_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("port must be non-zero".to_string()));
        }
        if self.serial.endpoints.is_empty() {
            return Err(ConfigError::Validation(
                "at least one serial endpoint is required".to_string(),
            ));
        }
        if self.bridge.topic.is_empty() {
            return Err(ConfigError::Validation("bridge topic must not be empty".to_string()));
        }
        if self.bridge.discovery_prefix.is_empty() {
            return Err(ConfigError::Validation(
                "discovery prefix must not be empty".to_string(),
            ));
        }
        if self.bridge.pulse_duration_ms == 0 {
            return Err(ConfigError::Validation(
                "pulse duration must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Return the `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Return the address announced to the hub.
    #[must_use]
    pub fn advertise_addr(&self) -> String {
        self.server
            .advertise
            .clone()
            .filter(|addr| !addr.is_empty())
            .unwrap_or_else(|| self.bind_addr())
    }

    #[must_use]
    pub fn discovery_settings(&self) -> DiscoverySettings {
        DiscoverySettings {
            app_name: APP_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            bridge_topic: self.bridge.topic.clone(),
            discovery_prefix: self.bridge.discovery_prefix.clone(),
            advertise: self.advertise_addr(),
        }
    }

    #[must_use]
    pub fn pulse_duration(&self) -> Duration {
        Duration::from_millis(self.bridge.pulse_duration_ms)
    }

    /// `None` when periodic re-announcement is disabled.
    #[must_use]
    pub fn announce_interval(&self) -> Option<Duration> {
        (self.bridge.announce_interval_secs > 0)
            .then(|| Duration::from_secs(self.bridge.announce_interval_secs))
    }

    /// The persisted devices, ready to replay into the registry.
    #[must_use]
    pub fn device_specs(&self) -> Vec<DeviceSpec> {
        self.device
            .iter()
            .map(|(name, stored)| stored.clone().into_spec(name))
            .collect()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8094,
            advertise: None,
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            topic: APP_NAME.to_string(),
            discovery_prefix: "homeassistant".to_string(),
            announce_interval_secs: 600,
            pulse_duration_ms: 1000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "udin2mqttd=info,udin2mqtt=info,tower_http=debug".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
