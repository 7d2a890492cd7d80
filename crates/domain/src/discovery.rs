//! Discovery announcements — retained messages describing a device to a
//! Home Assistant style hub.

use serde::{Deserialize, Serialize};

use crate::device::{Device, DeviceKind};
use crate::topic;

/// Bridge-wide values every announcement is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoverySettings {
    pub app_name: String,
    pub version: String,
    /// Prefix of the bridge's own topics (commands, availability).
    pub bridge_topic: String,
    /// Prefix the hub listens on for announcements.
    pub discovery_prefix: String,
    /// `host:port` where the control surface can be reached.
    pub advertise: String,
}

/// A topic and JSON payload ready to be published retained.
#[derive(Debug, Clone, PartialEq)]
pub struct Announcement {
    pub topic: String,
    pub payload: serde_json::Value,
}

/// `availability` entry of a discovery payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    pub topic: String,
}

/// `device` block of a discovery payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubDevice {
    pub identifiers: Vec<String>,
    pub name: String,
    pub sw_version: String,
    pub configuration_url: String,
}

/// Cover discovery payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverConfig {
    pub availability: Vec<Availability>,
    pub command_topic: String,
    pub device: HubDevice,
    pub unique_id: String,
    pub icon: String,
}

impl Device {
    /// Build the retained announcement for this device.
    #[must_use]
    pub fn announcement(&self, settings: &DiscoverySettings) -> Announcement {
        let hub_device = HubDevice {
            identifiers: vec![self.name.clone()],
            name: self.name.clone(),
            sw_version: format!("{} v{}", settings.app_name, settings.version),
            configuration_url: format!("http://{}", settings.advertise),
        };
        let availability = vec![Availability {
            topic: topic::availability_topic(&settings.bridge_topic),
        }];
        match self.kind {
            DeviceKind::MomentaryOpenClose => {
                let config = CoverConfig {
                    availability,
                    command_topic: topic::command_topic(&settings.bridge_topic, &self.name),
                    device: hub_device,
                    unique_id: self.name.clone(),
                    icon: self.icon_or_default().to_string(),
                };
                Announcement {
                    topic: topic::cover_config_topic(&settings.discovery_prefix, &self.name),
                    payload: serde_json::json!(config),
                }
            }
        }
    }
}
