//! Persisted form of a device.

use serde::{Deserialize, Serialize};

use udin2mqtt_domain::device::{Device, DeviceKind, DeviceSpec};

/// One `[device.<name>]` table. The name is the table key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredDevice {
    pub kind: DeviceKind,
    /// Wiring, in the kind's order.
    pub def: Vec<String>,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl StoredDevice {
    /// The definition to replay into the registry under `name`.
    #[must_use]
    pub fn into_spec(self, name: &str) -> DeviceSpec {
        DeviceSpec::new(name, self.kind, self.def)
            .enabled(self.enabled)
            .icon(self.icon)
    }
}

impl From<&Device> for StoredDevice {
    fn from(device: &Device) -> Self {
        Self {
            kind: device.kind,
            def: device.wiring.clone(),
            enabled: device.enabled,
            icon: device.icon.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_deserialize_device_table() {
        let toml = r#"
            kind = "momentaryopenclose"
            def = ["udin_8r-r1", "udin_8r-r2"]
            enabled = true
        "#;
        let stored: StoredDevice = toml::from_str(toml).unwrap();
        assert_eq!(stored.kind, DeviceKind::MomentaryOpenClose);
        assert_eq!(stored.def, ["udin_8r-r1", "udin_8r-r2"]);
        assert!(stored.enabled);
        assert_eq!(stored.icon, None);
    }

    #[test]
    fn should_default_to_disabled() {
        let toml = r#"
            kind = "0"
            def = ["udin_8r-r1", "udin_8r-r2"]
        "#;
        let stored: StoredDevice = toml::from_str(toml).unwrap();
        assert!(!stored.enabled);
    }

    #[test]
    fn should_reject_unknown_kind() {
        let toml = r#"
            kind = "garage"
            def = []
        "#;
        assert!(toml::from_str::<StoredDevice>(toml).is_err());
    }

    #[test]
    fn should_carry_flags_into_spec() {
        let stored = StoredDevice {
            kind: DeviceKind::MomentaryOpenClose,
            def: vec!["udin_8r-r1".to_string(), "udin_8r-r2".to_string()],
            enabled: true,
            icon: Some("mdi:garage".to_string()),
        };
        let spec = stored.into_spec("garage");
        assert_eq!(spec.name, "garage");
        assert!(spec.enabled);
        assert_eq!(spec.icon.as_deref(), Some("mdi:garage"));
    }
}
