//! Device — an operator-facing logical device wired to one or more relays.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, ValidationError};
use crate::name::sanitize;
use crate::relay::RelayAddress;

/// Icon announced when a device has none of its own.
pub const DEFAULT_ICON: &str = "mdi:blinds";

/// The closed set of logical device kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum DeviceKind {
    /// A cover driven by two momentary relays: one pulse opens, the other closes.
    MomentaryOpenClose,
}

impl DeviceKind {
    /// Every supported kind, in catalog order.
    pub const ALL: [Self; 1] = [Self::MomentaryOpenClose];

    /// Human-facing name offered in the kind catalog.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::MomentaryOpenClose => "MomentaryOpenClose",
        }
    }

    /// Number of wiring entries the kind needs.
    #[must_use]
    pub fn wiring_len(self) -> usize {
        match self {
            Self::MomentaryOpenClose => 2,
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MomentaryOpenClose => f.write_str("momentaryopenclose"),
        }
    }
}

impl FromStr for DeviceKind {
    type Err = ValidationError;

    /// Accepts the persisted spelling, the catalog label (any case) and the
    /// legacy numeric tag `0`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "0" || s.eq_ignore_ascii_case("momentaryopenclose") {
            return Ok(Self::MomentaryOpenClose);
        }
        Err(ValidationError::UnknownKind(s.to_string()))
    }
}

impl TryFrom<String> for DeviceKind {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DeviceKind> for String {
    fn from(value: DeviceKind) -> Self {
        value.to_string()
    }
}

/// A logical device record, as held by the registry and persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub name: String,
    pub kind: DeviceKind,
    /// Relay addresses in their external spelling, in kind-defined order.
    pub wiring: Vec<String>,
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl Device {
    /// The icon to announce, falling back to [`DEFAULT_ICON`].
    #[must_use]
    pub fn icon_or_default(&self) -> &str {
        self.icon.as_deref().unwrap_or(DEFAULT_ICON)
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}: {}, enabled={})",
            self.name,
            self.kind,
            self.wiring.join(","),
            self.enabled
        )
    }
}

/// Request to define a device, parsed from operator or config input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSpec {
    pub name: String,
    pub kind: DeviceKind,
    pub wiring: Vec<String>,
    pub enabled: bool,
    pub icon: Option<String>,
}

impl DeviceSpec {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: DeviceKind, wiring: Vec<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            wiring,
            enabled: false,
            icon: None,
        }
    }

    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    #[must_use]
    pub fn icon(mut self, icon: Option<String>) -> Self {
        self.icon = icon.filter(|icon| !icon.is_empty());
        self
    }

    /// Parse the positional form `[name, kind, wiring...]` used by the
    /// control surface. The device starts disabled.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyName`] when no name is given and
    /// [`ValidationError::UnknownKind`] when the kind is missing or unknown.
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> Result<Self, ValidationError> {
        let (name, rest) = args.split_first().ok_or(ValidationError::EmptyName)?;
        let (kind, wiring) = rest
            .split_first()
            .ok_or_else(|| ValidationError::UnknownKind(String::new()))?;
        let kind = kind.as_ref().parse()?;
        let wiring = wiring.iter().map(|w| w.as_ref().to_string()).collect();
        Ok(Self::new(name.as_ref(), kind, wiring))
    }

    /// Validate and produce the registry record.
    ///
    /// The name is sanitized; each wiring entry must parse as a
    /// [`RelayAddress`] accepted by `relay_exists`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Validation`] on an empty name, a wiring list of
    /// the wrong length, or a relay that does not parse or does not exist.
    pub fn into_device(
        self,
        relay_exists: impl Fn(&RelayAddress) -> bool,
    ) -> Result<Device, BridgeError> {
        let name = sanitize(&self.name);
        if name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        if self.wiring.len() != self.kind.wiring_len() {
            return Err(ValidationError::WiringLength {
                kind: self.kind.label(),
                expected: self.kind.wiring_len(),
                actual: self.wiring.len(),
            }
            .into());
        }
        for entry in &self.wiring {
            let address: RelayAddress = entry.parse()?;
            if !relay_exists(&address) {
                return Err(ValidationError::UnknownRelay(entry.clone()).into());
            }
        }
        Ok(Device {
            name,
            kind: self.kind,
            wiring: self.wiring,
            enabled: self.enabled,
            icon: self.icon,
        })
    }
}
