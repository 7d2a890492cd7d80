//! Relay address — `<controller>-r<index>`, one switchable output.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Compound key of controller name and 1-based relay index.
///
/// Ordering is by controller name, then by numeric index, which is the
/// order the relay catalog is offered to operators in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RelayAddress {
    pub controller: String,
    pub index: u8,
}

impl RelayAddress {
    #[must_use]
    pub fn new(controller: impl Into<String>, index: u8) -> Self {
        Self {
            controller: controller.into(),
            index,
        }
    }
}

impl fmt::Display for RelayAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-r{}", self.controller, self.index)
    }
}

impl FromStr for RelayAddress {
    type Err = ValidationError;

    /// Parse the external spelling. Controller keys never contain `-`
    /// (see [`crate::name::sanitize`]), so the first `-` is the separator.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidRelayAddress(s.to_string());
        let (controller, relay) = s.split_once('-').ok_or_else(invalid)?;
        let index = relay
            .strip_prefix('r')
            .and_then(|digits| digits.parse::<u8>().ok())
            .ok_or_else(invalid)?;
        if controller.is_empty() || index == 0 {
            return Err(invalid());
        }
        Ok(Self::new(controller, index))
    }
}

impl TryFrom<String> for RelayAddress {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RelayAddress> for String {
    fn from(value: RelayAddress) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_display_canonical_spelling() {
        assert_eq!(RelayAddress::new("udin_8r", 3).to_string(), "udin_8r-r3");
    }

    #[test]
    fn should_parse_canonical_spelling() {
        let addr: RelayAddress = "udin_44-r4".parse().unwrap();
        assert_eq!(addr, RelayAddress::new("udin_44", 4));
    }

    #[test]
    fn should_reject_missing_separator() {
        assert!("udin_8r1".parse::<RelayAddress>().is_err());
    }

    #[test]
    fn should_reject_missing_r_prefix() {
        assert!("udin_8r-1".parse::<RelayAddress>().is_err());
    }

    #[test]
    fn should_reject_non_numeric_index() {
        assert!("udin_8r-rx".parse::<RelayAddress>().is_err());
    }

    #[test]
    fn should_reject_zero_index() {
        assert!("udin_8r-r0".parse::<RelayAddress>().is_err());
    }

    #[test]
    fn should_reject_empty_controller() {
        assert!("-r1".parse::<RelayAddress>().is_err());
    }

    #[test]
    fn should_order_by_controller_then_numeric_index() {
        let mut relays = vec![
            RelayAddress::new("udin_8r", 10),
            RelayAddress::new("udin_8r", 2),
            RelayAddress::new("udin_44", 1),
        ];
        relays.sort();
        let spelled: Vec<String> = relays.iter().map(ToString::to_string).collect();
        assert_eq!(spelled, ["udin_44-r1", "udin_8r-r2", "udin_8r-r10"]);
    }
}
