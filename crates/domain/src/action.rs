//! Action — the physical effect a device command resolves to.

use std::fmt;

use crate::device::{Device, DeviceKind};
use crate::error::ValidationError;
use crate::relay::RelayAddress;

/// What to do with the target relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Switch on, hold briefly, switch off.
    Pulse,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pulse => f.write_str("pulse"),
        }
    }
}

/// A resolved command: which controller, which relay, which operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub controller: String,
    pub relay: u8,
    pub operation: Operation,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}].{}", self.controller, self.relay, self.operation)
    }
}

impl Device {
    /// Interpret a free-text command received for this device.
    ///
    /// For [`DeviceKind::MomentaryOpenClose`], `open` pulses the first wiring
    /// entry and `close` the second, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnrecognizedCommand`] for any other text and
    /// [`ValidationError::InvalidRelayAddress`] when the selected wiring entry
    /// is missing or malformed.
    pub fn interpret(&self, command: &str) -> Result<Action, ValidationError> {
        match self.kind {
            DeviceKind::MomentaryOpenClose => {
                let slot = match command.to_ascii_lowercase().as_str() {
                    "open" => 0,
                    "close" => 1,
                    _ => {
                        return Err(ValidationError::UnrecognizedCommand {
                            device: self.name.clone(),
                            command: command.to_string(),
                        });
                    }
                };
                let entry = self.wiring.get(slot).ok_or_else(|| {
                    ValidationError::InvalidRelayAddress(format!("{}: no wiring entry {slot}", self.name))
                })?;
                let RelayAddress { controller, index } = entry.parse()?;
                Ok(Action {
                    controller,
                    relay: index,
                    operation: Operation::Pulse,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blind(wiring: &[&str]) -> Device {
        Device {
            name: "blind1".to_string(),
            kind: DeviceKind::MomentaryOpenClose,
            wiring: wiring.iter().map(ToString::to_string).collect(),
            enabled: true,
            icon: None,
        }
    }

    #[test]
    fn should_pulse_first_relay_on_open() {
        let action = blind(&["udin_8r-r1", "udin_8r-r2"]).interpret("open").unwrap();
        assert_eq!(
            action,
            Action {
                controller: "udin_8r".to_string(),
                relay: 1,
                operation: Operation::Pulse,
            }
        );
    }

    #[test]
    fn should_pulse_second_relay_on_close() {
        let action = blind(&["udin_8r-r1", "udin_8r-r2"]).interpret("close").unwrap();
        assert_eq!(action.controller, "udin_8r");
        assert_eq!(action.relay, 2);
        assert_eq!(action.operation, Operation::Pulse);
    }

    #[test]
    fn should_match_commands_case_insensitively() {
        let device = blind(&["udin_8r-r1", "udin_8r-r2"]);
        for (command, relay) in [("OPEN", 1), ("Close", 2), ("oPeN", 1), ("CLOSE", 2)] {
            assert_eq!(device.interpret(command).unwrap().relay, relay);
        }
    }

    #[test]
    fn should_reject_unknown_command() {
        let result = blind(&["udin_8r-r1", "udin_8r-r2"]).interpret("foo");
        assert!(matches!(result, Err(ValidationError::UnrecognizedCommand { .. })));
    }

    #[test]
    fn should_reject_malformed_wiring_entry() {
        let result = blind(&["udin_8r-r1", "udin_8r"]).interpret("close");
        assert!(matches!(result, Err(ValidationError::InvalidRelayAddress(_))));
    }

    #[test]
    fn should_reject_missing_wiring_entry() {
        let result = blind(&["udin_8r-r1"]).interpret("close");
        assert!(matches!(result, Err(ValidationError::InvalidRelayAddress(_))));
    }

    #[test]
    fn should_display_action() {
        let action = blind(&["udin_8r-r1", "udin_8r-r2"]).interpret("close").unwrap();
        assert_eq!(action.to_string(), "udin_8r[2].pulse");
    }
}
