//! Serial adapter error types.

use udin2mqtt_domain::error::BridgeError;

/// Errors specific to the serial adapter.
#[derive(Debug, thiserror::Error)]
pub enum SerialError {
    /// The serial device could not be opened.
    #[error("failed to open serial endpoint {endpoint}")]
    Open {
        endpoint: String,
        #[source]
        source: serialport::Error,
    },
}

impl SerialError {
    /// Convert into a [`BridgeError::Transport`] for propagation across port
    /// boundaries.
    pub fn into_domain(self) -> BridgeError {
        BridgeError::Transport(Box::new(self))
    }
}

impl From<SerialError> for BridgeError {
    fn from(err: SerialError) -> Self {
        err.into_domain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_error() -> SerialError {
        SerialError::Open {
            endpoint: "/dev/ttyUSB9".to_string(),
            source: serialport::Error::new(serialport::ErrorKind::NoDevice, "gone"),
        }
    }

    #[test]
    fn should_display_endpoint_in_open_error() {
        assert_eq!(
            open_error().to_string(),
            "failed to open serial endpoint /dev/ttyUSB9"
        );
    }

    #[test]
    fn should_convert_to_transport_error() {
        let err: BridgeError = open_error().into();
        assert!(matches!(err, BridgeError::Transport(_)));
    }
}
