//! # udin2mqtt-adapter-serial
//!
//! Serial adapter — implements the [`LineTransport`] port for UDIN boards.
//!
//! ## Endpoints
//! - a device path such as `/dev/ttyUSB0`, opened with `serialport`;
//! - `mock` or `mock:<model line>`, a synthetic in-memory board that echoes
//!   every request and answers identify with its model line.
//!
//! ## Dependency rule
//! Depends on `udin2mqtt-app` (for the port trait) and `udin2mqtt-domain`.

pub mod config;
pub mod error;
pub mod line;
pub mod mock;

use std::time::Duration;

use udin2mqtt_app::ports::LineTransport;

pub use config::SerialConfig;
pub use error::SerialError;
pub use line::UdinLine;
pub use mock::MockBoard;

/// Endpoint prefix selecting the synthetic board.
pub const MOCK_PREFIX: &str = "mock";

/// How long a single read waits before it is retried. The exchange as a whole
/// has no deadline.
const READ_POLL: Duration = Duration::from_millis(500);

/// Open `endpoint` and wrap it in a line transport.
///
/// # Errors
///
/// Returns [`SerialError::Open`] when the serial device cannot be opened.
pub fn open(endpoint: &str, baud_rate: u32) -> Result<Box<dyn LineTransport>, SerialError> {
    if endpoint.starts_with(MOCK_PREFIX) {
        let board = MockBoard::from_endpoint(endpoint);
        tracing::debug!(endpoint, model = board.model(), "opening mock board");
        let identifier = board.identifier().to_string();
        return Ok(Box::new(UdinLine::new(identifier, board)));
    }

    tracing::debug!(endpoint, baud_rate, "opening serial port");
    let port = serialport::new(endpoint, baud_rate)
        .data_bits(serialport::DataBits::Eight)
        .stop_bits(serialport::StopBits::One)
        .parity(serialport::Parity::None)
        .timeout(READ_POLL)
        .open()
        .map_err(|source| SerialError::Open {
            endpoint: endpoint.to_string(),
            source,
        })?;
    Ok(Box::new(UdinLine::new(serial_identifier(endpoint), port)))
}

/// Identifier of a serial endpoint: its path without a leading `/dev/`.
#[must_use]
pub fn serial_identifier(endpoint: &str) -> String {
    endpoint
        .strip_prefix("/dev/")
        .unwrap_or(endpoint)
        .to_string()
}
