//! Synthetic UDIN board for running without hardware.

use std::collections::VecDeque;
use std::io::{self, Read, Write};

use udin2mqtt_domain::board::MODEL_PREFIX_LEN;

use crate::MOCK_PREFIX;

/// Model line reported by a bare `mock` endpoint.
pub const DEFAULT_MOCK_MODEL: &str = "UDIN-8R 8 x Relay V1.0";

/// In-memory board. Every write is echoed back followed by `\n`; an identify
/// request is also answered with the model line.
#[derive(Debug, Clone)]
pub struct MockBoard {
    model: String,
    pending: VecDeque<u8>,
}

impl MockBoard {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            pending: VecDeque::new(),
        }
    }

    /// Board for a `mock[:MODEL]` endpoint.
    #[must_use]
    pub fn from_endpoint(endpoint: &str) -> Self {
        let model = endpoint
            .strip_prefix(MOCK_PREFIX)
            .and_then(|rest| rest.strip_prefix(':'))
            .unwrap_or(DEFAULT_MOCK_MODEL);
        Self::new(model)
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// The model prefix, which is what names the controller.
    #[must_use]
    pub fn identifier(&self) -> &str {
        self.model.get(..MODEL_PREFIX_LEN).unwrap_or(&self.model)
    }
}

impl Write for MockBoard {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend(buf);
        self.pending.push_back(b'\n');
        if buf == b"?\r" {
            self.pending.extend(self.model.as_bytes());
            self.pending.extend(b"\r\n");
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Read for MockBoard {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.pending.read(buf)
    }
}
