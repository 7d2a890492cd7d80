//! Serial endpoints configuration.

use serde::Deserialize;

/// Which controller boards to attach, and how.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Device paths, or `mock[:MODEL]` for a synthetic board.
    pub endpoints: Vec<String>,
    /// Line speed for real serial devices.
    pub baud_rate: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            endpoints: vec![crate::MOCK_PREFIX.to_string()],
            baud_rate: 9600,
        }
    }
}
