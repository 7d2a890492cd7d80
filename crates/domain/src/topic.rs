//! Bus topic conventions. These spellings are shared with external hubs
//! and must not change.

use crate::error::ValidationError;

/// `<bridge>/<device>/set` — where a device receives commands.
#[must_use]
pub fn command_topic(bridge: &str, device: &str) -> String {
    format!("{bridge}/{device}/set")
}

/// `<bridge>/+/set` — subscription filter covering every device.
#[must_use]
pub fn command_filter(bridge: &str) -> String {
    format!("{bridge}/+/set")
}

/// `<discovery>/cover/<device>/config` — retained cover announcement.
#[must_use]
pub fn cover_config_topic(discovery_prefix: &str, device: &str) -> String {
    format!("{discovery_prefix}/cover/{device}/config")
}

/// `<bridge>/bridge/availability` — bridge online/offline state.
#[must_use]
pub fn availability_topic(bridge: &str) -> String {
    format!("{bridge}/bridge/availability")
}

/// Device name carried by a command topic: its second-to-last segment.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidTopic`] when the topic has fewer than
/// two segments or the segment is empty.
pub fn device_from_command_topic(topic: &str) -> Result<&str, ValidationError> {
    let mut segments = topic.rsplit('/');
    segments.next();
    segments
        .next()
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ValidationError::InvalidTopic(topic.to_string()))
}
