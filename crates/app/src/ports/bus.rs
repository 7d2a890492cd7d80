//! Bus messages exchanged with the message-bus client.

use std::borrow::Cow;

use udin2mqtt_domain::discovery::Announcement;

/// A message received on a subscribed topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl InboundMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }

    /// The payload as text; invalid UTF-8 is replaced rather than rejected.
    #[must_use]
    pub fn payload_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}

/// A message the bus client should publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub retain: bool,
}

impl From<Announcement> for OutboundMessage {
    fn from(announcement: Announcement) -> Self {
        Self {
            topic: announcement.topic,
            payload: announcement.payload.to_string().into_bytes(),
            retain: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_decode_payload_text() {
        let msg = InboundMessage::new("udin2mqtt/blind1/set", "OPEN");
        assert_eq!(msg.payload_text(), "OPEN");
    }

    #[test]
    fn should_replace_invalid_utf8() {
        let msg = InboundMessage::new("t", vec![0x6f, 0xff]);
        assert_eq!(msg.payload_text(), "o\u{fffd}");
    }

    #[test]
    fn should_retain_announcements() {
        let msg = OutboundMessage::from(Announcement {
            topic: "baz/cover/blind1/config".to_string(),
            payload: serde_json::json!({"unique_id": "blind1"}),
        });
        assert!(msg.retain);
        assert_eq!(msg.payload, br#"{"unique_id":"blind1"}"#);
    }
}
