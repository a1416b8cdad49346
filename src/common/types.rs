use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::color::DisplayColor;

/// A single chat message as it travels through the relay.
///
/// Built once by the sender and read by every consumer; nothing mutates it
/// afterwards. Row identity lives in the history store, not here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub sender: String,
    pub content: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub sender_color: DisplayColor,
}

impl ChatMessage {
    pub fn new(
        sender: impl Into<String>,
        content: impl Into<String>,
        sender_color: DisplayColor,
    ) -> Self {
        Self {
            sender: sender.into(),
            content: content.into(),
            timestamp: Utc::now(),
            sender_color,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_uses_camel_case_and_color_names() {
        let message = ChatMessage::new("carol", "hi", DisplayColor::DarkRed);
        let json = serde_json::to_value(&message).unwrap();

        assert_eq!(json["sender"], "carol");
        assert_eq!(json["senderColor"], "DarkRed");
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn missing_timestamp_and_color_fall_back_to_defaults() {
        let before = Utc::now();
        let message: ChatMessage =
            serde_json::from_str(r#"{"sender":"bob","content":"yo"}"#).unwrap();

        assert_eq!(message.sender_color, DisplayColor::Gray);
        assert!(message.timestamp >= before);
    }
}
