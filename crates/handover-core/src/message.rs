//! Wire messages.
//!
//! Two windows exchange exactly two message kinds: the receiver announces
//! readiness to its opener, and the opener answers with a storage snapshot.
//! Messages travel as JSON text with a `type` discriminator.

use crate::StorageSnapshot;
use serde::{Deserialize, Serialize};

/// A message posted across the window boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferMessage {
    /// Receiver -> opener: the receiving window is listening.
    ReceiverReady,
    /// Opener -> receiver: the selected storage entries.
    TransferStorage { data: StorageSnapshot },
}

impl TransferMessage {
    /// Encode for posting.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode a posted message.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StorageValue;
    use serde_json::json;

    #[test]
    fn ready_wire_shape() {
        let text = TransferMessage::ReceiverReady.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value, json!({"type": "RECEIVER_READY"}));
    }

    #[test]
    fn transfer_wire_shape() {
        let mut data = StorageSnapshot::new();
        data.insert("token", StorageValue::Raw("abc123".to_string()));
        data.insert("profile", StorageValue::Json(json!({"name": "Kim"})));

        let text = TransferMessage::TransferStorage { data }.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "TRANSFER_STORAGE",
                "data": {
                    "profile": {"encoding": "json", "value": {"name": "Kim"}},
                    "token": {"encoding": "raw", "value": "abc123"},
                }
            })
        );
    }

    #[test]
    fn unknown_type_is_rejected() {
        assert!(TransferMessage::from_json(r#"{"type": "PING"}"#).is_err());
    }

    #[test]
    fn roundtrip() {
        let mut data = StorageSnapshot::new();
        data.insert("token", StorageValue::Raw("abc123".to_string()));
        let msg = TransferMessage::TransferStorage { data };
        let back = TransferMessage::from_json(&msg.to_json().unwrap()).unwrap();
        assert_eq!(msg, back);
    }
}
