//! Chat message bodies.

use serde::{Deserialize, Deserializer, Serialize};

use crate::{ConversationId, UserId};

/// A server-confirmed chat message.
///
/// Carried on `/topic/chatRoom/{id}` and returned by the history endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Server-assigned id. Confirmed messages always carry one in practice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Author.
    pub sender_id: UserId,
    /// Author display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_username: Option<String>,
    /// Recipient.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver_id: Option<UserId>,
    /// Recipient display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver_username: Option<String>,
    /// Message text.
    pub content: String,
    /// Server timestamp as sent (ISO-8601 string, or the raw JSON when the
    /// server emits an array form).
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<String>,
    /// Whether the recipient has read it.
    #[serde(default)]
    pub read: bool,
    /// Conversation the message belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_room_id: Option<ConversationId>,
}

/// Body published to `/app/chat.sendMessage`.
///
/// The server assigns id and timestamp and echoes the stored message on the
/// conversation topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingMessage {
    /// Author (the local identity).
    pub sender_id: UserId,
    /// Author display name.
    pub sender_username: String,
    /// Recipient.
    pub receiver_id: UserId,
    /// Recipient display name, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver_username: Option<String>,
    /// Trimmed message text.
    pub content: String,
    /// Conversation key.
    pub chat_room_id: ConversationId,
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match raw {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(text)) => Some(text),
        Some(other) => Some(other.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_server_message() {
        let json = r#"{
            "id": "42",
            "senderId": "A",
            "senderUsername": "alice",
            "receiverId": "B",
            "receiverUsername": "bob",
            "content": "hi",
            "timestamp": "2024-05-01T10:00:00",
            "read": false,
            "chatRoomId": "A_B"
        }"#;

        let message: ChatMessage = serde_json::from_str(json).unwrap();
        assert_eq!(message.id.as_deref(), Some("42"));
        assert_eq!(message.chat_room_id, Some(ConversationId::between("B", "A")));
        assert_eq!(message.timestamp.as_deref(), Some("2024-05-01T10:00:00"));
    }

    #[test]
    fn array_timestamp_is_kept_as_text() {
        let json = r#"{"senderId":"A","content":"x","timestamp":[2024,5,1,10,0]}"#;
        let message: ChatMessage = serde_json::from_str(json).unwrap();
        assert_eq!(message.timestamp.as_deref(), Some("[2024,5,1,10,0]"));
        assert!(!message.read);
    }

    #[test]
    fn outgoing_uses_camel_case() {
        let outgoing = OutgoingMessage {
            sender_id: "A".into(),
            sender_username: "alice".into(),
            receiver_id: "B".into(),
            receiver_username: None,
            content: "hello".into(),
            chat_room_id: ConversationId::between("A", "B"),
        };

        let json = serde_json::to_value(&outgoing).unwrap();
        assert_eq!(json["chatRoomId"], "A_B");
        assert_eq!(json["senderUsername"], "alice");
        assert!(json.get("receiverUsername").is_none());
    }
}
