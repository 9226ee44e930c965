//! JSON bodies carried on push destinations and REST snapshots.
//!
//! Every inbound push body decodes into exactly one [`PushEvent`] variant,
//! chosen by the destination it arrived on. Consumers match on the variant
//! instead of registering per-destination callbacks.
//!
//! Unknown fields are ignored everywhere so the server can grow its payloads
//! without breaking older clients.

pub mod chat;
pub mod notify;
pub mod snapshot;

pub use chat::{ChatMessage, OutgoingMessage};
pub use notify::{ChatCategory, MatchUpdate, MatchUpdateKind, StatusUpdate, UnreadUpdate};
pub use snapshot::{FriendStatus, PendingMatch};
use serde::de::DeserializeOwned;

use crate::{
    ConversationId, Destination,
    errors::{ProtocolError, Result},
};

/// A decoded server push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushEvent {
    /// Unread counter delta (`queue/unread-updates`).
    Unread(UnreadUpdate),
    /// Match notification (`queue/match-notifications`).
    Match(MatchUpdate),
    /// A friend request arrived. The body is not inspected.
    FriendRequestNew,
    /// A friend request changed. The body is not inspected.
    FriendRequestUpdate,
    /// Presence change (`topic/status`).
    Status(StatusUpdate),
    /// Confirmed chat message on a conversation topic.
    ChatMessage {
        /// Conversation whose topic carried the message.
        conversation: ConversationId,
        /// The message.
        message: ChatMessage,
    },
}

impl PushEvent {
    /// Decode `body` according to the destination it arrived on.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::NotInbound` for outbound-only destinations
    /// - `ProtocolError::InvalidPayload` if the JSON does not fit the type
    pub fn decode(destination: &Destination, body: &str) -> Result<Self> {
        match destination {
            Destination::UnreadUpdates { .. } => parse(destination, body).map(Self::Unread),
            Destination::MatchNotifications { .. } => parse(destination, body).map(Self::Match),
            Destination::FriendRequestsNew { .. } => Ok(Self::FriendRequestNew),
            Destination::FriendRequestsUpdate { .. } => Ok(Self::FriendRequestUpdate),
            Destination::Status => parse(destination, body).map(Self::Status),
            Destination::ChatRoom(conversation) => parse(destination, body)
                .map(|message| Self::ChatMessage { conversation: conversation.clone(), message }),
            Destination::SendMessage => Err(ProtocolError::NotInbound(destination.path())),
        }
    }
}

fn parse<T: DeserializeOwned>(destination: &Destination, body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| ProtocolError::InvalidPayload {
        destination: destination.path(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn friend_request_bodies_are_not_inspected() {
        let destination = Destination::FriendRequestsNew { username: "alice".into() };
        assert_eq!(PushEvent::decode(&destination, "not json"), Ok(PushEvent::FriendRequestNew));
    }

    #[test]
    fn malformed_status_is_an_error() {
        let result = PushEvent::decode(&Destination::Status, r#"{"online":"yes"}"#);
        assert!(matches!(result, Err(ProtocolError::InvalidPayload { .. })));
    }

    #[test]
    fn chat_message_carries_topic_conversation() {
        let conversation = ConversationId::between("A", "B");
        let destination = Destination::ChatRoom(conversation.clone());
        let body = r#"{"id":"1","senderId":"A","content":"hi","chatRoomId":"A_B"}"#;

        let event = PushEvent::decode(&destination, body);
        assert!(matches!(
            event,
            Ok(PushEvent::ChatMessage { conversation: c, .. }) if c == conversation
        ));
    }

    #[test]
    fn send_destination_is_not_inbound() {
        assert!(matches!(
            PushEvent::decode(&Destination::SendMessage, "{}"),
            Err(ProtocolError::NotInbound(_))
        ));
    }
}
