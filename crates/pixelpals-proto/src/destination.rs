//! Push-channel destinations.
//!
//! Per-user queues are addressed by username (the broker routes
//! `/user/{username}/...`), conversation topics by [`ConversationId`].

use std::fmt;

use crate::ConversationId;

/// A named stream on the push channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Destination {
    /// Unread counter deltas for one user.
    UnreadUpdates {
        /// Queue owner.
        username: String,
    },
    /// Match request/accept/decline/close notifications for one user.
    MatchNotifications {
        /// Queue owner.
        username: String,
    },
    /// A new friend request arrived.
    FriendRequestsNew {
        /// Queue owner.
        username: String,
    },
    /// An existing friend request changed state.
    FriendRequestsUpdate {
        /// Queue owner.
        username: String,
    },
    /// Global online/offline presence broadcasts.
    Status,
    /// Message stream of one conversation.
    ChatRoom(ConversationId),
    /// Outbound chat send (application destination).
    SendMessage,
}

impl Destination {
    /// Wire path used in `SUBSCRIBE` and `SEND` frames.
    pub fn path(&self) -> String {
        match self {
            Self::UnreadUpdates { username } => format!("/user/{username}/queue/unread-updates"),
            Self::MatchNotifications { username } => {
                format!("/user/{username}/queue/match-notifications")
            },
            Self::FriendRequestsNew { username } => {
                format!("/user/{username}/queue/friend-requests/new")
            },
            Self::FriendRequestsUpdate { username } => {
                format!("/user/{username}/queue/friend-requests/update")
            },
            Self::Status => "/topic/status".to_string(),
            Self::ChatRoom(id) => format!("/topic/chatRoom/{id}"),
            Self::SendMessage => "/app/chat.sendMessage".to_string(),
        }
    }

    /// Whether the server pushes messages on this destination.
    pub fn is_inbound(&self) -> bool {
        !matches!(self, Self::SendMessage)
    }

    /// The per-user queues every logged-in identity listens on.
    pub fn user_queues(username: &str) -> [Self; 4] {
        let username = username.to_string();
        [
            Self::UnreadUpdates { username: username.clone() },
            Self::MatchNotifications { username: username.clone() },
            Self::FriendRequestsNew { username: username.clone() },
            Self::FriendRequestsUpdate { username },
        ]
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}
