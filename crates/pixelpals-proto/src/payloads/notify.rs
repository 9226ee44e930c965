//! Notification bodies pushed on the per-user queues and the status topic.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{ConversationId, MatchId, UserId};

/// Category of the conversation an unread delta refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChatCategory {
    /// Direct chat with a friend.
    ChatFriend,
    /// Chat inside a match room.
    ChatMatch,
    /// Any category this client does not know.
    #[serde(other)]
    Other,
}

/// Body of `queue/unread-updates`.
///
/// Every field is optional; a single body may carry several shapes at once:
///
/// - `total_unread_count`: replace the total
/// - `unread_counts_per_chat`: replace the per-conversation map
/// - `chat_room_id` + `unread_count`: point update of one conversation
/// - `category`: bump one category counter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadUpdate {
    /// Authoritative total.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_unread_count: Option<u64>,
    /// Authoritative per-conversation counts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unread_counts_per_chat: Option<BTreeMap<ConversationId, u64>>,
    /// Conversation of a point update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_room_id: Option<ConversationId>,
    /// New count of `chat_room_id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unread_count: Option<u64>,
    /// Category of the message that caused the update.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub category: Option<ChatCategory>,
}

impl UnreadUpdate {
    /// The `(conversation, count)` pair of a point update, if both are set.
    pub fn point_update(&self) -> Option<(&ConversationId, u64)> {
        Some((self.chat_room_id.as_ref()?, self.unread_count?))
    }
}

/// Kind of a match notification as sent on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchUpdateKind {
    /// Someone asked the user for a match.
    MatchRequest,
    /// A match the user is part of was accepted.
    MatchAccepted,
    /// A request the user sent was declined.
    MatchDeclined,
    /// A match the user is part of was closed.
    MatchClosed,
    /// Any type this client does not know.
    #[serde(other)]
    Unknown,
}

/// Body of `queue/match-notifications`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchUpdate {
    /// Notification type.
    #[serde(rename = "type")]
    pub kind: MatchUpdateKind,
    /// Match the notification is about. Bodies without one are ignored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_id: Option<MatchId>,
    /// Other participant (on accept).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opponent_username: Option<String>,
    /// Who closed the match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closer_username: Option<String>,
    /// Who sent the request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_username: Option<String>,
    /// Who declined the request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decliner_username: Option<String>,
    /// Game the match is for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_name: Option<String>,
}

impl MatchUpdate {
    /// Username of the other party, whichever field the kind uses.
    pub fn counterpart_username(&self) -> Option<&str> {
        let field = match self.kind {
            MatchUpdateKind::MatchRequest => &self.sender_username,
            MatchUpdateKind::MatchAccepted => &self.opponent_username,
            MatchUpdateKind::MatchDeclined => &self.decliner_username,
            MatchUpdateKind::MatchClosed => &self.closer_username,
            MatchUpdateKind::Unknown => return None,
        };
        field.as_deref()
    }
}

/// Body of `topic/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    /// User whose presence changed.
    pub user_id: UserId,
    /// Display name, when sent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// New presence.
    #[serde(alias = "isOnline")]
    pub online: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unread_point_update_with_category() {
        let json = r#"{"chatRoomId":"A_B","unreadCount":3,"type":"CHAT_FRIEND"}"#;
        let update: UnreadUpdate = serde_json::from_str(json).unwrap();

        assert_eq!(update.point_update(), Some((&ConversationId::from_raw("A_B"), 3)));
        assert_eq!(update.category, Some(ChatCategory::ChatFriend));
        assert_eq!(update.total_unread_count, None);
    }

    #[test]
    fn unknown_category_does_not_fail() {
        let json = r#"{"totalUnreadCount":1,"type":"CHAT_GROUP"}"#;
        let update: UnreadUpdate = serde_json::from_str(json).unwrap();
        assert_eq!(update.category, Some(ChatCategory::Other));
    }

    #[test]
    fn match_update_counterpart_follows_kind() {
        let json = r#"{"type":"MATCH_DECLINED","matchId":"m1","declinerUsername":"bob","gameName":"Chess"}"#;
        let update: MatchUpdate = serde_json::from_str(json).unwrap();

        assert_eq!(update.kind, MatchUpdateKind::MatchDeclined);
        assert_eq!(update.counterpart_username(), Some("bob"));
    }

    #[test]
    fn status_accepts_both_online_spellings() {
        let a: StatusUpdate = serde_json::from_str(r#"{"userId":"u1","online":true}"#).unwrap();
        let b: StatusUpdate =
            serde_json::from_str(r#"{"userId":"u1","username":"x","isOnline":true}"#).unwrap();
        assert!(a.online);
        assert!(b.online);
    }
}
