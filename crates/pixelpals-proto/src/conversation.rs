//! Identifiers shared by payloads and client state.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque user id assigned by the server.
pub type UserId = String;

/// Opaque match id assigned by the server.
pub type MatchId = String;

/// Separator between the two participant ids of a direct conversation.
pub const PAIR_SEPARATOR: char = '_';

/// Conversation key shared by both participants of a chat.
///
/// Direct chats use [`ConversationId::between`], which orders the two
/// participant ids byte-wise and joins them with [`PAIR_SEPARATOR`]. Both
/// sides compute the same key without asking the server. Match-room chats use
/// the match id verbatim via [`ConversationId::from_raw`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    /// Pairing key for a direct conversation between `a` and `b`.
    ///
    /// Symmetric: `between(a, b) == between(b, a)`.
    pub fn between(a: &str, b: &str) -> Self {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        Self(format!("{low}{PAIR_SEPARATOR}{high}"))
    }

    /// Wrap an id received from the server (or a match id) unchanged.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConversationId {
    fn from(raw: &str) -> Self {
        Self::from_raw(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairing_orders_lexicographically() {
        assert_eq!(ConversationId::between("A", "B").as_str(), "A_B");
        assert_eq!(ConversationId::between("B", "A").as_str(), "A_B");
    }

    #[test]
    fn pairing_is_bytewise_not_numeric() {
        // "10" < "9" byte-wise; both sides must agree on that.
        assert_eq!(ConversationId::between("9", "10").as_str(), "10_9");
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = ConversationId::between("u2", "u1");
        assert_eq!(serde_json::to_string(&id).ok().as_deref(), Some("\"u1_u2\""));
    }
}
