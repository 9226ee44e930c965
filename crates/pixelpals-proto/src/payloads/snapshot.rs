//! REST snapshot bodies.

use serde::{Deserialize, Serialize};

use crate::{MatchId, UserId};

/// One entry of `GET /friends`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendStatus {
    /// Friend id.
    pub id: UserId,
    /// Friend display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Presence at snapshot time.
    #[serde(default, alias = "isOnline")]
    pub online: bool,
    /// Avatar location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// One entry of `GET /match/pending-game-match`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingMatch {
    /// Match id.
    pub id: MatchId,
    /// Requesting user.
    #[serde(default, rename = "userAUsername", skip_serializing_if = "Option::is_none")]
    pub user_a_username: Option<String>,
    /// Game the match is for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_name: Option<String>,
    /// When the request was made (server local date-time, no zone).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_at: Option<String>,
}
