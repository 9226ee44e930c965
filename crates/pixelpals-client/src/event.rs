//! Client events, actions, and REST request descriptions.

use std::collections::BTreeMap;

use pixelpals_core::{AuthToken, ConnectionState, Identity};
use pixelpals_proto::{
    ConversationId, Frame, MatchId, UserId,
    payloads::{ChatMessage, FriendStatus, PendingMatch},
};
use serde::de::DeserializeOwned;

use crate::{
    error::FetchError,
    matches::{MatchKind, MatchNotification},
    transcript::ConversationKind,
};

/// Events the caller feeds into the client.
///
/// The caller is responsible for:
/// - Reporting transport events, tagged with the attempt they belong to
/// - Executing REST requests and reporting their outcome
/// - Driving time forward via ticks
/// - Forwarding user intents (login, open chat, send, mark read, ...)
///
/// Generic over `I` (Instant type) to support both production
/// (`std::time::Instant`) and simulation environments.
#[derive(Debug, Clone)]
pub enum ClientEvent<I = std::time::Instant> {
    /// User logged in; construct the session state and open the channel.
    Login {
        /// Who logged in.
        identity: Identity,
        /// Their bearer credential.
        token: AuthToken,
    },

    /// User logged out; tear everything down.
    Logout,

    /// Transport of `attempt` is open.
    TransportOpened {
        /// Attempt from `ClientAction::OpenTransport`.
        attempt: u64,
    },

    /// Text message received on transport `attempt`.
    TransportData {
        /// Attempt the transport belongs to.
        attempt: u64,
        /// Raw WebSocket text.
        text: String,
    },

    /// Transport of `attempt` closed or failed.
    TransportClosed {
        /// Attempt the transport belongs to.
        attempt: u64,
    },

    /// Time tick for reconnects, heart-beats and timeouts.
    Tick {
        /// Current time from the environment.
        now: I,
    },

    /// Host surface came back to the foreground.
    VisibilityRegained,

    /// A REST request finished.
    Fetched {
        /// Login epoch from the `Fetch` action.
        epoch: u64,
        /// The request that was executed.
        request: Request,
        /// Decoded response, or why there is none.
        result: Result<Response, FetchError>,
    },

    /// Open a conversation (fetches history, then subscribes its topic).
    OpenConversation(ConversationKind),

    /// Close the open conversation.
    CloseConversation,

    /// Send a chat message to the open conversation.
    SendMessage {
        /// Message text; trimmed before sending.
        content: String,
    },

    /// Mark a conversation as read on the server.
    MarkRead(ConversationId),

    /// The user acknowledged a match notification.
    ClearMatchNotification {
        /// Match of the notification.
        match_id: MatchId,
        /// Kind of the notification.
        kind: MatchKind,
    },

    /// The friend chat page was opened.
    ResetFriendChat,

    /// The match room was opened.
    ResetMatchChat,

    /// Re-fetch every snapshot.
    Refresh,

    /// Re-fetch the friend presence snapshot.
    RefreshPresence,
}

/// Actions the client produces for the caller to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientAction {
    /// Open a WebSocket; report its events with `attempt`.
    OpenTransport {
        /// Attempt number.
        attempt: u64,
    },

    /// Send a frame on the current WebSocket.
    Send(Frame),

    /// Send a heart-beat EOL on the current WebSocket.
    SendHeartbeat,

    /// Close the WebSocket of `attempt`.
    CloseTransport {
        /// Attempt being closed.
        attempt: u64,
    },

    /// Execute a REST request and report it back as `ClientEvent::Fetched`.
    Fetch {
        /// Login epoch to echo back.
        epoch: u64,
        /// What to fetch.
        request: Request,
    },

    /// Connection state changed (for a "connecting" indicator).
    ConnectionChanged(ConnectionState),

    /// A match was accepted or closed. Show it and navigate.
    MatchUpdate(MatchNotification),

    /// The credential is no longer valid. Local state is gone; go to login.
    SessionExpired {
        /// What reported the expiry.
        reason: String,
    },

    /// An operation failed; state was left untouched so it can be retried.
    Error {
        /// User-facing description.
        message: String,
    },
}

/// HTTP method of a [`Request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
}

/// Where the history of a conversation comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistorySource {
    /// Direct chat history with a friend.
    Direct {
        /// The friend.
        counterpart: UserId,
    },
    /// Match-room chat history.
    Match {
        /// The match.
        match_id: MatchId,
    },
}

impl HistorySource {
    /// History source of a conversation kind.
    pub fn of(kind: &ConversationKind) -> Self {
        match kind {
            ConversationKind::Direct { counterpart } => {
                Self::Direct { counterpart: counterpart.id.clone() }
            },
            ConversationKind::Match { match_id, .. } => Self::Match { match_id: match_id.clone() },
        }
    }
}

/// A REST request the client needs executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// `GET /messages/unread/total`
    UnreadTotal,
    /// `GET /messages/unread/per-chat`
    UnreadPerChat,
    /// `POST /messages/mark-read/{conversationId}`
    MarkRead(ConversationId),
    /// Conversation history.
    History {
        /// Conversation the history is for (stale-response guard).
        conversation: ConversationId,
        /// Which endpoint to use.
        source: HistorySource,
    },
    /// `GET /match/pending-game-match`
    PendingMatches,
    /// `GET /friends/pending`
    PendingFriendRequests,
    /// `GET /friends`: the friend list, each entry with its online flag.
    FriendStatus,
}

impl Request {
    /// Every snapshot fetched after (re)connect or on refresh.
    pub fn snapshots() -> [Self; 5] {
        [
            Self::UnreadTotal,
            Self::UnreadPerChat,
            Self::PendingMatches,
            Self::PendingFriendRequests,
            Self::FriendStatus,
        ]
    }

    /// HTTP method.
    pub fn method(&self) -> Method {
        match self {
            Self::MarkRead(_) => Method::Post,
            _ => Method::Get,
        }
    }

    /// Path relative to the API base.
    pub fn path(&self) -> String {
        match self {
            Self::UnreadTotal => "/messages/unread/total".to_string(),
            Self::UnreadPerChat => "/messages/unread/per-chat".to_string(),
            Self::MarkRead(conversation) => format!("/messages/mark-read/{conversation}"),
            Self::History { source: HistorySource::Direct { counterpart }, .. } => {
                format!("/messages/history/{counterpart}")
            },
            Self::History { source: HistorySource::Match { match_id }, .. } => {
                format!("/messages/match/{match_id}/history")
            },
            Self::PendingMatches => "/match/pending-game-match".to_string(),
            Self::PendingFriendRequests => "/friends/pending".to_string(),
            Self::FriendStatus => "/friends".to_string(),
        }
    }

    /// Decode a successful response body.
    ///
    /// # Errors
    ///
    /// - `FetchError::Decode` if the body does not fit the endpoint
    pub fn decode_response(&self, body: &str) -> Result<Response, FetchError> {
        let response = match self {
            Self::UnreadTotal => Response::UnreadTotal(parse(body)?),
            Self::UnreadPerChat => Response::UnreadPerChat(parse(body)?),
            Self::MarkRead(_) => Response::MarkedRead,
            Self::History { .. } => Response::History(parse(body)?),
            Self::PendingMatches => Response::PendingMatches(parse(body)?),
            Self::PendingFriendRequests => {
                Response::PendingFriendRequests(parse::<Vec<serde_json::Value>>(body)?.len())
            },
            Self::FriendStatus => Response::FriendStatus(parse(body)?),
        };
        Ok(response)
    }
}

/// A decoded REST response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Total unread count.
    UnreadTotal(u64),
    /// Unread count per conversation.
    UnreadPerChat(BTreeMap<ConversationId, u64>),
    /// Mark-read succeeded.
    MarkedRead,
    /// Conversation history, oldest first.
    History(Vec<ChatMessage>),
    /// Match requests waiting for the user.
    PendingMatches(Vec<PendingMatch>),
    /// Number of pending friend requests.
    PendingFriendRequests(usize),
    /// Friend list with presence.
    FriendStatus(Vec<FriendStatus>),
}

fn parse<T: DeserializeOwned>(body: &str) -> Result<T, FetchError> {
    serde_json::from_str(body).map_err(|e| FetchError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_paths_follow_source() {
        let direct = Request::History {
            conversation: "a_b".into(),
            source: HistorySource::Direct { counterpart: "b".into() },
        };
        let matched = Request::History {
            conversation: "m1".into(),
            source: HistorySource::Match { match_id: "m1".into() },
        };

        assert_eq!(direct.path(), "/messages/history/b");
        assert_eq!(matched.path(), "/messages/match/m1/history");
    }

    #[test]
    fn mark_read_is_post() {
        let request = Request::MarkRead("a_b".into());
        assert_eq!(request.method(), Method::Post);
        assert_eq!(request.path(), "/messages/mark-read/a_b");
        assert_eq!(request.decode_response(""), Ok(Response::MarkedRead));
    }

    #[test]
    fn pending_friend_requests_counts_entries() {
        let body = r#"[{"id":"1"},{"id":"2"},{"id":"3"}]"#;
        assert_eq!(
            Request::PendingFriendRequests.decode_response(body),
            Ok(Response::PendingFriendRequests(3))
        );
    }

    #[test]
    fn friend_status_reads_the_friend_list() {
        let request = Request::FriendStatus;
        assert_eq!(request.method(), Method::Get);
        assert_eq!(request.path(), "/friends");

        // Full user records; fields the tracker does not need are ignored.
        let body = r#"[{"id":"f1","username":"bob","email":"b@x","level":3,"rating":4.5,
            "online":true,"avatarUrl":null,"authProvider":"LOCAL"}]"#;
        assert!(matches!(
            request.decode_response(body),
            Ok(Response::FriendStatus(friends))
                if friends.len() == 1 && friends[0].id == "f1" && friends[0].online
        ));
    }

    #[test]
    fn bad_body_is_decode_error() {
        assert!(matches!(
            Request::UnreadTotal.decode_response("\"many\""),
            Err(FetchError::Decode(_))
        ));
    }
}
