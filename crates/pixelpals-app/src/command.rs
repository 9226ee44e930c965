//! Line-oriented user commands.
//!
//! A line starting with `/` is a command; anything else is a chat message for
//! the open conversation.
//!
//! ```text
//! /login <user-id> <username> <token>
//! /logout
//! /chat <friend-id> [friend-name]
//! /match <match-id> <opponent-id> [opponent-name]
//! /close
//! /read [conversation-id]
//! /ack <match-id> <request|accept|decline|close>
//! /seen <friends|matches>
//! /refresh
//! /presence
//! /visible
//! /quit
//! ```

use pixelpals_client::{
    AuthToken, ClientEvent, ConversationId, ConversationKind, Counterpart, Identity, MatchKind,
};
use thiserror::Error;

/// Errors from parsing a command line.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// `/something` that is not a known command.
    #[error("unknown command: /{0}")]
    Unknown(String),

    /// A required argument is absent.
    #[error("/{command} needs <{argument}>")]
    MissingArgument {
        /// Command name without the slash.
        command: &'static str,
        /// Name of the missing argument.
        argument: &'static str,
    },

    /// `/ack` with a kind that is not one of the four.
    #[error("unknown notification kind: {0}")]
    InvalidKind(String),

    /// `/seen` with a badge that is not `friends` or `matches`.
    #[error("unknown badge: {0}")]
    InvalidBadge(String),
}

/// A parsed user command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Log in and open the push channel.
    Login {
        /// Who.
        identity: Identity,
        /// Their bearer credential.
        token: AuthToken,
    },
    /// Log out.
    Logout,
    /// Open a conversation.
    Open(ConversationKind),
    /// Close the open conversation.
    Close,
    /// Mark a conversation read; the open one when `None`.
    MarkRead(Option<ConversationId>),
    /// Acknowledge a match notification.
    Ack {
        /// Match of the notification.
        match_id: String,
        /// Kind of the notification.
        kind: MatchKind,
    },
    /// The friend chat page was viewed.
    SeenFriends,
    /// The match room was viewed.
    SeenMatches,
    /// Re-fetch every snapshot.
    Refresh,
    /// Re-fetch friend presence.
    Presence,
    /// The frontend became visible again.
    Visible,
    /// Send text to the open conversation.
    Say(String),
    /// Leave the application.
    Quit,
}

impl Command {
    /// Parse one input line.
    ///
    /// Returns `Ok(None)` for a blank line.
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let Some(rest) = line.strip_prefix('/') else {
            return Ok(Some(Self::Say(line.to_string())));
        };

        let mut words = rest.split_whitespace();
        let name = words.next().unwrap_or_default();

        let command = match name {
            "login" => {
                let user_id = required(words.next(), "login", "user-id")?;
                let username = required(words.next(), "login", "username")?;
                let token = required(words.next(), "login", "token")?;
                Self::Login {
                    identity: Identity::new(user_id, username),
                    token: AuthToken::new(token),
                }
            },
            "logout" => Self::Logout,
            "chat" => {
                let id = required(words.next(), "chat", "friend-id")?;
                let counterpart =
                    Counterpart { id: id.to_string(), username: words.next().map(str::to_string) };
                Self::Open(ConversationKind::Direct { counterpart })
            },
            "match" => {
                let match_id = required(words.next(), "match", "match-id")?;
                let id = required(words.next(), "match", "opponent-id")?;
                let counterpart =
                    Counterpart { id: id.to_string(), username: words.next().map(str::to_string) };
                Self::Open(ConversationKind::Match { match_id: match_id.to_string(), counterpart })
            },
            "close" => Self::Close,
            "read" => Self::MarkRead(words.next().map(ConversationId::from)),
            "ack" => {
                let match_id = required(words.next(), "ack", "match-id")?;
                let kind = match required(words.next(), "ack", "kind")? {
                    "request" => MatchKind::Requested,
                    "accept" => MatchKind::Accepted,
                    "decline" => MatchKind::Declined,
                    "close" => MatchKind::Closed,
                    other => return Err(CommandError::InvalidKind(other.to_string())),
                };
                Self::Ack { match_id: match_id.to_string(), kind }
            },
            "seen" => match required(words.next(), "seen", "badge")? {
                "friends" => Self::SeenFriends,
                "matches" => Self::SeenMatches,
                other => return Err(CommandError::InvalidBadge(other.to_string())),
            },
            "refresh" => Self::Refresh,
            "presence" => Self::Presence,
            "visible" => Self::Visible,
            "quit" | "exit" => Self::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };

        Ok(Some(command))
    }

    /// The client event for this command.
    ///
    /// `open` is the open conversation, used by `/read` without an argument.
    /// Returns `None` for `Quit` and for `/read` with nothing to mark.
    pub fn into_event<I>(self, open: Option<&ConversationId>) -> Option<ClientEvent<I>> {
        let event = match self {
            Self::Login { identity, token } => ClientEvent::Login { identity, token },
            Self::Logout => ClientEvent::Logout,
            Self::Open(kind) => ClientEvent::OpenConversation(kind),
            Self::Close => ClientEvent::CloseConversation,
            Self::MarkRead(conversation) => {
                ClientEvent::MarkRead(conversation.or_else(|| open.cloned())?)
            },
            Self::Ack { match_id, kind } => ClientEvent::ClearMatchNotification { match_id, kind },
            Self::SeenFriends => ClientEvent::ResetFriendChat,
            Self::SeenMatches => ClientEvent::ResetMatchChat,
            Self::Refresh => ClientEvent::Refresh,
            Self::Presence => ClientEvent::RefreshPresence,
            Self::Visible => ClientEvent::VisibilityRegained,
            Self::Say(content) => ClientEvent::SendMessage { content },
            Self::Quit => return None,
        };
        Some(event)
    }
}

fn required<'a>(
    word: Option<&'a str>,
    command: &'static str,
    argument: &'static str,
) -> Result<&'a str, CommandError> {
    word.ok_or(CommandError::MissingArgument { command, argument })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_a_message() {
        assert_eq!(Command::parse("  hello there "), Ok(Some(Command::Say("hello there".into()))));
        assert_eq!(Command::parse("   "), Ok(None));
    }

    #[test]
    fn chat_with_optional_name() {
        let parsed = Command::parse("/chat u2 bob");
        assert_eq!(
            parsed,
            Ok(Some(Command::Open(ConversationKind::Direct {
                counterpart: Counterpart::new("u2", "bob")
            })))
        );

        let parsed = Command::parse("/chat u2");
        assert!(matches!(
            parsed,
            Ok(Some(Command::Open(ConversationKind::Direct { counterpart })))
                if counterpart.username.is_none()
        ));
    }

    #[test]
    fn missing_arguments_are_named() {
        assert_eq!(
            Command::parse("/login u1 alice"),
            Err(CommandError::MissingArgument { command: "login", argument: "token" })
        );
        assert_eq!(
            Command::parse("/match m1"),
            Err(CommandError::MissingArgument { command: "match", argument: "opponent-id" })
        );
    }

    #[test]
    fn ack_kinds() {
        assert_eq!(
            Command::parse("/ack m1 decline"),
            Ok(Some(Command::Ack { match_id: "m1".into(), kind: MatchKind::Declined }))
        );
        assert_eq!(Command::parse("/ack m1 maybe"), Err(CommandError::InvalidKind("maybe".into())));
    }

    #[test]
    fn unknown_command() {
        assert_eq!(Command::parse("/dance"), Err(CommandError::Unknown("dance".into())));
    }

    #[test]
    fn read_defaults_to_open_conversation() {
        let open = ConversationId::from("a_b");

        let event: Option<ClientEvent> = Command::MarkRead(None).into_event(Some(&open));
        assert!(matches!(event, Some(ClientEvent::MarkRead(c)) if c == open));

        let event: Option<ClientEvent> = Command::MarkRead(None).into_event(None);
        assert!(event.is_none());
        let event: Option<ClientEvent> = Command::Quit.into_event(Some(&open));
        assert!(event.is_none());
    }
}
