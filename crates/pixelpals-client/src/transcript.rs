//! Transcript of the open conversation.
//!
//! Only one conversation is open at a time. Opening another one discards the
//! previous log; history is fetched again on every open.
//!
//! # Reconciliation
//!
//! Every confirmed message arriving on the conversation topic goes through:
//!
//! 1. An entry with the same server id exists: duplicate delivery, dropped.
//! 2. A provisional entry with the same `(sender_id, content)` exists: it is
//!    replaced in place by the confirmed message.
//! 3. Otherwise the message is appended.
//!
//! # Invariants
//!
//! - A history response for a conversation that is no longer open is
//!   discarded.
//! - A logical message is visible once: provisional or confirmed, never both.

use pixelpals_proto::{ConversationId, Destination, MatchId, UserId, payloads::ChatMessage};

/// The other participant of a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Counterpart {
    /// Their user id.
    pub id: UserId,
    /// Their display name, when known.
    pub username: Option<String>,
}

impl Counterpart {
    /// Counterpart with a known display name.
    pub fn new(id: impl Into<UserId>, username: impl Into<String>) -> Self {
        Self { id: id.into(), username: Some(username.into()) }
    }
}

/// What kind of conversation is open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationKind {
    /// Direct chat with a friend.
    Direct {
        /// The friend.
        counterpart: Counterpart,
    },
    /// Chat inside a match room.
    Match {
        /// The match; also the conversation key.
        match_id: MatchId,
        /// The opponent.
        counterpart: Counterpart,
    },
}

impl ConversationKind {
    /// Conversation key as seen by `self_id`.
    pub fn conversation_id(&self, self_id: &str) -> ConversationId {
        match self {
            Self::Direct { counterpart } => ConversationId::between(self_id, &counterpart.id),
            Self::Match { match_id, .. } => ConversationId::from_raw(match_id.clone()),
        }
    }

    /// The other participant.
    pub fn counterpart(&self) -> &Counterpart {
        match self {
            Self::Direct { counterpart } | Self::Match { counterpart, .. } => counterpart,
        }
    }
}

/// One visible message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptEntry {
    /// Sent locally, not yet echoed by the server.
    Provisional {
        /// Locally generated id (`local-{millis}-{suffix}`).
        local_id: String,
        /// Message as it will look once confirmed.
        message: ChatMessage,
    },
    /// Stored by the server.
    Confirmed(ChatMessage),
}

impl TranscriptEntry {
    /// The message, whichever phase.
    pub fn message(&self) -> &ChatMessage {
        match self {
            Self::Provisional { message, .. } | Self::Confirmed(message) => message,
        }
    }

    /// Still waiting for the server echo.
    pub fn is_provisional(&self) -> bool {
        matches!(self, Self::Provisional { .. })
    }

    /// Server id for confirmed entries, local id for provisional ones.
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Provisional { local_id, .. } => Some(local_id),
            Self::Confirmed(message) => message.id.as_deref(),
        }
    }

    fn confirmed_id(&self) -> Option<&str> {
        match self {
            Self::Provisional { .. } => None,
            Self::Confirmed(message) => message.id.as_deref(),
        }
    }

    fn same_author_and_text(&self, other: &ChatMessage) -> bool {
        let message = self.message();
        message.sender_id == other.sender_id && message.content == other.content
    }
}

/// Loading state of the history of the open conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryState {
    /// Request in flight.
    Loading,
    /// History merged into the log.
    Loaded,
    /// Request failed; the log holds only local sends and later pushes.
    Failed,
}

/// What reconciling one incoming message did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    /// Same server id already present.
    Duplicate,
    /// Replaced the provisional entry at this index.
    Replaced(usize),
    /// Appended as a new confirmed entry.
    Appended,
    /// No conversation open, or the message belongs to another one.
    Ignored,
}

#[derive(Debug, Clone)]
struct OpenConversation {
    id: ConversationId,
    kind: ConversationKind,
    history: HistoryState,
    entries: Vec<TranscriptEntry>,
}

/// The open conversation, if any.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    open: Option<OpenConversation>,
}

impl Transcript {
    /// Nothing open.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open `kind` for `self_id`, discarding the previous log.
    ///
    /// Returns the previous conversation, whose topic the caller must leave.
    pub fn open(&mut self, kind: ConversationKind, self_id: &str) -> Option<ConversationId> {
        let id = kind.conversation_id(self_id);
        let previous = self.close();
        tracing::debug!(conversation = %id, "opening conversation");
        self.open = Some(OpenConversation {
            id,
            kind,
            history: HistoryState::Loading,
            entries: Vec::new(),
        });
        previous
    }

    /// Close the open conversation. Returns it, if there was one.
    pub fn close(&mut self) -> Option<ConversationId> {
        self.open.take().map(|open| open.id)
    }

    /// Key of the open conversation.
    pub fn conversation_id(&self) -> Option<&ConversationId> {
        self.open.as_ref().map(|o| &o.id)
    }

    /// Kind of the open conversation.
    pub fn kind(&self) -> Option<&ConversationKind> {
        self.open.as_ref().map(|o| &o.kind)
    }

    /// Push topic of the open conversation.
    pub fn destination(&self) -> Option<Destination> {
        self.conversation_id().map(|id| Destination::ChatRoom(id.clone()))
    }

    /// History state of the open conversation.
    pub fn history_state(&self) -> Option<HistoryState> {
        self.open.as_ref().map(|o| o.history)
    }

    /// Visible entries in display order. Empty when nothing is open.
    pub fn entries(&self) -> &[TranscriptEntry] {
        self.open.as_ref().map(|o| o.entries.as_slice()).unwrap_or(&[])
    }

    /// Merge a history response for `conversation`.
    ///
    /// Returns `false` (and changes nothing) when `conversation` is not the
    /// open one. On success the log becomes the history, followed by entries
    /// the history does not cover yet: provisional sends without a matching
    /// `(sender_id, content)` and confirmed messages with an unknown id.
    pub fn resolve_history(
        &mut self,
        conversation: &ConversationId,
        history: Option<Vec<ChatMessage>>,
    ) -> bool {
        let Some(open) = self.open.as_mut().filter(|o| &o.id == conversation) else {
            tracing::debug!(%conversation, "discarding history of closed conversation");
            return false;
        };

        let Some(history) = history else {
            open.history = HistoryState::Failed;
            return true;
        };

        let mut claimed = vec![false; history.len()];
        let mut carried = Vec::new();
        for entry in open.entries.drain(..) {
            let covered = match entry.confirmed_id() {
                Some(id) => history.iter().any(|m| m.id.as_deref() == Some(id)),
                None => {
                    let found = history
                        .iter()
                        .enumerate()
                        .position(|(i, m)| !claimed[i] && entry.same_author_and_text(m));
                    if let Some(i) = found {
                        claimed[i] = true;
                    }
                    found.is_some()
                },
            };
            if !covered {
                carried.push(entry);
            }
        }

        open.entries = history.into_iter().map(TranscriptEntry::Confirmed).collect();
        open.entries.extend(carried);
        open.history = HistoryState::Loaded;
        true
    }

    /// Append a local send. No-op when nothing is open.
    pub fn push_provisional(&mut self, local_id: String, message: ChatMessage) {
        if let Some(open) = self.open.as_mut() {
            open.entries.push(TranscriptEntry::Provisional { local_id, message });
        }
    }

    /// Reconcile a confirmed message pushed on the conversation topic.
    pub fn receive(&mut self, message: ChatMessage) -> Reconciled {
        let Some(open) = self.open.as_mut() else {
            return Reconciled::Ignored;
        };

        if message.chat_room_id.as_ref().is_some_and(|id| id != &open.id) {
            tracing::debug!(conversation = %open.id, "message for another conversation");
            return Reconciled::Ignored;
        }

        if let Some(id) = message.id.as_deref()
            && open.entries.iter().any(|e| e.confirmed_id() == Some(id))
        {
            return Reconciled::Duplicate;
        }

        if let Some(index) =
            open.entries.iter().position(|e| e.is_provisional() && e.same_author_and_text(&message))
        {
            open.entries[index] = TranscriptEntry::Confirmed(message);
            return Reconciled::Replaced(index);
        }

        open.entries.push(TranscriptEntry::Confirmed(message));
        Reconciled::Appended
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn direct(counterpart: &str) -> ConversationKind {
        ConversationKind::Direct { counterpart: Counterpart::new(counterpart, counterpart) }
    }

    fn confirmed(id: &str, sender: &str, content: &str) -> ChatMessage {
        ChatMessage {
            id: Some(id.into()),
            sender_id: sender.into(),
            sender_username: None,
            receiver_id: None,
            receiver_username: None,
            content: content.into(),
            timestamp: None,
            read: false,
            chat_room_id: None,
        }
    }

    fn local(sender: &str, content: &str) -> ChatMessage {
        ChatMessage { id: None, ..confirmed("", sender, content) }
    }

    #[test]
    fn direct_conversation_uses_pairing_key() {
        let mut transcript = Transcript::new();
        transcript.open(direct("A"), "B");

        assert_eq!(transcript.conversation_id().map(ConversationId::as_str), Some("A_B"));
        assert_eq!(transcript.history_state(), Some(HistoryState::Loading));
    }

    #[test]
    fn match_conversation_uses_match_id() {
        let kind = ConversationKind::Match {
            match_id: "m7".into(),
            counterpart: Counterpart::new("x", "xavier"),
        };
        assert_eq!(kind.conversation_id("me").as_str(), "m7");
    }

    #[test]
    fn stale_history_is_discarded() {
        let mut transcript = Transcript::new();
        transcript.open(direct("A"), "me");
        let stale = transcript.conversation_id().cloned().unwrap_or_else(|| "x".into());
        transcript.open(direct("B"), "me");

        assert!(!transcript.resolve_history(&stale, Some(vec![confirmed("1", "A", "old")])));
        assert!(transcript.entries().is_empty());
        assert_eq!(transcript.history_state(), Some(HistoryState::Loading));
    }

    #[test]
    fn provisional_replaced_in_place() {
        let mut transcript = Transcript::new();
        transcript.open(direct("B"), "A");
        transcript.push_provisional("local-1".into(), local("A", "hi"));
        transcript.push_provisional("local-2".into(), local("A", "there"));

        assert_eq!(transcript.receive(confirmed("42", "A", "hi")), Reconciled::Replaced(0));
        assert_eq!(transcript.entries().len(), 2);
        assert!(!transcript.entries()[0].is_provisional());
        assert!(transcript.entries()[1].is_provisional());
    }

    #[test]
    fn duplicate_confirmed_is_dropped() {
        let mut transcript = Transcript::new();
        transcript.open(direct("B"), "A");

        assert_eq!(transcript.receive(confirmed("1", "B", "yo")), Reconciled::Appended);
        assert_eq!(transcript.receive(confirmed("1", "B", "yo")), Reconciled::Duplicate);
        assert_eq!(transcript.entries().len(), 1);
    }

    #[test]
    fn other_conversation_is_ignored() {
        let mut transcript = Transcript::new();
        transcript.open(direct("B"), "A");

        let mut message = confirmed("1", "C", "psst");
        message.chat_room_id = Some("A_C".into());
        assert_eq!(transcript.receive(message), Reconciled::Ignored);
    }

    #[test]
    fn history_keeps_unmatched_local_sends() {
        let mut transcript = Transcript::new();
        transcript.open(direct("B"), "A");
        let id = transcript.conversation_id().cloned().unwrap_or_else(|| "x".into());
        transcript.push_provisional("local-1".into(), local("A", "echoed"));
        transcript.push_provisional("local-2".into(), local("A", "pending"));

        let applied = transcript.resolve_history(
            &id,
            Some(vec![confirmed("1", "B", "earlier"), confirmed("2", "A", "echoed")]),
        );

        assert!(applied);
        let ids: Vec<_> = transcript.entries().iter().filter_map(TranscriptEntry::id).collect();
        assert_eq!(ids, ["1", "2", "local-2"]);
    }

    #[test]
    fn failed_history_keeps_log() {
        let mut transcript = Transcript::new();
        transcript.open(direct("B"), "A");
        let id = transcript.conversation_id().cloned().unwrap_or_else(|| "x".into());
        transcript.push_provisional("local-1".into(), local("A", "hi"));

        assert!(transcript.resolve_history(&id, None));
        assert_eq!(transcript.history_state(), Some(HistoryState::Failed));
        assert_eq!(transcript.entries().len(), 1);
    }
}
