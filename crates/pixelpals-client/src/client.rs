//! Client state machine.
//!
//! The `Client` composes the push-channel session with the presence tracker,
//! unread ledger, match queue and transcript, and exposes one read model
//! ([`Overview`]). Its lifetime follows the logged-in identity: `Login` builds
//! the state, `Logout` (or an expired credential) tears it down to zero.
//!
//! # Staleness guards
//!
//! - Transport events carry an attempt number (checked by the session).
//! - REST requests carry the login epoch; responses from an earlier epoch are
//!   dropped.
//! - History responses carry their conversation id (checked by the
//!   transcript).

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use pixelpals_core::{
    AuthToken, ConnectionState, Environment, Identity, Session, SessionAction, SessionConfig,
    SessionError,
};
use pixelpals_proto::{
    ConversationId, Destination, MatchId, PushEvent,
    payloads::{ChatMessage, OutgoingMessage},
};

use crate::{
    error::{ClientError, FetchError},
    event::{ClientAction, ClientEvent, HistorySource, Request, Response},
    matches::{MatchKind, MatchNotification, MatchOutcome, MatchQueue},
    presence::{PresenceEntry, PresenceTracker},
    transcript::{ConversationKind, HistoryState, Transcript},
    unread::UnreadLedger,
};

/// Length of the random suffix of provisional message ids.
const LOCAL_ID_SUFFIX_LEN: u32 = 7;

/// Identity lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lifecycle {
    /// No identity; all state is empty.
    LoggedOut,
    /// State belongs to this identity.
    LoggedIn(Identity),
}

/// Combined read model for the view surfaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overview {
    /// Push-channel state.
    pub connection: ConnectionState,
    /// Authoritative unread total.
    pub total_unread: u64,
    /// Unread count per conversation.
    pub per_conversation: BTreeMap<ConversationId, u64>,
    /// Friend-chat badge.
    pub friend_chat_unread: u64,
    /// Match-chat badge.
    pub match_chat_unread: u64,
    /// Pending friend requests.
    pub pending_friend_requests: u64,
    /// Queued match notifications in arrival order.
    pub match_notifications: Vec<MatchNotification>,
    /// Match the user is currently in.
    pub active_match: Option<MatchId>,
    /// Friend presence ordered by friend id.
    pub presence: Vec<PresenceEntry>,
}

impl Overview {
    /// Collapsed indicator: unread total plus queued match notifications plus
    /// pending friend requests.
    pub fn urgent_count(&self) -> u64 {
        self.total_unread
            .saturating_add(self.match_notifications.len() as u64)
            .saturating_add(self.pending_friend_requests)
    }
}

/// Real-time state of one logged-in user.
pub struct Client<E: Environment> {
    /// Environment for time and randomness.
    env: E,

    /// Push-channel session.
    session: Session<E::Instant>,

    /// Who the state belongs to.
    lifecycle: Lifecycle,

    /// Incremented on every login and logout.
    epoch: u64,

    presence: PresenceTracker,
    unread: UnreadLedger,
    matches: MatchQueue,
    transcript: Transcript,
    pending_friend_requests: u64,
}

impl<E: Environment> Client<E> {
    /// Create a logged-out client.
    pub fn new(env: E, config: SessionConfig) -> Self {
        Self {
            env,
            session: Session::new(config),
            lifecycle: Lifecycle::LoggedOut,
            epoch: 0,
            presence: PresenceTracker::new(),
            unread: UnreadLedger::new(),
            matches: MatchQueue::new(),
            transcript: Transcript::new(),
            pending_friend_requests: 0,
        }
    }

    /// Current lifecycle.
    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// Logged-in identity. `None` when logged out.
    pub fn identity(&self) -> Option<&Identity> {
        match &self.lifecycle {
            Lifecycle::LoggedIn(identity) => Some(identity),
            Lifecycle::LoggedOut => None,
        }
    }

    /// Bearer credential for REST requests. `None` when logged out.
    pub fn token(&self) -> Option<&AuthToken> {
        self.session.token()
    }

    /// Current login epoch.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Push-channel state.
    pub fn connection_state(&self) -> ConnectionState {
        self.session.state()
    }

    /// Push-channel session.
    pub fn session(&self) -> &Session<E::Instant> {
        &self.session
    }

    /// Friend presence.
    pub fn presence(&self) -> &PresenceTracker {
        &self.presence
    }

    /// Unread counters.
    pub fn unread(&self) -> &UnreadLedger {
        &self.unread
    }

    /// Match notifications.
    pub fn matches(&self) -> &MatchQueue {
        &self.matches
    }

    /// Open conversation.
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Pending friend request count.
    pub fn pending_friend_requests(&self) -> u64 {
        self.pending_friend_requests
    }

    /// Snapshot of everything the views display.
    pub fn overview(&self) -> Overview {
        Overview {
            connection: self.session.state(),
            total_unread: self.unread.total(),
            per_conversation: self.unread.per_conversation().clone(),
            friend_chat_unread: self.unread.friend_chat(),
            match_chat_unread: self.unread.match_chat(),
            pending_friend_requests: self.pending_friend_requests,
            match_notifications: self.matches.entries().to_vec(),
            active_match: self.matches.active_match().cloned(),
            presence: self.presence.entries().cloned().collect(),
        }
    }

    /// Process an event and return resulting actions.
    ///
    /// # Errors
    ///
    /// Local precondition failures (see [`ClientError`]). The event changed
    /// no state when an error is returned.
    pub fn handle(
        &mut self,
        event: ClientEvent<E::Instant>,
    ) -> Result<Vec<ClientAction>, ClientError> {
        let before = self.session.state();

        let mut actions = match event {
            ClientEvent::Login { identity, token } => self.handle_login(identity, token)?,
            ClientEvent::Logout => self.teardown(),
            ClientEvent::TransportOpened { attempt } => {
                let session_actions = self.session.transport_opened(attempt);
                self.absorb(session_actions)
            },
            ClientEvent::TransportData { attempt, text } => {
                let session_actions = self.session.handle_data(attempt, &text, self.env.now());
                self.absorb(session_actions)
            },
            ClientEvent::TransportClosed { attempt } => {
                let session_actions = self.session.transport_closed(attempt, self.env.now());
                self.absorb(session_actions)
            },
            ClientEvent::Tick { now } => {
                let session_actions = self.session.tick(now);
                self.absorb(session_actions)
            },
            ClientEvent::VisibilityRegained => {
                let session_actions = self.session.visibility_regained(self.env.now());
                self.absorb(session_actions)
            },
            ClientEvent::Fetched { epoch, request, result } => {
                self.handle_fetched(epoch, request, result)
            },
            ClientEvent::OpenConversation(kind) => self.handle_open_conversation(kind)?,
            ClientEvent::CloseConversation => self.handle_close_conversation(),
            ClientEvent::SendMessage { content } => self.handle_send_message(&content)?,
            ClientEvent::MarkRead(conversation) => {
                self.require_login()?;
                vec![self.fetch(Request::MarkRead(conversation))]
            },
            ClientEvent::ClearMatchNotification { match_id, kind } => {
                self.matches.clear(&match_id, kind);
                Vec::new()
            },
            ClientEvent::ResetFriendChat => {
                self.unread.reset_friend_chat();
                Vec::new()
            },
            ClientEvent::ResetMatchChat => {
                self.unread.reset_match_chat();
                Vec::new()
            },
            ClientEvent::Refresh => {
                self.require_login()?;
                self.fetch_snapshots()
            },
            ClientEvent::RefreshPresence => {
                self.require_login()?;
                vec![self.fetch(Request::FriendStatus)]
            },
        };

        let after = self.session.state();
        if after != before {
            actions.push(ClientAction::ConnectionChanged(after));
        }

        Ok(actions)
    }

    fn handle_login(
        &mut self,
        identity: Identity,
        token: AuthToken,
    ) -> Result<Vec<ClientAction>, ClientError> {
        if !identity.is_complete() {
            return Err(SessionError::IncompleteIdentity.into());
        }

        let mut actions = Vec::new();
        if self.identity() != Some(&identity) {
            actions.extend(self.teardown());
            self.epoch += 1;
            tracing::info!(username = %identity.username, epoch = self.epoch, "logged in");
            self.lifecycle = Lifecycle::LoggedIn(identity.clone());
        }

        let session_actions = self.session.open(identity, token, self.env.now())?;
        actions.extend(self.absorb(session_actions));
        Ok(actions)
    }

    /// Close the channel and reduce every component to its empty state.
    ///
    /// Idempotent.
    fn teardown(&mut self) -> Vec<ClientAction> {
        let session_actions = self.session.close();
        let actions = self.absorb(session_actions);

        if self.lifecycle != Lifecycle::LoggedOut {
            self.epoch += 1;
            tracing::info!(epoch = self.epoch, "logged out");
        }

        self.lifecycle = Lifecycle::LoggedOut;
        self.presence.clear();
        self.unread.clear();
        self.matches.reset();
        self.transcript.close();
        self.pending_friend_requests = 0;
        actions
    }

    fn expire(&mut self, reason: String) -> Vec<ClientAction> {
        tracing::warn!(%reason, "session expired");
        let mut actions = self.teardown();
        actions.push(ClientAction::SessionExpired { reason });
        actions
    }

    fn require_login(&self) -> Result<&Identity, ClientError> {
        self.identity().ok_or(ClientError::NotLoggedIn)
    }

    fn fetch(&self, request: Request) -> ClientAction {
        ClientAction::Fetch { epoch: self.epoch, request }
    }

    fn fetch_snapshots(&self) -> Vec<ClientAction> {
        Request::snapshots().into_iter().map(|r| self.fetch(r)).collect()
    }

    /// Turn session actions into client actions, reacting to the
    /// notifications among them.
    fn absorb(&mut self, session_actions: Vec<SessionAction>) -> Vec<ClientAction> {
        let mut actions = Vec::new();
        for action in session_actions {
            match action {
                SessionAction::OpenTransport { attempt } => {
                    actions.push(ClientAction::OpenTransport { attempt });
                },
                SessionAction::SendFrame(frame) => actions.push(ClientAction::Send(frame)),
                SessionAction::SendHeartbeat => actions.push(ClientAction::SendHeartbeat),
                SessionAction::CloseTransport { attempt } => {
                    actions.push(ClientAction::CloseTransport { attempt });
                },
                SessionAction::Established => actions.extend(self.on_established()),
                SessionAction::Rejected { reason, unauthorized } => {
                    if unauthorized {
                        actions.extend(self.expire(reason));
                    } else {
                        actions.push(ClientAction::Error {
                            message: format!("push channel refused: {reason}"),
                        });
                    }
                },
                SessionAction::Deliver { destination, body } => {
                    actions.extend(self.on_push(&destination, &body));
                },
            }
        }
        actions
    }

    fn on_established(&mut self) -> Vec<ClientAction> {
        let Some(identity) = self.identity() else {
            return Vec::new();
        };

        let mut destinations = Destination::user_queues(&identity.username).to_vec();
        destinations.push(Destination::Status);
        if self.transcript.history_state().is_some_and(|s| s != HistoryState::Loading) {
            destinations.extend(self.transcript.destination());
        }

        let mut actions = Vec::new();
        for destination in destinations {
            let session_actions = self.session.subscribe(destination);
            actions.extend(self.absorb(session_actions));
        }
        actions.extend(self.fetch_snapshots());
        actions
    }

    fn on_push(&mut self, destination: &Destination, body: &str) -> Vec<ClientAction> {
        let event = match PushEvent::decode(destination, body) {
            Ok(event) => event,
            Err(error) => {
                tracing::warn!(%destination, %error, "skipping malformed push");
                return Vec::new();
            },
        };

        match event {
            PushEvent::Unread(update) => {
                self.unread.apply(&update);
                self.log_drift();
                Vec::new()
            },
            PushEvent::Match(update) => {
                let now = self.wall_clock();
                match self.matches.on_event(&update, now) {
                    MatchOutcome::Announced(notification) => {
                        vec![ClientAction::MatchUpdate(notification)]
                    },
                    MatchOutcome::Queued | MatchOutcome::Duplicate | MatchOutcome::Ignored => {
                        Vec::new()
                    },
                }
            },
            PushEvent::FriendRequestNew => {
                self.pending_friend_requests += 1;
                Vec::new()
            },
            PushEvent::FriendRequestUpdate => vec![self.fetch(Request::PendingFriendRequests)],
            PushEvent::Status(update) => {
                self.presence.apply(&update);
                Vec::new()
            },
            PushEvent::ChatMessage { conversation, message } => {
                if self.transcript.conversation_id() == Some(&conversation) {
                    let outcome = self.transcript.receive(message);
                    tracing::trace!(?outcome, "reconciled chat message");
                }
                Vec::new()
            },
        }
    }

    fn handle_fetched(
        &mut self,
        epoch: u64,
        request: Request,
        result: Result<Response, FetchError>,
    ) -> Vec<ClientAction> {
        if epoch != self.epoch || self.identity().is_none() {
            tracing::debug!(epoch, current = self.epoch, ?request, "dropping stale response");
            return Vec::new();
        }

        if let Err(error) = &result
            && error.is_session_fatal()
        {
            return self.expire(format!("{} returned {error}", request.path()));
        }

        if let Err(error) = &result {
            tracing::warn!(path = %request.path(), %error, "request failed");
        }

        let response = result.ok();
        match (request, response) {
            (Request::UnreadTotal, Some(Response::UnreadTotal(total))) => {
                self.unread.replace_total(total);
                self.log_drift();
                Vec::new()
            },
            (Request::UnreadPerChat, Some(Response::UnreadPerChat(counts))) => {
                self.unread.replace_per_conversation(counts);
                self.log_drift();
                Vec::new()
            },
            (Request::UnreadTotal | Request::UnreadPerChat, _) => {
                self.unread.zero_snapshot();
                Vec::new()
            },
            (Request::PendingMatches, Some(Response::PendingMatches(pending))) => {
                let now = self.wall_clock();
                self.matches.replace_pending(pending, now);
                Vec::new()
            },
            (Request::PendingMatches, _) => {
                self.matches.fail_pending();
                Vec::new()
            },
            (Request::PendingFriendRequests, Some(Response::PendingFriendRequests(count))) => {
                self.pending_friend_requests = count as u64;
                Vec::new()
            },
            (Request::PendingFriendRequests, _) => {
                self.pending_friend_requests = 0;
                Vec::new()
            },
            (Request::FriendStatus, Some(Response::FriendStatus(friends))) => {
                self.presence.replace_snapshot(friends);
                Vec::new()
            },
            (Request::FriendStatus, _) => {
                self.presence.clear();
                Vec::new()
            },
            (Request::History { conversation, .. }, response) => {
                let history = match response {
                    Some(Response::History(messages)) => Some(messages),
                    _ => None,
                };
                let failed = history.is_none();
                if !self.transcript.resolve_history(&conversation, history) {
                    return Vec::new();
                }

                let session_actions = self.session.subscribe(Destination::ChatRoom(conversation));
                let mut actions = self.absorb(session_actions);
                if failed {
                    actions.push(ClientAction::Error {
                        message: "could not load conversation history".to_string(),
                    });
                }
                actions
            },
            (Request::MarkRead(conversation), Some(Response::MarkedRead)) => {
                let removed = self.unread.complete_mark_read(&conversation);
                tracing::debug!(%conversation, removed, "marked read");
                Vec::new()
            },
            (Request::MarkRead(conversation), _) => vec![ClientAction::Error {
                message: format!("could not mark {conversation} as read"),
            }],
        }
    }

    fn handle_open_conversation(
        &mut self,
        kind: ConversationKind,
    ) -> Result<Vec<ClientAction>, ClientError> {
        let self_id = self.require_login()?.user_id.clone();

        let source = HistorySource::of(&kind);
        let previous = self.transcript.open(kind, &self_id);

        let mut actions = Vec::new();
        if let Some(previous) = previous {
            let session_actions = self.session.unsubscribe(&Destination::ChatRoom(previous));
            actions.extend(self.absorb(session_actions));
        }

        if let Some(conversation) = self.transcript.conversation_id().cloned() {
            actions.push(self.fetch(Request::History { conversation, source }));
        }
        Ok(actions)
    }

    fn handle_close_conversation(&mut self) -> Vec<ClientAction> {
        let Some(previous) = self.transcript.close() else {
            return Vec::new();
        };
        let session_actions = self.session.unsubscribe(&Destination::ChatRoom(previous));
        self.absorb(session_actions)
    }

    fn handle_send_message(&mut self, content: &str) -> Result<Vec<ClientAction>, ClientError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ClientError::EmptyMessage);
        }

        let identity = self.require_login()?.clone();
        let (Some(conversation), Some(kind)) =
            (self.transcript.conversation_id().cloned(), self.transcript.kind())
        else {
            return Err(ClientError::NoConversation);
        };

        let counterpart = kind.counterpart().clone();
        if counterpart.id.trim().is_empty() {
            return Err(ClientError::UnresolvedCounterpart);
        }
        self.session.ensure_connected()?;

        let outgoing = OutgoingMessage {
            sender_id: identity.user_id.clone(),
            sender_username: identity.username.clone(),
            receiver_id: counterpart.id.clone(),
            receiver_username: counterpart.username.clone(),
            content: content.to_string(),
            chat_room_id: conversation.clone(),
        };
        let body =
            serde_json::to_string(&outgoing).map_err(|e| ClientError::Encode(e.to_string()))?;

        let provisional = ChatMessage {
            id: None,
            sender_id: identity.user_id,
            sender_username: Some(identity.username),
            receiver_id: Some(counterpart.id),
            receiver_username: counterpart.username,
            content: content.to_string(),
            timestamp: Some(self.wall_clock().to_rfc3339_opts(SecondsFormat::Millis, true)),
            read: false,
            chat_room_id: Some(conversation),
        };
        let local_id = self.local_id();
        self.transcript.push_provisional(local_id, provisional);

        let session_actions = self.session.publish(&Destination::SendMessage, body);
        Ok(self.absorb(session_actions))
    }

    /// `local-{unix_millis}-{7 base36 chars}`.
    fn local_id(&self) -> String {
        let mut value = self.env.random_u64() % 36u64.pow(LOCAL_ID_SUFFIX_LEN);
        let mut suffix = [b'0'; LOCAL_ID_SUFFIX_LEN as usize];
        for slot in suffix.iter_mut().rev() {
            let digit = (value % 36) as u8;
            *slot = if digit < 10 { b'0' + digit } else { b'a' + digit - 10 };
            value /= 36;
        }
        format!("local-{}-{}", self.env.wall_clock_millis(), String::from_utf8_lossy(&suffix))
    }

    fn wall_clock(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.env.wall_clock_millis()).unwrap_or_default()
    }

    fn log_drift(&self) {
        let drift = self.unread.drift();
        if drift != 0 {
            tracing::debug!(
                total = self.unread.total(),
                sum = self.unread.per_conversation_sum(),
                drift,
                "unread total and per-conversation counts disagree"
            );
        }
    }
}
