//! Push-channel session state machine.
//!
//! Owns the single STOMP-over-WebSocket connection of the logged-in identity:
//! handshake, subscription registry, heart-beats, reconnect and teardown. Uses
//! the action pattern: methods take time as input and return actions for the
//! driver to execute. The driver owns the socket; the session never performs
//! I/O.
//!
//! # State Machine
//!
//! ```text
//!                open / visibility
//! ┌──────┐ ─────────────────────────> ┌────────────┐  CONNECTED  ┌───────────┐
//! │ Idle │                            │ Connecting │ ──────────> │ Connected │
//! └──────┘ <─────── close ─────────── └────────────┘             └───────────┘
//!                                      │  │    ^                    │
//!                               ERROR  │  │    │ tick (delay)       │ drop / ERROR
//!                                      ↓  │    │                    │ idle timeout
//!                               ┌──────────┐  ┌─────────┐           │
//!                               │ Rejected │  │ Backoff │ <─────────┘
//!                               └──────────┘  └─────────┘
//! ```
//!
//! `Idle`, `Backoff` and `Rejected` all read as [`ConnectionState::Disconnected`].
//!
//! # Invariants
//!
//! - At most one transport attempt exists. Every attempt has a number; events
//!   tagged with a superseded number are ignored.
//! - `Rejected` is never left by a timer, only by `open` or
//!   `visibility_regained`.
//! - The subscription registry belongs to one identity. Changing identity
//!   clears it; drops keep it and `CONNECTED` re-sends all of it.

use std::{
    fmt::Debug,
    ops::{Add, Sub},
    time::Duration,
};

use pixelpals_proto::{Command, Destination, Frame};

use crate::{
    error::SessionError,
    identity::{AuthToken, Identity},
};

/// Delay before reconnecting after a drop.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Heart-beat interval offered to the broker and used for outgoing beats.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);

/// `host` header of the `CONNECT` frame.
pub const DEFAULT_HOST: &str = "localhost";

/// Markers in a handshake rejection that mean the credential is bad.
const UNAUTHORIZED_MARKERS: [&str; 3] = ["Unauthorized", "401", "403"];

/// Actions returned by the session state machine.
///
/// The driver executes the transport actions (`OpenTransport`, `SendFrame`,
/// `SendHeartbeat`, `CloseTransport`); the remaining ones are notifications
/// for the layer above.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Open a new WebSocket. Report its events tagged with `attempt`.
    OpenTransport {
        /// Attempt number the transport events must carry.
        attempt: u64,
    },

    /// Encode and send this frame on the current transport.
    SendFrame(Frame),

    /// Send a single EOL (STOMP heart-beat) on the current transport.
    SendHeartbeat,

    /// Close the current transport.
    CloseTransport {
        /// Attempt being closed.
        attempt: u64,
    },

    /// Handshake completed; the channel is live.
    Established,

    /// Handshake refused. The session stays disconnected until an explicit
    /// retry.
    Rejected {
        /// Reason reported by the broker.
        reason: String,
        /// The reason carries an authorization failure marker.
        unauthorized: bool,
    },

    /// A push arrived on a registered destination.
    Deliver {
        /// Destination the subscription was registered for.
        destination: Destination,
        /// Raw frame body.
        body: String,
    },
}

/// Externally visible connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No live transport (idle, waiting to reconnect, or rejected).
    Disconnected,
    /// Transport opening or STOMP handshake in progress.
    Connecting,
    /// Handshake complete.
    Connected,
}

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Fixed delay between a drop and the next attempt.
    pub reconnect_delay: Duration,
    /// Outgoing heart-beat interval. `Duration::ZERO` disables heart-beats.
    pub heartbeat_interval: Duration,
    /// Drop the connection after this long without inbound traffic.
    pub idle_timeout: Option<Duration>,
    /// `host` header of the handshake.
    pub host: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            idle_timeout: None,
            host: DEFAULT_HOST.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
enum Phase<I> {
    Idle,
    Connecting,
    Connected { last_heartbeat: I },
    Backoff { retry_at: I },
    Rejected(SessionError),
}

#[derive(Debug, Clone)]
struct Subscription {
    id: String,
    destination: Destination,
}

/// Push-channel session.
///
/// Pure state machine: no I/O, no Environment storage. Time is passed to the
/// methods that need it.
///
/// Generic over `Instant` to support both real time and virtual time for
/// deterministic testing.
#[derive(Debug, Clone)]
pub struct Session<I>
where
    I: Copy + Ord + Debug + Add<Duration, Output = I> + Sub<Output = Duration>,
{
    config: SessionConfig,
    phase: Phase<I>,
    identity: Option<Identity>,
    token: Option<AuthToken>,
    attempt: u64,
    last_activity: Option<I>,
    subscriptions: Vec<Subscription>,
    next_subscription: u64,
}

impl<I> Session<I>
where
    I: Copy + Ord + Debug + Add<Duration, Output = I> + Sub<Output = Duration>,
{
    /// Create an idle session.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            phase: Phase::Idle,
            identity: None,
            token: None,
            attempt: 0,
            last_activity: None,
            subscriptions: Vec::new(),
            next_subscription: 0,
        }
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        match self.phase {
            Phase::Connecting => ConnectionState::Connecting,
            Phase::Connected { .. } => ConnectionState::Connected,
            Phase::Idle | Phase::Backoff { .. } | Phase::Rejected(_) => {
                ConnectionState::Disconnected
            },
        }
    }

    /// Whether the channel is live.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// `Ok` when connected.
    ///
    /// # Errors
    ///
    /// - `SessionError::NotConnected` otherwise
    pub fn ensure_connected(&self) -> Result<(), SessionError> {
        if self.is_connected() { Ok(()) } else { Err(SessionError::NotConnected) }
    }

    /// Identity the session is open for. `None` when idle.
    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Credential the session is open with. `None` when idle.
    #[must_use]
    pub fn token(&self) -> Option<&AuthToken> {
        self.token.as_ref()
    }

    /// Number of the current (or last) transport attempt.
    #[must_use]
    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    /// Rejection that stopped the session. `None` unless rejected.
    #[must_use]
    pub fn rejection(&self) -> Option<&SessionError> {
        match &self.phase {
            Phase::Rejected(error) => Some(error),
            _ => None,
        }
    }

    /// When the next reconnect fires. `None` unless waiting to reconnect.
    #[must_use]
    pub fn retry_at(&self) -> Option<I> {
        match self.phase {
            Phase::Backoff { retry_at } => Some(retry_at),
            _ => None,
        }
    }

    /// Whether `destination` is in the subscription registry.
    #[must_use]
    pub fn is_subscribed(&self, destination: &Destination) -> bool {
        self.subscriptions.iter().any(|s| &s.destination == destination)
    }

    /// Registered destinations in subscription order.
    pub fn subscriptions(&self) -> impl Iterator<Item = &Destination> {
        self.subscriptions.iter().map(|s| &s.destination)
    }

    /// Open the channel for `identity`.
    ///
    /// No-op if already connecting or connected for the same identity. A
    /// different identity closes the previous connection first, dropping its
    /// subscriptions.
    ///
    /// # Errors
    ///
    /// - `SessionError::IncompleteIdentity` if user id or username is blank
    pub fn open(
        &mut self,
        identity: Identity,
        token: AuthToken,
        now: I,
    ) -> Result<Vec<SessionAction>, SessionError> {
        if !identity.is_complete() {
            return Err(SessionError::IncompleteIdentity);
        }

        let same_identity = self.identity.as_ref() == Some(&identity);
        if same_identity && matches!(self.phase, Phase::Connecting | Phase::Connected { .. }) {
            return Ok(Vec::new());
        }

        let mut actions = if same_identity { self.close_transport() } else { self.close() };

        tracing::info!(username = %identity.username, "opening push channel");
        self.identity = Some(identity);
        self.token = Some(token);
        actions.extend(self.start_attempt(now));

        Ok(actions)
    }

    /// Transport for `attempt` is open; send the STOMP handshake.
    pub fn transport_opened(&mut self, attempt: u64) -> Vec<SessionAction> {
        if !self.is_current(attempt) || !matches!(self.phase, Phase::Connecting) {
            tracing::debug!(attempt, current = self.attempt, "ignoring stale transport open");
            return Vec::new();
        }

        let Some(token) = &self.token else {
            return Vec::new();
        };

        let heartbeat_ms = self.config.heartbeat_interval.as_millis() as u64;
        vec![SessionAction::SendFrame(Frame::connect(
            &self.config.host,
            token.expose(),
            heartbeat_ms,
        ))]
    }

    /// Process one inbound text message of transport `attempt`.
    ///
    /// Heart-beats only refresh activity. Undecodable data is logged and
    /// skipped.
    pub fn handle_data(&mut self, attempt: u64, text: &str, now: I) -> Vec<SessionAction> {
        if !self.is_current(attempt) {
            tracing::debug!(attempt, current = self.attempt, "ignoring data from stale transport");
            return Vec::new();
        }

        self.last_activity = Some(now);

        let frame = match Frame::decode(text) {
            Ok(Some(frame)) => frame,
            Ok(None) => return Vec::new(),
            Err(error) => {
                tracing::warn!(%error, "skipping undecodable frame");
                return Vec::new();
            },
        };

        match (&self.phase, frame.command) {
            (Phase::Connecting, Command::Connected) => self.handle_connected(now),
            (Phase::Connected { .. }, Command::Message) => self.handle_message(frame),
            (Phase::Connecting, Command::Error) => self.handle_rejection(&frame),
            (Phase::Connected { .. }, Command::Error) => {
                tracing::warn!(reason = %frame.error_reason(), "broker error on live channel");
                self.handle_drop(now, true)
            },
            (_, Command::Receipt) => Vec::new(),
            (phase, command) => {
                tracing::warn!(?command, ?phase, "unexpected frame for session phase");
                Vec::new()
            },
        }
    }

    /// Transport `attempt` closed (peer close or network failure).
    ///
    /// Schedules a single reconnect unless the session was rejected or
    /// closed by the user.
    pub fn transport_closed(&mut self, attempt: u64, now: I) -> Vec<SessionAction> {
        if !self.is_current(attempt) {
            tracing::debug!(attempt, current = self.attempt, "ignoring stale transport close");
            return Vec::new();
        }

        self.handle_drop(now, false)
    }

    /// Process periodic maintenance (reconnect, heart-beats, idle timeout).
    pub fn tick(&mut self, now: I) -> Vec<SessionAction> {
        match self.phase {
            Phase::Backoff { retry_at } if now >= retry_at => {
                tracing::info!(attempt = self.attempt + 1, "reconnecting push channel");
                self.start_attempt(now)
            },
            Phase::Connecting | Phase::Connected { .. } if self.idle_exceeded(now) => {
                tracing::warn!("push channel idle timeout");
                self.handle_drop(now, true)
            },
            Phase::Connected { last_heartbeat } => {
                let interval = self.config.heartbeat_interval;
                if interval.is_zero() || now - last_heartbeat < interval {
                    return Vec::new();
                }
                self.phase = Phase::Connected { last_heartbeat: now };
                vec![SessionAction::SendHeartbeat]
            },
            _ => Vec::new(),
        }
    }

    /// The host surface came back to the foreground.
    ///
    /// Forces a fresh attempt unless already connecting or connected. This
    /// also leaves `Rejected`: foregrounding counts as an explicit retry.
    pub fn visibility_regained(&mut self, now: I) -> Vec<SessionAction> {
        match self.phase {
            Phase::Connecting | Phase::Connected { .. } => Vec::new(),
            Phase::Idle | Phase::Backoff { .. } | Phase::Rejected(_) => {
                if self.identity.is_none() || self.token.is_none() {
                    return Vec::new();
                }
                tracing::info!("visibility regained, reopening push channel");
                self.start_attempt(now)
            },
        }
    }

    /// Register `destination` and send `SUBSCRIBE`.
    ///
    /// Silent no-op when not connected, or when already registered.
    pub fn subscribe(&mut self, destination: Destination) -> Vec<SessionAction> {
        if !self.is_connected() {
            tracing::debug!(%destination, "subscribe while disconnected ignored");
            return Vec::new();
        }
        if self.is_subscribed(&destination) {
            return Vec::new();
        }

        let id = format!("sub-{}", self.next_subscription);
        self.next_subscription += 1;

        let frame = Frame::subscribe(&id, &destination.path());
        self.subscriptions.push(Subscription { id, destination });
        vec![SessionAction::SendFrame(frame)]
    }

    /// Remove `destination` from the registry. Sends `UNSUBSCRIBE` only when
    /// connected.
    pub fn unsubscribe(&mut self, destination: &Destination) -> Vec<SessionAction> {
        let Some(index) = self.subscriptions.iter().position(|s| &s.destination == destination)
        else {
            return Vec::new();
        };

        let subscription = self.subscriptions.remove(index);
        if self.is_connected() {
            vec![SessionAction::SendFrame(Frame::unsubscribe(&subscription.id))]
        } else {
            Vec::new()
        }
    }

    /// Send `body` to `destination`. Nothing is buffered while disconnected.
    pub fn publish(&mut self, destination: &Destination, body: String) -> Vec<SessionAction> {
        if !self.is_connected() {
            tracing::debug!(%destination, "publish while disconnected dropped");
            return Vec::new();
        }

        vec![SessionAction::SendFrame(Frame::send(&destination.path(), body))]
    }

    /// Tear the session down. Idempotent, safe on a never-opened session.
    ///
    /// Clears identity, credential, subscriptions and timers.
    pub fn close(&mut self) -> Vec<SessionAction> {
        let actions = self.close_transport();

        if self.identity.is_some() {
            tracing::info!("push channel closed");
        }

        self.identity = None;
        self.token = None;
        self.subscriptions.clear();
        actions
    }

    fn is_current(&self, attempt: u64) -> bool {
        attempt == self.attempt
    }

    fn start_attempt(&mut self, now: I) -> Vec<SessionAction> {
        self.attempt += 1;
        self.phase = Phase::Connecting;
        self.last_activity = Some(now);
        vec![SessionAction::OpenTransport { attempt: self.attempt }]
    }

    /// Close the live transport (if any) and go idle, keeping identity and
    /// subscriptions.
    fn close_transport(&mut self) -> Vec<SessionAction> {
        let actions = match self.phase {
            Phase::Connected { .. } => vec![
                SessionAction::SendFrame(Frame::disconnect()),
                SessionAction::CloseTransport { attempt: self.attempt },
            ],
            Phase::Connecting => vec![SessionAction::CloseTransport { attempt: self.attempt }],
            Phase::Idle | Phase::Backoff { .. } | Phase::Rejected(_) => Vec::new(),
        };

        self.phase = Phase::Idle;
        self.last_activity = None;
        actions
    }

    fn idle_exceeded(&self, now: I) -> bool {
        match (self.config.idle_timeout, self.last_activity) {
            (Some(timeout), Some(last)) => now - last > timeout,
            _ => false,
        }
    }

    fn handle_connected(&mut self, now: I) -> Vec<SessionAction> {
        self.phase = Phase::Connected { last_heartbeat: now };
        tracing::info!(
            attempt = self.attempt,
            subscriptions = self.subscriptions.len(),
            "push channel connected"
        );

        let mut actions: Vec<SessionAction> = self
            .subscriptions
            .iter()
            .map(|s| SessionAction::SendFrame(Frame::subscribe(&s.id, &s.destination.path())))
            .collect();
        actions.push(SessionAction::Established);
        actions
    }

    fn handle_message(&mut self, frame: Frame) -> Vec<SessionAction> {
        let Some(id) = frame.subscription() else {
            tracing::warn!("MESSAGE frame without subscription header");
            return Vec::new();
        };

        let Some(subscription) = self.subscriptions.iter().find(|s| s.id == id) else {
            tracing::debug!(subscription = id, "MESSAGE for unknown subscription");
            return Vec::new();
        };

        vec![SessionAction::Deliver {
            destination: subscription.destination.clone(),
            body: frame.body,
        }]
    }

    fn handle_rejection(&mut self, frame: &Frame) -> Vec<SessionAction> {
        let reason = frame.error_reason();
        let unauthorized = UNAUTHORIZED_MARKERS.iter().any(|marker| reason.contains(marker));
        tracing::warn!(%reason, unauthorized, "push channel handshake rejected");

        self.phase = Phase::Rejected(SessionError::HandshakeRejected {
            reason: reason.clone(),
            unauthorized,
        });
        self.last_activity = None;

        vec![
            SessionAction::CloseTransport { attempt: self.attempt },
            SessionAction::Rejected { reason, unauthorized },
        ]
    }

    /// Live or pending transport is gone; schedule one reconnect.
    ///
    /// `close` is set when the session itself decided to drop the transport
    /// and the driver still has to close it.
    fn handle_drop(&mut self, now: I, close: bool) -> Vec<SessionAction> {
        if !matches!(self.phase, Phase::Connecting | Phase::Connected { .. }) {
            return Vec::new();
        }

        let retry_at = now + self.config.reconnect_delay;
        tracing::info!(
            attempt = self.attempt,
            delay = ?self.config.reconnect_delay,
            "push channel dropped"
        );

        self.phase = Phase::Backoff { retry_at };
        self.last_activity = None;

        if close {
            vec![SessionAction::CloseTransport { attempt: self.attempt }]
        } else {
            Vec::new()
        }
    }
}
