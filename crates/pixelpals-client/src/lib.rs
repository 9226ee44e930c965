//! Client
//!
//! Action-based real-time state for a PixelPals user: friend presence, unread
//! counters, match notifications and the open conversation, all fed by one
//! push-channel session and a handful of REST snapshots.
//!
//! # Architecture
//!
//! The client follows the same Sans-IO pattern as [`pixelpals_core`]. It
//! receives events ([`ClientEvent`]), processes them through pure state machine
//! logic, and returns actions ([`ClientAction`]) for the caller to execute.
//! REST calls are described by [`Request`] and come back as
//! [`ClientEvent::Fetched`].
//!
//! # Components
//!
//! - [`Client`]: Top-level state machine and read model ([`Overview`])
//! - [`PresenceTracker`]: Friend online/offline map
//! - [`UnreadLedger`]: Unread totals, per-conversation and category counters
//! - [`MatchQueue`]: Match notifications keyed by `(match_id, kind)`
//! - [`Transcript`]: Message log of the open conversation
//!
//! # Transport (optional)
//!
//! With the `transport` feature enabled, this crate also provides:
//! - [`transport::open_push_channel`]: WebSocket carrying the STOMP session
//! - [`transport::RestClient`]: Executes [`Request`]s against the REST API

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod client;
mod error;
mod event;
mod matches;
mod presence;
mod transcript;
mod unread;

#[cfg(feature = "transport")]
pub mod transport;

pub use client::{Client, Lifecycle, Overview};
pub use error::{ClientError, FetchError};
pub use event::{ClientAction, ClientEvent, HistorySource, Method, Request, Response};
pub use matches::{MatchKind, MatchNotification, MatchOutcome, MatchQueue};
pub use pixelpals_core::{
    AuthToken, ConnectionState, Environment, Identity, SessionConfig, SessionError,
};
pub use pixelpals_proto::{ConversationId, MatchId, UserId};
pub use presence::{PresenceEntry, PresenceTracker};
pub use transcript::{
    ConversationKind, Counterpart, HistoryState, Reconciled, Transcript, TranscriptEntry,
};
pub use unread::UnreadLedger;
