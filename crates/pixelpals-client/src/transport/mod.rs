//! WebSocket and REST transport for the client.
//!
//! Thin I/O layers that move text and JSON. Protocol logic stays in the
//! Sans-IO [`Client`](crate::Client):
//!
//! - [`ws`]: one task per push-channel attempt, reporting [`TransportEvent`]s
//! - [`rest`]: executes [`Request`](crate::Request)s with the bearer token

use std::time::Duration;

use thiserror::Error;

use crate::ClientEvent;

pub mod rest;
pub mod ws;

pub use rest::RestClient;
pub use ws::{PushChannel, open_push_channel};

/// Default REST base URL.
pub const DEFAULT_API_URL: &str = "http://localhost:8080/api";

/// Default push-channel URL.
///
/// The broker endpoint `/ws` is SockJS-wrapped; plain WebSocket clients
/// connect to its `/websocket` transport.
pub const DEFAULT_WS_URL: &str = "ws://localhost:8080/ws/websocket";

/// Default REST request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP client could not be built.
    #[error("http client setup failed: {0}")]
    Setup(String),

    /// The push channel task is gone.
    #[error("push channel closed")]
    Closed,
}

/// Where and how to reach the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// REST base URL; request paths are appended to it.
    pub api_url: String,
    /// Push-channel WebSocket URL.
    pub ws_url: String,
    /// Per-request REST timeout. Expiry is a transport failure.
    pub request_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            ws_url: DEFAULT_WS_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Something that happened on a push-channel attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The WebSocket handshake completed.
    Opened {
        /// Attempt the socket belongs to.
        attempt: u64,
    },
    /// A text message arrived.
    Data {
        /// Attempt the socket belongs to.
        attempt: u64,
        /// Raw text.
        text: String,
    },
    /// The socket closed, failed, or never opened.
    Closed {
        /// Attempt the socket belongs to.
        attempt: u64,
    },
}

impl TransportEvent {
    /// The matching client event.
    pub fn into_client_event<I>(self) -> ClientEvent<I> {
        match self {
            Self::Opened { attempt } => ClientEvent::TransportOpened { attempt },
            Self::Data { attempt, text } => ClientEvent::TransportData { attempt, text },
            Self::Closed { attempt } => ClientEvent::TransportClosed { attempt },
        }
    }
}
