//! Client error types.

use pixelpals_core::SessionError;
use thiserror::Error;

/// Local precondition failures returned from `Client::handle`.
///
/// Returning one of these means the event changed no state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The event needs a logged-in identity.
    #[error("not logged in")]
    NotLoggedIn,

    /// Message content is blank after trimming.
    #[error("message is empty")]
    EmptyMessage,

    /// No conversation is open.
    #[error("no conversation is open")]
    NoConversation,

    /// The counterpart of the open conversation has no id.
    #[error("conversation counterpart is unknown")]
    UnresolvedCounterpart,

    /// Outgoing payload could not be encoded.
    #[error("failed to encode payload: {0}")]
    Encode(String),

    /// Session-level failure (incomplete identity, not connected).
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Outcome of a failed REST request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// 401 or 403: the credential is no longer accepted.
    #[error("unauthorized (HTTP {status})")]
    Unauthorized {
        /// HTTP status code.
        status: u16,
    },

    /// Any other non-success status.
    #[error("request failed with HTTP {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// Connection failure or timeout.
    #[error("transport failure: {0}")]
    Transport(String),

    /// Body did not match the endpoint's shape.
    #[error("invalid response body: {0}")]
    Decode(String),
}

impl FetchError {
    /// Classify a non-success HTTP status.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => Self::Unauthorized { status },
            _ => Self::Status { status },
        }
    }

    /// Returns true if the session must be torn down and the user sent back
    /// to login.
    pub fn is_session_fatal(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}
