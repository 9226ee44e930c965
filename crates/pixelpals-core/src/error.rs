//! Error types for the push-channel session.

use thiserror::Error;

/// Errors that can occur during session operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// `open` was called without both user id and username.
    #[error("identity is incomplete: user id and username are both required")]
    IncompleteIdentity,

    /// Operation needs a live connection and there is none.
    #[error("push channel is not connected")]
    NotConnected,

    /// The server refused the handshake. Not retried automatically.
    #[error("handshake rejected: {reason}")]
    HandshakeRejected {
        /// Reason reported by the broker.
        reason: String,
        /// The reason carries an authorization failure marker.
        unauthorized: bool,
    },
}

impl SessionError {
    /// Returns true if this error clears on its own once the channel
    /// reconnects.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::NotConnected)
    }

    /// Returns true if the credential is no longer accepted and the user must
    /// authenticate again.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::HandshakeRejected { unauthorized: true, .. })
    }
}
