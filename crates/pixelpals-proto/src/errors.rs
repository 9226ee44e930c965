//! Protocol error types.

use thiserror::Error;

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while decoding frames or payloads.
///
/// None of these are fatal for a session: a frame or body that fails to decode
/// is skipped and processing continues with the next one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Command line is not a STOMP command we understand.
    #[error("unknown command: {0:?}")]
    UnknownCommand(String),

    /// Header line without a `:` separator.
    #[error("malformed header line: {0:?}")]
    MalformedHeader(String),

    /// Header value contains an escape sequence STOMP 1.2 does not define.
    #[error("invalid escape sequence in header: {0:?}")]
    InvalidEscape(String),

    /// Frame ended before the header block was terminated.
    #[error("frame ended inside header block")]
    UnterminatedHeaders,

    /// Body is shorter than its `content-length` header claims.
    #[error("body truncated: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Bytes promised by `content-length`.
        expected: usize,
        /// Bytes actually present.
        actual: usize,
    },

    /// `content-length` header is not a valid length.
    #[error("invalid content-length: {0:?}")]
    InvalidContentLength(String),

    /// Frame is missing a header required for its command.
    #[error("missing required header: {0}")]
    MissingHeader(&'static str),

    /// JSON body does not match the payload type of its destination.
    #[error("invalid payload on {destination}: {reason}")]
    InvalidPayload {
        /// Destination the body arrived on.
        destination: String,
        /// Deserializer error message.
        reason: String,
    },

    /// Destination is outbound-only and never carries server pushes.
    #[error("destination {0} does not carry inbound messages")]
    NotInbound(String),
}
