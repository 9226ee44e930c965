//! Wire protocol for the PixelPals push channel.
//!
//! The server speaks STOMP 1.2 over a WebSocket. This crate owns the pieces of
//! that protocol the client core needs:
//!
//! - [`Frame`]: STOMP frame encoding and decoding (text, NUL-terminated)
//! - [`Destination`]: typed push and outbound destinations
//! - [`ConversationId`]: deterministic pairing key for two participants
//! - [`payloads`]: JSON bodies carried on each destination, and the typed
//!   [`PushEvent`] every inbound body decodes into
//!
//! Nothing here performs I/O.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod conversation;
pub mod destination;
pub mod errors;
pub mod frame;
pub mod payloads;

pub use conversation::{ConversationId, MatchId, UserId};
pub use destination::Destination;
pub use errors::{ProtocolError, Result};
pub use frame::{Command, Frame};
pub use payloads::PushEvent;
