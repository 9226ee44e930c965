//! Sans-IO core of the PixelPals real-time client.
//!
//! - [`env`]: time and randomness abstraction shared by every state machine
//! - [`identity`]: the logged-in user and its bearer credential
//! - [`session`]: the push-channel session (handshake, subscriptions,
//!   heart-beats, reconnect)
//!
//! Nothing in this crate performs I/O. Drivers feed transport events and time
//! in, and execute the returned actions.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod env;
pub mod error;
pub mod identity;
pub mod session;

pub use env::Environment;
pub use error::SessionError;
pub use identity::{AuthToken, Identity};
pub use session::{ConnectionState, Session, SessionAction, SessionConfig};
