//! Application layer for PixelPals
//!
//! Generic runtime for frontend orchestration, enabling deterministic
//! simulation testing with the same code that runs in production.
//!
//! # Components
//!
//! - [`Command`]: Line-oriented user commands, parsed into client events
//! - [`Driver`]: Trait for platform-specific I/O abstraction
//! - [`Runtime`]: Generic orchestration loop feeding a
//!   [`Client`](pixelpals_client::Client) from a [`Driver`]
//! - [`Notice`]: User-facing announcements the runtime hands to the driver

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod command;
mod driver;
mod notice;
mod runtime;

pub use command::{Command, CommandError};
pub use driver::{Driver, DriverEvent};
pub use notice::Notice;
pub use runtime::{DEFAULT_PRESENCE_POLL, Runtime};
