//! Command-line frontend for PixelPals.
//!
//! A thin shell over [`pixelpals_app::Driver`] that provides stdin/stdout
//! I/O and real sockets. All orchestration logic lives in the generic
//! [`pixelpals_app::Runtime`].

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod driver;
pub mod render;
pub mod system_env;

pub use driver::{CliDriver, CliError};
pub use pixelpals_app::{Driver, Runtime};
pub use system_env::SystemEnv;
