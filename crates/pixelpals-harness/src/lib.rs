//! Deterministic simulation harness for PixelPals client testing.
//!
//! Simulated implementations of the Environment and Driver traits plus a fake
//! STOMP broker, so the real client and runtime can be exercised without a
//! network or a wall clock.
//!
//! - [`SimEnv`]: virtual clock and seeded RNG; clones share one clock
//! - [`SimBroker`]: server side of the push channel (handshake, subscription
//!   bookkeeping, pushes)
//! - [`SimDriver`]: scripted [`Driver`](pixelpals_app::Driver) capturing
//!   everything the runtime asks it to do

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod sim_broker;
pub mod sim_driver;
pub mod sim_env;

pub use sim_broker::SimBroker;
pub use sim_driver::{SimDriver, SimDriverError};
pub use sim_env::SimEnv;
