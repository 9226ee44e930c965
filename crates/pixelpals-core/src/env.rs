//! Clocks and entropy behind a trait.
//!
//! The session and the client never read the system clock themselves: the
//! driver passes `now` in, and wall-clock stamps and provisional ids come
//! from here. Tests plug in a virtual clock and a seeded RNG.

use std::{
    ops::{Add, Sub},
    time::Duration,
};

/// Time and randomness for the client.
///
/// Implementations must keep `now()` monotonic. `wall_clock_millis()` may
/// jump; it only labels messages.
pub trait Environment: Clone + Send + Sync + 'static {
    /// Monotonic instant: `std::time::Instant` in production, a `Duration`
    /// offset in simulation. Reconnect deadlines are computed with `Add`.
    type Instant: Copy
        + Ord
        + Send
        + Sync
        + std::fmt::Debug
        + Add<Duration, Output = Self::Instant>
        + Sub<Output = Duration>;

    /// Current monotonic time.
    fn now(&self) -> Self::Instant;

    /// Sleeps for the specified duration.
    ///
    /// Only driver code awaits this; state machines take time as a parameter.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;

    /// Fill `buffer` with random bytes. Deterministic for a seeded simulation.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Milliseconds since the Unix epoch (wall clock).
    ///
    /// Used for user-visible timestamps and provisional message ids, never for
    /// timeouts.
    fn wall_clock_millis(&self) -> i64;

    /// Random suffix for provisional message ids.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }
}
