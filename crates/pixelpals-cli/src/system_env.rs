//! Production Environment implementation using system time and RNG.
//!
//! Real monotonic time for timers, the system wall clock for user-visible
//! timestamps, OS randomness for provisional message ids, and tokio sleep.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use pixelpals_core::Environment;

/// The real clocks and OS entropy.
///
/// # Panics
///
/// `random_bytes` panics if the OS RNG fails; a process without entropy has
/// nothing sensible to fall back to.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = Instant;

    #[allow(clippy::disallowed_methods)]
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer).expect("invariant: OS RNG failure is unrecoverable");
    }

    /// A clock set before 1970 reads as the epoch.
    #[allow(clippy::disallowed_methods)]
    fn wall_clock_millis(&self) -> i64 {
        let since_epoch = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
        i64::try_from(since_epoch.as_millis()).unwrap_or(i64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_is_monotonic() {
        let env = SystemEnv::new();

        let mut previous = env.now();
        for _ in 0..100 {
            let current = env.now();
            assert!(current >= previous);
            previous = current;
        }
    }

    #[test]
    fn provisional_ids_do_not_collide() {
        let env = SystemEnv::new();

        let ids: std::collections::HashSet<u64> = (0..64).map(|_| env.random_u64()).collect();
        assert_eq!(ids.len(), 64);
    }

    #[test]
    fn wall_clock_agrees_with_chrono() {
        let ours = SystemEnv::new().wall_clock_millis();
        let theirs = chrono::Utc::now().timestamp_millis();

        assert!((theirs - ours).abs() < 5_000, "clocks differ by {}ms", theirs - ours);
    }

    #[tokio::test]
    async fn sleep_waits() {
        let env = SystemEnv::new();

        let start = env.now();
        env.sleep(Duration::from_millis(20)).await;

        assert!(env.now() - start >= Duration::from_millis(20));
    }
}
