//! Simulated environment with a virtual clock and seeded RNG.
//!
//! Time only moves when a test (or `sleep`) advances it. Instants are
//! `Duration`s since the start of the simulation. The wall clock is a fixed
//! epoch plus the virtual elapsed time, so user-visible timestamps are
//! reproducible too.

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use pixelpals_core::Environment;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Wall clock at simulation start: 2023-11-14T22:13:20Z.
pub const DEFAULT_EPOCH_MILLIS: i64 = 1_700_000_000_000;

struct SimState {
    elapsed: Duration,
    epoch_millis: i64,
    rng: ChaCha8Rng,
}

/// Deterministic environment for simulation.
///
/// Clones share the clock and the RNG, so a test can hold one handle and
/// advance time for the client that owns another.
#[derive(Clone)]
pub struct SimEnv {
    state: Arc<Mutex<SimState>>,
}

impl Default for SimEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl SimEnv {
    /// Environment seeded with 0.
    pub fn new() -> Self {
        Self::with_seed(0)
    }

    /// Environment with a specific RNG seed.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                elapsed: Duration::ZERO,
                epoch_millis: DEFAULT_EPOCH_MILLIS,
                rng: ChaCha8Rng::seed_from_u64(seed),
            })),
        }
    }

    /// Move the virtual clock forward.
    pub fn advance(&self, duration: Duration) {
        let mut state = self.lock();
        state.elapsed += duration;
    }

    /// Virtual time since the simulation started.
    pub fn elapsed(&self) -> Duration {
        self.lock().elapsed
    }

    /// Set the wall clock at simulation start.
    pub fn set_epoch_millis(&self, millis: i64) {
        self.lock().epoch_millis = millis;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Environment for SimEnv {
    type Instant = Duration;

    fn now(&self) -> Self::Instant {
        self.elapsed()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        self.advance(duration);
        std::future::ready(())
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        self.lock().rng.fill_bytes(buffer);
    }

    fn wall_clock_millis(&self) -> i64 {
        let state = self.lock();
        state.epoch_millis + state.elapsed.as_millis() as i64
    }
}
