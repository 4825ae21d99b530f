//! Virtual-clock environment.

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use chrono::{DateTime, TimeZone, Utc};
use driftline_core::Environment;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Virtual instant: elapsed virtual time since environment creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SimInstant(Duration);

impl std::ops::Sub for SimInstant {
    type Output = Duration;

    fn sub(self, rhs: Self) -> Duration {
        self.0.saturating_sub(rhs.0)
    }
}

struct Inner {
    elapsed: Duration,
    rng: ChaCha8Rng,
}

/// Deterministic environment with a manually-advanced clock and seeded RNG.
///
/// Clones share one clock, so advancing the environment inside a test is
/// visible to every state machine holding a clone.
#[derive(Clone)]
pub struct SimEnv {
    inner: Arc<Mutex<Inner>>,
    epoch: DateTime<Utc>,
}

impl SimEnv {
    /// Create a virtual environment with the given RNG seed.
    ///
    /// The wall clock starts at 2024-01-01T00:00:00Z and advances in lockstep
    /// with the monotonic clock.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                elapsed: Duration::ZERO,
                rng: ChaCha8Rng::seed_from_u64(seed),
            })),
            epoch: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().unwrap_or_default(),
        }
    }

    /// Advance the virtual clock.
    pub fn advance(&self, duration: Duration) {
        self.lock().elapsed += duration;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Environment for SimEnv {
    type Instant = SimInstant;

    fn now(&self) -> SimInstant {
        SimInstant(self.lock().elapsed)
    }

    fn now_utc(&self) -> DateTime<Utc> {
        let elapsed = self.lock().elapsed;
        self.epoch + chrono::Duration::from_std(elapsed).unwrap_or(chrono::Duration::zero())
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        self.advance(duration);
        std::future::ready(())
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        self.lock().rng.fill_bytes(buffer);
    }
}
