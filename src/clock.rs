//! Monotonic time sources for duration bookkeeping. Everything in this crate
//! that computes a duration goes through [`Clock`] so tests can drive time by
//! hand. We never read wall-clock time here; clock skew after process start
//! must not show up in measured durations.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::LazyLock;
use std::time::Instant;

/// A monotonic time source, reported as nanoseconds from an arbitrary origin.
/// Only differences between readings are meaningful.
pub trait Clock: Send + Sync + 'static {
    fn monotonic_time(&self) -> u64;
}

impl std::fmt::Debug for dyn Clock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Clock")
    }
}

static PROCESS_ANCHOR: LazyLock<Instant> = LazyLock::new(Instant::now);

/// The default clock, backed by [`Instant`] readings taken against a single
/// process-wide anchor so that every [`SystemClock`] agrees on the origin.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn monotonic_time(&self) -> u64 {
        PROCESS_ANCHOR.elapsed().as_nanos() as u64
    }
}

/// A hand-cranked clock for tests. Starts at zero and only moves when told to.
#[derive(Debug, Default)]
pub struct MockClock {
    now: AtomicU64,
}

impl MockClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, nanos: u64) {
        self.now.store(nanos, Ordering::Release);
    }

    pub fn add(&self, nanos: u64) {
        self.now.fetch_add(nanos, Ordering::AcqRel);
    }
}

impl Clock for MockClock {
    fn monotonic_time(&self) -> u64 {
        self.now.load(Ordering::Acquire)
    }
}
