//! Monotonic clock implementations.
//!
//! The jitter collector consumes timestamps through the [`TimeSource`]
//! trait. Production code uses [`MonotonicClock`]; tests script exact
//! timer behavior with [`MockClock`].

use std::time::Instant;

/// Trait for high-resolution monotonic time sources.
///
/// The collector measures the duration of deliberately slow operations,
/// so the reported resolution must be finer than the per-sample entropy
/// assumption: two calls bracketing a folding pass must observably
/// differ. The startup health test rejects sources that do not meet
/// this bar.
pub trait TimeSource {
    /// Returns the current reading in nanoseconds.
    ///
    /// Readings must be monotonic up to small adjustments (the startup
    /// test tolerates a handful of backward steps). A reading of zero is
    /// treated as "no timer present".
    fn now(&mut self) -> u64;
}

/// Real monotonic clock backed by [`std::time::Instant`].
///
/// Readings are nanoseconds elapsed since the clock was created. On
/// common platforms `Instant` maps to the OS monotonic clock with
/// nanosecond granularity, which the startup test verifies at runtime.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Creates a clock anchored at the current instant.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicClock {
    fn now(&mut self) -> u64 {
        self.origin.elapsed().as_nanos() as u64
    }
}

/// Deterministic clock for testing that replays scripted readings.
///
/// Once the script is exhausted the last reading repeats, which behaves
/// like a stuck timer; scripts should be sized generously for the
/// scenario under test. The call counter makes work-scaling assertions
/// possible without instrumenting the collector itself.
#[derive(Debug, Clone)]
pub struct MockClock {
    readings: Vec<u64>,
    cursor: usize,
    calls: u64,
}

impl MockClock {
    /// Creates a clock replaying the given readings in order.
    ///
    /// # Panics
    ///
    /// Panics if `readings` is empty.
    pub fn from_readings(readings: Vec<u64>) -> Self {
        assert!(!readings.is_empty(), "mock clock needs at least one reading");
        Self {
            readings,
            cursor: 0,
            calls: 0,
        }
    }

    /// Creates a clock that starts at `start` and advances by `step`
    /// on every call, for `count` calls.
    pub fn stepping(start: u64, step: u64, count: usize) -> Self {
        let readings = (0..count as u64)
            .map(|i| start.wrapping_add(step.wrapping_mul(i)))
            .collect();
        Self::from_readings(readings)
    }

    /// Creates a clock that reports the same value on every call.
    pub fn constant(value: u64, count: usize) -> Self {
        Self::from_readings(vec![value; count])
    }

    /// Returns how many times the clock has been read.
    pub fn calls(&self) -> u64 {
        self.calls
    }
}

impl TimeSource for MockClock {
    fn now(&mut self) -> u64 {
        self.calls += 1;
        let index = self.cursor.min(self.readings.len() - 1);
        self.cursor += 1;
        self.readings[index]
    }
}
