//! Startup health test for the timing source.
//!
//! Before any collector may be used, the platform timer must prove it
//! is present, fine-grained, monotonic enough, and variable enough to
//! back the per-sample entropy assumption. Platforms that fail any
//! check are rejected outright; there is no degraded mode.

use thiserror::Error;

use crate::noise::{fold_time, TIME_ENTROPY_BITS};
use crate::timing::{MonotonicClock, TimeSource};

/// Measured iterations of the timer sanity loop.
const TEST_LOOP_COUNT: u64 = 300;

/// Warm-up iterations whose measurements are discarded. These runs
/// pollute caches and branch predictors into a steady state so the
/// measured iterations see worst-case conditions.
const CLEAR_CACHE: u64 = 100;

/// Reasons the platform timer is unfit for jitter collection.
///
/// All variants are fatal for the collector-to-be; none is retryable
/// on the same platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StartupError {
    /// The timer returned zero; no usable time source exists.
    #[error("timer is missing or returns zero")]
    NoTimer,
    /// Consecutive readings were identical, or the counter steps in
    /// coarse quanta.
    #[error("timer resolution is too coarse")]
    CoarseTimer,
    /// A single timed folding pass took less than one timer quantum
    /// per assumed entropy bit.
    #[error("timer variation below the per-sample entropy bound")]
    MinVariation,
    /// The timer ran backwards more often than NTP-style adjustments
    /// can explain.
    #[error("timer is not monotonic")]
    NonMonotonic,
    /// Every measured delta was identical.
    #[error("timer deltas show no variation")]
    VarianceVar,
    /// The average delta-of-deltas stayed at or below the per-sample
    /// entropy bound.
    #[error("mean timer variation below the per-sample entropy bound")]
    MinVariationVar,
}

/// Runs the startup health test against the platform clock.
pub fn init() -> Result<(), StartupError> {
    verify_platform(&mut MonotonicClock::new())
}

/// Runs the startup health test against an arbitrary time source.
///
/// Each iteration brackets a single fixed-count folding pass with two
/// timer reads and inspects the delta. The first [`CLEAR_CACHE`]
/// iterations only warm the machine up; the remaining
/// [`TEST_LOOP_COUNT`] feed the statistics.
pub fn verify_platform<C: TimeSource>(clock: &mut C) -> Result<(), StartupError> {
    let mut delta_sum: u64 = 0;
    let mut old_delta: u64 = 0;
    let mut time_backwards: u32 = 0;
    let mut count_var: u32 = 0;
    let mut count_mod: u32 = 0;

    for i in 0..(TEST_LOOP_COUNT + CLEAR_CACHE) {
        let start = clock.now();
        let folded = fold_time(start, 1);
        core::hint::black_box(folded);
        let end = clock.now();

        if start == 0 || end == 0 {
            return Err(StartupError::NoTimer);
        }
        let delta = end.wrapping_sub(start);
        if delta == 0 {
            return Err(StartupError::CoarseTimer);
        }
        if delta < u64::from(TIME_ENTROPY_BITS) {
            return Err(StartupError::MinVariation);
        }

        if i < CLEAR_CACHE {
            continue;
        }

        if end <= start {
            time_backwards += 1;
        }
        if delta % 100 == 0 {
            count_mod += 1;
        }
        // Delta-of-delta statistics need a primed old_delta, so they
        // start one iteration after the warm-up ends.
        if i > CLEAR_CACHE {
            if delta != old_delta {
                count_var += 1;
            }
            delta_sum = delta_sum.wrapping_add(delta.abs_diff(old_delta));
        }
        old_delta = delta;
    }

    // CLOCK adjustments (adjtime, NTP) can legitimately step a few
    // readings backwards during the run; more than that is a broken
    // timer.
    if time_backwards > 3 {
        return Err(StartupError::NonMonotonic);
    }
    if delta_sum == 0 {
        return Err(StartupError::VarianceVar);
    }
    if delta_sum / TEST_LOOP_COUNT <= u64::from(TIME_ENTROPY_BITS) {
        return Err(StartupError::MinVariationVar);
    }
    // Counters stepping in multiples of 100 exist in the wild; reject
    // when more than 90% of deltas land on such a quantum.
    if count_mod > (TEST_LOOP_COUNT as u32 / 10) * 9 {
        return Err(StartupError::CoarseTimer);
    }

    tracing::debug!(count_var, count_mod, delta_sum, "timer sanity counters");
    Ok(())
}
