//! Time folding and loop-count shuffling.
//!
//! Folding compresses a 64-bit timestamp delta into a small number of
//! bits while simultaneously serving as the timed operation whose
//! duration carries the jitter. The loop must therefore execute exactly
//! as written: every window extraction goes through
//! [`core::hint::black_box`] so the optimizer can neither collapse the
//! pass into a parity computation nor hoist it out of the repeat loop.
//! This replaces the blunt instrument of compiling the whole crate
//! without optimizations.

use core::hint::black_box;

use crate::timing::TimeSource;

/// Width of one folded sample in bits. This is the assumed lower bound
/// on the entropy of a single timing measurement. Legal range 1..=8.
pub const TIME_ENTROPY_BITS: u32 = 1;

/// Size of the entropy pool in bits.
pub const DATA_SIZE_BITS: u32 = 64;

/// Size of the entropy pool in bytes.
pub const DATA_SIZE_BYTES: usize = 8;

/// Window width fed to the shuffler when deriving fold loop counts.
pub(crate) const MAX_FOLD_LOOP_BIT: u32 = 4;

/// Guaranteed minimum power of two for fold loop counts.
pub(crate) const MIN_FOLD_LOOP_BIT: u32 = 0;

/// One folding pass: XOR together every `width`-bit window of `time`,
/// from least to most significant. Windows that do not fit completely
/// (when 64 is not divisible by `width`) are discarded; the upmost bits
/// are assumed entropy-free anyway.
pub(crate) fn fold_once(time: u64, width: u32) -> u64 {
    let windows = DATA_SIZE_BITS / width;
    let mut folded = 0u64;
    for i in 1..=windows {
        let mut window = time << (DATA_SIZE_BITS - width * i);
        window >>= DATA_SIZE_BITS - width;
        folded ^= black_box(window);
    }
    folded
}

/// Folds `time` into [`TIME_ENTROPY_BITS`] bits, repeating the pass
/// `loop_count` times. Only the final pass's value is returned; the
/// earlier passes exist to consume a measurable, varying amount of
/// time.
pub(crate) fn fold_time(time: u64, loop_count: u64) -> u64 {
    let mut folded = 0u64;
    for _ in 0..loop_count {
        folded = black_box(fold_once(time, TIME_ENTROPY_BITS));
    }
    folded
}

/// Derives the loop count for the next folding operation from the
/// current time, optionally mixed with the entropy pool.
///
/// All `bits`-wide windows of the timestamp are folded onto each other
/// and a floor of `1 << min` is added, so the result lies in
/// `[1 << min, (1 << min) + (1 << bits))`. Nothing in the collector
/// ever runs for a constant number of iterations.
pub(crate) fn loop_shuffle<C: TimeSource>(
    clock: &mut C,
    pool: Option<u64>,
    bits: u32,
    min: u32,
) -> u64 {
    let mask = (1u64 << bits) - 1;
    let mut time = clock.now();
    if let Some(pool) = pool {
        time ^= pool;
    }
    let mut shuffle = 0u64;
    for _ in 0..(u64::from(DATA_SIZE_BITS) / u64::from(bits)) {
        shuffle ^= time & mask;
        time >>= bits;
    }
    shuffle + (1u64 << min)
}
