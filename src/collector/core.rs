//! The entropy collector: measurement, unbiasing, generation, reads.
//!
//! A collector is owned by exactly one caller; every operation takes
//! `&mut self` and nothing blocks or suspends. One generation pass
//! XOR-rotates `ceil(64 / TEB) × osr` unbiased samples into the pool,
//! optionally stirs, and the read path hands the pool out in 8-byte
//! chunks after the continuous self-test has cleared it.

use thiserror::Error;
use zeroize::Zeroize;

use super::config::CollectorConfig;
use super::pool;
use crate::health::{ContinuousOutcome, ContinuousTest};
use crate::noise::{
    fold_time, loop_shuffle, MemoryAccess, DATA_SIZE_BITS, DATA_SIZE_BYTES, MAX_FOLD_LOOP_BIT,
    MIN_FOLD_LOOP_BIT, TIME_ENTROPY_BITS,
};
use crate::timing::{MonotonicClock, TimeSource};

/// The collector's scratch memory could not be allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("failed to allocate collector scratch memory")]
pub struct AllocError;

/// Errors surfaced by the read path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ReadError {
    /// No collector was supplied; a caller bug.
    #[error("no entropy collector present")]
    CollectorAbsent,
    /// The FIPS 140-2 continuous self-test failed. The collector is
    /// permanently dead; free it and allocate a new one.
    #[error("continuous self-test failed, collector is disabled")]
    FipsFailure,
}

/// Jitter entropy collector.
///
/// Gathers entropy from the execution-timing jitter of a deliberately
/// unoptimized folding loop, with memory-access wait states layered on
/// top. Not thread-safe; wrap it yourself if you must share it.
pub struct EntropyCollector<C: TimeSource = MonotonicClock> {
    /// Entropy pool, doubling as the current 64-bit output.
    data: u64,
    /// Timestamp of the previous measurement.
    prev_time: u64,
    /// Continuous output test, primed at construction.
    fips: ContinuousTest,
    fips_enabled: bool,
    memory: Option<MemoryAccess>,
    osr: u32,
    stir: bool,
    unbias: bool,
    clock: C,
}

impl EntropyCollector<MonotonicClock> {
    /// Creates a collector with default configuration on the platform
    /// clock.
    pub fn new() -> Result<Self, AllocError> {
        Self::with_config(&CollectorConfig::default())
    }

    /// Creates a collector with the given configuration on the
    /// platform clock.
    pub fn with_config(config: &CollectorConfig) -> Result<Self, AllocError> {
        Self::with_parts(config, MonotonicClock::new())
    }
}

impl<C: TimeSource> EntropyCollector<C> {
    /// Creates a collector with an explicit time source.
    ///
    /// Construction runs one generation pass to fill the pool with
    /// non-zero content and primes the continuous test. The caller is
    /// expected to have validated the platform with
    /// [`crate::health::init`] first.
    pub fn with_parts(config: &CollectorConfig, clock: C) -> Result<Self, AllocError> {
        let memory = if config.memory_access {
            Some(MemoryAccess::new()?)
        } else {
            None
        };

        let mut collector = Self {
            data: 0,
            prev_time: 0,
            fips: ContinuousTest::new(),
            fips_enabled: config.fips_mode(),
            memory,
            osr: config.effective_osr(),
            stir: config.stir,
            unbias: config.unbias,
            clock,
        };

        collector.generate();
        // Prime the continuous test; a priming outcome already runs
        // the required extra pass.
        let _ = collector.continuous_check();

        tracing::debug!(
            osr = collector.osr,
            memory_access = collector.memory.is_some(),
            stir = collector.stir,
            unbias = collector.unbias,
            fips = collector.fips_enabled,
            "entropy collector ready"
        );
        Ok(collector)
    }

    /// Fills `buf` with entropy.
    ///
    /// Each 8-byte chunk comes from one generation pass that has
    /// passed the continuous self-test; a failing pass contributes no
    /// bytes. After the request is served, one further pass overwrites
    /// the pool so the returned value no longer lingers in memory
    /// (suppressed by the `secure-memory` feature).
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, ReadError> {
        for chunk in buf.chunks_mut(DATA_SIZE_BYTES) {
            self.generate();
            self.continuous_check()?;
            chunk.copy_from_slice(&self.data.to_ne_bytes()[..chunk.len()]);
        }

        #[cfg(not(feature = "secure-memory"))]
        self.generate();

        Ok(buf.len())
    }

    /// Returns the current pool word. Inspection only; reads go
    /// through [`EntropyCollector::read`].
    pub fn pool(&self) -> u64 {
        self.data
    }

    /// Returns whether the continuous self-test has permanently
    /// disabled this collector.
    pub fn fips_failed(&self) -> bool {
        self.fips.has_failed()
    }

    /// One generation pass: fills the pool with a fresh 64-bit value.
    ///
    /// The round count covers every pool bit once per oversampling
    /// step. The first round takes a throwaway measurement so the
    /// first delta is computed against a real timestamp rather than
    /// whatever `prev_time` held before.
    fn generate(&mut self) {
        let rounds =
            u64::from((DATA_SIZE_BITS - 1) / TIME_ENTROPY_BITS + 1) * u64::from(self.osr);
        for round in 0..rounds {
            if round == 0 {
                self.measure();
            }
            let sample = self.unbiased_sample();
            self.data = pool::accumulate(self.data, sample);
        }
        if self.stir {
            self.data ^= pool::stir_mix(self.data);
        }
    }

    /// One folded jitter sample.
    ///
    /// The memory walk runs first so its wait states land inside the
    /// measured interval; the delta to the previous measurement is
    /// then folded down with a shuffled loop count.
    fn measure(&mut self) -> u64 {
        if let Some(memory) = self.memory.as_mut() {
            memory.touch();
        }
        let now = self.clock.now();
        let delta = now.wrapping_sub(self.prev_time);
        self.prev_time = now;

        let loops = loop_shuffle(
            &mut self.clock,
            Some(self.data),
            MAX_FOLD_LOOP_BIT,
            MIN_FOLD_LOOP_BIT,
        );
        fold_time(delta, loops)
    }

    /// Von-Neumann unbiasing over sample pairs (RFC 4086 §4.2): the
    /// first of two unequal consecutive samples is returned. Assumes
    /// successive samples are independent.
    fn unbiased_sample(&mut self) -> u64 {
        if !self.unbias {
            return self.measure();
        }
        loop {
            let a = self.measure();
            let b = self.measure();
            if a != b {
                return a;
            }
        }
    }

    /// Runs the continuous self-test over the current pool value. On
    /// a priming outcome the mandatory extra generation pass runs
    /// before returning.
    fn continuous_check(&mut self) -> Result<(), ReadError> {
        if !self.fips_enabled {
            return Ok(());
        }
        match self.fips.observe(self.data) {
            ContinuousOutcome::Passed => Ok(()),
            ContinuousOutcome::Primed => {
                self.generate();
                Ok(())
            }
            ContinuousOutcome::Failed => Err(ReadError::FipsFailure),
        }
    }
}

impl<C: TimeSource> Drop for EntropyCollector<C> {
    fn drop(&mut self) {
        self.data.zeroize();
        self.prev_time.zeroize();
        self.fips = ContinuousTest::new();
        if let Some(memory) = self.memory.as_mut() {
            memory.zeroize();
        }
    }
}

impl<C: TimeSource> std::fmt::Debug for EntropyCollector<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntropyCollector")
            .field("osr", &self.osr)
            .field("memory_access", &self.memory.is_some())
            .field("stir", &self.stir)
            .field("unbias", &self.unbias)
            .field("fips_enabled", &self.fips_enabled)
            .field("fips_failed", &self.fips.has_failed())
            .finish_non_exhaustive()
    }
}

/// Reads entropy through an optional collector handle, for callers
/// that keep the collector in an `Option` (daemon-style ownership).
pub fn read_entropy<C: TimeSource>(
    collector: Option<&mut EntropyCollector<C>>,
    buf: &mut [u8],
) -> Result<usize, ReadError> {
    match collector {
        Some(collector) => collector.read(buf),
        None => Err(ReadError::CollectorAbsent),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noise::fold_once;
    use crate::timing::MockClock;

    /// Config with every stochastic stage disabled, so the pool
    /// evolution is a pure function of the scripted clock.
    fn deterministic_config(fips: bool) -> CollectorConfig {
        CollectorConfig {
            osr: 1,
            memory_access: false,
            stir: false,
            unbias: false,
            fips: Some(fips),
        }
    }

    /// Builds a clock script from per-measurement deltas. Every
    /// measurement consumes two readings: the measured timestamp and
    /// the shuffler's, which only influences the fold loop count.
    fn script_from_deltas(deltas: &[u64]) -> Vec<u64> {
        let mut readings = Vec::with_capacity(deltas.len() * 2);
        let mut t = 0u64;
        for &delta in deltas {
            t += delta;
            readings.push(t);
            readings.push(t + 1);
        }
        readings
    }

    /// Deltas whose fold parities are all zero except at the given
    /// measurement indices. Delta 6 folds to 0, delta 2 folds to 1
    /// (TEB = 1 parity).
    fn parity_deltas(total: usize, odd_at: &[usize]) -> Vec<u64> {
        (0..total)
            .map(|m| if odd_at.contains(&m) { 2 } else { 6 })
            .collect()
    }

    #[test]
    fn test_read_fills_buffer_with_live_clock() {
        // Default collector on the platform clock: 32-byte reads are
        // neither constant nor repeatable.
        let config = CollectorConfig {
            fips: Some(false),
            ..Default::default()
        };
        let mut collector = EntropyCollector::with_config(&config).unwrap();
        let mut first = [0u8; 32];
        let mut second = [0u8; 32];
        assert_eq!(collector.read(&mut first).unwrap(), 32);
        assert_eq!(collector.read(&mut second).unwrap(), 32);
        assert!(first.iter().any(|&b| b != first[0]));
        assert_ne!(first, second);
    }

    #[test]
    fn test_short_read_truncates_pool_word() {
        let config = CollectorConfig {
            fips: Some(false),
            ..Default::default()
        };
        let mut collector = EntropyCollector::with_config(&config).unwrap();
        let mut buf = [0u8; 3];
        assert_eq!(collector.read(&mut buf).unwrap(), 3);
    }

    #[test]
    fn test_absent_collector_rejected() {
        let mut buf = [0u8; 8];
        let absent: Option<&mut EntropyCollector<MonotonicClock>> = None;
        assert_eq!(
            read_entropy(absent, &mut buf),
            Err(ReadError::CollectorAbsent)
        );
    }

    #[test]
    fn test_memory_access_disabled_is_noop() {
        // Without the scratch region the walk is a no-op and reads
        // still work.
        let config = CollectorConfig {
            memory_access: false,
            fips: Some(false),
            ..Default::default()
        };
        let mut collector = EntropyCollector::with_config(&config).unwrap();
        assert!(collector.memory.is_none());
        let mut buf = [0u8; 64];
        assert_eq!(collector.read(&mut buf).unwrap(), 64);
    }

    #[test]
    fn test_generation_work_scales_with_osr() {
        // One pass with osr = k and unbiasing off takes k * 64 sample
        // measurements plus one priming measurement, at two clock
        // reads each.
        for osr in [1u64, 3, 5] {
            let config = CollectorConfig {
                osr: osr as u32,
                memory_access: false,
                stir: false,
                unbias: false,
                fips: Some(false),
            };
            let clock = MockClock::stepping(1_000, 7, 100_000);
            let mut collector = EntropyCollector::with_parts(&config, clock).unwrap();
            let before = collector.clock.calls();
            collector.generate();
            let measurements = osr * u64::from(DATA_SIZE_BITS / TIME_ENTROPY_BITS) + 1;
            // Each measurement reads the clock twice: once for the
            // delta, once inside the loop shuffler.
            assert_eq!(collector.clock.calls() - before, 2 * measurements);
        }
    }

    #[test]
    fn test_accumulation_matches_folded_deltas() {
        // With stirring and unbiasing off, the pool after
        // one generation pass is exactly the XOR-rotate accumulation
        // of the folded measurement deltas.
        let deltas: Vec<u64> = (0..65u64).map(|m| 3 + (m * 5) % 16).collect();
        let clock = MockClock::from_readings(script_from_deltas(&deltas));
        let collector =
            EntropyCollector::with_parts(&deterministic_config(false), clock).unwrap();

        let mut expected = 0u64;
        for (m, &delta) in deltas.iter().enumerate() {
            if m == 0 {
                continue; // priming measurement, discarded
            }
            expected = pool::accumulate(expected, fold_once(delta, TIME_ENTROPY_BITS));
        }
        assert_eq!(collector.pool(), expected);
    }

    #[test]
    fn test_continuous_failure_is_sticky() {
        // A scripted clock forces the pool onto a fixed value: one
        // odd-parity delta in each of the two construction-time passes
        // sets distinct non-zero pools, then every later delta folds
        // to zero and a full pass leaves the pool unchanged.
        let deltas = parity_deltas(600, &[1, 67]);
        let clock = MockClock::from_readings(script_from_deltas(&deltas));
        let mut collector =
            EntropyCollector::with_parts(&deterministic_config(true), clock).unwrap();

        // First read passes: the pool still differs from the primed
        // reference value.
        let mut buf = [0u8; 8];
        assert_eq!(collector.read(&mut buf), Ok(8));

        // Now the pool has gone static; the next read trips the test
        // and every read after that stays dead.
        assert_eq!(collector.read(&mut buf), Err(ReadError::FipsFailure));
        assert!(collector.fips_failed());
        assert_eq!(collector.read(&mut buf), Err(ReadError::FipsFailure));
        assert_eq!(collector.read(&mut buf), Err(ReadError::FipsFailure));
    }

    #[test]
    fn test_fresh_collector_recovers_after_fips_death() {
        // Discarding the dead collector and allocating a new one
        // restores service.
        let deltas = parity_deltas(600, &[1, 67]);
        let clock = MockClock::from_readings(script_from_deltas(&deltas));
        let mut dead = EntropyCollector::with_parts(&deterministic_config(true), clock).unwrap();
        let mut buf = [0u8; 8];
        assert_eq!(dead.read(&mut buf), Ok(8));
        assert_eq!(dead.read(&mut buf), Err(ReadError::FipsFailure));
        drop(dead);

        let mut replacement = EntropyCollector::with_config(&CollectorConfig {
            fips: Some(false),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(replacement.read(&mut buf), Ok(8));
    }

    #[cfg(not(feature = "secure-memory"))]
    #[test]
    fn test_scrub_pass_clears_returned_value() {
        // The pool after a read must not equal the bytes handed out.
        // Odd-parity deltas at measurement 1 (construction pass) and
        // 140 (inside the scrub pass) make both values deterministic
        // and distinct.
        let deltas = parity_deltas(400, &[1, 140]);
        let clock = MockClock::from_readings(script_from_deltas(&deltas));
        let mut collector =
            EntropyCollector::with_parts(&deterministic_config(false), clock).unwrap();

        let mut buf = [0u8; 8];
        collector.read(&mut buf).unwrap();
        assert_ne!(collector.pool(), u64::from_ne_bytes(buf));
    }

    #[test]
    fn test_construction_fills_pool() {
        // The construction-time pass leaves non-zero content behind
        // (deterministically: one odd-parity sample).
        let deltas = parity_deltas(100, &[5]);
        let clock = MockClock::from_readings(script_from_deltas(&deltas));
        let collector =
            EntropyCollector::with_parts(&deterministic_config(false), clock).unwrap();
        assert_ne!(collector.pool(), 0);
    }

    #[test]
    fn test_zero_osr_promoted_at_construction() {
        let config = CollectorConfig {
            osr: 0,
            memory_access: false,
            fips: Some(false),
            ..Default::default()
        };
        let collector = EntropyCollector::with_config(&config).unwrap();
        assert_eq!(collector.osr, 1);
    }

    #[test]
    fn test_stir_applied_after_generation() {
        // Same script with and without stirring: the stirred pool is
        // the unstirred one XORed with its mixer.
        let deltas: Vec<u64> = (0..65u64).map(|m| 3 + (m * 11) % 32).collect();

        let plain = EntropyCollector::with_parts(
            &deterministic_config(false),
            MockClock::from_readings(script_from_deltas(&deltas)),
        )
        .unwrap();

        let mut stirred_config = deterministic_config(false);
        stirred_config.stir = true;
        let stirred = EntropyCollector::with_parts(
            &stirred_config,
            MockClock::from_readings(script_from_deltas(&deltas)),
        )
        .unwrap();

        let expected = plain.pool() ^ pool::stir_mix(plain.pool());
        assert_eq!(stirred.pool(), expected);
    }
}
