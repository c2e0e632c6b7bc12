//! FIPS 140-2 continuous self-test.
//!
//! Two consecutive 64-bit outputs of the generator must differ. A
//! repeat marks the collector permanently dead; the caller's only
//! recourse is to free it and allocate a new one.

/// Result of feeding one generated output to the continuous test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContinuousOutcome {
    /// The output differs from its predecessor.
    Passed,
    /// The test had no reference value yet and stored this output;
    /// the driver must run one more generation pass before handing
    /// anything out.
    Primed,
    /// The output repeated, or the test had already failed.
    Failed,
}

/// Continuous output comparison with sticky failure.
///
/// A reference value of zero means "not yet primed"; a freshly
/// generated pool is never handed to the test before the generator has
/// filled it with non-zero content.
#[derive(Debug, Clone, Default)]
pub struct ContinuousTest {
    last: u64,
    failed: bool,
}

impl ContinuousTest {
    /// Creates an unprimed test.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one generated output to the test.
    pub fn observe(&mut self, output: u64) -> ContinuousOutcome {
        if self.failed {
            return ContinuousOutcome::Failed;
        }
        if self.last == 0 {
            self.last = output;
            return ContinuousOutcome::Primed;
        }
        if output == self.last {
            self.failed = true;
            tracing::warn!("continuous self-test failed: generator output repeated");
            return ContinuousOutcome::Failed;
        }
        self.last = output;
        ContinuousOutcome::Passed
    }

    /// Returns whether the test has failed. Failure is permanent.
    pub fn has_failed(&self) -> bool {
        self.failed
    }
}
