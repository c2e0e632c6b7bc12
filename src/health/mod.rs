//! Platform health and self-tests.
//!
//! The startup test gates collector use on the quality of the
//! platform's timer; the continuous test watches generated output for
//! stuck values as required by FIPS 140-2. Both are rejection
//! mechanisms, not quality proofs.

mod continuous;
mod startup;

pub use continuous::{ContinuousOutcome, ContinuousTest};
pub use startup::{init, verify_platform, StartupError};
