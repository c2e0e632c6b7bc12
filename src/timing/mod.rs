//! Time source abstraction.
//!
//! This module provides a trait-based abstraction over the platform's
//! high-resolution monotonic timer, allowing for both real clock input
//! and scripted mock implementations for testing.

mod clock;

pub use clock::{MockClock, MonotonicClock, TimeSource};
