//! Jitter Entropy Library
//!
//! A non-physical true random number generator (TRNG) that harvests
//! entropy from the execution-timing jitter of CPU instructions and
//! memory accesses. No dedicated hardware is required; the noise comes
//! from the processor itself.
//!
//! # Architecture
//!
//! The system follows an explicit data flow per 64-bit output:
//!
//! ```text
//! memory walk → timer delta → fold → unbias → pool (XOR + rotate)
//!                                                  ↓
//!                                      stir → continuous test → out
//! ```
//!
//! # Design Principles
//!
//! - **Fail-closed**: the startup test rejects platforms whose timers
//!   cannot back the entropy assumption, and a failed continuous test
//!   permanently disables the collector
//! - **Measured, not modeled**: the folding loop is both the
//!   compression step and the timed operation; optimization barriers
//!   keep it honest
//! - **No cryptographic claims**: the stir step is an invertible
//!   mixer, not a conditioner; feed the output to a CSPRNG if you
//!   need one
//!
//! # Example
//!
//! ```no_run
//! use jitter_entropy::{init, CollectorConfig, EntropyCollector};
//!
//! // Reject platforms with an unfit timer before collecting.
//! init().expect("platform timer unfit for jitter collection");
//!
//! let mut collector = EntropyCollector::with_config(&CollectorConfig::default())
//!     .expect("allocation failed");
//!
//! let mut seed = [0u8; 32];
//! collector.read(&mut seed).expect("collector disabled");
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod collector;
pub mod health;
pub mod noise;
pub mod timing;

// Re-export commonly used types at crate root
pub use collector::{
    platform_fips_enabled, read_entropy, AllocError, CollectorConfig, ConfigError,
    EntropyCollector, FileConfig, OutputConfig, ReadError,
};
pub use health::{init, verify_platform, ContinuousOutcome, ContinuousTest, StartupError};
pub use noise::{MemoryAccess, DATA_SIZE_BITS, DATA_SIZE_BYTES, TIME_ENTROPY_BITS};
pub use timing::{MockClock, MonotonicClock, TimeSource};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
