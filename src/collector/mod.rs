//! Entropy collector, configuration and read path.

mod config;
mod core;
mod pool;
mod rng;

pub use self::config::{
    platform_fips_enabled, CollectorConfig, ConfigError, FileConfig, OutputConfig,
};
pub use self::core::{read_entropy, AllocError, EntropyCollector, ReadError};
