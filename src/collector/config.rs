//! Collector and output configuration.
//!
//! All noise and post-processing stages default to enabled; switches
//! exist for platforms where a stage is counterproductive and for
//! tests that need deterministic behavior.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for an entropy collector.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Oversampling rate: multiplier on the sample rounds per 64-bit
    /// output. Zero is promoted to one at construction.
    pub osr: u32,
    /// Run the memory-access noise source.
    pub memory_access: bool,
    /// Stir the pool after each generation pass.
    pub stir: bool,
    /// Apply von-Neumann unbiasing to sample pairs.
    pub unbias: bool,
    /// Force the FIPS continuous test on or off. `None` consults the
    /// platform FIPS mode.
    pub fips: Option<bool>,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            osr: 1,
            memory_access: true,
            stir: true,
            unbias: true,
            fips: None,
        }
    }
}

impl CollectorConfig {
    /// Returns the oversampling rate with the zero promotion applied.
    pub fn effective_osr(&self) -> u32 {
        self.osr.max(1)
    }

    /// Resolves whether the continuous test runs for this collector.
    pub fn fips_mode(&self) -> bool {
        self.fips.unwrap_or_else(platform_fips_enabled)
    }
}

/// Returns whether the platform runs in FIPS mode.
///
/// On Linux this is the kernel's `fips_enabled` switch; elsewhere the
/// answer is no and callers opt in per collector.
pub fn platform_fips_enabled() -> bool {
    #[cfg(target_os = "linux")]
    {
        std::fs::read_to_string("/proc/sys/crypto/fips_enabled")
            .map(|value| value.trim() == "1")
            .unwrap_or(false)
    }
    #[cfg(not(target_os = "linux"))]
    {
        false
    }
}

/// Configuration file errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub collector: CollectorConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Output configuration for the command-line front-end.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Run continuously (true) or emit a fixed number of bytes.
    pub continuous: bool,
    /// Number of bytes to emit if not continuous.
    pub bytes: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            continuous: false,
            bytes: 32,
        }
    }
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CollectorConfig::default();
        assert_eq!(config.osr, 1);
        assert!(config.memory_access);
        assert!(config.stir);
        assert!(config.unbias);
        assert!(config.fips.is_none());
    }

    #[test]
    fn test_zero_osr_promoted() {
        let config = CollectorConfig {
            osr: 0,
            ..Default::default()
        };
        assert_eq!(config.effective_osr(), 1);
    }

    #[test]
    fn test_fips_override_wins() {
        let config = CollectorConfig {
            fips: Some(true),
            ..Default::default()
        };
        assert!(config.fips_mode());
    }

    #[test]
    fn test_partial_file_config_parses() {
        let parsed: FileConfig = toml::from_str(
            r#"
            [collector]
            osr = 3
            stir = false
            "#,
        )
        .unwrap();
        assert_eq!(parsed.collector.osr, 3);
        assert!(!parsed.collector.stir);
        // Omitted fields keep their defaults.
        assert!(parsed.collector.unbias);
        assert_eq!(parsed.output.bytes, 32);
    }
}
