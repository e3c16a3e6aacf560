// Recorder configuration, loaded from TOML
//
// Every key is optional; missing keys fall back to the defaults below.

use crate::error::{RecorderError, Result};
use crate::report::OutputFormat;
use crate::stack_unwind::MAX_STACK_DEPTH;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for a [`CallTimingRecorder`](crate::recorder::CallTimingRecorder)
///
/// # Example
/// ```
/// use callcost::config::RecorderConfig;
///
/// let config = RecorderConfig::from_toml_str("default_threshold = 500").unwrap();
/// assert_eq!(config.default_threshold, 500);
/// assert!(config.enabled);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RecorderConfig {
    /// When false, `begin`/`end` do nothing
    pub enabled: bool,

    /// Threshold used when the caller (or a replay event) supplies none
    ///
    /// Default: 1000, the instrumentation layer's "1000us = 1ms" convention.
    /// Compared as-is against millisecond elapsed times.
    pub default_threshold: u64,

    /// Capture the reporting thread's stack into each report
    pub capture_stack: bool,

    /// Upper bound on captured frames before filtering
    pub max_stack_depth: usize,

    /// Rendering of reports printed by the CLI
    pub format: OutputFormat,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_threshold: 1000,
            capture_stack: true,
            max_stack_depth: MAX_STACK_DEPTH,
            format: OutputFormat::Text,
        }
    }
}

impl RecorderConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml_str(&contents)?;
        tracing::debug!(path = %path.as_ref().display(), ?config, "loaded recorder config");
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.capture_stack && self.max_stack_depth == 0 {
            return Err(RecorderError::Config(
                "max_stack_depth must be >= 1 when capture_stack is enabled".to_string(),
            ));
        }
        Ok(())
    }
}
