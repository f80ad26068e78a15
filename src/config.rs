//! Simulation-wide tunables.
//!
//! Domain constants that the protocol itself establishes (epoch length,
//! heat window, max object size) are fixed; `RunConfig` carries the small
//! set of knobs that vary by invocation, in the style of the teacher's
//! `Config`/`ConfigBuilder` split between fixed and adjustable settings.

use serde::{Deserialize, Serialize};

/// Time slices per epoch; tag-heat statistics are bucketed at this
/// granularity.
pub const SLICES_PER_EPOCH: u64 = 1800;

/// Extra slices run past `T` to drain in-flight reads before exit.
pub const EXTRA_TIME: u64 = 105;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// `log` level filter used when no `RUST_LOG` override is present.
    pub log_level: String,
    /// Run one scripted scenario against an in-memory protocol instead of
    /// reading stdin, then exit. Useful for smoke-testing without a driver.
    pub selftest: bool,
}

impl RunConfig {
    pub fn production() -> Self {
        RunConfig { log_level: "info".to_string(), selftest: false }
    }

    pub fn development() -> Self {
        let mut config = Self::production();
        config.log_level = "debug".to_string();
        config
    }

    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if !matches!(self.log_level.as_str(), "trace" | "debug" | "info" | "warn" | "error") {
            errors.push(format!("unknown log level: {}", self.log_level));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig::production()
    }
}

/// Fluent builder mirroring the teacher's `ConfigBuilder`.
pub struct RunConfigBuilder {
    config: RunConfig,
}

impl RunConfigBuilder {
    pub fn new() -> Self {
        RunConfigBuilder { config: RunConfig::production() }
    }

    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.log_level = level.into();
        self
    }

    pub fn selftest(mut self, enable: bool) -> Self {
        self.config.selftest = enable;
        self
    }

    pub fn build(self) -> anyhow::Result<RunConfig> {
        match self.config.validate() {
            Ok(()) => Ok(self.config),
            Err(errors) => Err(anyhow::anyhow!("configuration validation failed: {}", errors.join("; "))),
        }
    }
}

impl Default for RunConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_rejects_unknown_log_level() {
        let result = RunConfigBuilder::new().log_level("verbose").build();
        assert!(result.is_err());
    }

    #[test]
    fn development_preset_is_debug() {
        assert_eq!(RunConfig::development().log_level, "debug");
    }
}
