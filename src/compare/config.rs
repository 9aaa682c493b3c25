// Configuration for comparing two sets of test-suite results
//
// Short tests and tests whose repeated runs spread widely are not reliable
// enough to compare; the thresholds here drop them before computing speedups.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Which quantity to compare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collect {
    /// Median `exec_time` across runs
    Exectime,
    /// Object size (`size` metric), identical in every run
    Objsize,
}

impl Collect {
    /// Metric key read from the result files
    pub fn metric(self) -> &'static str {
        match self {
            Collect::Exectime => "exec_time",
            Collect::Objsize => "size",
        }
    }
}

/// Configuration for `suitediff compare`
///
/// # Example
/// ```
/// use suitediff::compare::{Collect, CompareConfig};
///
/// let config = CompareConfig::from_json_str(r#"{"collect": "exectime", "minimum-runtime-sec": 0.5}"#).unwrap();
/// assert_eq!(config.collect, Collect::Exectime);
/// assert_eq!(config.tolerance, 1.0);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CompareConfig {
    pub collect: Collect,

    /// Tests whose fastest run is shorter than this are dropped
    ///
    /// Default: 0.0 (keep everything)
    #[serde(default)]
    pub minimum_runtime_sec: f64,

    /// Maximum relative spread of runs around the median
    ///
    /// A test is kept when `max(median - min, max - median) / median` is
    /// strictly below this value.
    ///
    /// Default: 1.0
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

fn default_tolerance() -> f64 {
    1.0
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            collect: Collect::Exectime,
            minimum_runtime_sec: 0.0,
            tolerance: default_tolerance(),
        }
    }
}

impl CompareConfig {
    /// Load a configuration file; `.toml` files are parsed as TOML, anything
    /// else as JSON
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let config = if path.extension().is_some_and(|ext| ext == "toml") {
            Self::from_toml_str(&content)?
        } else {
            Self::from_json_str(&content)?
        };

        config.validate().map_err(anyhow::Error::msg)?;
        Ok(config)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Failed to parse compare config JSON")
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse compare config TOML")
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.minimum_runtime_sec.is_finite() || self.minimum_runtime_sec < 0.0 {
            return Err(format!(
                "minimum-runtime-sec must be a non-negative number, got {}",
                self.minimum_runtime_sec
            ));
        }

        if self.tolerance.is_nan() || self.tolerance <= 0.0 {
            return Err(format!(
                "tolerance must be positive, got {}",
                self.tolerance
            ));
        }

        Ok(())
    }
}
