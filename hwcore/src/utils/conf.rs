//! Checker configuration, read from TOML.
//!
//! ```toml
//! spec_checks = true
//! assertion_checks = true
//! symbolic_verification = true
//!
//! [[exclusion]]
//! node = "neg"
//! reason = "two's complement minimum value has no positive counterpart"
//! ```
//!
//! Missing keys keep their default: every check enabled, nothing excluded.
use std::path::{Path, PathBuf};

use hwir::EvalOptions;
use serde::Deserialize;

use crate::utils::error::{HwError, HwResult};

/// Environment variable naming the configuration file used by [`CheckConfig::load`].
pub const ENV_CHECK_CONFIG_PATH: &str = "HWCORE_CHECK_CONFIG";

/// A node whose spec mismatches are tolerated, and why.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Exclusion {
    pub node: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CheckConfig {
    /// Numeric comparison of implementation and spec on every evaluation.
    pub spec_checks: bool,
    /// `check()` assertions.
    pub assertion_checks: bool,
    /// Symbolic equivalence proofs.
    pub symbolic_verification: bool,
    #[serde(rename = "exclusion")]
    pub exclusions: Vec<Exclusion>,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            spec_checks: true,
            assertion_checks: true,
            symbolic_verification: true,
            exclusions: Vec::new(),
        }
    }
}

impl CheckConfig {
    pub fn from_toml_str(source: &str) -> HwResult<Self> {
        toml::from_str(source).map_err(|e| HwError::ConfigParse {
            source: e,
            file: "<string>".to_string(),
        })
    }

    pub fn from_file(path: &Path) -> HwResult<Self> {
        let source = std::fs::read_to_string(path)?;
        toml::from_str(&source).map_err(|e| HwError::ConfigParse {
            source: e,
            file: path.display().to_string(),
        })
    }

    /// Configuration from the file named by [`ENV_CHECK_CONFIG_PATH`], or the default
    /// when the variable is not set.
    pub fn load() -> HwResult<Self> {
        match std::env::var_os(ENV_CHECK_CONFIG_PATH) {
            Some(path) => Self::from_file(&PathBuf::from(path)),
            None => Ok(Self::default()),
        }
    }

    /// Reason recorded for excluding `node`, if any.
    pub fn exclusion(&self, node: &str) -> Option<&str> {
        self.exclusions
            .iter()
            .find(|e| e.node == node)
            .map(|e| e.reason.as_str())
    }

    /// Options for an evaluation session.
    pub fn eval_options(&self) -> EvalOptions {
        EvalOptions {
            check_specs: self.spec_checks,
            check_assertions: self.assertion_checks,
            spec_exclusions: self
                .exclusions
                .iter()
                .map(|e| (e.node.clone(), e.reason.clone()))
                .collect(),
        }
    }
}
