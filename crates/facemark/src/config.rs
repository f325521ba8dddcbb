//! Labeler configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use facemark_classify::{RuleSet, RuleSetConfig};
use facemark_core::ConfigError;
use facemark_shell::EnumerateOptions;

/// Everything needed to label one kind of part, as stored in JSON.
///
/// ```json
/// {
///   "enumerate": { "shell_types": ["CLOSED_SHELL", "OPEN_SHELL"] },
///   "rules": { "name": "disc", "rules": [ ... ], "fallback": "face_{index}" }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelerConfig {
    #[serde(default)]
    pub enumerate: EnumerateOptions,
    pub rules: RuleSetConfig,
    /// Pretty-print the JSON report.
    #[serde(default)]
    pub pretty_report: bool,
}

impl LabelerConfig {
    pub fn new(rules: RuleSetConfig) -> Self {
        Self {
            enumerate: EnumerateOptions::default(),
            rules,
            pretty_report: false,
        }
    }

    /// Also label faces of open shells.
    pub fn with_open_shells(mut self) -> Self {
        self.enumerate = self.enumerate.with_open_shells();
        self
    }

    pub fn pretty(mut self) -> Self {
        self.pretty_report = true;
        self
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Build the rule set this configuration describes.
    pub fn rule_set(&self) -> Result<RuleSet, ConfigError> {
        RuleSet::try_from(self.rules.clone())
    }
}
