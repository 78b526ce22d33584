//! Lint configuration (`wetwire.toml`)

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::debug;
use wetwire_model::Severity;

/// Config file name searched in the project root
pub const CONFIG_FILE: &str = "wetwire.toml";

/// Default bound on fix cycles
pub const DEFAULT_MAX_FIX_CYCLES: usize = 3;

/// Default operator budget for `if_` conditions
pub const DEFAULT_MAX_CONDITION_OPERATORS: usize = 3;

/// Rule engine settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LintConfig {
    /// Upper bound on fix cycles per file (at least 1)
    pub max_fix_cycles: usize,
    /// Rule ids that never run
    pub disabled_rules: BTreeSet<String>,
    /// Rule id to severity, replacing the rule's own severity
    pub severity_overrides: BTreeMap<String, Severity>,
    /// Operators allowed in one condition before it counts as complex
    pub max_condition_operators: usize,
    /// Source file extensions, without the dot
    pub extensions: Vec<String>,
}

impl Default for LintConfig {
    fn default() -> Self {
        Self {
            max_fix_cycles: DEFAULT_MAX_FIX_CYCLES,
            disabled_rules: BTreeSet::new(),
            severity_overrides: BTreeMap::new(),
            max_condition_operators: DEFAULT_MAX_CONDITION_OPERATORS,
            extensions: vec!["py".to_string()],
        }
    }
}

impl LintConfig {
    /// Parse TOML text
    ///
    /// # Errors
    /// [`ConfigError::Parse`] on malformed TOML or unknown keys,
    /// [`ConfigError::Invalid`] on out-of-range values.
    pub fn from_toml(path: &Path, text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.message().to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file
    ///
    /// # Errors
    /// [`ConfigError::Read`] if the file cannot be read, otherwise as
    /// [`LintConfig::from_toml`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(path, &text)
    }

    /// Load `wetwire.toml` from `root`, falling back to defaults when absent
    ///
    /// # Errors
    /// As [`LintConfig::load`] when the file exists.
    pub fn discover(root: &Path) -> Result<Self, ConfigError> {
        let dir = if root.is_file() {
            root.parent().unwrap_or(root)
        } else {
            root
        };
        let path = dir.join(CONFIG_FILE);
        if path.is_file() {
            debug!(path = %path.display(), "loading lint config");
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Check value ranges
    ///
    /// # Errors
    /// [`ConfigError::Invalid`] naming the first bad key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_fix_cycles == 0 {
            return Err(ConfigError::invalid("max_fix_cycles", "must be at least 1"));
        }
        if self.extensions.is_empty() {
            return Err(ConfigError::invalid("extensions", "must name at least one extension"));
        }
        Ok(())
    }

    /// With fix cycle bound
    #[inline]
    #[must_use]
    pub fn with_max_fix_cycles(mut self, cycles: usize) -> Self {
        self.max_fix_cycles = cycles;
        self
    }

    /// With a disabled rule
    #[inline]
    #[must_use]
    pub fn with_disabled_rule(mut self, rule_id: impl Into<String>) -> Self {
        self.disabled_rules.insert(rule_id.into());
        self
    }

    /// With a severity override
    #[inline]
    #[must_use]
    pub fn with_severity(mut self, rule_id: impl Into<String>, severity: Severity) -> Self {
        self.severity_overrides.insert(rule_id.into(), severity);
        self
    }

    /// With condition operator budget
    #[inline]
    #[must_use]
    pub fn with_max_condition_operators(mut self, operators: usize) -> Self {
        self.max_condition_operators = operators;
        self
    }

    /// Whether a rule runs
    #[inline]
    #[must_use]
    pub fn is_enabled(&self, rule_id: &str) -> bool {
        !self.disabled_rules.contains(rule_id)
    }

    /// Severity for a rule, honoring overrides
    #[inline]
    #[must_use]
    pub fn severity_for(&self, rule_id: &str, default: Severity) -> Severity {
        self.severity_overrides.get(rule_id).copied().unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn partial_file_keeps_defaults() {
        let config = LintConfig::from_toml(
            Path::new("wetwire.toml"),
            "disabled_rules = [\"WAG011\"]\n\n[severity_overrides]\nWAG050 = \"error\"\n",
        )
        .unwrap();
        assert_eq!(config.max_fix_cycles, DEFAULT_MAX_FIX_CYCLES);
        assert!(!config.is_enabled("WAG011"));
        assert_eq!(config.severity_for("WAG050", Severity::Warning), Severity::Error);
        assert_eq!(config.severity_for("WAG018", Severity::Warning), Severity::Warning);
    }

    #[test]
    fn zero_cycles_rejected() {
        let err = LintConfig::from_toml(Path::new("wetwire.toml"), "max_fix_cycles = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "max_fix_cycles", .. }));
    }

    #[test]
    fn unknown_keys_rejected() {
        let err = LintConfig::from_toml(Path::new("wetwire.toml"), "max_cycles = 2\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn missing_file_means_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(LintConfig::discover(dir.path()).unwrap(), LintConfig::default());
    }
}
