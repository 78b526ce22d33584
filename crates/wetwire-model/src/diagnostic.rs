//! Diagnostics shared by the resolver and the rule engine

use crate::location::SourceLocation;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// How serious a finding is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Advisory; never fails a run
    Warning,
    /// Blocking; a run with remaining errors exits non-zero
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => f.write_str("warning"),
            Self::Error => f.write_str("error"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "warning" | "warn" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown severity '{other}'")),
        }
    }
}

/// Which part of the analysis produced a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Structural invariant violation (undefined reference, duplicate id, cycle)
    Reference,
    /// Style or security finding
    Rule,
}

/// A single finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Rule identifier, e.g. `WAG050`
    pub rule_id: String,
    /// Severity after configuration overrides
    pub severity: Severity,
    /// Human-readable message
    pub message: String,
    /// File the finding points into
    pub file: PathBuf,
    /// 1-based line
    pub line: u32,
    /// 0-based column
    pub column: u32,
    /// Whether an automatic fix exists for this finding
    pub fixable: bool,
    /// Reference error or rule violation
    pub origin: Origin,
    /// Suggested remedy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl Diagnostic {
    /// Create diagnostic at a location
    #[must_use]
    pub fn new(
        rule_id: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
        location: &SourceLocation,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            severity,
            message: message.into(),
            file: location.file.clone(),
            line: location.line,
            column: location.column,
            fixable: false,
            origin: Origin::Rule,
            suggestion: None,
        }
    }

    /// Mark as a reference error
    #[inline]
    #[must_use]
    pub fn reference(mut self) -> Self {
        self.origin = Origin::Reference;
        self
    }

    /// Mark as fixable or not
    #[inline]
    #[must_use]
    pub fn with_fixable(mut self, fixable: bool) -> Self {
        self.fixable = fixable;
        self
    }

    /// Attach a suggestion
    #[inline]
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Does this finding fail a run?
    #[inline]
    #[must_use]
    pub fn is_blocking(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Location the finding points at
    #[must_use]
    pub fn location(&self) -> SourceLocation {
        SourceLocation {
            file: self.file.clone(),
            line: self.line,
            column: self.column,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}: {} [{}] {}",
            self.file.display(),
            self.line,
            self.column,
            self.severity,
            self.rule_id,
            self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::Position;

    #[test]
    fn display_and_builder() {
        let loc = SourceLocation::new("ci.py", Position::new(3, 4));
        let diag = Diagnostic::new("WAG054", Severity::Error, "job 'deploy' needs undefined job 'missing'", &loc)
            .reference();
        assert!(diag.is_blocking());
        assert_eq!(diag.origin, Origin::Reference);
        assert_eq!(
            diag.to_string(),
            "ci.py:3:4: error [WAG054] job 'deploy' needs undefined job 'missing'"
        );
    }

    #[test]
    fn json_shape() {
        let loc = SourceLocation::new("ci.py", Position::new(1, 0));
        let diag = Diagnostic::new("WAG050", Severity::Warning, "unused", &loc).with_fixable(true);
        let json = serde_json::to_value(&diag).unwrap();
        assert_eq!(json["rule_id"], "WAG050");
        assert_eq!(json["severity"], "warning");
        assert_eq!(json["fixable"], true);
        assert!(json.get("suggestion").is_none());
    }

    #[test]
    fn severity_parses() {
        assert_eq!("ERROR".parse::<Severity>(), Ok(Severity::Error));
        assert_eq!("warn".parse::<Severity>(), Ok(Severity::Warning));
        assert!("fatal".parse::<Severity>().is_err());
    }
}
