//! Lint errors
//!
//! Only conditions that make a whole run meaningless are errors here.
//! Findings are [`wetwire_model::Diagnostic`]s and per-file parse failures are
//! collected into the run summary.

use std::path::PathBuf;
use wetwire_discover::DiscoveryError;
use wetwire_model::Span;

/// Errors from configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config {path}: {source}")]
    Read {
        /// Config file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML or has unknown keys
    #[error("invalid config {path}: {message}")]
    Parse {
        /// Config file
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// A value is out of range
    #[error("invalid config value for {key}: {message}")]
    Invalid {
        /// Offending key
        key: &'static str,
        /// What is wrong with it
        message: String,
    },
}

impl ConfigError {
    /// Create invalid-value error
    pub fn invalid(key: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            message: message.into(),
        }
    }
}

/// Errors from the rule engine and fix pipeline
#[derive(Debug, thiserror::Error)]
pub enum LintError {
    /// Configuration problem
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Discovery problem that is not scoped to one file
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    /// Rewritten file could not be written back
    #[error("failed to write {path}: {source}")]
    Write {
        /// Target file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Two edits of one fix claim the same text
    #[error("overlapping edits at {first:?} and {second:?}")]
    OverlappingEdits {
        /// Earlier edit
        first: Span,
        /// Later edit
        second: Span,
    },

    /// Edit does not fall on valid positions of the source
    #[error("edit {span:?} is outside the {len}-byte source")]
    EditOutOfBounds {
        /// Offending span
        span: Span,
        /// Source length
        len: usize,
    },
}

impl LintError {
    /// Create write error
    pub fn write_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }
}

/// Result alias for lint operations
pub type Result<T> = std::result::Result<T, LintError>;
