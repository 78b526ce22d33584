//! Discovery errors
//!
//! Everything except [`DiscoveryError::RootNotFound`] and
//! [`DiscoveryError::ParserInit`] is scoped to one file and is collected into
//! the discovery report instead of aborting the run.

use std::path::{Path, PathBuf};

/// Errors raised while finding or parsing source modules
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// Root path does not exist
    #[error("root not found: {0}")]
    RootNotFound(PathBuf),

    /// Source file could not be read
    #[error("io error reading {path}: {source}")]
    Io {
        /// File being read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Source file is not valid Python
    #[error("syntax error in {path}:{line}:{column}: {message}")]
    Syntax {
        /// Offending file
        path: PathBuf,
        /// 1-based line of the first error
        line: u32,
        /// 0-based column of the first error
        column: u32,
        /// What went wrong
        message: String,
    },

    /// Grammar could not be loaded
    #[error("parser initialization failed: {0}")]
    ParserInit(String),
}

impl DiscoveryError {
    /// Create syntax error
    pub fn syntax_error(path: impl Into<PathBuf>, line: u32, column: u32, message: impl Into<String>) -> Self {
        Self::Syntax {
            path: path.into(),
            line,
            column,
            message: message.into(),
        }
    }

    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// File the error is scoped to, if any
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Io { path, .. } | Self::Syntax { path, .. } => Some(path),
            Self::RootNotFound(_) | Self::ParserInit(_) => None,
        }
    }

    /// Whether the error only affects one file
    #[inline]
    #[must_use]
    pub fn is_file_scoped(&self) -> bool {
        self.path().is_some()
    }
}

/// Result alias for discovery operations
pub type Result<T> = std::result::Result<T, DiscoveryError>;
