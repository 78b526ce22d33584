//! Project runner
//!
//! Lints, and optionally fixes, every source file under a root. Every module
//! is parsed up front so names resolve across files. Files are then processed
//! in parallel and merged in path order; rewritten files are written back
//! afterwards, one at a time, and only when their text changed.

use crate::analyzer::Analyzer;
use crate::config::LintConfig;
use crate::error::{LintError, Result};
use crate::fix::{FixConflict, FixPipeline, RejectedFix};
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use wetwire_discover::{DiscoveryError, ParsedModule};
use wetwire_model::Diagnostic;

/// File that could not be read or parsed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileError {
    /// Offending file
    pub path: PathBuf,
    /// 1-based line, 0 when not positional
    pub line: u32,
    /// 0-based column
    pub column: u32,
    /// What went wrong
    pub message: String,
}

impl FileError {
    fn from_discovery(path: &Path, err: &DiscoveryError) -> Self {
        match err {
            DiscoveryError::Syntax {
                path,
                line,
                column,
                message,
            } => Self {
                path: path.clone(),
                line: *line,
                column: *column,
                message: message.clone(),
            },
            other => Self {
                path: other.path().unwrap_or(path).to_path_buf(),
                line: 0,
                column: 0,
                message: other.to_string(),
            },
        }
    }
}

/// Lint result for one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
    /// Linted file
    pub path: PathBuf,
    /// Findings left after fixing (or all findings without `--fix`)
    pub diagnostics: Vec<Diagnostic>,
    /// Findings resolved by fixes
    pub fixed: usize,
    /// Fix cycles run
    pub cycles: usize,
    /// Whether the file was rewritten
    pub written: bool,
    /// Fixes deferred by overlapping edits
    pub conflicts: Vec<FixConflict>,
    /// Fixes thrown away
    pub rejected: Vec<RejectedFix>,
}

/// Outcome of a whole run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Reports of files that parsed, in path order
    pub files: Vec<FileReport>,
    /// Files that did not parse
    pub parse_errors: Vec<FileError>,
}

impl RunSummary {
    /// Every remaining finding
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.files.iter().flat_map(|f| f.diagnostics.iter())
    }

    /// Findings resolved across all files
    #[must_use]
    pub fn fixed(&self) -> usize {
        self.files.iter().map(|f| f.fixed).sum()
    }

    /// Files rewritten on disk
    #[must_use]
    pub fn written(&self) -> usize {
        self.files.iter().filter(|f| f.written).count()
    }

    /// Error-severity findings remaining
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.diagnostics().filter(|d| d.is_blocking()).count()
    }

    /// Warning-severity findings remaining
    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.diagnostics().filter(|d| !d.is_blocking()).count()
    }

    /// Whether blocking findings or parse errors remain
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.error_count() > 0 || !self.parse_errors.is_empty()
    }

    /// Process exit status: 1 when anything blocking remains
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        i32::from(self.has_failures())
    }
}

/// Per-file work before anything is written
enum Processed {
    Report { report: FileReport, rewrite: Option<String> },
    Failed(FileError),
}

/// Lints every file under a root
#[derive(Debug, Clone)]
pub struct ProjectRunner {
    pipeline: FixPipeline,
    fix: bool,
}

impl ProjectRunner {
    /// Detection-only runner
    #[must_use]
    pub fn new(config: LintConfig) -> Self {
        Self {
            pipeline: FixPipeline::new(config),
            fix: false,
        }
    }

    /// Runner over an existing pipeline
    #[must_use]
    pub fn from_pipeline(pipeline: FixPipeline) -> Self {
        Self { pipeline, fix: false }
    }

    /// Apply fixes and write changed files back
    #[inline]
    #[must_use]
    pub fn with_fix(mut self, fix: bool) -> Self {
        self.fix = fix;
        self
    }

    /// Detection analyzer
    #[inline]
    #[must_use]
    pub fn analyzer(&self) -> &Analyzer {
        self.pipeline.analyzer()
    }

    /// Lint (and fix) every source file under `root`
    ///
    /// # Errors
    /// [`LintError::Discovery`] if `root` does not exist, [`LintError::Write`]
    /// if a rewritten file cannot be written. Unreadable or unparsable files
    /// are collected into the summary.
    pub fn run(&self, root: &Path) -> Result<RunSummary> {
        let files = self.analyzer().engine().collect_files(root)?;
        info!(root = %root.display(), files = files.len(), fix = self.fix, "linting project");

        // Neighbors keep their on-disk text while each file is fixed.
        let engine = self.analyzer().engine();
        let modules: Vec<Arc<ParsedModule>> = files
            .par_iter()
            .filter_map(|path| engine.parse_file(path).ok())
            .collect();
        debug!(modules = modules.len(), "project scope parsed");

        let processed: Vec<Processed> = files
            .par_iter()
            .map(|path| self.process(path, &modules))
            .collect();

        let mut summary = RunSummary::default();
        for item in processed {
            match item {
                Processed::Report { mut report, rewrite } => {
                    if let Some(text) = rewrite {
                        fs::write(&report.path, text)
                            .map_err(|e| LintError::write_error(&report.path, e))?;
                        debug!(file = %report.path.display(), "wrote fixed file");
                        report.written = true;
                    }
                    summary.files.push(report);
                }
                Processed::Failed(err) => summary.parse_errors.push(err),
            }
        }

        info!(
            files = summary.files.len(),
            errors = summary.error_count(),
            warnings = summary.warning_count(),
            fixed = summary.fixed(),
            written = summary.written(),
            parse_errors = summary.parse_errors.len(),
            "lint complete"
        );
        Ok(summary)
    }

    fn process(&self, path: &Path, neighbors: &[Arc<ParsedModule>]) -> Processed {
        let source = match fs::read_to_string(path) {
            Ok(source) => source,
            Err(err) => {
                let err = DiscoveryError::io_error(path, err);
                warn!(error = %err, "skipping file");
                return Processed::Failed(FileError::from_discovery(path, &err));
            }
        };

        if !self.fix {
            return match self.analyzer().analyze_with(path, &source, neighbors) {
                Ok(diagnostics) => Processed::Report {
                    report: FileReport {
                        path: path.to_path_buf(),
                        diagnostics,
                        fixed: 0,
                        cycles: 0,
                        written: false,
                        conflicts: Vec::new(),
                        rejected: Vec::new(),
                    },
                    rewrite: None,
                },
                Err(err) => {
                    warn!(error = %err, "skipping file");
                    Processed::Failed(FileError::from_discovery(path, &err))
                }
            };
        }

        match self.pipeline.run_with(path, &source, neighbors) {
            Ok(outcome) => Processed::Report {
                rewrite: outcome.changed.then_some(outcome.source),
                report: FileReport {
                    path: path.to_path_buf(),
                    diagnostics: outcome.remaining,
                    fixed: outcome.fixed,
                    cycles: outcome.cycles,
                    written: false,
                    conflicts: outcome.conflicts,
                    rejected: outcome.rejected,
                },
            },
            Err(err) => {
                warn!(error = %err, "skipping file");
                Processed::Failed(FileError::from_discovery(path, &err))
            }
        }
    }
}
