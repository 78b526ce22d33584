//! Wetwire Lint
//!
//! Rule engine and fix pipeline over declarative workflow modules.
//!
//! - [`Rule`] / [`FixableRule`]: detection, and span-edit fixes
//! - [`RuleRegistry`]: built-in `WAGnnn` rules in id order
//! - [`Analyzer`]: runs the registry against one file
//! - [`FixPipeline`]: bounded fix cycles with conflict deferral and regression checks
//! - [`ProjectRunner`]: every file under a root, writing back only changed files
//!
//! # Example
//!
//! ```rust,ignore
//! use wetwire_lint::{LintConfig, ProjectRunner};
//!
//! let config = LintConfig::discover(root)?;
//! let summary = ProjectRunner::new(config).with_fix(true).run(root)?;
//! std::process::exit(summary.exit_code());
//! ```

#![warn(unreachable_pub)]

pub mod analyzer;
pub mod config;
pub mod context;
pub mod edit;
pub mod error;
pub mod fix;
pub mod registry;
pub mod rule;
pub mod rules;
pub mod runner;

pub use analyzer::{Analyzer, RuleFindings};
pub use config::{LintConfig, CONFIG_FILE, DEFAULT_MAX_FIX_CYCLES};
pub use context::{LintContext, WorkflowAnalysis};
pub use edit::{apply_edits, TextEdit};
pub use error::{ConfigError, LintError, Result};
pub use fix::{FixConflict, FixOutcome, FixPipeline, RejectReason, RejectedFix};
pub use registry::RuleRegistry;
pub use rule::{FixPlan, FixResult, FixableRule, Rule, RuleState};
pub use runner::{FileError, FileReport, ProjectRunner, RunSummary};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
