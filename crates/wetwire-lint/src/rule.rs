//! Rule traits
//!
//! A rule either only detects, or detects and fixes. Fixes are planned as
//! span edits against the context's text; the pipeline decides whether to
//! apply them.

use crate::context::LintContext;
use crate::edit::{apply_edits, TextEdit};
use crate::error::Result;
use serde::Serialize;
use std::fmt;
use wetwire_model::{Diagnostic, Severity};

/// Per-rule lifecycle inside one fix run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleState {
    /// Not yet checked
    Idle,
    /// Running detection
    Checking,
    /// No findings
    Clean,
    /// Findings remain
    Violations,
    /// Applying a fix
    Fixing,
}

impl fmt::Display for RuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Checking => "checking",
            Self::Clean => "clean",
            Self::Violations => "violations",
            Self::Fixing => "fixing",
        };
        f.write_str(s)
    }
}

/// Detection rule
pub trait Rule: Send + Sync + fmt::Debug {
    /// Stable identifier, e.g. `WAG050`
    fn id(&self) -> &'static str;

    /// One-line description
    fn description(&self) -> &'static str;

    /// Severity before configuration overrides
    fn severity(&self) -> Severity;

    /// Findings for the file in `ctx`
    fn check(&self, ctx: &LintContext<'_>) -> Vec<Diagnostic>;

    /// Fix capability, for rules that have one
    fn as_fixable(&self) -> Option<&dyn FixableRule> {
        None
    }
}

/// Edits a fixable rule wants to make
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixPlan {
    /// Disjoint edits against the planned-on text
    pub edits: Vec<TextEdit>,
    /// Findings the edits resolve
    pub fixed: usize,
}

impl FixPlan {
    /// Whether there is nothing to do
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Add edits resolving one finding
    pub fn push(&mut self, edits: impl IntoIterator<Item = TextEdit>) {
        let before = self.edits.len();
        self.edits.extend(edits);
        if self.edits.len() > before {
            self.fixed += 1;
        }
    }

    /// Add an edit not counted as a fix (e.g. an import)
    pub fn support(&mut self, edit: TextEdit) {
        self.edits.push(edit);
    }
}

/// Outcome of running one rule's fix on its own
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixResult {
    /// Rewritten text
    pub source: String,
    /// Findings resolved
    pub fixed: usize,
    /// Findings this rule still reports on the rewritten text
    pub remaining: Vec<Diagnostic>,
}

/// Rule that can also rewrite the source
pub trait FixableRule: Rule {
    /// Plan edits for every fixable finding in `ctx`
    fn plan_fix(&self, ctx: &LintContext<'_>) -> FixPlan;

    /// Apply this rule's fix and re-check the result
    ///
    /// # Errors
    /// Edit errors from a malformed plan, or a syntax error if the rewrite
    /// no longer parses.
    fn fix(&self, ctx: &LintContext<'_>) -> Result<FixResult> {
        let plan = self.plan_fix(ctx);
        if plan.is_empty() {
            return Ok(FixResult {
                source: ctx.source().to_string(),
                fixed: 0,
                remaining: self.check(ctx),
            });
        }
        let source = apply_edits(ctx.source(), &plan.edits)?;
        let remaining = {
            let next = LintContext::parse(ctx.path(), &source, ctx.config())?;
            self.check(&next)
        };
        Ok(FixResult {
            source,
            fixed: plan.fixed,
            remaining,
        })
    }
}
