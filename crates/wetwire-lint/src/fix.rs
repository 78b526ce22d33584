//! Fix application pipeline
//!
//! Each cycle runs every fixable rule in id order against the current text.
//! A rule's edits are applied only if they stay clear of text an earlier rule
//! rewrote in the same cycle, the result still parses, and no other rule that
//! was clean starts reporting. Blocked fixes are retried next cycle. The loop
//! stops when a cycle changes nothing or the cycle bound is reached; a run
//! whose last cycle still rejected fixes is not reported as converged.

use crate::analyzer::{flatten, Analyzer, RuleFindings};
use crate::config::LintConfig;
use crate::edit::{apply_edits, remap_span, written_spans};
use crate::rule::RuleState;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};
use wetwire_discover::{DiscoveryError, ParsedModule};
use wetwire_model::{Diagnostic, Span};

/// Two rules wanted to edit the same text in one cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FixConflict {
    /// Rule whose fix was deferred
    pub rule: &'static str,
    /// Rule that already rewrote the text
    pub blocked_by: &'static str,
    /// Cycle the conflict happened in (1-based)
    pub cycle: usize,
    /// Rewritten text the deferred fix ran into
    pub span: Span,
}

/// Why a planned fix was thrown away
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum RejectReason {
    /// Edits could not be applied
    InvalidEdits(String),
    /// Rewritten text no longer parses
    Syntax(String),
    /// Rules that were clean report violations afterwards
    Regression(Vec<&'static str>),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEdits(message) => write!(f, "invalid edits: {message}"),
            Self::Syntax(message) => write!(f, "fix breaks the parse: {message}"),
            Self::Regression(rules) => write!(f, "fix introduces violations of {}", rules.join(", ")),
        }
    }
}

/// Fix that was planned but not applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedFix {
    /// Rule that planned it
    pub rule: &'static str,
    /// Cycle it was planned in (1-based)
    pub cycle: usize,
    /// What went wrong
    pub reason: RejectReason,
}

/// Result of running the pipeline over one source text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FixOutcome {
    /// Final text
    pub source: String,
    /// Whether the final text differs from the input
    pub changed: bool,
    /// Findings resolved across all cycles
    pub fixed: usize,
    /// Cycles run
    pub cycles: usize,
    /// Findings on the final text
    pub remaining: Vec<Diagnostic>,
    /// Fixes deferred because of overlapping edits
    pub conflicts: Vec<FixConflict>,
    /// Fixes thrown away
    pub rejected: Vec<RejectedFix>,
    /// Whether a cycle ended with nothing applied and nothing rejected.
    ///
    /// `false` when the bound cut the run short, or when fixes that are
    /// still wanted keep being rejected.
    pub converged: bool,
    /// Final state of every rule
    pub rule_states: BTreeMap<&'static str, RuleState>,
}

impl FixOutcome {
    /// Whether blocking findings remain
    #[must_use]
    pub fn has_blocking(&self) -> bool {
        self.remaining.iter().any(Diagnostic::is_blocking)
    }
}

/// Text rewritten by an accepted fix in the current cycle
#[derive(Debug, Clone, Copy)]
struct Touched {
    span: Span,
    rule: &'static str,
}

/// Bounded fix loop over one file
#[derive(Debug, Clone)]
pub struct FixPipeline {
    analyzer: Analyzer,
    max_cycles: usize,
}

impl FixPipeline {
    /// Pipeline with the built-in rules and the configured cycle bound
    #[must_use]
    pub fn new(config: LintConfig) -> Self {
        Self::from_analyzer(Analyzer::new(config))
    }

    /// Pipeline over an existing analyzer
    #[must_use]
    pub fn from_analyzer(analyzer: Analyzer) -> Self {
        let max_cycles = analyzer.config().max_fix_cycles.max(1);
        Self { analyzer, max_cycles }
    }

    /// Override the cycle bound (at least one cycle always runs)
    #[inline]
    #[must_use]
    pub fn with_max_cycles(mut self, cycles: usize) -> Self {
        self.max_cycles = cycles.max(1);
        self
    }

    /// Cycle bound
    #[inline]
    #[must_use]
    pub fn max_cycles(&self) -> usize {
        self.max_cycles
    }

    /// Analyzer used for detection
    #[inline]
    #[must_use]
    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    fn detect(
        &self,
        path: &Path,
        source: &str,
        neighbors: &[Arc<ParsedModule>],
    ) -> Result<RuleFindings, DiscoveryError> {
        let ctx = self.analyzer.context_with(path, source, neighbors)?;
        Ok(self.analyzer.check_by_rule(&ctx))
    }

    /// Run fix cycles over `source`
    ///
    /// # Errors
    /// [`DiscoveryError::Syntax`] if the input itself does not parse. Fixes
    /// that break the parse are rejected, never returned as errors.
    pub fn run(&self, path: &Path, source: &str) -> Result<FixOutcome, DiscoveryError> {
        self.run_with(path, source, &[])
    }

    /// Run fix cycles over `source`, resolving names across `neighbors`
    ///
    /// # Errors
    /// [`DiscoveryError::Syntax`] if the input itself does not parse.
    pub fn run_with(
        &self,
        path: &Path,
        source: &str,
        neighbors: &[Arc<ParsedModule>],
    ) -> Result<FixOutcome, DiscoveryError> {
        let mut text = source.to_string();
        let mut findings = self.detect(path, &text, neighbors)?;
        let mut states: BTreeMap<&'static str, RuleState> =
            findings.keys().map(|id| (*id, RuleState::Idle)).collect();
        let mut fixed = 0;
        let mut cycles = 0;
        let mut converged = false;
        let mut conflicts = Vec::new();
        let mut rejected = Vec::new();

        while cycles < self.max_cycles {
            cycles += 1;
            let mut touched: Vec<Touched> = Vec::new();
            let rejected_before = rejected.len();

            for rule in self.analyzer.registry().fixable() {
                let id = rule.id();
                states.insert(id, RuleState::Checking);
                let plan = {
                    let ctx = self.analyzer.context_with(path, &text, neighbors)?;
                    rule.plan_fix(&ctx)
                };
                if plan.is_empty() {
                    states.insert(id, state_of(&findings, id));
                    continue;
                }

                if let Some(blocker) = touched
                    .iter()
                    .find(|t| plan.edits.iter().any(|e| e.span.overlaps(&t.span)))
                {
                    warn!(
                        file = %path.display(),
                        cycle = cycles,
                        rule = id,
                        blocked_by = blocker.rule,
                        "fix conflict, deferring to next cycle"
                    );
                    conflicts.push(FixConflict {
                        rule: id,
                        blocked_by: blocker.rule,
                        cycle: cycles,
                        span: blocker.span,
                    });
                    states.insert(id, RuleState::Violations);
                    continue;
                }

                states.insert(id, RuleState::Fixing);
                let reject = |reason: RejectReason| {
                    warn!(file = %path.display(), cycle = cycles, rule = id, %reason, "fix rejected");
                    RejectedFix { rule: id, cycle: cycles, reason }
                };
                let candidate = match apply_edits(&text, &plan.edits) {
                    Ok(candidate) => candidate,
                    Err(err) => {
                        rejected.push(reject(RejectReason::InvalidEdits(err.to_string())));
                        states.insert(id, RuleState::Violations);
                        continue;
                    }
                };
                if candidate == text {
                    states.insert(id, state_of(&findings, id));
                    continue;
                }
                let after = match self.detect(path, &candidate, neighbors) {
                    Ok(after) => after,
                    Err(err) => {
                        rejected.push(reject(RejectReason::Syntax(err.to_string())));
                        states.insert(id, RuleState::Violations);
                        continue;
                    }
                };
                let regressed = regressions(&findings, &after, id);
                if !regressed.is_empty() {
                    rejected.push(reject(RejectReason::Regression(regressed)));
                    states.insert(id, RuleState::Violations);
                    continue;
                }

                for t in &mut touched {
                    t.span = remap_span(t.span, &plan.edits);
                }
                touched.extend(
                    written_spans(&plan.edits)
                        .into_iter()
                        .map(|span| Touched { span, rule: id }),
                );
                debug!(
                    file = %path.display(),
                    cycle = cycles,
                    rule = id,
                    fixed = plan.fixed,
                    edits = plan.edits.len(),
                    "fix applied"
                );
                fixed += plan.fixed;
                text = candidate;
                findings = after;
                states.insert(id, state_of(&findings, id));
            }

            if touched.is_empty() {
                // A rejected plan comes back unchanged next cycle.
                converged = rejected.len() == rejected_before;
                break;
            }
        }

        for (id, found) in &findings {
            states.insert(*id, state_of_findings(found));
        }
        let remaining = flatten(findings);
        let changed = text != source;
        info!(
            file = %path.display(),
            cycles,
            fixed,
            remaining = remaining.len(),
            conflicts = conflicts.len(),
            converged,
            "fix pipeline finished"
        );
        Ok(FixOutcome {
            source: text,
            changed,
            fixed,
            cycles,
            remaining,
            conflicts,
            rejected,
            converged,
            rule_states: states,
        })
    }
}

fn state_of_findings(found: &[Diagnostic]) -> RuleState {
    if found.is_empty() {
        RuleState::Clean
    } else {
        RuleState::Violations
    }
}

fn state_of(findings: &RuleFindings, id: &str) -> RuleState {
    findings
        .get(id)
        .map_or(RuleState::Clean, |found| state_of_findings(found))
}

/// Rules other than `fixing` that were clean before and are not after
fn regressions(before: &RuleFindings, after: &RuleFindings, fixing: &str) -> Vec<&'static str> {
    before
        .iter()
        .filter(|(id, found)| **id != fixing && found.is_empty())
        .filter(|(id, _)| after.get(**id).is_some_and(|found| !found.is_empty()))
        .map(|(id, _)| *id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::LintContext;
    use crate::edit::TextEdit;
    use crate::registry::RuleRegistry;
    use crate::rule::{FixPlan, FixableRule, Rule};
    use pretty_assertions::assert_eq;
    use wetwire_model::{Position, Severity, SourceLocation};

    /// Swaps a plain env value for a raw secret expression
    #[derive(Debug)]
    struct InlineSecret;

    impl InlineSecret {
        fn target(source: &str) -> Option<Span> {
            source.find("\"plain\"").map(|at| Span::new(at, at + 7))
        }
    }

    impl Rule for InlineSecret {
        fn id(&self) -> &'static str {
            "TEST001"
        }

        fn description(&self) -> &'static str {
            "inline secret"
        }

        fn severity(&self) -> Severity {
            Severity::Warning
        }

        fn check(&self, ctx: &LintContext<'_>) -> Vec<Diagnostic> {
            Self::target(ctx.source())
                .map(|_| {
                    let location = SourceLocation::new(ctx.path(), Position::new(1, 0));
                    Diagnostic::new(self.id(), self.severity(), "plain value", &location)
                })
                .into_iter()
                .collect()
        }

        fn as_fixable(&self) -> Option<&dyn FixableRule> {
            Some(self)
        }
    }

    impl FixableRule for InlineSecret {
        fn plan_fix(&self, ctx: &LintContext<'_>) -> FixPlan {
            let mut plan = FixPlan::default();
            if let Some(span) = Self::target(ctx.source()) {
                plan.push([TextEdit::replace(span, "\"${{ secrets.A }}\"")]);
            }
            plan
        }
    }

    const SOURCE: &str = r#"from wetwire_github.workflow import Job, Step, Workflow

build = Job(runs_on="ubuntu-latest", steps=[Step(run="make", env={"A": "plain"})])

ci = Workflow(name="CI", on={"push": {}}, jobs={"build": build})
"#;

    #[test]
    fn fix_reviving_a_clean_rule_is_rejected() {
        let mut registry = RuleRegistry::with_defaults();
        registry.register(InlineSecret);
        let analyzer = Analyzer::new(LintConfig::default()).with_registry(registry);
        let outcome = FixPipeline::from_analyzer(analyzer).run(Path::new("ci.py"), SOURCE).unwrap();

        assert!(!outcome.changed);
        assert_eq!(outcome.source, SOURCE);
        assert_eq!(outcome.rejected.len(), 1);
        assert_eq!(outcome.rejected[0].reason, RejectReason::Regression(vec!["WAG003"]));
        assert_eq!(outcome.rule_states["TEST001"], RuleState::Violations);
        assert_eq!(outcome.rule_states["WAG003"], RuleState::Clean);
        assert_eq!(outcome.cycles, 1);
        assert!(!outcome.converged);
    }

    #[test]
    fn clean_source_converges_in_one_cycle() {
        let outcome = FixPipeline::new(LintConfig::default())
            .run(Path::new("ci.py"), SOURCE)
            .unwrap();
        assert!(!outcome.changed);
        assert_eq!(outcome.fixed, 0);
        assert_eq!(outcome.cycles, 1);
        assert!(outcome.remaining.is_empty());
    }
}
