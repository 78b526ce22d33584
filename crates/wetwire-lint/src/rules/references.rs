//! Reference rules
//!
//! Thin views over the reference resolution shared through the context.
//! Unused outputs and orphan secrets are fixed by removing their entries.

use crate::context::LintContext;
use crate::edit::{entry_removals, TextEdit};
use crate::rule::{FixPlan, FixableRule, Rule};
use std::collections::{BTreeSet, HashMap, HashSet};
use wetwire_model::{Diagnostic, MapEntry, Severity, SourceLocation, Span};
use wetwire_resolve::{codes, EnvScope};

/// Findings of one resolver check, deduplicated across workflows sharing a job
fn resolved(ctx: &LintContext<'_>, rule_id: &str) -> Vec<Diagnostic> {
    let mut out: Vec<Diagnostic> = ctx
        .resolutions()
        .flat_map(|r| r.with_rule(rule_id).cloned())
        .filter(|d| d.file == ctx.path())
        .collect();
    out.sort_by(|a, b| (a.line, a.column, &a.message).cmp(&(b.line, b.column, &b.message)));
    out.dedup();
    out
}

/// Structural reference check reported as-is
#[derive(Debug, Clone, Copy)]
pub struct ReferenceCheck {
    id: &'static str,
    description: &'static str,
}

impl ReferenceCheck {
    /// WAG051
    #[must_use]
    pub const fn circular_needs() -> Self {
        Self {
            id: codes::CIRCULAR_NEEDS,
            description: "Detect circular dependencies in job needs",
        }
    }

    /// WAG053
    #[must_use]
    pub const fn step_output_references() -> Self {
        Self {
            id: codes::STEP_OUTPUT_REFERENCE,
            description: "Validate step output references against earlier step ids",
        }
    }

    /// WAG054
    #[must_use]
    pub const fn undefined_needs() -> Self {
        Self {
            id: codes::UNDEFINED_NEEDS,
            description: "Detect needs naming undefined jobs or the job itself",
        }
    }

    /// WAG055
    #[must_use]
    pub const fn duplicate_step_ids() -> Self {
        Self {
            id: codes::DUPLICATE_STEP_ID,
            description: "Detect duplicate step ids within a job",
        }
    }

    /// WAG056
    #[must_use]
    pub const fn duplicate_job_ids() -> Self {
        Self {
            id: codes::DUPLICATE_JOB_ID,
            description: "Detect duplicate job ids within a workflow",
        }
    }
}

impl Rule for ReferenceCheck {
    fn id(&self) -> &'static str {
        self.id
    }

    fn description(&self) -> &'static str {
        self.description
    }

    fn severity(&self) -> Severity {
        Severity::Error
    }

    fn check(&self, ctx: &LintContext<'_>) -> Vec<Diagnostic> {
        resolved(ctx, self.id)
    }
}

/// Entries to drop from each mapping literal, keyed by the literal's entries.
///
/// An entry is only dropped when every analysis that sees its mapping found
/// it unused, so a job shared by several workflows keeps outputs any of them
/// reads.
#[derive(Default)]
struct Removals<'c> {
    owners: HashMap<Span, (&'c [MapEntry], usize)>,
    unused: HashMap<(Span, Span), (usize, (u32, u32))>,
}

impl<'c> Removals<'c> {
    fn see(&mut self, owner: Span, entries: &'c [MapEntry]) {
        self.owners.entry(owner).or_insert((entries, 0)).1 += 1;
    }

    fn unused(&mut self, owner: Span, entry: Span, location: &SourceLocation) {
        self.unused
            .entry((owner, entry))
            .or_insert((0, (location.line, location.column)))
            .0 += 1;
    }

    fn removable(&self, owner: Span, entry: Span) -> bool {
        let seen = self.owners.get(&owner).map(|(_, seen)| *seen);
        self.unused.get(&(owner, entry)).map(|(count, _)| *count) == seen
    }

    /// Positions of findings the plan would remove
    fn removable_at(&self) -> HashSet<(u32, u32)> {
        self.unused
            .iter()
            .filter(|((owner, entry), _)| self.removable(*owner, *entry))
            .map(|(_, (_, at))| *at)
            .collect()
    }

    fn plan(&self, source: &str) -> FixPlan {
        let mut plan = FixPlan::default();
        let mut owners: Vec<_> = self.owners.iter().collect();
        owners.sort_by_key(|(span, _)| **span);
        for (owner, (entries, _)) in owners {
            let remove: BTreeSet<usize> = entries
                .iter()
                .enumerate()
                .filter(|(_, e)| self.removable(*owner, e.span))
                .map(|(i, _)| i)
                .collect();
            if remove.is_empty() {
                continue;
            }
            let spans: Vec<Span> = entries.iter().map(|e| e.span).collect();
            let edits: Vec<TextEdit> = entry_removals(source, &spans, &remove);
            plan.edits.extend(edits);
            plan.fixed += remove.len();
        }
        plan
    }

    /// Resolver findings, fixable only where the plan removes them
    fn flag(&self, mut found: Vec<Diagnostic>) -> Vec<Diagnostic> {
        let at = self.removable_at();
        for diagnostic in &mut found {
            diagnostic.fixable = at.contains(&(diagnostic.line, diagnostic.column));
        }
        found
    }
}

/// WAG050: outputs no downstream job reads
#[derive(Debug, Default, Clone, Copy)]
pub struct UnusedOutputs;

impl UnusedOutputs {
    fn removals<'c>(ctx: &'c LintContext<'_>) -> Removals<'c> {
        let mut removals = Removals::default();
        for (workflow, analysis) in ctx.workflows() {
            for job in workflow.jobs.values() {
                if ctx.in_file(&job.location) {
                    removals.see(job.span, &job.outputs);
                }
            }
            for unused in &analysis.resolution.usage.unused_outputs {
                let Some(job) = workflow.job(&unused.job) else {
                    continue;
                };
                if ctx.in_file(&unused.location) {
                    removals.unused(job.span, unused.span, &unused.location);
                }
            }
        }
        removals
    }
}

impl Rule for UnusedOutputs {
    fn id(&self) -> &'static str {
        codes::UNUSED_OUTPUT
    }

    fn description(&self) -> &'static str {
        "Flag job outputs that are never referenced by downstream jobs"
    }

    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn check(&self, ctx: &LintContext<'_>) -> Vec<Diagnostic> {
        Self::removals(ctx).flag(resolved(ctx, self.id()))
    }

    fn as_fixable(&self) -> Option<&dyn FixableRule> {
        Some(self)
    }
}

impl FixableRule for UnusedOutputs {
    fn plan_fix(&self, ctx: &LintContext<'_>) -> FixPlan {
        Self::removals(ctx).plan(ctx.source())
    }
}

/// WAG052: env-bound secrets no step reads
#[derive(Debug, Default, Clone, Copy)]
pub struct OrphanSecrets;

impl OrphanSecrets {
    fn removals<'c>(ctx: &'c LintContext<'_>) -> Removals<'c> {
        let mut removals = Removals::default();
        for (workflow, analysis) in ctx.workflows() {
            if ctx.in_file(&workflow.location) {
                removals.see(workflow.span, &workflow.env);
            }
            for job in workflow.jobs.values() {
                if ctx.in_file(&job.location) {
                    removals.see(job.span, &job.env);
                }
            }
            for orphan in &analysis.resolution.usage.orphan_secrets {
                let owner = match &orphan.scope {
                    EnvScope::Workflow => Some(workflow.span),
                    EnvScope::Job(id) => workflow.job(id).map(|job| job.span),
                };
                if let Some(owner) = owner.filter(|_| ctx.in_file(&orphan.location)) {
                    removals.unused(owner, orphan.span, &orphan.location);
                }
            }
        }
        for (job, resolution) in ctx.detached_jobs() {
            removals.see(job.span, &job.env);
            for orphan in &resolution.usage.orphan_secrets {
                removals.unused(job.span, orphan.span, &orphan.location);
            }
        }
        removals
    }
}

impl Rule for OrphanSecrets {
    fn id(&self) -> &'static str {
        codes::ORPHAN_SECRET
    }

    fn description(&self) -> &'static str {
        "Flag secrets bound in workflow or job env that no step uses"
    }

    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn check(&self, ctx: &LintContext<'_>) -> Vec<Diagnostic> {
        Self::removals(ctx).flag(resolved(ctx, self.id()))
    }

    fn as_fixable(&self) -> Option<&dyn FixableRule> {
        Some(self)
    }
}

impl FixableRule for OrphanSecrets {
    fn plan_fix(&self, ctx: &LintContext<'_>) -> FixPlan {
        Self::removals(ctx).plan(ctx.source())
    }
}
