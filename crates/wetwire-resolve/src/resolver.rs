//! Reference resolver
//!
//! Runs every check over one workflow (or one detached job) and collects the
//! findings into a [`Resolution`].

use crate::checks;
use crate::usage::UsageIndex;
use serde::Serialize;
use tracing::debug;
use wetwire_graph::NeedsGraph;
use wetwire_model::{Diagnostic, Job, Workflow};

/// Findings of one resolution pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Resolution {
    /// Reference errors and advisory usage findings, sorted by location
    pub diagnostics: Vec<Diagnostic>,
    /// Removable unused outputs and orphan secrets
    pub usage: UsageIndex,
}

impl Resolution {
    /// Findings with the given rule id
    pub fn with_rule<'a>(&'a self, rule_id: &'a str) -> impl Iterator<Item = &'a Diagnostic> + 'a {
        self.diagnostics.iter().filter(move |d| d.rule_id == rule_id)
    }

    /// Whether any finding is an error
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_blocking)
    }

    /// Merge another resolution into this one
    pub fn extend(&mut self, other: Resolution) {
        self.diagnostics.extend(other.diagnostics);
        self.usage.extend(other.usage);
        sort(&mut self.diagnostics);
    }
}

/// Runs the reference checks
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceResolver;

impl ReferenceResolver {
    /// Create resolver
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Resolve one workflow, building its needs graph
    #[must_use]
    pub fn resolve_workflow(&self, workflow: &Workflow) -> Resolution {
        let graph = NeedsGraph::from_workflow(workflow);
        self.resolve_with_graph(workflow, &graph)
    }

    /// Resolve one workflow against an already built needs graph
    #[must_use]
    pub fn resolve_with_graph(&self, workflow: &Workflow, graph: &NeedsGraph) -> Resolution {
        let mut diagnostics = checks::job_dependencies(workflow);
        diagnostics.extend(checks::needs_cycles(workflow, graph));
        diagnostics.extend(checks::duplicate_jobs(workflow));
        for job in workflow.jobs.values() {
            diagnostics.extend(checks::step_ids(job));
            diagnostics.extend(checks::step_output_references(job));
        }

        let mut usage = UsageIndex {
            unused_outputs: checks::unused_outputs(workflow),
            orphan_secrets: checks::workflow_orphan_secrets(workflow),
        };
        for job in workflow.jobs.values() {
            usage.orphan_secrets.extend(checks::job_orphan_secrets(job));
        }
        diagnostics.extend(usage.unused_outputs.iter().map(checks::unused_output_diagnostic));
        diagnostics.extend(usage.orphan_secrets.iter().map(checks::orphan_secret_diagnostic));
        sort(&mut diagnostics);

        debug!(
            workflow = %workflow.id,
            diagnostics = diagnostics.len(),
            unused_outputs = usage.unused_outputs.len(),
            orphan_secrets = usage.orphan_secrets.len(),
            "resolved workflow references"
        );
        Resolution { diagnostics, usage }
    }

    /// Job-local checks for a job no workflow uses
    #[must_use]
    pub fn resolve_job(&self, job: &Job) -> Resolution {
        let mut diagnostics = checks::step_ids(job);
        diagnostics.extend(checks::step_output_references(job));
        let usage = UsageIndex {
            unused_outputs: Vec::new(),
            orphan_secrets: checks::job_orphan_secrets(job),
        };
        diagnostics.extend(usage.orphan_secrets.iter().map(checks::orphan_secret_diagnostic));
        sort(&mut diagnostics);
        Resolution { diagnostics, usage }
    }
}

fn sort(diagnostics: &mut [Diagnostic]) {
    diagnostics.sort_by(|a, b| {
        (&a.file, a.line, a.column, &a.rule_id).cmp(&(&b.file, b.line, b.column, &b.rule_id))
    });
}
