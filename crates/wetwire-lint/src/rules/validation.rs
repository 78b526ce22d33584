//! Workflow-level validation rules

use crate::context::LintContext;
use crate::rule::Rule;
use std::collections::HashMap;
use wetwire_model::{Diagnostic, Severity};

/// Webhook events a workflow may be triggered by
pub const VALID_EVENT_TYPES: &[&str] = &[
    "branch_protection_rule",
    "check_run",
    "check_suite",
    "create",
    "delete",
    "deployment",
    "deployment_status",
    "discussion",
    "discussion_comment",
    "fork",
    "gollum",
    "issue_comment",
    "issues",
    "label",
    "merge_group",
    "milestone",
    "page_build",
    "project",
    "project_card",
    "project_column",
    "public",
    "pull_request",
    "pull_request_comment",
    "pull_request_review",
    "pull_request_review_comment",
    "pull_request_target",
    "push",
    "registry_package",
    "release",
    "repository_dispatch",
    "schedule",
    "status",
    "watch",
    "workflow_call",
    "workflow_dispatch",
    "workflow_run",
];

/// WAG006: two workflows in one file share a display name
#[derive(Debug, Default, Clone, Copy)]
pub struct DuplicateWorkflowNames;

impl Rule for DuplicateWorkflowNames {
    fn id(&self) -> &'static str {
        "WAG006"
    }

    fn description(&self) -> &'static str {
        "Detect duplicate workflow names in the same file"
    }

    fn severity(&self) -> Severity {
        Severity::Error
    }

    fn check(&self, ctx: &LintContext<'_>) -> Vec<Diagnostic> {
        let mut first_line: HashMap<&str, u32> = HashMap::new();
        let mut out = Vec::new();
        for workflow in ctx.model().workflows.iter().filter(|wf| ctx.in_file(&wf.location)) {
            let Some(name) = workflow.name.as_deref() else {
                continue;
            };
            match first_line.get(name) {
                Some(line) => out.push(Diagnostic::new(
                    self.id(),
                    self.severity(),
                    format!("Duplicate workflow name '{name}' (first defined at line {line})"),
                    &workflow.location,
                )),
                None => {
                    first_line.insert(name, workflow.location.line);
                }
            }
        }
        out
    }
}

/// WAG009: trigger names must be known webhook events
#[derive(Debug, Default, Clone, Copy)]
pub struct EventTypes;

impl Rule for EventTypes {
    fn id(&self) -> &'static str {
        "WAG009"
    }

    fn description(&self) -> &'static str {
        "Validate webhook event types in triggers"
    }

    fn severity(&self) -> Severity {
        Severity::Error
    }

    fn check(&self, ctx: &LintContext<'_>) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        for workflow in ctx.model().workflows.iter().filter(|wf| ctx.in_file(&wf.location)) {
            for (event, position) in workflow.events() {
                if VALID_EVENT_TYPES.contains(&event.as_str()) {
                    continue;
                }
                out.push(
                    Diagnostic::new(
                        self.id(),
                        self.severity(),
                        format!("Unknown event type '{event}'"),
                        &workflow.location.at(position),
                    )
                    .with_suggestion(format!(
                        "Valid events: {}...",
                        VALID_EVENT_TYPES[..5].join(", ")
                    )),
                );
            }
        }
        out
    }
}
