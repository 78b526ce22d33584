//! Individual reference checks
//!
//! Each check is independent and reads only the materialized model.

use crate::codes;
use crate::usage::{EnvScope, OrphanSecret, UnusedOutput};
use std::collections::{BTreeSet, HashMap};
use wetwire_graph::NeedsGraph;
use wetwire_model::expr::{job_outputs, mentions_env_var, needs_outputs, secrets, step_outputs, value_secrets};
use wetwire_model::{Diagnostic, Job, MapEntry, Severity, SourceLocation, Step, Value, Workflow};

/// `needs` entries must name a sibling job other than the job itself
#[must_use]
pub fn job_dependencies(workflow: &Workflow) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    for (id, job) in &workflow.jobs {
        for need in &job.needs {
            if need.job == *id {
                out.push(
                    Diagnostic::new(
                        codes::UNDEFINED_NEEDS,
                        Severity::Error,
                        format!("Job '{id}' lists itself in needs"),
                        &need.location,
                    )
                    .reference()
                    .with_suggestion(format!("Remove '{id}' from its own needs")),
                );
            } else if !workflow.jobs.contains_key(&need.job) {
                out.push(
                    Diagnostic::new(
                        codes::UNDEFINED_NEEDS,
                        Severity::Error,
                        format!("Job '{id}' needs undefined job '{}'", need.job),
                        &need.location,
                    )
                    .reference()
                    .with_suggestion(format!(
                        "Define job '{}' in workflow '{}' or remove it from needs",
                        need.job, workflow.id
                    )),
                );
            }
        }
    }
    out
}

/// Each cycle of the needs graph, reported once at its first job
#[must_use]
pub fn needs_cycles(workflow: &Workflow, graph: &NeedsGraph) -> Vec<Diagnostic> {
    graph
        .cycles()
        .into_iter()
        .filter_map(|cycle| {
            let first = cycle.first()?;
            let location = graph
                .location(first)
                .cloned()
                .unwrap_or_else(|| workflow.location.clone());
            Some(
                Diagnostic::new(
                    codes::CIRCULAR_NEEDS,
                    Severity::Error,
                    format!(
                        "Circular dependency detected among jobs {} in workflow '{}'",
                        cycle.join(", "),
                        workflow.id
                    ),
                    &location,
                )
                .reference()
                .with_suggestion("Break the cycle by removing one of the needs edges"),
            )
        })
        .collect()
}

/// Job keys repeated in the workflow's `jobs` mapping
#[must_use]
pub fn duplicate_jobs(workflow: &Workflow) -> Vec<Diagnostic> {
    workflow
        .duplicate_jobs
        .iter()
        .map(|dup| {
            Diagnostic::new(
                codes::DUPLICATE_JOB_ID,
                Severity::Error,
                format!("Duplicate job id '{}' in workflow '{}'", dup.id, workflow.id),
                &dup.location,
            )
            .reference()
        })
        .collect()
}

/// Non-empty step identifiers must be unique within a job
#[must_use]
pub fn step_ids(job: &Job) -> Vec<Diagnostic> {
    let mut first_seen: HashMap<&str, usize> = HashMap::new();
    let mut out = Vec::new();
    for step in &job.steps {
        let Some(id) = step.id.as_deref() else {
            continue;
        };
        match first_seen.get(id) {
            Some(first) => out.push(
                Diagnostic::new(
                    codes::DUPLICATE_STEP_ID,
                    Severity::Error,
                    format!(
                        "Duplicate step id '{id}' in job '{}' (first used by step #{})",
                        job.id,
                        first + 1
                    ),
                    &step.location,
                )
                .reference(),
            ),
            None => {
                first_seen.insert(id, step.index);
            }
        }
    }
    out
}

/// `steps.<id>.outputs.<name>` must name an earlier step of the same job.
///
/// Job `outputs` are read after every step has run and only need the step
/// to exist.
#[must_use]
pub fn step_output_references(job: &Job) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    for step in &job.steps {
        for value in step.strings() {
            for (target, _) in value.as_str().map(step_outputs).unwrap_or_default() {
                let message = match job.step_index(&target) {
                    None => format!(
                        "Reference to undefined step id '{target}' in step {} of job '{}'",
                        step.label(),
                        job.id
                    ),
                    Some(index) if index >= step.index => format!(
                        "Forward reference to step '{target}' in step {} of job '{}'",
                        step.label(),
                        job.id
                    ),
                    Some(_) => continue,
                };
                out.push(step_reference(message, &target, &step_value_location(step, value)));
            }
        }
    }
    for entry in &job.outputs {
        for value in entry.value.strings() {
            for (target, _) in value.as_str().map(step_outputs).unwrap_or_default() {
                if job.step_index(&target).is_none() {
                    let message = format!(
                        "Reference to undefined step id '{target}' in outputs of job '{}'",
                        job.id
                    );
                    let location = SourceLocation::new(&job.location.file, value.position);
                    out.push(step_reference(message, &target, &location));
                }
            }
        }
    }
    out
}

fn step_value_location(step: &Step, value: &Value) -> SourceLocation {
    step.location.at(value.position)
}

fn step_reference(message: String, target: &str, location: &SourceLocation) -> Diagnostic {
    Diagnostic::new(codes::STEP_OUTPUT_REFERENCE, Severity::Error, message, location)
        .reference()
        .with_suggestion(format!(
            "Ensure a step with id='{target}' is defined before this reference"
        ))
}

/// Every string literal a job carries, including steps bound elsewhere
fn job_strings(job: &Job) -> impl Iterator<Item = &str> {
    job.fields
        .iter()
        .flat_map(|field| field.value.strings())
        .chain(job.steps.iter().flat_map(Step::strings))
        .filter_map(Value::as_str)
}

/// Outputs not read through `needs.<job>.outputs.<name>` by any job, nor
/// through `jobs.<job>.outputs.<name>` in the triggers
#[must_use]
pub fn unused_outputs(workflow: &Workflow) -> Vec<UnusedOutput> {
    let mut consumed: BTreeSet<(String, String)> = workflow
        .jobs
        .values()
        .flat_map(job_strings)
        .flat_map(needs_outputs)
        .collect();
    if let Some(triggers) = &workflow.triggers {
        consumed.extend(
            triggers
                .strings()
                .into_iter()
                .filter_map(Value::as_str)
                .flat_map(job_outputs),
        );
    }

    let mut out = Vec::new();
    for (id, job) in &workflow.jobs {
        for entry in &job.outputs {
            let Some(name) = entry.key_str() else {
                continue;
            };
            if !consumed.contains(&(id.clone(), name.to_string())) {
                out.push(UnusedOutput {
                    job: id.clone(),
                    output: name.to_string(),
                    location: SourceLocation::new(&job.location.file, entry.key.position),
                    span: entry.span,
                });
            }
        }
    }
    out
}

/// Diagnostic for an unused output
#[must_use]
pub fn unused_output_diagnostic(unused: &UnusedOutput) -> Diagnostic {
    Diagnostic::new(
        codes::UNUSED_OUTPUT,
        Severity::Warning,
        format!(
            "Job output '{}' in job '{}' is never referenced by any downstream job",
            unused.output, unused.job
        ),
        &unused.location,
    )
    .with_fixable(true)
    .with_suggestion(format!(
        "Remove unused output or reference it via needs.{}.outputs.{}",
        unused.job, unused.output
    ))
}

/// Secrets bound in the workflow `env` that no step of the workflow reads
#[must_use]
pub fn workflow_orphan_secrets(workflow: &Workflow) -> Vec<OrphanSecret> {
    let steps: Vec<&Step> = workflow.steps().map(|(_, step)| step).collect();
    // Job env values may forward a workflow variable (`env.TOKEN`).
    let job_env: Vec<&Value> = workflow
        .jobs
        .values()
        .flat_map(|job| job.env.iter().map(|e| &e.value))
        .collect();
    orphans(
        &workflow.env,
        &workflow.location,
        &EnvScope::Workflow,
        &steps,
        &job_env,
    )
}

/// Secrets bound in the job `env` that none of its steps read
#[must_use]
pub fn job_orphan_secrets(job: &Job) -> Vec<OrphanSecret> {
    let steps: Vec<&Step> = job.steps.iter().collect();
    orphans(&job.env, &job.location, &EnvScope::Job(job.id.clone()), &steps, &[])
}

fn orphans(
    env: &[MapEntry],
    owner: &SourceLocation,
    scope: &EnvScope,
    steps: &[&Step],
    extra: &[&Value],
) -> Vec<OrphanSecret> {
    let consumers: Vec<&Value> = steps
        .iter()
        .flat_map(|step| step.fields.iter().map(|field| &field.value))
        .chain(extra.iter().copied())
        .collect();
    let texts: Vec<&str> = consumers
        .iter()
        .flat_map(|value| value.strings())
        .filter_map(Value::as_str)
        .collect();
    let direct: BTreeSet<String> = consumers
        .iter()
        .flat_map(|value| value_secrets(value))
        .chain(texts.iter().flat_map(|text| secrets(text)))
        .collect();

    let mut out = Vec::new();
    for entry in env {
        let Some(var) = entry.key_str() else {
            continue;
        };
        let bound = value_secrets(&entry.value);
        let Some(secret) = bound.first() else {
            continue;
        };
        let via_env = texts.iter().any(|text| mentions_env_var(text, var));
        if via_env || bound.iter().any(|s| direct.contains(s)) {
            continue;
        }
        out.push(OrphanSecret {
            secret: secret.clone(),
            env_var: var.to_string(),
            scope: scope.clone(),
            location: owner.at(entry.key.position),
            span: entry.span,
        });
    }
    out
}

/// Diagnostic for an orphan secret
#[must_use]
pub fn orphan_secret_diagnostic(orphan: &OrphanSecret) -> Diagnostic {
    Diagnostic::new(
        codes::ORPHAN_SECRET,
        Severity::Warning,
        format!(
            "Secret '{}' is bound to env '{}' but not used in any step",
            orphan.secret, orphan.env_var
        ),
        &orphan.location,
    )
    .with_fixable(true)
    .with_suggestion("Remove the unused secret or use it in a step")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wetwire_model::{EntityId, NeedsRef, Position, Span, ValueKind};

    fn text(s: &str, line: u32) -> Value {
        Value::new(ValueKind::Str(s.to_string()), Span::default(), Position::new(line, 0))
    }

    fn step(index: usize, id: Option<&str>, run: &str) -> Step {
        let run = text(run, index as u32 + 1);
        Step {
            id: id.map(str::to_string),
            name: None,
            index,
            location: SourceLocation::new("ci.py", Position::new(index as u32 + 1, 0)),
            span: Span::default(),
            run: Some(run.clone()),
            uses: None,
            with: None,
            env: Vec::new(),
            condition: None,
            fields: vec![wetwire_model::Field {
                name: "run".into(),
                value: run,
                span: Span::default(),
            }],
        }
    }

    fn job(id: &str, steps: Vec<Step>) -> Job {
        Job {
            id: id.to_string(),
            binding: None,
            location: SourceLocation::new("ci.py", Position::new(1, 0)),
            span: Span::default(),
            needs: Vec::new(),
            steps,
            outputs: Vec::new(),
            env: Vec::new(),
            condition: None,
            runs_on: None,
            permissions: None,
            fields: Vec::new(),
        }
    }

    fn workflow(jobs: Vec<Job>) -> Workflow {
        Workflow {
            id: EntityId::new("ci"),
            name: None,
            location: SourceLocation::new("ci.py", Position::new(1, 0)),
            span: Span::default(),
            triggers: None,
            env: Vec::new(),
            jobs: jobs.into_iter().map(|j| (j.id.clone(), j)).collect(),
            duplicate_jobs: Vec::new(),
            fields: Vec::new(),
        }
    }

    fn need(job: &str) -> NeedsRef {
        NeedsRef {
            job: job.to_string(),
            location: SourceLocation::new("ci.py", Position::new(9, 4)),
        }
    }

    #[test]
    fn self_need_is_reported_once() {
        let mut a = job("a", Vec::new());
        a.needs.push(need("a"));
        let diags = job_dependencies(&workflow(vec![a]));
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message, "Job 'a' lists itself in needs");
    }

    #[test]
    fn duplicate_step_ids() {
        let j = job(
            "build",
            vec![step(0, Some("x"), "a"), step(1, Some("x"), "b"), step(2, None, "c")],
        );
        let diags = step_ids(&j);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].rule_id, codes::DUPLICATE_STEP_ID);
        assert_eq!(diags[0].line, 2);
    }

    #[test]
    fn self_step_reference_is_forward() {
        let j = job("build", vec![step(0, Some("s"), "echo ${{ steps.s.outputs.v }}")]);
        let diags = step_output_references(&j);
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.starts_with("Forward reference to step 's'"));
    }

    #[test]
    fn backward_step_reference_is_fine() {
        let j = job(
            "build",
            vec![
                step(0, Some("s"), "echo v=1"),
                step(1, None, "echo ${{ steps.s.outputs.v }}"),
            ],
        );
        assert!(step_output_references(&j).is_empty());
    }

    #[test]
    fn step_direct_secret_use_consumes_job_env_secret() {
        let mut j = job("deploy", vec![step(0, None, "deploy --token ${{ secrets.TOKEN }}")]);
        j.env.push(MapEntry {
            key: text("TOKEN", 3),
            value: text("${{ secrets.TOKEN }}", 3),
            span: Span::new(10, 40),
        });
        assert!(job_orphan_secrets(&j).is_empty());
    }
}
