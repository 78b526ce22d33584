//! Materialized workflow entities
//!
//! Built from discovered bindings once per discovery pass and treated as
//! read-only afterwards. A rewrite of the source produces a fresh set.

use crate::entity::EntityId;
use crate::location::{Position, SourceLocation, Span};
use crate::value::{Field, MapEntry, Value, ValueKind};
use indexmap::IndexMap;

/// Top-level workflow
#[derive(Debug, Clone, PartialEq)]
pub struct Workflow {
    /// Binding name
    pub id: EntityId,
    /// Display name (`name=`)
    pub name: Option<String>,
    /// Location of the constructor call
    pub location: SourceLocation,
    /// Span of the constructor call
    pub span: Span,
    /// Trigger configuration (`on=`), passed through untouched
    pub triggers: Option<Value>,
    /// Workflow-level `env` entries
    pub env: Vec<MapEntry>,
    /// Jobs by identifier, in declaration order
    pub jobs: IndexMap<String, Job>,
    /// Job keys declared more than once; the first declaration is kept
    pub duplicate_jobs: Vec<DuplicateJob>,
    /// Raw constructor fields
    pub fields: Vec<Field>,
}

impl Workflow {
    /// Job by identifier
    #[inline]
    #[must_use]
    pub fn job(&self, id: &str) -> Option<&Job> {
        self.jobs.get(id)
    }

    /// Display name, falling back to the binding name
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(self.id.as_str())
    }

    /// Trigger event names with their positions.
    ///
    /// Reads dict keys, a bare event string, or a list of event strings.
    /// Typed trigger containers (`Triggers(push=...)`) yield their field names.
    #[must_use]
    pub fn events(&self) -> Vec<(String, Position)> {
        let Some(triggers) = &self.triggers else {
            return Vec::new();
        };
        match &triggers.kind {
            ValueKind::Str(event) => vec![(event.clone(), triggers.position)],
            ValueKind::List(items) => items
                .iter()
                .filter_map(|item| item.as_str().map(|e| (e.to_string(), item.position)))
                .collect(),
            ValueKind::Map(entries) => entries
                .iter()
                .filter_map(|entry| {
                    entry
                        .key_str()
                        .map(|e| (e.to_string(), entry.key.position))
                })
                .collect(),
            ValueKind::Call(call) => call
                .fields
                .iter()
                .map(|field| (field.name.clone(), field.value.position))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Whether this workflow can be called from other workflows
    #[must_use]
    pub fn is_reusable(&self) -> bool {
        self.events().iter().any(|(event, _)| event == "workflow_call")
    }

    /// Every `(job, step)` pair in job order
    pub fn steps(&self) -> impl Iterator<Item = (&Job, &Step)> {
        self.jobs
            .values()
            .flat_map(|job| job.steps.iter().map(move |step| (job, step)))
    }
}

/// Second declaration of an existing job key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateJob {
    /// Repeated key
    pub id: String,
    /// Where the repeat was declared
    pub location: SourceLocation,
}

/// One entry of a job's `needs`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeedsRef {
    /// Needed job identifier
    pub job: String,
    /// Where the entry was written
    pub location: SourceLocation,
}

/// Job owned by one workflow
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    /// Identifier within the workflow (the `jobs` key, or the binding name when detached)
    pub id: String,
    /// Top-level binding the job was declared through, if any
    pub binding: Option<String>,
    /// Location of the constructor call
    pub location: SourceLocation,
    /// Span of the constructor call
    pub span: Span,
    /// Needed jobs, in declaration order
    pub needs: Vec<NeedsRef>,
    /// Steps in execution order
    pub steps: Vec<Step>,
    /// `outputs` entries: output name to reference expression
    pub outputs: Vec<MapEntry>,
    /// Job-level `env` entries
    pub env: Vec<MapEntry>,
    /// `if_` condition
    pub condition: Option<Value>,
    /// `runs_on`
    pub runs_on: Option<Value>,
    /// `permissions`
    pub permissions: Option<Value>,
    /// Raw constructor fields
    pub fields: Vec<Field>,
}

impl Job {
    /// Position of the step with this identifier
    #[must_use]
    pub fn step_index(&self, id: &str) -> Option<usize> {
        self.steps
            .iter()
            .position(|step| step.id.as_deref() == Some(id))
    }

    /// Declared output names
    pub fn output_names(&self) -> impl Iterator<Item = &str> {
        self.outputs.iter().filter_map(MapEntry::key_str)
    }

    /// Whether the job needs `other`
    #[must_use]
    pub fn needs_job(&self, other: &str) -> bool {
        self.needs.iter().any(|n| n.job == other)
    }
}

/// Step owned by one job
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    /// Optional identifier; steps without one cannot be referenced
    pub id: Option<String>,
    /// Display name
    pub name: Option<String>,
    /// Zero-based position in the job
    pub index: usize,
    /// Location of the step expression
    pub location: SourceLocation,
    /// Span of the step expression
    pub span: Span,
    /// `run` command
    pub run: Option<Value>,
    /// `uses` action reference
    pub uses: Option<Value>,
    /// `with_` inputs
    pub with: Option<Value>,
    /// Step-level `env` entries
    pub env: Vec<MapEntry>,
    /// `if_` condition
    pub condition: Option<Value>,
    /// Raw fields (for steps built by helper calls, that call's keywords)
    pub fields: Vec<Field>,
}

impl Step {
    /// Every string literal in any field of this step
    #[must_use]
    pub fn strings(&self) -> Vec<&Value> {
        self.fields
            .iter()
            .flat_map(|field| field.value.strings())
            .collect()
    }

    /// `run` text when it is a string literal
    #[must_use]
    pub fn run_text(&self) -> Option<&str> {
        self.run.as_ref().and_then(Value::as_str)
    }

    /// `uses` text when it is a string literal
    #[must_use]
    pub fn uses_text(&self) -> Option<&str> {
        self.uses.as_ref().and_then(Value::as_str)
    }

    /// Label for messages: identifier, name, or position
    #[must_use]
    pub fn label(&self) -> String {
        match (&self.id, &self.name) {
            (Some(id), _) => id.clone(),
            (None, Some(name)) => format!("'{name}'"),
            (None, None) => format!("#{}", self.index + 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::tests::{s, val};

    fn workflow(triggers: Option<Value>) -> Workflow {
        Workflow {
            id: EntityId::new("ci"),
            name: None,
            location: SourceLocation::default(),
            span: Span::default(),
            triggers,
            env: Vec::new(),
            jobs: IndexMap::new(),
            duplicate_jobs: Vec::new(),
            fields: Vec::new(),
        }
    }

    #[test]
    fn events_from_dict_keys() {
        let on = val(ValueKind::Map(vec![
            MapEntry { key: s("push"), value: val(ValueKind::Null), span: Span::default() },
            MapEntry { key: s("workflow_call"), value: val(ValueKind::Null), span: Span::default() },
        ]));
        let wf = workflow(Some(on));
        let names: Vec<_> = wf.events().into_iter().map(|(e, _)| e).collect();
        assert_eq!(names, vec!["push", "workflow_call"]);
        assert!(wf.is_reusable());
    }

    #[test]
    fn events_from_single_string() {
        let wf = workflow(Some(s("push")));
        assert_eq!(wf.events().len(), 1);
        assert!(!wf.is_reusable());
        assert_eq!(wf.display_name(), "ci");
    }
}
