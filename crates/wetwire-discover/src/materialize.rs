//! Materialization of workflow entities from discovered bindings
//!
//! Names used as arguments (`jobs={"build": build_job}`, `steps=[checkout]`)
//! are resolved against module-level bindings, first in the module that uses
//! them and then across every module in the [`Scope`].

use crate::syntax::{Binding, ParsedModule};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::debug;
use wetwire_model::{
    Call, DuplicateJob, EntityId, EntityKind, Job, MapEntry, NeedsRef, SourceLocation, Step,
    Value, ValueKind, Workflow,
};

/// Workflows and jobs materialized from a set of modules
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModuleModel {
    /// Workflows in module and binding order
    pub workflows: Vec<Workflow>,
    /// `Job` bindings not used by any workflow in scope
    pub detached_jobs: Vec<Job>,
}

impl ModuleModel {
    /// Every job, attached or detached
    pub fn jobs(&self) -> impl Iterator<Item = &Job> {
        self.workflows
            .iter()
            .flat_map(|wf| wf.jobs.values())
            .chain(self.detached_jobs.iter())
    }
}

/// Modules whose bindings are visible to name resolution
#[derive(Debug, Clone, Default)]
pub struct Scope<'a> {
    modules: Vec<&'a ParsedModule>,
}

impl<'a> Scope<'a> {
    /// Create scope
    #[must_use]
    pub fn new(modules: impl IntoIterator<Item = &'a ParsedModule>) -> Self {
        Self {
            modules: modules.into_iter().collect(),
        }
    }

    /// Modules in scope
    #[must_use]
    pub fn modules(&self) -> &[&'a ParsedModule] {
        &self.modules
    }

    fn lookup(&self, name: &str, from: &'a ParsedModule) -> Option<(&'a ParsedModule, &'a Binding)> {
        if let Some(binding) = from.binding(name) {
            return Some((from, binding));
        }
        self.modules
            .iter()
            .copied()
            .filter(|m| m.path != from.path)
            .find_map(|m| m.binding(name).map(|b| (m, b)))
    }
}

/// Materialize one module on its own
#[must_use]
pub fn materialize(module: &ParsedModule) -> ModuleModel {
    let scope = Scope::new([module]);
    materialize_scope(&scope)
}

/// Materialize every module in `scope`, resolving names across modules
#[must_use]
pub fn materialize_scope(scope: &Scope<'_>) -> ModuleModel {
    let materializer = Materializer { scope };
    let mut consumed: HashSet<(PathBuf, String)> = HashSet::new();
    let mut workflows = Vec::new();

    for &module in scope.modules() {
        for binding in &module.bindings {
            let Some(call) = binding.value.as_call() else {
                continue;
            };
            if module.constructors.classify(&call.callee) == Some(EntityKind::Workflow) {
                workflows.push(materializer.workflow(module, binding, call, &mut consumed));
            }
        }
    }

    let mut detached_jobs = Vec::new();
    for &module in scope.modules() {
        for binding in &module.bindings {
            if module.binding_kind(binding) != Some(EntityKind::Job)
                || consumed.contains(&(module.path.clone(), binding.name.clone()))
            {
                continue;
            }
            if let Some(call) = binding.value.as_call() {
                let source = JobSource {
                    module,
                    call,
                    value: &binding.value,
                    binding: Some(binding.name.as_str()),
                };
                detached_jobs.push(materializer.job(&binding.name, &source, &HashMap::new()));
            }
        }
    }

    debug!(
        workflows = workflows.len(),
        detached_jobs = detached_jobs.len(),
        "materialized model"
    );
    ModuleModel {
        workflows,
        detached_jobs,
    }
}

struct JobSource<'a> {
    module: &'a ParsedModule,
    call: &'a Call,
    value: &'a Value,
    binding: Option<&'a str>,
}

struct Materializer<'s, 'a> {
    scope: &'s Scope<'a>,
}

impl<'s, 'a> Materializer<'s, 'a> {
    fn workflow(
        &self,
        module: &'a ParsedModule,
        binding: &'a Binding,
        call: &'a Call,
        consumed: &mut HashSet<(PathBuf, String)>,
    ) -> Workflow {
        let entries: &[MapEntry] = call
            .field_value(&["jobs"])
            .and_then(Value::as_map)
            .unwrap_or_default();

        // binding name -> job key, so `needs=[build_job]` maps back to "build"
        let key_by_binding: HashMap<String, String> = entries
            .iter()
            .filter_map(|e| Some((e.value.as_name()?.to_string(), e.key_str()?.to_string())))
            .collect();

        let mut jobs = IndexMap::new();
        let mut duplicate_jobs = Vec::new();
        for entry in entries {
            let Some(key) = entry.key_str() else {
                continue;
            };
            if jobs.contains_key(key) {
                duplicate_jobs.push(DuplicateJob {
                    id: key.to_string(),
                    location: SourceLocation::new(&module.path, entry.key.position),
                });
                continue;
            }
            let Some(source) = self.job_source(&entry.value, module) else {
                debug!(job = key, "job value is not a direct constructor; kept opaque");
                jobs.insert(key.to_string(), opaque_job(key, &module.path, &entry.value));
                continue;
            };
            if let Some(name) = source.binding {
                consumed.insert((source.module.path.clone(), name.to_string()));
            }
            jobs.insert(key.to_string(), self.job(key, &source, &key_by_binding));
        }

        Workflow {
            id: EntityId::new(binding.name.clone()),
            name: call
                .field_value(&["name"])
                .and_then(Value::as_str)
                .map(str::to_string),
            location: SourceLocation::new(&module.path, binding.value.position),
            span: binding.value.span,
            triggers: call.field_value(&["on", "on_"]).cloned(),
            env: map_entries(call.field_value(&["env"])),
            jobs,
            duplicate_jobs,
            fields: call.fields.clone(),
        }
    }

    fn job_source(&self, value: &'a Value, module: &'a ParsedModule) -> Option<JobSource<'a>> {
        match &value.kind {
            ValueKind::Call(call) if module.constructors.classify(&call.callee) == Some(EntityKind::Job) => {
                Some(JobSource {
                    module,
                    call,
                    value,
                    binding: None,
                })
            }
            ValueKind::Name(name) => {
                let (owner, binding) = self.scope.lookup(name, module)?;
                if owner.binding_kind(binding) != Some(EntityKind::Job) {
                    return None;
                }
                Some(JobSource {
                    module: owner,
                    call: binding.value.as_call()?,
                    value: &binding.value,
                    binding: Some(binding.name.as_str()),
                })
            }
            _ => None,
        }
    }

    fn job(&self, id: &str, source: &JobSource<'a>, key_by_binding: &HashMap<String, String>) -> Job {
        let call = source.call;
        let file = &source.module.path;

        let needs = call
            .field_value(&["needs"])
            .map(|value| needs_refs(value, file, key_by_binding))
            .unwrap_or_default();

        let steps = call
            .field_value(&["steps"])
            .and_then(Value::as_list)
            .unwrap_or_default()
            .iter()
            .enumerate()
            .map(|(index, item)| self.step(index, item, source.module))
            .collect();

        Job {
            id: id.to_string(),
            binding: source.binding.map(str::to_string),
            location: SourceLocation::new(file, source.value.position),
            span: source.value.span,
            needs,
            steps,
            outputs: map_entries(call.field_value(&["outputs"])),
            env: map_entries(call.field_value(&["env"])),
            condition: call.field_value(&["if_", "if"]).cloned(),
            runs_on: call.field_value(&["runs_on"]).cloned(),
            permissions: call.field_value(&["permissions"]).cloned(),
            fields: call.fields.clone(),
        }
    }

    fn step(&self, index: usize, item: &'a Value, module: &'a ParsedModule) -> Step {
        let (owner, value) = match &item.kind {
            ValueKind::Name(name) => match self.scope.lookup(name, module) {
                Some((owner, binding)) if binding.value.as_call().is_some() => (owner, &binding.value),
                _ => (module, item),
            },
            _ => (module, item),
        };
        let location = SourceLocation::new(&owner.path, value.position);

        // Helper calls (action wrappers) still occupy a step position.
        let Some(call) = value.as_call() else {
            return Step {
                id: None,
                name: None,
                index,
                location,
                span: value.span,
                run: None,
                uses: None,
                with: None,
                env: Vec::new(),
                condition: None,
                fields: Vec::new(),
            };
        };
        let text = |names: &[&str]| {
            call.field_value(names)
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        Step {
            id: text(&["id"]).filter(|id| !id.is_empty()),
            name: text(&["name"]),
            index,
            location,
            span: value.span,
            run: call.field_value(&["run"]).cloned(),
            uses: call.field_value(&["uses"]).cloned(),
            with: call.field_value(&["with_", "with"]).cloned(),
            env: map_entries(call.field_value(&["env"])),
            condition: call.field_value(&["if_", "if"]).cloned(),
            fields: call.fields.clone(),
        }
    }
}

/// Job known only by its key: the value is a helper call or an unresolved name
fn opaque_job(id: &str, file: &Path, value: &Value) -> Job {
    Job {
        id: id.to_string(),
        binding: None,
        location: SourceLocation::new(file, value.position),
        span: value.span,
        needs: Vec::new(),
        steps: Vec::new(),
        outputs: Vec::new(),
        env: Vec::new(),
        condition: None,
        runs_on: None,
        permissions: None,
        fields: Vec::new(),
    }
}

fn map_entries(value: Option<&Value>) -> Vec<MapEntry> {
    value.and_then(Value::as_map).map(<[MapEntry]>::to_vec).unwrap_or_default()
}

fn needs_refs(value: &Value, file: &Path, key_by_binding: &HashMap<String, String>) -> Vec<NeedsRef> {
    let one = |item: &Value| -> Option<NeedsRef> {
        let job = match &item.kind {
            ValueKind::Str(name) => name.clone(),
            ValueKind::Name(name) => key_by_binding.get(name).cloned().unwrap_or_else(|| name.clone()),
            _ => return None,
        };
        Some(NeedsRef {
            job,
            location: SourceLocation::new(file, item.position),
        })
    };
    match value.as_list() {
        Some(items) => items.iter().filter_map(one).collect(),
        None => one(value).into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse_module;
    use pretty_assertions::assert_eq;

    fn module(path: &str, source: &str) -> ParsedModule {
        parse_module(Path::new(path), source, "wetwire_github").unwrap()
    }

    #[test]
    fn materializes_jobs_needs_and_steps() {
        let m = module(
            "ci.py",
            r#"
from wetwire_github.workflow import Workflow, Job, Step

checkout = Step(uses="actions/checkout@v4")
build_job = Job(
    runs_on="ubuntu-latest",
    outputs={"version": "${{ steps.get_version.outputs.version }}"},
    steps=[checkout, Step(id="get_version", run="echo v=1 >> $GITHUB_OUTPUT"), setup_python()],
)
deploy_job = Job(runs_on="ubuntu-latest", needs=[build_job], steps=[Step(run="echo ${{ needs.build.outputs.version }}")])
ci = Workflow(name="CI", on={"push": {}}, jobs={"build": build_job, "deploy": deploy_job})
"#,
        );
        let model = materialize(&m);
        assert_eq!(model.workflows.len(), 1);
        assert!(model.detached_jobs.is_empty());

        let wf = &model.workflows[0];
        assert_eq!(wf.name.as_deref(), Some("CI"));
        assert_eq!(wf.jobs.keys().collect::<Vec<_>>(), vec!["build", "deploy"]);

        let build = wf.job("build").unwrap();
        assert_eq!(build.binding.as_deref(), Some("build_job"));
        assert_eq!(build.steps.len(), 3);
        assert_eq!(build.steps[0].uses_text(), Some("actions/checkout@v4"));
        assert_eq!(build.steps[1].id.as_deref(), Some("get_version"));
        assert_eq!(build.steps[2].index, 2);
        assert_eq!(build.output_names().collect::<Vec<_>>(), vec!["version"]);

        let deploy = wf.job("deploy").unwrap();
        assert_eq!(deploy.needs.iter().map(|n| n.job.as_str()).collect::<Vec<_>>(), vec!["build"]);
    }

    #[test]
    fn duplicate_job_keys_keep_first() {
        let m = module(
            "ci.py",
            "ci = Workflow(jobs={\"a\": Job(runs_on=\"x\"), \"a\": Job(runs_on=\"y\")})\n",
        );
        let wf = &materialize(&m).workflows[0];
        assert_eq!(wf.jobs.len(), 1);
        assert_eq!(wf.duplicate_jobs.len(), 1);
        assert_eq!(wf.duplicate_jobs[0].id, "a");
        let runs_on = wf.job("a").unwrap().runs_on.as_ref().and_then(Value::as_str);
        assert_eq!(runs_on, Some("x"));
    }

    #[test]
    fn unused_job_bindings_are_detached() {
        let m = module("jobs.py", "lint = Job(runs_on=\"ubuntu-latest\", needs=\"setup\")\n");
        let model = materialize(&m);
        assert!(model.workflows.is_empty());
        assert_eq!(model.detached_jobs.len(), 1);
        assert_eq!(model.detached_jobs[0].id, "lint");
        assert_eq!(model.detached_jobs[0].needs[0].job, "setup");
    }

    #[test]
    fn helper_built_jobs_stay_known_by_key() {
        let m = module(
            "ci.py",
            "ci = Workflow(jobs={\"build\": make_job(), \"deploy\": Job(needs=[\"build\"])})\n",
        );
        let wf = &materialize(&m).workflows[0];
        assert_eq!(wf.jobs.keys().collect::<Vec<_>>(), vec!["build", "deploy"]);
        let build = wf.job("build").unwrap();
        assert!(build.steps.is_empty());
        assert!(build.binding.is_none());
    }

    #[test]
    fn resolves_names_across_modules() {
        let jobs = module("jobs.py", "build = Job(runs_on=\"ubuntu-latest\")\n");
        let wf = module("ci.py", "from .jobs import build\nci = Workflow(jobs={\"build\": build})\n");
        let scope = Scope::new([&wf, &jobs]);
        let model = materialize_scope(&scope);
        let job = model.workflows[0].job("build").unwrap();
        assert_eq!(job.location.file, PathBuf::from("jobs.py"));
        assert!(model.detached_jobs.is_empty());
    }
}
