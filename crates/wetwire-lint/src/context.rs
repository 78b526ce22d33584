//! Lint context: everything rules share for one file
//!
//! The model, needs graphs and reference resolution are computed once per
//! pass and read by every rule. Names are resolved across the rest of the
//! project when neighbor modules are supplied; the model then keeps the
//! workflows and jobs that touch this file.

use crate::config::LintConfig;
use std::path::Path;
use std::sync::Arc;
use wetwire_discover::{
    materialize_scope, parse_module, DiscoveryError, ModuleModel, ParsedModule, Scope, DEFAULT_PACKAGE,
};
use wetwire_graph::NeedsGraph;
use wetwire_model::{Call, EntityKind, Job, SourceLocation, Value, Workflow};
use wetwire_resolve::{ReferenceResolver, Resolution};

/// Needs graph and resolution of one workflow
#[derive(Debug, Clone)]
pub struct WorkflowAnalysis {
    /// Job needs graph
    pub graph: NeedsGraph,
    /// Reference findings
    pub resolution: Resolution,
}

/// Constructor call found anywhere in the module
#[derive(Debug, Clone, Copy)]
pub struct ConstructorCall<'a> {
    /// The call value (span, position)
    pub value: &'a Value,
    /// The call itself
    pub call: &'a Call,
}

impl<'a> ConstructorCall<'a> {
    /// Keyword value matching any of `names`
    #[must_use]
    pub fn field(self, names: &[&str]) -> Option<&'a Value> {
        self.call.field_value(names)
    }
}

/// Workflows defined in or using a job from `file`, and `file`'s detached jobs
fn touching(model: ModuleModel, file: &Path) -> ModuleModel {
    let workflows = model
        .workflows
        .into_iter()
        .filter(|wf| {
            wf.location.file.as_path() == file
                || wf.jobs.values().any(|job| job.location.file.as_path() == file)
        })
        .collect();
    let detached_jobs = model
        .detached_jobs
        .into_iter()
        .filter(|job| job.location.file.as_path() == file)
        .collect();
    ModuleModel {
        workflows,
        detached_jobs,
    }
}

/// Shared state of one lint pass over one file
#[derive(Debug)]
pub struct LintContext<'a> {
    source: &'a str,
    config: &'a LintConfig,
    module: Arc<ParsedModule>,
    model: ModuleModel,
    analyses: Vec<WorkflowAnalysis>,
    detached: Vec<Resolution>,
}

impl<'a> LintContext<'a> {
    /// Build context from a parsed module and its text
    #[must_use]
    pub fn new(module: Arc<ParsedModule>, source: &'a str, config: &'a LintConfig) -> Self {
        Self::with_neighbors(module, &[], source, config)
    }

    /// Build context resolving names across `neighbors` too.
    ///
    /// A neighbor with the same path as `module` is ignored, so the modules of
    /// a whole project can be passed while one of them is being rewritten.
    #[must_use]
    pub fn with_neighbors(
        module: Arc<ParsedModule>,
        neighbors: &[Arc<ParsedModule>],
        source: &'a str,
        config: &'a LintConfig,
    ) -> Self {
        let others = neighbors
            .iter()
            .map(Arc::as_ref)
            .filter(|m| m.path != module.path);
        let scope = Scope::new(std::iter::once(module.as_ref()).chain(others));
        let model = touching(materialize_scope(&scope), &module.path);
        let resolver = ReferenceResolver::new();
        let analyses = model
            .workflows
            .iter()
            .map(|workflow| {
                let graph = NeedsGraph::from_workflow(workflow);
                let resolution = resolver.resolve_with_graph(workflow, &graph);
                WorkflowAnalysis { graph, resolution }
            })
            .collect();
        let detached = model
            .detached_jobs
            .iter()
            .map(|job| resolver.resolve_job(job))
            .collect();
        Self {
            source,
            config,
            module,
            model,
            analyses,
            detached,
        }
    }

    /// Parse `source` and build context
    ///
    /// # Errors
    /// [`DiscoveryError::Syntax`] if the source does not parse.
    pub fn parse(path: &Path, source: &'a str, config: &'a LintConfig) -> Result<Self, DiscoveryError> {
        let module = parse_module(path, source, DEFAULT_PACKAGE)?;
        Ok(Self::new(Arc::new(module), source, config))
    }

    /// File being linted
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.module.path
    }

    /// Source text
    #[inline]
    #[must_use]
    pub fn source(&self) -> &'a str {
        self.source
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &'a LintConfig {
        self.config
    }

    /// Parsed module
    #[inline]
    #[must_use]
    pub fn module(&self) -> &ParsedModule {
        &self.module
    }

    /// Materialized workflows and detached jobs
    #[inline]
    #[must_use]
    pub fn model(&self) -> &ModuleModel {
        &self.model
    }

    /// Workflows with their analyses
    pub fn workflows(&self) -> impl Iterator<Item = (&Workflow, &WorkflowAnalysis)> {
        self.model.workflows.iter().zip(&self.analyses)
    }

    /// Detached jobs with their job-local resolutions
    pub fn detached_jobs(&self) -> impl Iterator<Item = (&Job, &Resolution)> {
        self.model.detached_jobs.iter().zip(&self.detached)
    }

    /// Every resolution of this pass
    pub fn resolutions(&self) -> impl Iterator<Item = &Resolution> {
        self.analyses
            .iter()
            .map(|a| &a.resolution)
            .chain(self.detached.iter())
    }

    /// Location in this file
    #[must_use]
    pub fn location(&self, value: &Value) -> SourceLocation {
        SourceLocation::new(&self.module.path, value.position)
    }

    /// Whether a span belongs to this file's text
    #[must_use]
    pub fn in_file(&self, location: &SourceLocation) -> bool {
        location.file == self.module.path
    }

    /// Every constructor call of `kind` in the module, in source order.
    ///
    /// Each call is reported once, however many workflows use it.
    #[must_use]
    pub fn constructor_calls(&self, kind: EntityKind) -> Vec<ConstructorCall<'_>> {
        let mut out = Vec::new();
        for binding in &self.module.bindings {
            binding.value.walk(&mut |value| {
                if let Some(call) = value.as_call() {
                    if self.module.constructors.classify(&call.callee) == Some(kind) {
                        out.push(ConstructorCall { value, call });
                    }
                }
            });
        }
        out
    }

    /// Every string literal bound at module level, dict keys excluded
    #[must_use]
    pub fn strings(&self) -> Vec<&Value> {
        self.module
            .bindings
            .iter()
            .flat_map(|binding| binding.value.strings())
            .collect()
    }
}
