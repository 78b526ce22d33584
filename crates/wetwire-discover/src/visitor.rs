//! Entity discovery over parsed modules

use crate::syntax::ParsedModule;
use wetwire_model::{DiscoveredEntity, EntityId, SourceLocation};

/// Every top-level binding of `module` that directly calls a known constructor.
///
/// Each entity lists the other names its arguments reference; those become
/// declaration-order edges, separate from job `needs`.
#[must_use]
pub fn discover_entities(module: &ParsedModule) -> Vec<DiscoveredEntity> {
    module
        .bindings
        .iter()
        .filter_map(|binding| {
            let call = binding.value.as_call()?;
            let kind = module.constructors.classify(&call.callee)?;
            let dependencies = binding
                .value
                .names()
                .into_iter()
                .filter(|name| *name != binding.name)
                .map(str::to_string)
                .collect();
            Some(DiscoveredEntity {
                id: EntityId::new(binding.name.clone()),
                kind,
                location: SourceLocation::new(&module.path, binding.position),
                span: binding.span,
                fields: call.fields.clone(),
                dependencies,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse_module;
    use pretty_assertions::assert_eq;
    use std::path::Path;
    use wetwire_model::EntityKind;

    fn entities(source: &str) -> Vec<DiscoveredEntity> {
        let module = parse_module(Path::new("ci.py"), source, "wetwire_github").unwrap();
        discover_entities(&module)
    }

    #[test]
    fn discovers_constructor_bindings_with_dependencies() {
        let found = entities(
            r#"from wetwire_github.workflow import Workflow, Job, Step

checkout = Step(uses="actions/checkout@v4")
build = Job(runs_on="ubuntu-latest", steps=[checkout])
ci = Workflow(name="CI", on={"push": {}}, jobs={"build": build})
settings = {"a": 1}
"#,
        );
        let summary: Vec<_> = found
            .iter()
            .map(|e| (e.id.as_str(), e.kind, e.dependencies.clone()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("checkout", EntityKind::Step, vec![]),
                ("build", EntityKind::Job, vec!["checkout".to_string()]),
                ("ci", EntityKind::Workflow, vec!["build".to_string()]),
            ]
        );
        assert_eq!(found[1].location.line, 4);
        assert_eq!(found[1].location.column, 0);
    }

    #[test]
    fn recognizes_aliased_and_attribute_constructors() {
        let found = entities(
            "from wetwire_github.workflow import Workflow as WF\nimport wetwire_github.workflow as w\n\nci = WF(jobs={})\nbuild = w.Job()\n",
        );
        let kinds: Vec<_> = found.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EntityKind::Workflow, EntityKind::Job]);
    }

    #[test]
    fn indirect_constructions_are_skipped() {
        let found = entities("jobs = [Job() for _ in range(3)]\nfactory = make_job()\n");
        assert!(found.is_empty());
    }
}
