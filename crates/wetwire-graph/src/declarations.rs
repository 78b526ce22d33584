//! Declaration ordering from discovery edges
//!
//! Bindings reference each other through constructor arguments
//! (`jobs={"build": build}`); an external serializer can use this order to
//! emit every binding after the bindings it mentions.

use crate::error::CycleError;
use crate::order::{topological_order, DependencyMap};
use std::collections::BTreeSet;
use wetwire_model::DiscoveredEntity;

/// Entity to the discovered entities its arguments reference
#[must_use]
pub fn declaration_dependencies(entities: &[DiscoveredEntity]) -> DependencyMap {
    let known: BTreeSet<&str> = entities.iter().map(|e| e.id.as_str()).collect();
    let mut map = DependencyMap::new();
    for entity in entities {
        let deps = map.entry(entity.id.to_string()).or_default();
        deps.extend(
            entity
                .dependencies
                .iter()
                .filter(|d| known.contains(d.as_str()))
                .cloned(),
        );
    }
    map
}

/// Entities in dependency-first order
///
/// # Errors
/// Returns [`CycleError`] when bindings reference each other circularly.
pub fn declaration_order(entities: &[DiscoveredEntity]) -> Result<Vec<String>, CycleError> {
    topological_order(&declaration_dependencies(entities))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wetwire_model::{EntityId, EntityKind, SourceLocation, Span};

    fn entity(id: &str, kind: EntityKind, deps: &[&str]) -> DiscoveredEntity {
        DiscoveredEntity {
            id: EntityId::new(id),
            kind,
            location: SourceLocation::default(),
            span: Span::default(),
            fields: Vec::new(),
            dependencies: deps.iter().map(|d| (*d).to_string()).collect(),
        }
    }

    #[test]
    fn orders_dependencies_first_and_ignores_unknown_names() {
        let entities = vec![
            entity("ci", EntityKind::Workflow, &["deploy", "build"]),
            entity("deploy", EntityKind::Job, &["build", "os"]),
            entity("build", EntityKind::Job, &["checkout"]),
            entity("checkout", EntityKind::Step, &[]),
        ];
        assert_eq!(
            declaration_order(&entities).unwrap(),
            vec!["checkout", "build", "deploy", "ci"]
        );
    }
}
