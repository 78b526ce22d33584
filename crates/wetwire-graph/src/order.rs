//! Deterministic topological ordering (Kahn's algorithm)
//!
//! Ready nodes are taken in lexicographic order, so the same graph always
//! yields the same order. When ordering stalls, the leftover nodes are split
//! into strongly connected components to name the actual cycles.

use crate::error::CycleError;
use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use std::collections::{BTreeMap, BTreeSet};

/// Node to the set of nodes it depends on
pub type DependencyMap = BTreeMap<String, BTreeSet<String>>;

/// Order nodes so every node comes after all of its dependencies.
///
/// Dependencies naming nodes absent from the map are ignored.
///
/// # Errors
/// Returns [`CycleError`] with the unresolved nodes and their cycles.
pub fn topological_order(deps: &DependencyMap) -> Result<Vec<String>, CycleError> {
    let mut pending: BTreeMap<&str, usize> = BTreeMap::new();
    let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (node, needs) in deps {
        let known: Vec<&str> = needs
            .iter()
            .map(String::as_str)
            .filter(|dep| deps.contains_key(*dep))
            .collect();
        pending.insert(node.as_str(), known.len());
        for dep in known {
            dependents.entry(dep).or_default().push(node.as_str());
        }
    }

    let mut ready: BTreeSet<&str> = pending
        .iter()
        .filter(|(_, count)| **count == 0)
        .map(|(node, _)| *node)
        .collect();
    let mut order = Vec::with_capacity(deps.len());

    while let Some(node) = ready.pop_first() {
        order.push(node.to_string());
        for dependent in dependents.get(node).into_iter().flatten() {
            if let Some(count) = pending.get_mut(dependent) {
                *count -= 1;
                if *count == 0 {
                    ready.insert(*dependent);
                }
            }
        }
    }

    if order.len() == deps.len() {
        return Ok(order);
    }

    let unresolved: BTreeSet<String> = pending
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .map(|(node, _)| node.to_string())
        .collect();
    let cycles = cycles_among(deps, &unresolved);
    Err(CycleError { unresolved, cycles })
}

/// Cycles (strongly connected components with an internal edge) among `nodes`
#[must_use]
pub fn cycles_among(deps: &DependencyMap, nodes: &BTreeSet<String>) -> Vec<Vec<String>> {
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
    for node in nodes {
        graph.add_node(node.as_str());
    }
    for node in nodes {
        for dep in deps.get(node).into_iter().flatten() {
            if nodes.contains(dep) {
                graph.add_edge(node.as_str(), dep.as_str(), ());
            }
        }
    }

    let mut cycles: Vec<Vec<String>> = tarjan_scc(&graph)
        .into_iter()
        .filter(|component| {
            component.len() > 1 || graph.contains_edge(component[0], component[0])
        })
        .map(|component| {
            let mut members: Vec<String> = component.into_iter().map(str::to_string).collect();
            members.sort();
            members
        })
        .collect();
    cycles.sort();
    cycles
}
