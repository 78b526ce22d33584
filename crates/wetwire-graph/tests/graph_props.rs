use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use wetwire_discover::{materialize, parse_module, DEFAULT_PACKAGE};
use wetwire_graph::{render_mermaid, topological_order, DependencyMap, NeedsGraph};
use wetwire_test_utils::{CYCLE, DIAMOND, MISSING_NEEDS};

fn needs_graph(source: &str) -> NeedsGraph {
    let module = parse_module(Path::new("ci.py"), source, DEFAULT_PACKAGE).unwrap();
    let model = materialize(&module);
    NeedsGraph::from_workflow(&model.workflows[0])
}

fn dependency_map(node_count: usize, edges: &[(usize, usize)]) -> DependencyMap {
    let mut deps: DependencyMap = (0..node_count)
        .map(|i| (format!("n{i:02}"), BTreeSet::new()))
        .collect();
    for &(from, to) in edges {
        if from < node_count && to < node_count {
            deps.entry(format!("n{from:02}"))
                .or_default()
                .insert(format!("n{to:02}"));
        }
    }
    deps
}

proptest! {
    #[test]
    fn prop_acyclic_order_respects_every_edge(
        node_count in 1..20usize,
        edges in proptest::collection::vec((0..20usize, 0..20usize), 0..50)
    ) {
        // Only keep edges pointing at lower indices so the input is acyclic
        let forward: Vec<_> = edges.into_iter().filter(|(a, b)| a > b).collect();
        let deps = dependency_map(node_count, &forward);
        let order = topological_order(&deps).unwrap();

        prop_assert_eq!(order.len(), node_count);
        let position: BTreeMap<&str, usize> =
            order.iter().enumerate().map(|(i, n)| (n.as_str(), i)).collect();
        for (node, needs) in &deps {
            for need in needs {
                prop_assert!(position[need.as_str()] < position[node.as_str()]);
            }
        }
    }

    #[test]
    fn prop_order_is_deterministic(
        node_count in 1..15usize,
        edges in proptest::collection::vec((0..15usize, 0..15usize), 0..30)
    ) {
        let deps = dependency_map(node_count, &edges);
        prop_assert_eq!(topological_order(&deps), topological_order(&deps));
    }

    #[test]
    fn prop_cycle_error_covers_every_unordered_node(
        node_count in 2..12usize,
        edges in proptest::collection::vec((0..12usize, 0..12usize), 1..30)
    ) {
        let deps = dependency_map(node_count, &edges);
        if let Err(err) = topological_order(&deps) {
            prop_assert!(!err.unresolved.is_empty());
            for cycle in &err.cycles {
                for node in cycle {
                    prop_assert!(err.unresolved.contains(node));
                }
            }
        }
    }
}

#[test]
fn diamond_orders_lexicographically() {
    let graph = needs_graph(DIAMOND);
    assert_eq!(graph.topological_order().unwrap(), vec!["A", "B", "C", "D"]);
    assert_eq!(graph.entry_jobs(), vec!["A"]);
    assert_eq!(graph.exit_jobs(), vec!["D"]);
}

#[test]
fn two_job_cycle_reports_exactly_both_jobs() {
    let graph = needs_graph(CYCLE);
    let err = graph.topological_order().unwrap_err();
    assert_eq!(
        err.unresolved,
        ["A", "B"].iter().map(|s| (*s).to_string()).collect::<BTreeSet<_>>()
    );
    assert_eq!(err.cycles, vec![vec!["A".to_string(), "B".to_string()]]);
    assert_eq!(graph.cycles(), err.cycles);
}

#[test]
fn missing_needs_are_kept_aside() {
    let graph = needs_graph(MISSING_NEEDS);
    assert_eq!(graph.edge_count(), 0);
    assert_eq!(graph.dangling(), &[("deploy".to_string(), "missing".to_string())]);
    assert!(graph.self_loops().is_empty());
}

#[test]
fn export_carries_job_locations() {
    let graph = needs_graph(DIAMOND);
    let export = graph.export();
    let d = export.nodes.iter().find(|n| n.id == "D").unwrap();
    assert_eq!(d.line, Some(3));
    assert_eq!(export.edges.len(), 4);

    let json = serde_json::to_value(&export).unwrap();
    assert_eq!(json["workflow"], "ci");
    assert!(render_mermaid(&[export]).contains("ci_A --> ci_B"));
}
