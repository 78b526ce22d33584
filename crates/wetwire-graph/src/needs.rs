//! Job needs graph for one workflow
//!
//! An edge `A → B` means job `A` needs job `B`.

use crate::error::{CycleError, GraphError};
use crate::export::{ExportEdge, ExportNode, GraphExport};
use crate::order::{cycles_among, topological_order, DependencyMap};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;
use wetwire_model::{SourceLocation, Workflow};

/// Directed graph of job dependencies
#[derive(Debug, Clone, Default)]
pub struct NeedsGraph {
    workflow: String,
    graph: DiGraph<String, ()>,
    index: BTreeMap<String, NodeIndex>,
    locations: BTreeMap<String, SourceLocation>,
    self_loops: Vec<String>,
    dangling: Vec<(String, String)>,
}

impl NeedsGraph {
    /// Create empty graph for a workflow
    #[must_use]
    pub fn new(workflow: impl Into<String>) -> Self {
        Self {
            workflow: workflow.into(),
            ..Self::default()
        }
    }

    /// Build from a workflow's jobs.
    ///
    /// Self-references and edges to unknown jobs are not added; they are kept
    /// aside for diagnostics.
    #[must_use]
    pub fn from_workflow(workflow: &Workflow) -> Self {
        let mut graph = Self::new(workflow.id.as_str());
        for (id, job) in &workflow.jobs {
            graph.add_job(id, Some(job.location.clone()));
        }
        for (id, job) in &workflow.jobs {
            for need in &job.needs {
                match graph.add_edge(id, &need.job) {
                    Ok(()) => {}
                    Err(GraphError::SelfLoop(node)) => graph.self_loops.push(node),
                    Err(_) => graph.dangling.push((id.clone(), need.job.clone())),
                }
            }
        }
        debug!(
            workflow = %graph.workflow,
            jobs = graph.node_count(),
            edges = graph.edge_count(),
            "built needs graph"
        );
        graph
    }

    /// Add a job node (idempotent)
    pub fn add_job(&mut self, id: &str, location: Option<SourceLocation>) -> NodeIndex {
        if let Some(location) = location {
            self.locations.insert(id.to_string(), location);
        }
        if let Some(index) = self.index.get(id) {
            return *index;
        }
        let index = self.graph.add_node(id.to_string());
        self.index.insert(id.to_string(), index);
        index
    }

    /// Record that `from` needs `to`
    ///
    /// # Errors
    /// [`GraphError::SelfLoop`] if `from == to`, [`GraphError::UnknownNode`]
    /// if either job is missing.
    pub fn add_edge(&mut self, from: &str, to: &str) -> Result<(), GraphError> {
        if from == to {
            return Err(GraphError::SelfLoop(from.to_string()));
        }
        let source = *self
            .index
            .get(from)
            .ok_or_else(|| GraphError::UnknownNode(from.to_string()))?;
        let target = *self
            .index
            .get(to)
            .ok_or_else(|| GraphError::UnknownNode(to.to_string()))?;
        self.graph.update_edge(source, target, ());
        Ok(())
    }

    /// Owning workflow
    #[inline]
    #[must_use]
    pub fn workflow(&self) -> &str {
        &self.workflow
    }

    /// Whether the job is in the graph
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Job identifiers, sorted
    pub fn jobs(&self) -> impl Iterator<Item = &str> {
        self.index.keys().map(String::as_str)
    }

    /// Number of jobs
    #[inline]
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of needs edges
    #[inline]
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Jobs `id` needs, sorted
    #[must_use]
    pub fn dependencies(&self, id: &str) -> Vec<&str> {
        self.neighbors(id, Direction::Outgoing)
    }

    /// Jobs that need `id`, sorted
    #[must_use]
    pub fn dependents(&self, id: &str) -> Vec<&str> {
        self.neighbors(id, Direction::Incoming)
    }

    fn neighbors(&self, id: &str, direction: Direction) -> Vec<&str> {
        let Some(index) = self.index.get(id) else {
            return Vec::new();
        };
        let mut out: Vec<&str> = self
            .graph
            .neighbors_directed(*index, direction)
            .map(|n| self.graph[n].as_str())
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Jobs with no needs, sorted
    #[must_use]
    pub fn entry_jobs(&self) -> Vec<&str> {
        self.jobs()
            .filter(|id| self.dependencies(id).is_empty())
            .collect()
    }

    /// Jobs nothing needs, sorted
    #[must_use]
    pub fn exit_jobs(&self) -> Vec<&str> {
        self.jobs()
            .filter(|id| self.dependents(id).is_empty())
            .collect()
    }

    /// Job to the jobs it needs
    #[must_use]
    pub fn dependency_map(&self) -> DependencyMap {
        self.jobs()
            .map(|id| {
                let deps: BTreeSet<String> =
                    self.dependencies(id).into_iter().map(str::to_string).collect();
                (id.to_string(), deps)
            })
            .collect()
    }

    /// Jobs ordered so each comes after everything it needs
    ///
    /// # Errors
    /// Returns [`CycleError`] naming the unresolved jobs and their cycles.
    pub fn topological_order(&self) -> Result<Vec<String>, CycleError> {
        topological_order(&self.dependency_map())
    }

    /// Every cycle in the graph, each sorted
    #[must_use]
    pub fn cycles(&self) -> Vec<Vec<String>> {
        let deps = self.dependency_map();
        let all: BTreeSet<String> = deps.keys().cloned().collect();
        cycles_among(&deps, &all)
    }

    /// Jobs whose needs named themselves
    #[inline]
    #[must_use]
    pub fn self_loops(&self) -> &[String] {
        &self.self_loops
    }

    /// `(job, missing)` needs that named no job in the workflow
    #[inline]
    #[must_use]
    pub fn dangling(&self) -> &[(String, String)] {
        &self.dangling
    }

    /// Where a job was declared
    #[inline]
    #[must_use]
    pub fn location(&self, id: &str) -> Option<&SourceLocation> {
        self.locations.get(id)
    }

    /// Node and edge lists for visualization
    #[must_use]
    pub fn export(&self) -> GraphExport {
        let nodes = self
            .jobs()
            .map(|id| {
                let location = self.location(id);
                ExportNode {
                    id: id.to_string(),
                    file: location.map(|l| l.file.clone()),
                    line: location.map(|l| l.line),
                }
            })
            .collect();
        let edges = self
            .jobs()
            .flat_map(|from| {
                self.dependencies(from).into_iter().map(move |to| ExportEdge {
                    from: from.to_string(),
                    to: to.to_string(),
                })
            })
            .collect();
        GraphExport {
            workflow: self.workflow.clone(),
            nodes,
            edges,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn graph(edges: &[(&str, &str)], jobs: &[&str]) -> NeedsGraph {
        let mut g = NeedsGraph::new("ci");
        for job in jobs {
            g.add_job(job, None);
        }
        for (from, to) in edges {
            g.add_edge(from, to).unwrap();
        }
        g
    }

    #[test]
    fn rejects_self_loop_and_unknown_nodes() {
        let mut g = graph(&[], &["a"]);
        assert_eq!(g.add_edge("a", "a"), Err(GraphError::SelfLoop("a".into())));
        assert_eq!(g.add_edge("a", "b"), Err(GraphError::UnknownNode("b".into())));
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn duplicate_edges_collapse() {
        let mut g = graph(&[("b", "a")], &["a", "b"]);
        g.add_edge("b", "a").unwrap();
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn queries() {
        let g = graph(&[("b", "a"), ("c", "a"), ("d", "b"), ("d", "c")], &["d", "c", "b", "a"]);
        assert_eq!(g.dependencies("d"), vec!["b", "c"]);
        assert_eq!(g.dependents("a"), vec!["b", "c"]);
        assert_eq!(g.entry_jobs(), vec!["a"]);
        assert_eq!(g.exit_jobs(), vec!["d"]);
        assert_eq!(g.topological_order().unwrap(), vec!["a", "b", "c", "d"]);
        assert!(g.cycles().is_empty());
    }

    #[test]
    fn export_lists_needs_edges() {
        let g = graph(&[("deploy", "build")], &["build", "deploy"]);
        let export = g.export();
        assert_eq!(export.nodes.len(), 2);
        assert_eq!(
            export.edges,
            vec![ExportEdge { from: "deploy".into(), to: "build".into() }]
        );
    }
}
