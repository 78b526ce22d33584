//! Graph export for external visualization

use serde::Serialize;
use std::fmt::Write;
use std::path::PathBuf;

/// One workflow's needs graph as plain lists
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphExport {
    /// Workflow binding name
    pub workflow: String,
    /// Jobs, sorted
    pub nodes: Vec<ExportNode>,
    /// Needs edges: `from` needs `to`
    pub edges: Vec<ExportEdge>,
}

/// Exported job
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportNode {
    /// Job identifier
    pub id: String,
    /// Defining file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    /// Defining line
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

/// Exported needs edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportEdge {
    /// Job that needs
    pub from: String,
    /// Job that is needed
    pub to: String,
}

fn node_id(workflow: &str, job: &str) -> String {
    format!("{workflow}_{job}")
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Mermaid flowchart; edges run from a needed job to the job that needs it.
///
/// Workflows get their own subgraph when there is more than one.
#[must_use]
pub fn render_mermaid(graphs: &[GraphExport]) -> String {
    let mut out = String::from("graph TD\n");
    let grouped = graphs.len() > 1;
    for graph in graphs {
        let indent = if grouped { "        " } else { "    " };
        if grouped {
            let _ = writeln!(out, "    subgraph {}[{}]", node_id(&graph.workflow, ""), graph.workflow);
        }
        for node in &graph.nodes {
            let _ = writeln!(out, "{indent}{}[{}]", node_id(&graph.workflow, &node.id), node.id);
        }
        for edge in &graph.edges {
            let _ = writeln!(
                out,
                "{indent}{} --> {}",
                node_id(&graph.workflow, &edge.to),
                node_id(&graph.workflow, &edge.from)
            );
        }
        if grouped {
            out.push_str("    end\n");
        }
    }
    out
}

/// Graphviz DOT digraph; edges run from a needed job to the job that needs it
#[must_use]
pub fn render_dot(graphs: &[GraphExport]) -> String {
    let mut out = String::from("digraph G {\n    rankdir=TB;\n    node [shape=box];\n");
    let grouped = graphs.len() > 1;
    for graph in graphs {
        let indent = if grouped { "        " } else { "    " };
        if grouped {
            let _ = writeln!(out, "    subgraph cluster_{} {{", node_id(&graph.workflow, ""));
            let _ = writeln!(out, "        label=\"{}\";", graph.workflow);
        }
        for node in &graph.nodes {
            let _ = writeln!(
                out,
                "{indent}\"{}\" [label=\"{}\"];",
                node_id(&graph.workflow, &node.id),
                node.id
            );
        }
        for edge in &graph.edges {
            let _ = writeln!(
                out,
                "{indent}\"{}\" -> \"{}\";",
                node_id(&graph.workflow, &edge.to),
                node_id(&graph.workflow, &edge.from)
            );
        }
        if grouped {
            out.push_str("    }\n");
        }
    }
    out.push_str("}\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample(workflow: &str) -> GraphExport {
        GraphExport {
            workflow: workflow.to_string(),
            nodes: vec![
                ExportNode { id: "build".into(), file: None, line: None },
                ExportNode { id: "deploy-prod".into(), file: None, line: None },
            ],
            edges: vec![ExportEdge { from: "deploy-prod".into(), to: "build".into() }],
        }
    }

    #[test]
    fn mermaid_single_workflow() {
        assert_eq!(
            render_mermaid(&[sample("ci")]),
            "graph TD\n    ci_build[build]\n    ci_deploy_prod[deploy-prod]\n    ci_build --> ci_deploy_prod\n"
        );
    }

    #[test]
    fn mermaid_groups_multiple_workflows() {
        let rendered = render_mermaid(&[sample("ci"), sample("release")]);
        assert!(rendered.contains("    subgraph ci_[ci]\n"));
        assert!(rendered.contains("        release_build --> release_deploy_prod\n"));
        assert_eq!(rendered.matches("    end\n").count(), 2);
    }

    #[test]
    fn dot_single_workflow() {
        assert_eq!(
            render_dot(&[sample("ci")]),
            "digraph G {\n    rankdir=TB;\n    node [shape=box];\n    \"ci_build\" [label=\"build\"];\n    \"ci_deploy_prod\" [label=\"deploy-prod\"];\n    \"ci_build\" -> \"ci_deploy_prod\";\n}\n"
        );
    }
}
