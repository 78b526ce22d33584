//! Graph errors

use std::collections::BTreeSet;
use std::fmt;

/// Nodes left over by topological ordering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleError {
    /// Every node that could not be ordered (cycle members and nodes downstream of them)
    pub unresolved: BTreeSet<String>,
    /// The cycles themselves, each sorted, in lexicographic order
    pub cycles: Vec<Vec<String>>,
}

impl fmt::Display for CycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .cycles
            .iter()
            .map(|cycle| format!("{{{}}}", cycle.join(", ")))
            .collect();
        write!(f, "dependency cycle among {}", rendered.join(" and "))
    }
}

impl std::error::Error for CycleError {}

/// Errors from graph construction and ordering
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// A node that depends on itself
    #[error("'{0}' depends on itself")]
    SelfLoop(String),

    /// Edge endpoint not in the graph
    #[error("unknown node '{0}'")]
    UnknownNode(String),

    /// Ordering failed
    #[error(transparent)]
    Cycle(#[from] CycleError),
}
