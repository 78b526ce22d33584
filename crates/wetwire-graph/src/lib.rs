//! Wetwire Dependency Graphs
//!
//! - [`NeedsGraph`]: job `needs` edges within one workflow
//! - [`topological_order`]: Kahn's algorithm with lexicographic tie-break
//! - [`CycleError`]: the exact node sets that block ordering
//! - [`GraphExport`], [`render_mermaid`], [`render_dot`]: visualization
//! - [`declaration_order`]: binding order from discovery edges

#![warn(unreachable_pub)]

mod declarations;
mod error;
mod export;
mod needs;
mod order;

pub use declarations::{declaration_dependencies, declaration_order};
pub use error::{CycleError, GraphError};
pub use export::{render_dot, render_mermaid, ExportEdge, ExportNode, GraphExport};
pub use needs::NeedsGraph;
pub use order::{cycles_among, topological_order, DependencyMap};
