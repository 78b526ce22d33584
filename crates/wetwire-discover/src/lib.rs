//! Wetwire Discovery Engine
//!
//! Finds `Workflow`, `Job` and `Step` declarations in Python modules by walking
//! their syntax tree. Source is never imported or executed.
//!
//! Pipeline: [`DiscoveryEngine::collect_files`] → parallel
//! [`syntax::parse_module`] → [`visitor::discover_entities`] →
//! [`materialize::materialize_scope`].

#![warn(unreachable_pub)]

pub mod cache;
mod engine;
mod error;
mod lower;
pub mod materialize;
pub mod syntax;
pub mod visitor;

pub use cache::{CacheStats, DiscoveryCache, SourceHash};
pub use engine::{DiscoveryEngine, DiscoveryOptions, DiscoveryReport, DEFAULT_PACKAGE};
pub use error::{DiscoveryError, Result};
pub use materialize::{materialize, materialize_scope, ModuleModel, Scope};
pub use syntax::{parse_module, Binding, ConstructorTable, Import, ParsedModule};
pub use visitor::discover_entities;
