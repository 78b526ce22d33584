//! Wetwire Resource Model
//!
//! Typed entities for declarative CI configuration, discovered from source
//! without executing it.
//!
//! # Core Concepts
//!
//! - [`Value`]: Lowered syntax value (scalar, list, mapping, name, call) with its source span
//! - [`Workflow`], [`Job`], [`Step`]: Materialized entities with source locations
//! - [`DiscoveredEntity`]: Flat `(identifier, kind, location, fields)` record for serializers
//! - [`Reference`]: Identifiers extracted from opaque expression strings
//! - [`Diagnostic`]: Finding emitted by the resolver and the rule engine
//!
//! # Example
//!
//! ```rust,ignore
//! use wetwire_model::expr::references;
//!
//! let refs = references("${{ needs.build.outputs.version }}");
//! assert_eq!(refs.len(), 1);
//! ```

#![warn(unreachable_pub)]

mod diagnostic;
mod entity;
pub mod expr;
mod location;
mod value;
mod workflow;

pub use diagnostic::{Diagnostic, Origin, Severity};
pub use entity::{DiscoveredEntity, EntityId, EntityKind};
pub use expr::Reference;
pub use location::{Position, SourceLocation, Span};
pub use value::{Call, Field, MapEntry, Value, ValueKind};
pub use workflow::{DuplicateJob, Job, NeedsRef, Step, Workflow};

/// Current version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
