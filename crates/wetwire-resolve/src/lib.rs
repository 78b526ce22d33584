//! Wetwire Reference Resolution
//!
//! Structural checks over a materialized workflow:
//! - `needs` must name a sibling job, never the job itself, and stay acyclic
//! - step identifiers are unique within a job
//! - `steps.<id>.outputs.<name>` names an earlier step of the same job
//! - job identifiers are unique within a workflow
//!
//! plus advisory usage tracking of job outputs and env-bound secrets.

#![warn(unreachable_pub)]

pub mod checks;
pub mod codes;
mod resolver;
mod usage;

pub use resolver::{ReferenceResolver, Resolution};
pub use usage::{EnvScope, OrphanSecret, UnusedOutput, UsageIndex};
