//! Rule identifiers for reference findings

/// Job output never consumed downstream
pub const UNUSED_OUTPUT: &str = "WAG050";
/// Cycle in the needs graph
pub const CIRCULAR_NEEDS: &str = "WAG051";
/// Secret bound in env but never read by a step
pub const ORPHAN_SECRET: &str = "WAG052";
/// Undefined or forward `steps.<id>.outputs.<name>` reference
pub const STEP_OUTPUT_REFERENCE: &str = "WAG053";
/// `needs` naming a missing job or the job itself
pub const UNDEFINED_NEEDS: &str = "WAG054";
/// Step identifier repeated within a job
pub const DUPLICATE_STEP_ID: &str = "WAG055";
/// Job identifier repeated within a workflow
pub const DUPLICATE_JOB_ID: &str = "WAG056";
