//! Built-in rules

pub mod expressions;
pub mod references;
pub mod security;
pub mod validation;

pub use expressions::{ComplexConditions, ConditionBuilders, SecretsContext};
pub use references::{OrphanSecrets, ReferenceCheck, UnusedOutputs};
pub use security::{
    HardcodedSecrets, SecretsInRun, UnpinnedActions, UnusedPermissions, UserInputInRun,
};
pub use validation::{DuplicateWorkflowNames, EventTypes};
