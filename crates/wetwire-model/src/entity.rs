//! Discovered entities
//!
//! The flat record handed to external serializers: one per top-level binding
//! that instantiates a known constructor.

use crate::location::{SourceLocation, Span};
use crate::value::Field;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of declarative entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// `Workflow(...)`
    Workflow,
    /// `Job(...)`
    Job,
    /// `Step(...)`
    Step,
}

impl EntityKind {
    /// All kinds
    pub const ALL: [EntityKind; 3] = [Self::Workflow, Self::Job, Self::Step];

    /// Constructor name in source
    #[inline]
    #[must_use]
    pub const fn constructor(self) -> &'static str {
        match self {
            Self::Workflow => "Workflow",
            Self::Job => "Job",
            Self::Step => "Step",
        }
    }

    /// Kind for a constructor name
    #[must_use]
    pub fn from_constructor(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.constructor() == name)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.constructor())
    }
}

/// Stable entity identifier: the declaration name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Create identifier
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// As string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// A top-level constructor binding found by discovery
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscoveredEntity {
    /// Binding name
    pub id: EntityId,
    /// Constructor kind
    pub kind: EntityKind,
    /// Where the binding starts
    pub location: SourceLocation,
    /// Span of the whole assignment
    pub span: Span,
    /// Constructor keyword arguments, in source order
    pub fields: Vec<Field>,
    /// Other top-level names referenced by the arguments
    pub dependencies: Vec<String>,
}

impl DiscoveredEntity {
    /// Field by name
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructor_names_round_trip() {
        for kind in EntityKind::ALL {
            assert_eq!(EntityKind::from_constructor(kind.constructor()), Some(kind));
        }
        assert_eq!(EntityKind::from_constructor("Matrix"), None);
    }
}
