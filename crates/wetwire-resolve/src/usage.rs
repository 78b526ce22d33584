//! Output and secret usage

use serde::Serialize;
use wetwire_model::{SourceLocation, Span};

/// Env mapping a secret was bound in
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "scope", content = "job", rename_all = "lowercase")]
pub enum EnvScope {
    /// Workflow-level `env`
    Workflow,
    /// `env` of the named job
    Job(String),
}

/// Job output nothing downstream reads
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnusedOutput {
    /// Declaring job
    pub job: String,
    /// Output name
    pub output: String,
    /// Location of the output key
    pub location: SourceLocation,
    /// Span of the `name: expression` entry
    pub span: Span,
}

/// Env entry binding a secret no step reads
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrphanSecret {
    /// Secret name
    pub secret: String,
    /// Env variable the secret is bound to
    pub env_var: String,
    /// Where the binding lives
    pub scope: EnvScope,
    /// Location of the env key
    pub location: SourceLocation,
    /// Span of the `VAR: value` entry
    pub span: Span,
}

/// Advisory usage findings, kept with spans so they can be removed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UsageIndex {
    /// Outputs nothing consumes
    pub unused_outputs: Vec<UnusedOutput>,
    /// Secrets nothing consumes
    pub orphan_secrets: Vec<OrphanSecret>,
}

impl UsageIndex {
    /// Whether nothing is unused
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.unused_outputs.is_empty() && self.orphan_secrets.is_empty()
    }

    /// Merge another index into this one
    pub fn extend(&mut self, other: UsageIndex) {
        self.unused_outputs.extend(other.unused_outputs);
        self.orphan_secrets.extend(other.orphan_secrets);
    }
}
