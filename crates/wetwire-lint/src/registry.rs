//! Rule registry
//!
//! Rules are trait objects kept in id order, which is also the order fixes
//! are tried in.

use crate::config::LintConfig;
use crate::rule::{FixableRule, Rule};
use crate::rules::{
    ComplexConditions, ConditionBuilders, DuplicateWorkflowNames, EventTypes, HardcodedSecrets,
    OrphanSecrets, ReferenceCheck, SecretsContext, SecretsInRun, UnpinnedActions, UnusedOutputs,
    UnusedPermissions, UserInputInRun,
};
use std::sync::Arc;
use tracing::warn;

/// Registered rules, sorted by id
#[derive(Debug, Default, Clone)]
pub struct RuleRegistry {
    rules: Vec<Arc<dyn Rule>>,
}

impl RuleRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Create registry with every built-in rule
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(ConditionBuilders);
        registry.register(SecretsContext);
        registry.register(DuplicateWorkflowNames);
        registry.register(EventTypes);
        registry.register(ComplexConditions);
        registry.register(HardcodedSecrets);
        registry.register(UnpinnedActions);
        registry.register(UnusedPermissions);
        registry.register(SecretsInRun);
        registry.register(UserInputInRun);
        registry.register(UnusedOutputs);
        registry.register(ReferenceCheck::circular_needs());
        registry.register(OrphanSecrets);
        registry.register(ReferenceCheck::step_output_references());
        registry.register(ReferenceCheck::undefined_needs());
        registry.register(ReferenceCheck::duplicate_step_ids());
        registry.register(ReferenceCheck::duplicate_job_ids());
        registry
    }

    /// Built-in rules minus those `config` disables
    #[must_use]
    pub fn from_config(config: &LintConfig) -> Self {
        let mut registry = Self::with_defaults();
        for id in &config.disabled_rules {
            if registry.get(id).is_none() {
                warn!(rule = %id, "disabled rule is not registered");
            }
        }
        for id in config.severity_overrides.keys() {
            if registry.get(id).is_none() {
                warn!(rule = %id, "severity override for unknown rule");
            }
        }
        registry.rules.retain(|rule| config.is_enabled(rule.id()));
        registry
    }

    /// Register a rule, replacing any rule with the same id
    pub fn register(&mut self, rule: impl Rule + 'static) {
        let rule: Arc<dyn Rule> = Arc::new(rule);
        match self.rules.binary_search_by(|r| r.id().cmp(rule.id())) {
            Ok(at) => self.rules[at] = rule,
            Err(at) => self.rules.insert(at, rule),
        }
    }

    /// Remove the rule with `id`
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.rules.len();
        self.rules.retain(|r| r.id() != id);
        self.rules.len() != before
    }

    /// Rule with `id`
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&dyn Rule> {
        self.rules
            .binary_search_by(|r| r.id().cmp(id))
            .ok()
            .map(|at| &*self.rules[at])
    }

    /// Rules in id order
    pub fn iter(&self) -> impl Iterator<Item = &dyn Rule> {
        self.rules.iter().map(|rule| &**rule)
    }

    /// Fixable rules in id order
    pub fn fixable(&self) -> impl Iterator<Item = &dyn FixableRule> {
        self.iter().filter_map(|rule| rule.as_fixable())
    }

    /// Registered ids in order
    #[must_use]
    pub fn ids(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.id()).collect()
    }

    /// Number of rules
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether no rule is registered
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
