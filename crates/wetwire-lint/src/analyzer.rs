//! Detection over one file

use crate::config::LintConfig;
use crate::context::LintContext;
use crate::registry::RuleRegistry;
use crate::rule::Rule;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::trace;
use wetwire_discover::{DiscoveryCache, DiscoveryEngine, DiscoveryError, DiscoveryOptions, ParsedModule};
use wetwire_model::Diagnostic;

/// Parsed modules kept across fix cycles
const PARSE_CACHE_CAPACITY: u64 = 256;

/// Findings grouped by rule id, every registered rule present
pub type RuleFindings = BTreeMap<&'static str, Vec<Diagnostic>>;

/// Runs the registered rules against single files
#[derive(Debug, Clone)]
pub struct Analyzer {
    registry: RuleRegistry,
    config: LintConfig,
    engine: DiscoveryEngine,
}

impl Analyzer {
    /// Analyzer with the built-in rules `config` enables
    #[must_use]
    pub fn new(config: LintConfig) -> Self {
        let options = DiscoveryOptions::default().with_extensions(config.extensions.clone());
        let engine =
            DiscoveryEngine::new(options).with_cache(DiscoveryCache::new(PARSE_CACHE_CAPACITY));
        Self {
            registry: RuleRegistry::from_config(&config),
            config,
            engine,
        }
    }

    /// Replace the rule set
    #[inline]
    #[must_use]
    pub fn with_registry(mut self, registry: RuleRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Active rules
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &LintConfig {
        &self.config
    }

    /// Engine used for parsing
    #[inline]
    #[must_use]
    pub fn engine(&self) -> &DiscoveryEngine {
        &self.engine
    }

    /// Parse `source` into a lint context
    ///
    /// # Errors
    /// [`DiscoveryError::Syntax`] if the source does not parse.
    pub fn context<'a>(&'a self, path: &Path, source: &'a str) -> Result<LintContext<'a>, DiscoveryError> {
        self.context_with(path, source, &[])
    }

    /// Parse `source` into a lint context that resolves names across `neighbors`
    ///
    /// # Errors
    /// [`DiscoveryError::Syntax`] if the source does not parse.
    pub fn context_with<'a>(
        &'a self,
        path: &Path,
        source: &'a str,
        neighbors: &[Arc<ParsedModule>],
    ) -> Result<LintContext<'a>, DiscoveryError> {
        let module = self.engine.parse_source(path, source)?;
        Ok(LintContext::with_neighbors(module, neighbors, source, &self.config))
    }

    /// Findings of one rule with configured severity applied
    #[must_use]
    pub fn check_rule(&self, rule: &dyn Rule, ctx: &LintContext<'_>) -> Vec<Diagnostic> {
        let severity = self.config.severity_for(rule.id(), rule.severity());
        let mut found = rule.check(ctx);
        for diagnostic in &mut found {
            diagnostic.severity = severity;
        }
        trace!(rule = rule.id(), findings = found.len(), "rule checked");
        found
    }

    /// Findings of every rule, grouped by rule id
    #[must_use]
    pub fn check_by_rule(&self, ctx: &LintContext<'_>) -> RuleFindings {
        self.registry
            .iter()
            .map(|rule| (rule.id(), self.check_rule(rule, ctx)))
            .collect()
    }

    /// Findings of every rule in source order
    #[must_use]
    pub fn check(&self, ctx: &LintContext<'_>) -> Vec<Diagnostic> {
        flatten(self.check_by_rule(ctx))
    }

    /// Parse and check one source text
    ///
    /// # Errors
    /// [`DiscoveryError::Syntax`] if the source does not parse.
    pub fn analyze_source(&self, path: &Path, source: &str) -> Result<Vec<Diagnostic>, DiscoveryError> {
        self.analyze_with(path, source, &[])
    }

    /// Parse and check one source text within a project
    ///
    /// # Errors
    /// [`DiscoveryError::Syntax`] if the source does not parse.
    pub fn analyze_with(
        &self,
        path: &Path,
        source: &str,
        neighbors: &[Arc<ParsedModule>],
    ) -> Result<Vec<Diagnostic>, DiscoveryError> {
        let ctx = self.context_with(path, source, neighbors)?;
        Ok(self.check(&ctx))
    }
}

/// Merge grouped findings into one list ordered by position, then rule id
#[must_use]
pub fn flatten(findings: RuleFindings) -> Vec<Diagnostic> {
    let mut all: Vec<Diagnostic> = findings.into_values().flatten().collect();
    all.sort_by(|a, b| {
        (&a.file, a.line, a.column, &a.rule_id, &a.message)
            .cmp(&(&b.file, b.line, b.column, &b.rule_id, &b.message))
    });
    all.dedup();
    all
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wetwire_model::Severity;
    use wetwire_test_utils::{CLEAN_WORKFLOW, MISSING_NEEDS, SYNTAX_ERROR, UNUSED_OUTPUT};

    #[test]
    fn clean_workflow_has_no_findings() {
        let analyzer = Analyzer::new(LintConfig::default());
        let found = analyzer.analyze_source(Path::new("ci.py"), CLEAN_WORKFLOW).unwrap();
        assert!(found.is_empty(), "{found:#?}");
    }

    #[test]
    fn missing_needs_is_one_reference_error() {
        let analyzer = Analyzer::new(LintConfig::default());
        let found = analyzer.analyze_source(Path::new("ci.py"), MISSING_NEEDS).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].rule_id, "WAG054");
        assert!(found[0].message.contains("'deploy'"));
        assert!(found[0].message.contains("'missing'"));
        assert!(found[0].is_blocking());
    }

    #[test]
    fn severity_override_applies() {
        let config = LintConfig::default().with_severity("WAG050", Severity::Error);
        let analyzer = Analyzer::new(config);
        let found = analyzer.analyze_source(Path::new("ci.py"), UNUSED_OUTPUT).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].severity, Severity::Error);
    }

    #[test]
    fn disabled_rule_reports_nothing() {
        let analyzer = Analyzer::new(LintConfig::default().with_disabled_rule("WAG050"));
        let found = analyzer.analyze_source(Path::new("ci.py"), UNUSED_OUTPUT).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn helper_built_job_satisfies_needs() {
        let source = r#"from wetwire_github.workflow import Job, Step, Workflow
from .factory import make_job

deploy = Job(runs_on="ubuntu-latest", needs=["build"], steps=[Step(run="make deploy")])

ci = Workflow(name="CI", on={"push": {}}, jobs={"build": make_job(), "deploy": deploy})
"#;
        let analyzer = Analyzer::new(LintConfig::default());
        let found = analyzer.analyze_source(Path::new("ci.py"), source).unwrap();
        assert!(found.is_empty(), "{found:#?}");
    }

    #[test]
    fn syntax_error_is_returned() {
        let analyzer = Analyzer::new(LintConfig::default());
        let err = analyzer.analyze_source(Path::new("bad.py"), SYNTAX_ERROR).unwrap_err();
        assert!(matches!(err, DiscoveryError::Syntax { .. }));
    }
}
