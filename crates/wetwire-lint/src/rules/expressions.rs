//! Expression rules: condition builders, secrets accessor, condition complexity

use crate::context::LintContext;
use crate::edit::{import_insertion, TextEdit};
use crate::rule::{FixPlan, FixableRule, Rule};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use wetwire_model::{Diagnostic, EntityKind, Severity, Value, ValueKind};

static STATUS_FUNCTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{\{\s*(always|failure|success|cancelled)\(\)\s*\}\}").expect("valid regex")
});
static WHOLE_STATUS_FUNCTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*\$\{\{\s*(always|failure|success|cancelled)\(\)\s*\}\}\s*$").expect("valid regex")
});
static SECRET_EXPRESSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{\{\s*secrets\.(\w+)\s*\}\}").expect("valid regex"));
static WHOLE_SECRET_EXPRESSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\$\{\{\s*secrets\.(\w+)\s*\}\}\s*$").expect("valid regex"));
static STRING_OPERATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&&|\|\||\band\b|\bor\b").expect("valid regex"));
static PYTHON_OPERATOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"==|!=|<=|>=|[&|~<>]|\band\b|\bor\b|\bnot\b").expect("valid regex")
});

/// `if_` conditions of every Step and Job call
fn conditions<'c>(ctx: &'c LintContext<'_>) -> Vec<&'c Value> {
    [EntityKind::Step, EntityKind::Job]
        .into_iter()
        .flat_map(|kind| ctx.constructor_calls(kind))
        .filter_map(|call| call.field(&["if_", "if"]))
        .collect()
}

/// WAG002: status functions should use the condition builders
#[derive(Debug, Default, Clone, Copy)]
pub struct ConditionBuilders;

impl Rule for ConditionBuilders {
    fn id(&self) -> &'static str {
        "WAG002"
    }

    fn description(&self) -> &'static str {
        "Use condition builders (always(), failure(), ...) instead of raw expression strings"
    }

    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn check(&self, ctx: &LintContext<'_>) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        for value in conditions(ctx) {
            let Some(text) = value.as_str() else {
                continue;
            };
            let Some(found) = STATUS_FUNCTION.captures(text) else {
                continue;
            };
            let func = &found[1];
            out.push(
                Diagnostic::new(
                    self.id(),
                    self.severity(),
                    format!("Use {func}() helper instead of hardcoded '${{{{ {func}() }}}}'"),
                    &ctx.location(value),
                )
                .with_fixable(WHOLE_STATUS_FUNCTION.is_match(text))
                .with_suggestion(format!("Import {func} from wetwire_github.workflow.expressions")),
            );
        }
        out
    }

    fn as_fixable(&self) -> Option<&dyn FixableRule> {
        Some(self)
    }
}

impl FixableRule for ConditionBuilders {
    fn plan_fix(&self, ctx: &LintContext<'_>) -> FixPlan {
        let mut plan = FixPlan::default();
        let mut names = BTreeSet::new();
        for value in conditions(ctx) {
            let Some(found) = value.as_str().and_then(|t| WHOLE_STATUS_FUNCTION.captures(t)) else {
                continue;
            };
            let func = found[1].to_string();
            plan.push([TextEdit::replace(value.span, format!("{func}()"))]);
            names.insert(func);
        }
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        if let Some(import) = import_insertion(ctx.module(), ctx.source(), &names) {
            plan.support(import);
        }
        plan
    }
}

/// WAG003: secrets should be read through `Secrets.get`
#[derive(Debug, Default, Clone, Copy)]
pub struct SecretsContext;

impl Rule for SecretsContext {
    fn id(&self) -> &'static str {
        "WAG003"
    }

    fn description(&self) -> &'static str {
        "Use Secrets.get() instead of raw ${{ secrets.* }} strings"
    }

    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn check(&self, ctx: &LintContext<'_>) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        for value in ctx.strings() {
            let Some(text) = value.as_str() else {
                continue;
            };
            let Some(found) = SECRET_EXPRESSION.captures(text) else {
                continue;
            };
            let name = &found[1];
            out.push(
                Diagnostic::new(
                    self.id(),
                    self.severity(),
                    format!("Use Secrets.get('{name}') instead of hardcoded '${{{{ secrets.{name} }}}}'"),
                    &ctx.location(value),
                )
                .with_fixable(WHOLE_SECRET_EXPRESSION.is_match(text))
                .with_suggestion(format!("Replace with: Secrets.get(\"{name}\")")),
            );
        }
        out
    }

    fn as_fixable(&self) -> Option<&dyn FixableRule> {
        Some(self)
    }
}

impl FixableRule for SecretsContext {
    fn plan_fix(&self, ctx: &LintContext<'_>) -> FixPlan {
        let mut plan = FixPlan::default();
        for value in ctx.strings() {
            let Some(found) = value.as_str().and_then(|t| WHOLE_SECRET_EXPRESSION.captures(t)) else {
                continue;
            };
            plan.push([TextEdit::replace(value.span, format!("Secrets.get(\"{}\")", &found[1]))]);
        }
        if !plan.is_empty() {
            if let Some(import) = import_insertion(ctx.module(), ctx.source(), &["Secrets"]) {
                plan.support(import);
            }
        }
        plan
    }
}

/// WAG011: conditions with too many operators
#[derive(Debug, Default, Clone, Copy)]
pub struct ComplexConditions;

impl ComplexConditions {
    fn complexity(value: &Value) -> usize {
        match &value.kind {
            ValueKind::Str(text) => STRING_OPERATOR.find_iter(text).count(),
            ValueKind::Opaque(text) => PYTHON_OPERATOR.find_iter(text).count(),
            ValueKind::Call(call) => call
                .args
                .iter()
                .chain(call.fields.iter().map(|f| &f.value))
                .map(Self::complexity)
                .sum(),
            _ => 0,
        }
    }
}

impl Rule for ComplexConditions {
    fn id(&self) -> &'static str {
        "WAG011"
    }

    fn description(&self) -> &'static str {
        "Flag conditions with too many boolean operators"
    }

    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn check(&self, ctx: &LintContext<'_>) -> Vec<Diagnostic> {
        let max = ctx.config().max_condition_operators;
        conditions(ctx)
            .into_iter()
            .filter_map(|value| {
                let complexity = Self::complexity(value);
                (complexity > max).then(|| {
                    Diagnostic::new(
                        self.id(),
                        self.severity(),
                        format!("Complex condition (complexity: {complexity}); extract to a named variable"),
                        &ctx.location(value),
                    )
                    .with_suggestion("Create: is_deploy_ready = condition1 & condition2 & condition3")
                })
            })
            .collect()
    }
}
