//! Security rules: credentials and untrusted input in shell commands,
//! unpinned actions, permission grants

use crate::context::{ConstructorCall, LintContext};
use crate::edit::TextEdit;
use crate::rule::{FixPlan, FixableRule, Rule};
use once_cell::sync::Lazy;
use regex::Regex;
use wetwire_model::expr::secrets;
use std::collections::BTreeSet;
use wetwire_model::{Diagnostic, EntityKind, Severity, Value, ValueKind};

/// Default versions used when pinning well-known actions
pub const ACTION_VERSIONS: &[(&str, &str)] = &[
    ("actions/checkout", "v4"),
    ("actions/setup-python", "v5"),
    ("actions/setup-node", "v4"),
    ("actions/setup-go", "v5"),
    ("actions/setup-java", "v4"),
    ("actions/cache", "v4"),
    ("actions/upload-artifact", "v4"),
    ("actions/download-artifact", "v4"),
    ("actions/github-script", "v7"),
    ("actions/stale", "v9"),
    ("actions/labeler", "v5"),
];

/// Permission scopes well-known actions need
pub const ACTION_PERMISSIONS: &[(&str, &[&str])] = &[
    ("actions/checkout", &["contents"]),
    ("actions/upload-artifact", &["actions"]),
    ("actions/download-artifact", &["actions"]),
    ("actions/cache", &["actions"]),
    ("actions/github-script", &["contents"]),
    ("peter-evans/create-pull-request", &["contents", "pull-requests"]),
    ("stefanzweifel/git-auto-commit-action", &["contents"]),
    ("peaceiris/actions-gh-pages", &["contents"]),
    ("docker/build-push-action", &["packages"]),
    ("docker/login-action", &["packages"]),
];

/// Refs that move and should not be pinned to
const BRANCH_NAMES: &[&str] = &["main", "master", "develop", "dev", "latest", "trunk"];

static SECRET_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r#"(?i)(api[_-]?key|apikey)\s*[=:]\s*['"]?([a-zA-Z0-9_-]{16,})"#, "API key"),
        (r#"(?i)(?:^|\s)-p\s*['"]([^\s'"]{8,})['"]"#, "password"),
        (r"(?i)(?:^|\s)-p([^\s]{8,})(?:\s|$)", "password"),
        (r#"(?i)(password|passwd|pwd)\s*[=:]\s*['"]?([^\s'"]{8,})"#, "password"),
        (r"AKIA[0-9A-Z]{16}", "AWS Access Key ID"),
        (
            r#"(?i)aws[_-]?secret[_-]?access[_-]?key\s*[=:]\s*['"]?([a-zA-Z0-9/+=]{40})"#,
            "AWS Secret Key",
        ),
        (r"sk_test_[a-zA-Z0-9]{20,}", "Stripe test key"),
        (r"sk_live_[a-zA-Z0-9]{20,}", "Stripe live key"),
        (r"pk_test_[a-zA-Z0-9]{20,}", "Stripe publishable test key"),
        (r"pk_live_[a-zA-Z0-9]{20,}", "Stripe publishable live key"),
        (r"ghp_[a-zA-Z0-9]{36}", "GitHub personal access token"),
        (r"ghs_[a-zA-Z0-9]{36}", "GitHub OAuth token"),
        (r"gho_[a-zA-Z0-9]{36}", "GitHub OAuth token"),
        (r"ghu_[a-zA-Z0-9]{36}", "GitHub user token"),
        (r#"(?i)(token|auth|bearer)\s*[=:]\s*['"]?([a-zA-Z0-9_-]{20,})"#, "token"),
        (r"-----BEGIN (RSA |DSA |EC |OPENSSH )?PRIVATE KEY-----", "private key"),
    ]
    .into_iter()
    .map(|(pattern, kind)| (Regex::new(pattern).expect("valid regex"), kind))
    .collect()
});

// Event fields anyone who opens an issue or pull request controls
static USER_INPUT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"github\.(?:event\.(?:(?:issue|pull_request|discussion)\.(?:title|body)|(?:comment|review)\.body|head_commit\.message|commits|pages)|head_ref)",
    )
    .expect("valid regex")
});

static USER_INPUT_EXPRESSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"\$\{{\{{\s*({})[\w.\[\]*]*\s*\}}\}}", USER_INPUT.as_str())).expect("valid regex")
});

/// `(value, text)` of a string-valued keyword on every Step call
fn step_strings<'c>(ctx: &'c LintContext<'_>, names: &[&str]) -> Vec<(&'c Value, &'c str)> {
    ctx.constructor_calls(EntityKind::Step)
        .into_iter()
        .filter_map(|call| call.field(names))
        .filter_map(|value| value.as_str().map(|text| (value, text)))
        .collect()
}

/// Default version for a well-known action
#[must_use]
pub fn default_version(action: &str) -> Option<&'static str> {
    ACTION_VERSIONS
        .iter()
        .find(|(name, _)| *name == action)
        .map(|(_, version)| *version)
}

/// WAG017: credentials written into `run` commands
#[derive(Debug, Default, Clone, Copy)]
pub struct HardcodedSecrets;

impl Rule for HardcodedSecrets {
    fn id(&self) -> &'static str {
        "WAG017"
    }

    fn description(&self) -> &'static str {
        "Detect hardcoded secrets in run commands"
    }

    fn severity(&self) -> Severity {
        Severity::Error
    }

    fn check(&self, ctx: &LintContext<'_>) -> Vec<Diagnostic> {
        step_strings(ctx, &["run"])
            .into_iter()
            .filter(|(_, text)| secrets(text).is_empty())
            .filter_map(|(value, text)| {
                let (_, kind) = SECRET_PATTERNS.iter().find(|(re, _)| re.is_match(text))?;
                Some(
                    Diagnostic::new(
                        self.id(),
                        self.severity(),
                        format!("Possible hardcoded {kind} detected in run command"),
                        &ctx.location(value),
                    )
                    .with_suggestion(
                        "Use Secrets.get() or ${{ secrets.SECRET_NAME }} to access sensitive values",
                    ),
                )
            })
            .collect()
    }
}

/// WAG018: actions without a version, or pinned to a branch
#[derive(Debug, Default, Clone, Copy)]
pub struct UnpinnedActions;

enum Pin<'t> {
    Missing { action: &'t str },
    Branch { action: &'t str, reference: &'t str },
}

impl UnpinnedActions {
    fn classify(uses: &str) -> Option<Pin<'_>> {
        if uses.starts_with("./") || uses.starts_with("docker://") {
            return None;
        }
        let Some((action, reference)) = uses.split_once('@') else {
            return Some(Pin::Missing { action: uses });
        };
        let is_sha = reference.len() == 40 && reference.chars().all(|c| c.is_ascii_hexdigit());
        let is_version = reference.starts_with('v') || reference.contains('.');
        if is_sha || is_version {
            None
        } else {
            Some(Pin::Branch { action, reference })
        }
    }

    /// Owner/repo part of an action path (`owner/repo/sub/dir` → `owner/repo`)
    fn repository(action: &str) -> &str {
        match action.match_indices('/').nth(1) {
            Some((index, _)) => &action[..index],
            None => action,
        }
    }
}

impl Rule for UnpinnedActions {
    fn id(&self) -> &'static str {
        "WAG018"
    }

    fn description(&self) -> &'static str {
        "Detect unpinned actions that may pose security risks"
    }

    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn check(&self, ctx: &LintContext<'_>) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        for (value, uses) in step_strings(ctx, &["uses"]) {
            let Some(pin) = Self::classify(uses) else {
                continue;
            };
            let location = ctx.location(value);
            let diagnostic = match pin {
                Pin::Missing { action } => {
                    let known = default_version(Self::repository(action));
                    Diagnostic::new(
                        self.id(),
                        self.severity(),
                        format!("Action '{uses}' is unpinned (no version specified)"),
                        &location,
                    )
                    .with_fixable(known.is_some())
                    .with_suggestion(format!("Pin to a version, e.g., {uses}@{}", known.unwrap_or("v4")))
                }
                Pin::Branch { action, reference } => {
                    let note = if BRANCH_NAMES.contains(&reference.to_ascii_lowercase().as_str()) {
                        format!(" Branch '{reference}' can change at any time.")
                    } else {
                        String::new()
                    };
                    let suggestion = match default_version(Self::repository(action)) {
                        Some(version) => format!("Pin to @{version} or a full commit SHA"),
                        None => "Pin to a version tag (e.g., @v4) or full commit SHA".to_string(),
                    };
                    Diagnostic::new(
                        self.id(),
                        self.severity(),
                        format!("Action '{uses}' is pinned to branch '{reference}'.{note}"),
                        &location,
                    )
                    .with_suggestion(suggestion)
                }
            };
            out.push(diagnostic);
        }
        out
    }

    fn as_fixable(&self) -> Option<&dyn FixableRule> {
        Some(self)
    }
}

impl FixableRule for UnpinnedActions {
    fn plan_fix(&self, ctx: &LintContext<'_>) -> FixPlan {
        let mut plan = FixPlan::default();
        for (value, uses) in step_strings(ctx, &["uses"]) {
            let Some(Pin::Missing { action }) = Self::classify(uses) else {
                continue;
            };
            let Some(version) = default_version(Self::repository(action)) else {
                continue;
            };
            // Keep the literal's own quoting and any prefix; insert before the closing quote.
            let literal = &ctx.source()[value.span.range()];
            let Some(quote) = literal.chars().last().filter(|c| *c == '"' || *c == '\'') else {
                continue;
            };
            let closing = value.span.end - quote.len_utf8();
            if literal.ends_with(&format!("{quote}{quote}{quote}")) {
                continue;
            }
            plan.push([TextEdit::insert(closing, format!("@{version}"))]);
        }
        plan
    }
}

/// WAG020: secrets interpolated straight into shell commands
#[derive(Debug, Default, Clone, Copy)]
pub struct SecretsInRun;

impl Rule for SecretsInRun {
    fn id(&self) -> &'static str {
        "WAG020"
    }

    fn description(&self) -> &'static str {
        "Warn about secrets used directly in run commands"
    }

    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn check(&self, ctx: &LintContext<'_>) -> Vec<Diagnostic> {
        step_strings(ctx, &["run"])
            .into_iter()
            .filter(|(_, text)| !secrets(text).is_empty())
            .map(|(value, _)| {
                Diagnostic::new(
                    self.id(),
                    self.severity(),
                    "Secret used directly in run command may be exposed in logs",
                    &ctx.location(value),
                )
                .with_suggestion(
                    "Pass secrets via env variables: env={'TOKEN': '${{ secrets.TOKEN }}'} and use $TOKEN in the command",
                )
            })
            .collect()
    }
}

/// WAG019: permission grants no step of the job needs
#[derive(Debug, Default, Clone, Copy)]
pub struct UnusedPermissions;

impl UnusedPermissions {
    /// `uses` of every step, or `None` when a step is hidden behind a helper
    fn step_actions<'c>(ctx: &'c LintContext<'_>, job: ConstructorCall<'c>) -> Option<Vec<&'c str>> {
        let Some(steps) = job.field(&["steps"]) else {
            return Some(Vec::new());
        };
        let mut actions = Vec::new();
        for item in steps.as_list()? {
            let value = match &item.kind {
                ValueKind::Name(name) => &ctx.module().binding(name)?.value,
                _ => item,
            };
            let call = value.as_call()?;
            if ctx.module().constructors.classify(&call.callee) != Some(EntityKind::Step) {
                return None;
            }
            if let Some(uses) = call.field_value(&["uses"]).and_then(Value::as_str) {
                actions.push(uses);
            }
        }
        Some(actions)
    }

    fn needed(actions: &[&str]) -> BTreeSet<&'static str> {
        actions
            .iter()
            .map(|uses| uses.split_once('@').map_or(*uses, |(action, _)| action))
            .filter_map(|action| ACTION_PERMISSIONS.iter().find(|(name, _)| *name == action))
            .flat_map(|(_, scopes)| scopes.iter().copied())
            .collect()
    }
}

impl Rule for UnusedPermissions {
    fn id(&self) -> &'static str {
        "WAG019"
    }

    fn description(&self) -> &'static str {
        "Detect unused permissions grants"
    }

    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn check(&self, ctx: &LintContext<'_>) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        for job in ctx.constructor_calls(EntityKind::Job) {
            let Some(permissions) = job.field(&["permissions"]) else {
                continue;
            };
            if let Some(grant @ ("write-all" | "read-all")) = permissions.as_str() {
                out.push(
                    Diagnostic::new(
                        self.id(),
                        self.severity(),
                        format!("Overly broad '{grant}' permission. Consider using specific permissions."),
                        &ctx.location(permissions),
                    )
                    .with_suggestion("Use specific permissions like {'contents': 'read'} instead of broad grants"),
                );
                continue;
            }
            let Some(entries) = permissions.as_map() else {
                continue;
            };
            let Some(actions) = Self::step_actions(ctx, job) else {
                continue;
            };
            let needed = Self::needed(&actions);
            for entry in entries {
                let (Some(scope), Some(level)) = (entry.key_str(), entry.value.as_str()) else {
                    continue;
                };
                if needed.contains(scope) {
                    continue;
                }
                out.push(
                    Diagnostic::new(
                        self.id(),
                        self.severity(),
                        format!("Permission '{scope}: {level}' appears unused"),
                        &ctx.location(&entry.key),
                    )
                    .with_suggestion(format!("Remove '{scope}' permission or verify it's needed")),
                );
            }
        }
        out
    }
}

/// WAG022: issue, pull request and commit text reaching a shell unquoted
#[derive(Debug, Default, Clone, Copy)]
pub struct UserInputInRun;

impl UserInputInRun {
    /// Whether `$VAR` or `${VAR}` appears with no quote right before or after it
    fn unquoted(run: &str, var: &str) -> bool {
        let escaped = regex::escape(var);
        let Ok(re) = Regex::new(&format!(r"\$(?:\{{{escaped}\}}|{escaped}\b)")) else {
            return false;
        };
        let quote = |c: Option<char>| matches!(c, Some('"' | '\''));
        let found = re.find_iter(run).any(|m| {
            !quote(run[..m.start()].chars().next_back()) && !quote(run[m.end()..].chars().next())
        });
        found
    }
}

impl Rule for UserInputInRun {
    fn id(&self) -> &'static str {
        "WAG022"
    }

    fn description(&self) -> &'static str {
        "Warn about unescaped user-controlled input in shell commands"
    }

    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn check(&self, ctx: &LintContext<'_>) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        for step in ctx.constructor_calls(EntityKind::Step) {
            let Some(run) = step.field(&["run"]) else {
                continue;
            };
            let Some(text) = run.as_str() else {
                continue;
            };
            let location = ctx.location(run);

            if let Some(found) = USER_INPUT_EXPRESSION.captures(text) {
                out.push(
                    Diagnostic::new(
                        self.id(),
                        self.severity(),
                        format!("User-controlled input '{}' used directly in shell command", &found[1]),
                        &location,
                    )
                    .with_suggestion("Pass user input via env variable and properly quote it: \"$VAR\""),
                );
                continue;
            }

            let env = step.field(&["env"]).and_then(Value::as_map).unwrap_or_default();
            let exposed = env.iter().find_map(|entry| {
                let var = entry.key_str()?;
                let bound = entry.value.as_str()?;
                (USER_INPUT.is_match(bound) && Self::unquoted(text, var)).then_some(var)
            });
            if let Some(var) = exposed {
                out.push(
                    Diagnostic::new(
                        self.id(),
                        self.severity(),
                        format!("Environment variable ${var} contains user input and is not properly quoted"),
                        &location,
                    )
                    .with_suggestion(format!("Quote the variable: \"${var}\" instead of ${var}")),
                );
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LintConfig;
    use crate::rule::FixResult;
    use pretty_assertions::assert_eq;
    use std::path::Path;

    const HEADER: &str = "from wetwire_github.workflow import Step\n\n";

    fn check(rule: &dyn Rule, body: &str) -> Vec<Diagnostic> {
        let source = format!("{HEADER}{body}");
        let config = LintConfig::default();
        let ctx = LintContext::parse(Path::new("ci.py"), &source, &config).unwrap();
        rule.check(&ctx)
    }

    fn fix(body: &str) -> FixResult {
        let source = format!("{HEADER}{body}");
        let config = LintConfig::default();
        let ctx = LintContext::parse(Path::new("ci.py"), &source, &config).unwrap();
        UnpinnedActions.fix(&ctx).unwrap()
    }

    #[test]
    fn hardcoded_key_reported_once_per_command() {
        let diags = check(
            &HardcodedSecrets,
            "s = Step(run=\"curl -H api_key=abcdef0123456789abcd --password=hunter2hunter2\")\n",
        );
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message, "Possible hardcoded API key detected in run command");
    }

    #[test]
    fn long_flags_are_not_passwords() {
        assert!(check(&HardcodedSecrets, "s = Step(run=\"pip install --python-version 3.12\")\n").is_empty());
    }

    #[test]
    fn commands_using_secret_context_are_skipped() {
        let body = "s = Step(run=\"login -p${{ secrets.PASSWORD }}\")\n";
        assert!(check(&HardcodedSecrets, body).is_empty());
        assert_eq!(check(&SecretsInRun, body).len(), 1);
    }

    #[test]
    fn pins_known_actions_keeping_quotes() {
        let result = fix("a = Step(uses='actions/checkout')\nb = Step(uses=\"actions/setup-node\")\nc = Step(uses=\"acme/tool\")\n");
        assert_eq!(result.fixed, 2);
        assert_eq!(
            result.source,
            format!("{HEADER}a = Step(uses='actions/checkout@v4')\nb = Step(uses=\"actions/setup-node@v4\")\nc = Step(uses=\"acme/tool\")\n")
        );
        assert_eq!(result.remaining.len(), 1);
        assert!(!result.remaining[0].fixable);
    }

    #[test]
    fn branch_pins_are_reported_not_fixed() {
        let diags = check(&UnpinnedActions, "s = Step(uses=\"actions/checkout@main\")\n");
        assert_eq!(diags.len(), 1);
        assert_eq!(
            diags[0].message,
            "Action 'actions/checkout@main' is pinned to branch 'main'. Branch 'main' can change at any time."
        );
        assert!(!diags[0].fixable);
        assert!(check(&UnpinnedActions, "s = Step(uses=\"actions/checkout@v4\")\n").is_empty());
        assert!(check(&UnpinnedActions, "s = Step(uses=\"./.github/actions/local\")\n").is_empty());
    }

    #[test]
    fn sub_directory_actions_use_repository_version() {
        assert_eq!(UnpinnedActions::repository("actions/cache/restore"), "actions/cache");
        assert_eq!(UnpinnedActions::repository("actions/cache"), "actions/cache");
    }

    #[test]
    fn broad_and_unneeded_permissions() {
        let header = "from wetwire_github.workflow import Job, Step\n\n";
        let source = format!(
            "{header}a = Job(permissions=\"write-all\", steps=[Step(run=\"make\")])\n\
             b = Job(permissions={{\"contents\": \"read\", \"issues\": \"write\"}}, steps=[Step(uses=\"actions/checkout@v4\")])\n"
        );
        let config = LintConfig::default();
        let ctx = LintContext::parse(Path::new("ci.py"), &source, &config).unwrap();
        let diags = UnusedPermissions.check(&ctx);
        let messages: Vec<_> = diags.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "Overly broad 'write-all' permission. Consider using specific permissions.",
                "Permission 'issues: write' appears unused",
            ]
        );
        assert_eq!(diags[1].line, 4);
    }

    #[test]
    fn permissions_behind_helper_steps_are_not_judged() {
        let header = "from wetwire_github.workflow import Job, Step\n\n";
        let source = format!(
            "{header}checkout = Step(uses=\"actions/checkout@v4\")\n\
             a = Job(permissions={{\"contents\": \"read\"}}, steps=[checkout])\n\
             b = Job(permissions={{\"packages\": \"write\"}}, steps=[publish()])\n"
        );
        let config = LintConfig::default();
        let ctx = LintContext::parse(Path::new("ci.py"), &source, &config).unwrap();
        assert!(UnusedPermissions.check(&ctx).is_empty());
    }

    #[test]
    fn user_input_expression_in_run() {
        let diags = check(
            &UserInputInRun,
            "s = Step(run=\"echo ${{ github.event.issue.title }}\")\n",
        );
        assert_eq!(diags.len(), 1);
        assert_eq!(
            diags[0].message,
            "User-controlled input 'github.event.issue.title' used directly in shell command"
        );
        assert!(check(&UserInputInRun, "s = Step(run=\"echo ${{ github.sha }}\")\n").is_empty());
    }

    #[test]
    fn user_input_env_var_must_be_quoted() {
        let env = "env={\"TITLE\": \"${{ github.event.pull_request.title }}\"}";
        let bare = check(&UserInputInRun, &format!("s = Step(run=\"echo $TITLE\", {env})\n"));
        assert_eq!(bare.len(), 1);
        assert_eq!(
            bare[0].message,
            "Environment variable $TITLE contains user input and is not properly quoted"
        );
        let quoted = check(&UserInputInRun, &format!("s = Step(run='echo \"$TITLE\"', {env})\n"));
        assert!(quoted.is_empty());
        let longer = check(&UserInputInRun, &format!("s = Step(run=\"echo $TITLE_LEN\", {env})\n"));
        assert!(longer.is_empty());
    }
}
