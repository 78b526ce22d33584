//! Reference extraction from opaque expression strings
//!
//! Expressions are never evaluated. The referenced identifiers are pulled out
//! by pattern matching so graphs and usage indexes can be built from them.

use crate::value::{Value, ValueKind};
use once_cell::sync::Lazy;
use regex::Regex;

// The leading group keeps `github.steps...`-style member access from matching.
static STEP_OUTPUT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[^\w.])steps\.([A-Za-z_][\w-]*)\.outputs\.([A-Za-z_][\w-]*)")
        .expect("valid regex")
});
static NEEDS_OUTPUT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[^\w.])needs\.([A-Za-z_][\w-]*)\.outputs\.([A-Za-z_][\w-]*)")
        .expect("valid regex")
});
static JOB_OUTPUT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[^\w.])jobs\.([A-Za-z_][\w-]*)\.outputs\.([A-Za-z_][\w-]*)")
        .expect("valid regex")
});
static SECRET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[^\w.])secrets\.([A-Za-z_]\w*)").expect("valid regex")
});

/// An identifier referenced by an expression string
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Reference {
    /// `steps.<step>.outputs.<output>`
    StepOutput {
        /// Step identifier
        step: String,
        /// Output name
        output: String,
    },
    /// `needs.<job>.outputs.<output>`
    NeedsOutput {
        /// Job identifier
        job: String,
        /// Output name
        output: String,
    },
    /// `jobs.<job>.outputs.<output>` (reusable workflow outputs)
    JobOutput {
        /// Job identifier
        job: String,
        /// Output name
        output: String,
    },
    /// `secrets.<name>`
    Secret {
        /// Secret name
        name: String,
    },
}

fn pairs(re: &Regex, text: &str) -> Vec<(String, String)> {
    re.captures_iter(text)
        .map(|c| (c[1].to_string(), c[2].to_string()))
        .collect()
}

/// `(step, output)` pairs referenced through `steps.*.outputs.*`
#[must_use]
pub fn step_outputs(text: &str) -> Vec<(String, String)> {
    pairs(&STEP_OUTPUT, text)
}

/// `(job, output)` pairs referenced through `needs.*.outputs.*`
#[must_use]
pub fn needs_outputs(text: &str) -> Vec<(String, String)> {
    pairs(&NEEDS_OUTPUT, text)
}

/// `(job, output)` pairs referenced through `jobs.*.outputs.*`
#[must_use]
pub fn job_outputs(text: &str) -> Vec<(String, String)> {
    pairs(&JOB_OUTPUT, text)
}

/// Secret names referenced through `secrets.*`
#[must_use]
pub fn secrets(text: &str) -> Vec<String> {
    SECRET
        .captures_iter(text)
        .map(|c| c[1].to_string())
        .collect()
}

/// Every reference in `text`
#[must_use]
pub fn references(text: &str) -> Vec<Reference> {
    let mut out: Vec<Reference> = step_outputs(text)
        .into_iter()
        .map(|(step, output)| Reference::StepOutput { step, output })
        .collect();
    out.extend(
        needs_outputs(text)
            .into_iter()
            .map(|(job, output)| Reference::NeedsOutput { job, output }),
    );
    out.extend(
        job_outputs(text)
            .into_iter()
            .map(|(job, output)| Reference::JobOutput { job, output }),
    );
    out.extend(secrets(text).into_iter().map(|name| Reference::Secret { name }));
    out
}

/// Secret name of a `Secrets.get("NAME")` accessor call
#[must_use]
pub fn secret_accessor(value: &Value) -> Option<&str> {
    let call = value.as_call()?;
    let is_accessor = call.callee == "Secrets.get" || call.callee.ends_with(".Secrets.get");
    if !is_accessor {
        return None;
    }
    call.args.first().and_then(Value::as_str)
}

/// Secrets referenced anywhere in a value, through strings or accessor calls
#[must_use]
pub fn value_secrets(value: &Value) -> Vec<String> {
    let mut out = Vec::new();
    value.walk(&mut |node| match &node.kind {
        ValueKind::Str(text) => out.extend(secrets(text)),
        ValueKind::Call(_) => {
            if let Some(name) = secret_accessor(node) {
                out.push(name.to_string());
            }
        }
        _ => {}
    });
    out
}

/// Inner text of a string that is exactly one `${{ ... }}` expression
#[must_use]
pub fn whole_expression(text: &str) -> Option<&str> {
    let inner = text.trim().strip_prefix("${{")?.strip_suffix("}}")?;
    if inner.contains("${{") || inner.contains("}}") {
        return None;
    }
    Some(inner.trim())
}

/// Whether `text` reads environment variable `var` as `$VAR`, `${VAR}` or `env.VAR`
#[must_use]
pub fn mentions_env_var(text: &str, var: &str) -> bool {
    if var.is_empty() {
        return false;
    }
    let ends_word = |rest: &str| {
        !rest
            .chars()
            .next()
            .is_some_and(|c| c.is_alphanumeric() || c == '_')
    };
    let braced = format!("${{{var}}}");
    if text.contains(&braced) {
        return true;
    }
    for prefix in ["$", "env."] {
        let needle = format!("{prefix}{var}");
        let mut from = 0;
        while let Some(found) = text[from..].find(&needle) {
            let end = from + found + needle.len();
            if ends_word(&text[end..]) {
                return true;
            }
            from = end;
        }
    }
    false
}
