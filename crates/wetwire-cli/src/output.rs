//! Human-readable renderings

use std::fmt::Write;
use wetwire_lint::RunSummary;
use wetwire_model::DiscoveredEntity;

fn plural(count: usize, word: &str) -> String {
    if count == 1 {
        format!("{count} {word}")
    } else {
        format!("{count} {word}s")
    }
}

/// Diagnostics, parse errors and a closing tally
pub(crate) fn lint_text(summary: &RunSummary, fix: bool) -> String {
    let mut out = String::new();
    for error in &summary.parse_errors {
        let _ = writeln!(
            out,
            "{}:{}:{}: error [parse] {}",
            error.path.display(),
            error.line,
            error.column,
            error.message
        );
    }
    for report in &summary.files {
        for diagnostic in &report.diagnostics {
            let _ = writeln!(out, "{diagnostic}");
            if let Some(suggestion) = &diagnostic.suggestion {
                let _ = writeln!(out, "    help: {suggestion}");
            }
        }
        for conflict in &report.conflicts {
            let _ = writeln!(
                out,
                "{}: {} deferred in cycle {} (overlaps {})",
                report.path.display(),
                conflict.rule,
                conflict.cycle,
                conflict.blocked_by
            );
        }
        for rejected in &report.rejected {
            let _ = writeln!(
                out,
                "{}: {} fix rejected in cycle {}: {}",
                report.path.display(),
                rejected.rule,
                rejected.cycle,
                rejected.reason
            );
        }
    }

    let mut tally = format!(
        "{}, {} in {}",
        plural(summary.error_count(), "error"),
        plural(summary.warning_count(), "warning"),
        plural(summary.files.len() + summary.parse_errors.len(), "file")
    );
    if !summary.parse_errors.is_empty() {
        let _ = write!(tally, ", {} failed to parse", summary.parse_errors.len());
    }
    if fix {
        let _ = write!(
            tally,
            "; fixed {}, rewrote {}",
            plural(summary.fixed(), "finding"),
            plural(summary.written(), "file")
        );
    }
    let _ = writeln!(out, "{tally}");
    out
}

/// One line per entity: kind, binding, location
pub(crate) fn entities_text(entities: &[DiscoveredEntity]) -> String {
    let mut out = String::new();
    for entity in entities {
        let _ = writeln!(out, "{:<8} {:<24} {}", entity.kind, entity.id, entity.location);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;
    use wetwire_lint::FileReport;
    use wetwire_model::{Diagnostic, Position, Severity, SourceLocation};

    #[test]
    fn tally_counts_errors_and_warnings() {
        let location = SourceLocation::new("ci.py", Position::new(4, 0));
        let summary = RunSummary {
            files: vec![FileReport {
                path: PathBuf::from("ci.py"),
                diagnostics: vec![
                    Diagnostic::new("WAG054", Severity::Error, "Job 'deploy' needs undefined job 'missing'", &location),
                ],
                fixed: 0,
                cycles: 0,
                written: false,
                conflicts: Vec::new(),
                rejected: Vec::new(),
            }],
            parse_errors: Vec::new(),
        };
        assert_eq!(
            lint_text(&summary, false),
            "ci.py:4:0: error [WAG054] Job 'deploy' needs undefined job 'missing'\n1 error, 0 warnings in 1 file\n"
        );
    }
}
