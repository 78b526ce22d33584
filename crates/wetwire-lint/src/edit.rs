//! Span edits
//!
//! Every fix is a list of [`TextEdit`]s against the text it was planned on.
//! Edits of one list must be disjoint; they are applied back to front so
//! earlier offsets stay valid.

use crate::error::{LintError, Result};
use std::collections::BTreeSet;
use wetwire_discover::ParsedModule;
use wetwire_model::Span;

/// Module providing the condition builders and `Secrets` accessor
pub const EXPRESSIONS_MODULE: &str = "wetwire_github.workflow.expressions";

/// Replace `span` with `replacement`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextEdit {
    /// Replaced bytes (empty for insertions)
    pub span: Span,
    /// New text
    pub replacement: String,
}

impl TextEdit {
    /// Replace a span
    #[must_use]
    pub fn replace(span: Span, replacement: impl Into<String>) -> Self {
        Self {
            span,
            replacement: replacement.into(),
        }
    }

    /// Insert at an offset
    #[must_use]
    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self::replace(Span::point(at), text)
    }

    /// Delete a span
    #[must_use]
    pub fn delete(span: Span) -> Self {
        Self::replace(span, String::new())
    }

    /// Size change this edit causes
    #[inline]
    #[must_use]
    pub fn delta(&self) -> isize {
        self.replacement.len() as isize - self.span.len() as isize
    }
}

/// Apply edits to `source`
///
/// # Errors
/// [`LintError::OverlappingEdits`] if two edits claim the same text,
/// [`LintError::EditOutOfBounds`] if an edit is outside the source or splits
/// a character.
pub fn apply_edits(source: &str, edits: &[TextEdit]) -> Result<String> {
    let mut sorted: Vec<&TextEdit> = edits.iter().collect();
    sorted.sort_by_key(|e| (e.span.start, e.span.end));
    sorted.dedup_by(|a, b| a == b);

    for pair in sorted.windows(2) {
        if pair[0].span.overlaps(&pair[1].span) {
            return Err(LintError::OverlappingEdits {
                first: pair[0].span,
                second: pair[1].span,
            });
        }
    }

    let mut out = source.to_string();
    for edit in sorted.iter().rev() {
        let span = edit.span;
        if span.end > out.len() || !out.is_char_boundary(span.start) || !out.is_char_boundary(span.end) {
            return Err(LintError::EditOutOfBounds {
                span,
                len: source.len(),
            });
        }
        out.replace_range(span.range(), &edit.replacement);
    }
    Ok(out)
}

/// Where `span` (in pre-edit coordinates) lands after `edits` are applied.
///
/// Offsets inside a replaced span collapse onto the start of its replacement.
#[must_use]
pub fn remap_span(span: Span, edits: &[TextEdit]) -> Span {
    let mut sorted: Vec<&TextEdit> = edits.iter().collect();
    sorted.sort_by_key(|e| (e.span.start, e.span.end));
    Span::new(remap_offset(span.start, &sorted), remap_offset(span.end, &sorted))
}

fn remap_offset(offset: usize, edits: &[&TextEdit]) -> usize {
    let mut shift: isize = 0;
    for edit in edits {
        if edit.span.end <= offset && !(edit.span.is_empty() && edit.span.start == offset) {
            shift += edit.delta();
        } else if edit.span.start < offset {
            return shifted(edit.span.start, shift);
        }
    }
    shifted(offset, shift)
}

fn shifted(offset: usize, shift: isize) -> usize {
    offset.saturating_add_signed(shift)
}

/// Spans the replacements of `edits` occupy once applied
#[must_use]
pub fn written_spans(edits: &[TextEdit]) -> Vec<Span> {
    let mut sorted: Vec<&TextEdit> = edits.iter().collect();
    sorted.sort_by_key(|e| (e.span.start, e.span.end));
    let mut shift: isize = 0;
    let mut out = Vec::with_capacity(sorted.len());
    for edit in sorted {
        let start = shifted(edit.span.start, shift);
        out.push(Span::new(start, start + edit.replacement.len()));
        shift += edit.delta();
    }
    out
}

/// Edits removing the selected entries of a comma-separated literal.
///
/// `entries` are the spans of every entry in source order; `remove` holds
/// indexes into it. Separators go with the removed entries so the literal
/// stays well formed.
#[must_use]
pub fn entry_removals(source: &str, entries: &[Span], remove: &BTreeSet<usize>) -> Vec<TextEdit> {
    let remove: BTreeSet<usize> = remove.iter().copied().filter(|i| *i < entries.len()).collect();
    if remove.is_empty() {
        return Vec::new();
    }
    let Some(last_kept) = (0..entries.len()).rev().find(|i| !remove.contains(i)) else {
        let first = entries[0].start;
        let last = entries[entries.len() - 1].end;
        return vec![TextEdit::delete(Span::new(first, past_comma(source, last)))];
    };

    let mut edits: Vec<TextEdit> = remove
        .iter()
        .filter(|i| **i < last_kept)
        .map(|i| TextEdit::delete(Span::new(entries[*i].start, entries[*i + 1].start)))
        .collect();
    if remove.iter().any(|i| *i > last_kept) {
        let tail = Span::new(entries[last_kept].end, entries[entries.len() - 1].end);
        edits.push(TextEdit::delete(tail));
    }
    edits
}

fn past_comma(source: &str, end: usize) -> usize {
    let rest = &source[end..];
    let trimmed = rest.trim_start();
    if trimmed.starts_with(',') {
        end + (rest.len() - trimmed.len()) + 1
    } else {
        end
    }
}

/// Edit importing `names` from the expressions module, unless already bound.
///
/// The import goes on its own line after the last module-level import.
#[must_use]
pub fn import_insertion(module: &ParsedModule, source: &str, names: &[&str]) -> Option<TextEdit> {
    let mut missing: Vec<&str> = names.iter().copied().filter(|n| !module.binds(n)).collect();
    missing.sort_unstable();
    missing.dedup();
    if missing.is_empty() {
        return None;
    }
    let line = format!("from {EXPRESSIONS_MODULE} import {}", missing.join(", "));
    match module.imports.iter().map(|i| i.span.end).max() {
        Some(end) => {
            // Statement span stops before the newline; keep the new line after it.
            let at = source[end..].find('\n').map_or(source.len(), |n| end + n);
            Some(TextEdit::insert(at, format!("\n{line}")))
        }
        None => Some(TextEdit::insert(0, format!("{line}\n"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::Path;
    use wetwire_discover::{parse_module, DEFAULT_PACKAGE};

    fn spans_of(source: &str, needles: &[&str]) -> Vec<Span> {
        needles
            .iter()
            .map(|n| {
                let start = source.find(n).unwrap();
                Span::new(start, start + n.len())
            })
            .collect()
    }

    fn remove(source: &str, needles: &[&str], indexes: &[usize]) -> String {
        let entries = spans_of(source, needles);
        let edits = entry_removals(source, &entries, &indexes.iter().copied().collect());
        apply_edits(source, &edits).unwrap()
    }

    #[test]
    fn applies_back_to_front() {
        let out = apply_edits(
            "abcdef",
            &[TextEdit::replace(Span::new(0, 1), "XY"), TextEdit::delete(Span::new(3, 5))],
        )
        .unwrap();
        assert_eq!(out, "XYbcf");
    }

    #[test]
    fn overlapping_edits_rejected() {
        let err = apply_edits(
            "abcdef",
            &[TextEdit::delete(Span::new(0, 3)), TextEdit::delete(Span::new(2, 4))],
        )
        .unwrap_err();
        assert!(matches!(err, LintError::OverlappingEdits { .. }));
    }

    #[test]
    fn removes_middle_entry() {
        let src = r#"{"a": 1, "b": 2, "c": 3}"#;
        assert_eq!(remove(src, &[r#""a": 1"#, r#""b": 2"#, r#""c": 3"#], &[1]), r#"{"a": 1, "c": 3}"#);
    }

    #[test]
    fn removes_trailing_entries() {
        let src = "{\n    \"a\": 1,\n    \"b\": 2,\n    \"c\": 3,\n}";
        let out = remove(src, &["\"a\": 1", "\"b\": 2", "\"c\": 3"], &[1, 2]);
        assert_eq!(out, "{\n    \"a\": 1,\n}");
    }

    #[test]
    fn removes_every_entry() {
        let src = r#"{"a": 1, "b": 2,}"#;
        assert_eq!(remove(src, &[r#""a": 1"#, r#""b": 2"#], &[0, 1]), "{}");
    }

    #[test]
    fn remaps_spans_after_earlier_edits() {
        let edits = [TextEdit::replace(Span::new(0, 2), "abcd")];
        assert_eq!(remap_span(Span::new(5, 7), &edits), Span::new(7, 9));
        assert_eq!(written_spans(&edits), vec![Span::new(0, 4)]);
    }

    #[test]
    fn import_goes_after_last_import() {
        let src = "from wetwire_github.workflow import Job\nimport os\n\nx = 1\n";
        let module = parse_module(Path::new("m.py"), src, DEFAULT_PACKAGE).unwrap();
        let edit = import_insertion(&module, src, &["always"]).unwrap();
        assert_eq!(
            apply_edits(src, &[edit]).unwrap(),
            "from wetwire_github.workflow import Job\nimport os\nfrom wetwire_github.workflow.expressions import always\n\nx = 1\n"
        );
    }

    #[test]
    fn bound_names_need_no_import() {
        let src = "from wetwire_github.workflow.expressions import Secrets\n";
        let module = parse_module(Path::new("m.py"), src, DEFAULT_PACKAGE).unwrap();
        assert_eq!(import_insertion(&module, src, &["Secrets"]), None);
    }
}
