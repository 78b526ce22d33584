//! Lowered syntax values
//!
//! Constructor arguments are kept as a small value tree rather than the raw
//! syntax tree: scalars, lists, mappings, bare names (references to other
//! bindings), nested calls, and opaque text for everything else. Every node
//! remembers where it came from so fixes can rewrite the exact source span.

use crate::location::{Position, Span};
use serde::Serialize;

/// A value with its source span and start position
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Value {
    /// What the value is
    pub kind: ValueKind,
    /// Byte span in the defining source
    pub span: Span,
    /// Start position in the defining source
    pub position: Position,
}

/// Shape of a lowered value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ValueKind {
    /// String literal, unquoted and unescaped
    Str(String),
    /// Integer literal
    Int(i64),
    /// Float literal
    Float(f64),
    /// `True` / `False`
    Bool(bool),
    /// `None`
    Null,
    /// List, tuple or set literal
    List(Vec<Value>),
    /// Dict literal, in source order (duplicate keys preserved)
    Map(Vec<MapEntry>),
    /// Identifier or dotted attribute path
    Name(String),
    /// Call expression
    Call(Call),
    /// Any other expression, as source text
    Opaque(String),
}

/// One `key: value` pair of a dict literal
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapEntry {
    /// Key expression
    pub key: Value,
    /// Value expression
    pub value: Value,
    /// Span covering key through value
    pub span: Span,
}

impl MapEntry {
    /// Key as a string, if it is a string literal
    #[inline]
    #[must_use]
    pub fn key_str(&self) -> Option<&str> {
        self.key.as_str()
    }
}

/// Call expression: `callee(args..., name=value...)`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Call {
    /// Dotted callee path as written (`Job`, `wf.Job`)
    pub callee: String,
    /// Positional arguments
    pub args: Vec<Value>,
    /// Keyword arguments in source order
    pub fields: Vec<Field>,
}

impl Call {
    /// Last segment of the callee path
    #[must_use]
    pub fn callee_name(&self) -> &str {
        self.callee.rsplit('.').next().unwrap_or(&self.callee)
    }

    /// First keyword argument with this name
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Value of the first keyword argument matching any of `names`
    #[must_use]
    pub fn field_value(&self, names: &[&str]) -> Option<&Value> {
        names
            .iter()
            .find_map(|name| self.field(name))
            .map(|f| &f.value)
    }
}

/// Named field: a keyword argument of a constructor call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    /// Keyword
    pub name: String,
    /// Argument value
    pub value: Value,
    /// Span covering `name=value`
    pub span: Span,
}

impl Value {
    /// Create value
    #[inline]
    #[must_use]
    pub fn new(kind: ValueKind, span: Span, position: Position) -> Self {
        Self { kind, span, position }
    }

    /// String literal contents
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match &self.kind {
            ValueKind::Str(s) => Some(s),
            _ => None,
        }
    }

    /// List items
    #[inline]
    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match &self.kind {
            ValueKind::List(items) => Some(items),
            _ => None,
        }
    }

    /// Dict entries
    #[inline]
    #[must_use]
    pub fn as_map(&self) -> Option<&[MapEntry]> {
        match &self.kind {
            ValueKind::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Name or dotted path
    #[inline]
    #[must_use]
    pub fn as_name(&self) -> Option<&str> {
        match &self.kind {
            ValueKind::Name(name) => Some(name),
            _ => None,
        }
    }

    /// Call expression
    #[inline]
    #[must_use]
    pub fn as_call(&self) -> Option<&Call> {
        match &self.kind {
            ValueKind::Call(call) => Some(call),
            _ => None,
        }
    }

    /// Look up a string key in a dict value
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map()?
            .iter()
            .find(|entry| entry.key_str() == Some(key))
            .map(|entry| &entry.value)
    }

    /// Visit this value and every nested value, depth first, in source order
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Value)) {
        visit(self);
        match &self.kind {
            ValueKind::List(items) => items.iter().for_each(|item| item.walk(visit)),
            ValueKind::Map(entries) => {
                for entry in entries {
                    entry.key.walk(visit);
                    entry.value.walk(visit);
                }
            }
            ValueKind::Call(call) => {
                call.args.iter().for_each(|arg| arg.walk(visit));
                call.fields.iter().for_each(|field| field.value.walk(visit));
            }
            _ => {}
        }
    }

    /// Every string literal reachable from this value, excluding dict keys
    #[must_use]
    pub fn strings(&self) -> Vec<&Value> {
        let mut out = Vec::new();
        self.collect_strings(&mut out);
        out
    }

    fn collect_strings<'a>(&'a self, out: &mut Vec<&'a Value>) {
        match &self.kind {
            ValueKind::Str(_) => out.push(self),
            ValueKind::List(items) => items.iter().for_each(|item| item.collect_strings(out)),
            ValueKind::Map(entries) => {
                entries.iter().for_each(|entry| entry.value.collect_strings(out));
            }
            ValueKind::Call(call) => {
                call.args.iter().for_each(|arg| arg.collect_strings(out));
                call.fields
                    .iter()
                    .for_each(|field| field.value.collect_strings(out));
            }
            _ => {}
        }
    }

    /// Root names referenced anywhere inside this value.
    ///
    /// `build.outputs` yields `build`; callee names are not references.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_names(&mut out);
        out
    }

    fn collect_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        match &self.kind {
            ValueKind::Name(path) => {
                let root = path.split('.').next().unwrap_or(path);
                if !out.contains(&root) {
                    out.push(root);
                }
            }
            ValueKind::List(items) => items.iter().for_each(|item| item.collect_names(out)),
            ValueKind::Map(entries) => {
                for entry in entries {
                    entry.key.collect_names(out);
                    entry.value.collect_names(out);
                }
            }
            ValueKind::Call(call) => {
                call.args.iter().for_each(|arg| arg.collect_names(out));
                call.fields
                    .iter()
                    .for_each(|field| field.value.collect_names(out));
            }
            _ => {}
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    pub(crate) fn val(kind: ValueKind) -> Value {
        Value::new(kind, Span::default(), Position::default())
    }

    pub(crate) fn s(text: &str) -> Value {
        val(ValueKind::Str(text.to_string()))
    }

    fn name(text: &str) -> Value {
        val(ValueKind::Name(text.to_string()))
    }

    fn entry(key: &str, value: Value) -> MapEntry {
        MapEntry {
            key: s(key),
            value,
            span: Span::default(),
        }
    }

    #[test]
    fn names_are_collected_once_by_root() {
        let value = val(ValueKind::Map(vec![
            entry("build", name("build_job")),
            entry("test", name("test_job.outputs")),
            entry("again", name("build_job")),
        ]));
        assert_eq!(value.names(), vec!["build_job", "test_job"]);
    }

    #[test]
    fn call_callee_is_not_a_reference() {
        let value = val(ValueKind::Call(Call {
            callee: "wf.Step".into(),
            args: vec![],
            fields: vec![Field {
                name: "run".into(),
                value: name("command"),
                span: Span::default(),
            }],
        }));
        assert_eq!(value.names(), vec!["command"]);
        assert_eq!(value.as_call().map(Call::callee_name), Some("Step"));
    }

    #[test]
    fn strings_skip_dict_keys() {
        let value = val(ValueKind::Map(vec![entry("KEY", s("${{ secrets.TOKEN }}"))]));
        let found: Vec<_> = value.strings().into_iter().filter_map(Value::as_str).collect();
        assert_eq!(found, vec!["${{ secrets.TOKEN }}"]);
    }

    #[test]
    fn get_reads_string_keys() {
        let value = val(ValueKind::Map(vec![entry("push", val(ValueKind::Null))]));
        assert!(value.get("push").is_some());
        assert!(value.get("pull_request").is_none());
    }
}
