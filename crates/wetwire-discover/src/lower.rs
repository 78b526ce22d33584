//! Lowering of tree-sitter Python nodes into model values

use tree_sitter::Node;
use wetwire_model::{Call, Field, MapEntry, Position, Span, Value, ValueKind};

/// Converts expression nodes of one source text into [`Value`] trees
#[derive(Debug, Clone, Copy)]
pub(crate) struct Lowerer<'s> {
    source: &'s str,
}

impl<'s> Lowerer<'s> {
    pub(crate) fn new(source: &'s str) -> Self {
        Self { source }
    }

    pub(crate) fn text(&self, node: Node<'_>) -> &'s str {
        node.utf8_text(self.source.as_bytes()).unwrap_or_default()
    }

    pub(crate) fn value(&self, node: Node<'_>) -> Value {
        let kind = match node.kind() {
            "string" => self.string(node),
            "concatenated_string" => self.concatenated(node),
            "integer" => {
                let text = self.text(node);
                text.replace('_', "")
                    .parse::<i64>()
                    .map_or_else(|_| ValueKind::Opaque(text.to_string()), ValueKind::Int)
            }
            "float" => {
                let text = self.text(node);
                text.replace('_', "")
                    .parse::<f64>()
                    .map_or_else(|_| ValueKind::Opaque(text.to_string()), ValueKind::Float)
            }
            "true" => ValueKind::Bool(true),
            "false" => ValueKind::Bool(false),
            "none" => ValueKind::Null,
            "list" | "tuple" | "set" => ValueKind::List(
                expression_children(node)
                    .into_iter()
                    .map(|child| self.value(child))
                    .collect(),
            ),
            "parenthesized_expression" => {
                if let Some(inner) = expression_children(node).into_iter().next() {
                    return self.value(inner);
                }
                ValueKind::Opaque(self.text(node).to_string())
            }
            "dictionary" => ValueKind::Map(self.entries(node)),
            "identifier" => ValueKind::Name(self.text(node).to_string()),
            "attribute" => self
                .dotted(node)
                .map_or_else(|| ValueKind::Opaque(self.text(node).to_string()), ValueKind::Name),
            "call" => self.call(node),
            _ => ValueKind::Opaque(self.text(node).to_string()),
        };
        Value::new(kind, span(node), position(node))
    }

    /// Dotted path for identifiers and attribute chains
    pub(crate) fn dotted(&self, node: Node<'_>) -> Option<String> {
        match node.kind() {
            "identifier" => Some(self.text(node).to_string()),
            "attribute" => {
                let object = self.dotted(node.child_by_field_name("object")?)?;
                let attribute = node.child_by_field_name("attribute")?;
                Some(format!("{object}.{}", self.text(attribute)))
            }
            _ => None,
        }
    }

    fn call(&self, node: Node<'_>) -> ValueKind {
        let Some(function) = node.child_by_field_name("function") else {
            return ValueKind::Opaque(self.text(node).to_string());
        };
        let callee = self
            .dotted(function)
            .unwrap_or_else(|| self.text(function).to_string());

        let mut args = Vec::new();
        let mut fields = Vec::new();
        if let Some(arguments) = node.child_by_field_name("arguments") {
            if arguments.kind() == "argument_list" {
                for child in expression_children(arguments) {
                    if child.kind() == "keyword_argument" {
                        let (Some(name), Some(value)) = (
                            child.child_by_field_name("name"),
                            child.child_by_field_name("value"),
                        ) else {
                            continue;
                        };
                        fields.push(Field {
                            name: self.text(name).to_string(),
                            value: self.value(value),
                            span: span(child),
                        });
                    } else {
                        args.push(self.value(child));
                    }
                }
            } else {
                args.push(self.value(arguments));
            }
        }
        ValueKind::Call(Call { callee, args, fields })
    }

    fn entries(&self, node: Node<'_>) -> Vec<MapEntry> {
        expression_children(node)
            .into_iter()
            .filter(|child| child.kind() == "pair")
            .filter_map(|pair| {
                let key = pair.child_by_field_name("key")?;
                let value = pair.child_by_field_name("value")?;
                Some(MapEntry {
                    key: self.value(key),
                    value: self.value(value),
                    span: span(pair),
                })
            })
            .collect()
    }

    fn string(&self, node: Node<'_>) -> ValueKind {
        let raw = self.text(node);
        let mut cursor = node.walk();
        let interpolated = node
            .named_children(&mut cursor)
            .any(|child| child.kind() == "interpolation");
        if interpolated {
            return ValueKind::Opaque(raw.to_string());
        }
        unquote(raw).map_or_else(|| ValueKind::Opaque(raw.to_string()), ValueKind::Str)
    }

    fn concatenated(&self, node: Node<'_>) -> ValueKind {
        let mut out = String::new();
        for part in expression_children(node) {
            match self.string(part) {
                ValueKind::Str(text) => out.push_str(&text),
                _ => return ValueKind::Opaque(self.text(node).to_string()),
            }
        }
        ValueKind::Str(out)
    }
}

/// Named children that are not comments
pub(crate) fn expression_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| child.kind() != "comment")
        .collect()
}

pub(crate) fn span(node: Node<'_>) -> Span {
    node.byte_range().into()
}

pub(crate) fn position(node: Node<'_>) -> Position {
    let point = node.start_position();
    Position::new(
        u32::try_from(point.row + 1).unwrap_or(u32::MAX),
        u32::try_from(point.column).unwrap_or(u32::MAX),
    )
}

/// Decode a Python string literal (prefix, quotes, escapes)
pub(crate) fn unquote(raw: &str) -> Option<String> {
    let quote_at = raw.find(|c| c == '"' || c == '\'')?;
    let prefix = raw[..quote_at].to_ascii_lowercase();
    let body = &raw[quote_at..];
    let quote = if body.starts_with("\"\"\"") || body.starts_with("'''") {
        &body[..3]
    } else {
        &body[..1]
    };
    if body.len() < quote.len() * 2 {
        return None;
    }
    let inner = body.strip_prefix(quote)?.strip_suffix(quote)?;

    let mut text = if prefix.contains('r') {
        inner.to_string()
    } else {
        unescape(inner)
    };
    if prefix.contains('f') {
        text = text.replace("{{", "{").replace("}}", "}");
    }
    Some(text)
}

fn unescape(inner: &str) -> String {
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            // line continuation
            Some('\n') => {}
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
