//! Module-level syntax: imports and top-level bindings
//!
//! Only module-level statements are inspected. Bindings made inside function
//! bodies, loops or conditionals are invisible to discovery.

use crate::cache::SourceHash;
use crate::error::{DiscoveryError, Result};
use crate::lower::{expression_children, position, span, Lowerer};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tree_sitter::{Node, Parser};
use wetwire_model::{EntityKind, Position, Span, Value};

/// A parsed source module
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedModule {
    /// Defining file
    pub path: PathBuf,
    /// Hash of path and source text
    pub hash: SourceHash,
    /// Module-level imports in source order
    pub imports: Vec<Import>,
    /// Module-level `name = expression` bindings in source order
    pub bindings: Vec<Binding>,
    /// Constructor names usable in this module, aliases included
    pub constructors: ConstructorTable,
}

impl ParsedModule {
    /// Last binding of `name` (later assignments shadow earlier ones)
    #[must_use]
    pub fn binding(&self, name: &str) -> Option<&Binding> {
        self.bindings.iter().rev().find(|b| b.name == name)
    }

    /// Entity kind constructed by a binding, if it is a direct constructor call
    #[must_use]
    pub fn binding_kind(&self, binding: &Binding) -> Option<EntityKind> {
        let call = binding.value.as_call()?;
        self.constructors.classify(&call.callee)
    }

    /// Whether `name` is bound at module level by an import or assignment
    #[must_use]
    pub fn binds(&self, name: &str) -> bool {
        self.imports.iter().any(|i| i.bound_name() == name) || self.binding(name).is_some()
    }
}

/// One imported name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    /// Source module for `from ... import`; `None` for plain `import`
    pub module: Option<String>,
    /// Imported name (dotted module path for plain `import`)
    pub name: String,
    /// `as` alias
    pub alias: Option<String>,
    /// Span of the whole import statement
    pub span: Span,
    /// Start of the import statement
    pub position: Position,
}

impl Import {
    /// Name the import binds in the module namespace
    #[must_use]
    pub fn bound_name(&self) -> &str {
        match (&self.alias, &self.module) {
            (Some(alias), _) => alias,
            (None, Some(_)) => &self.name,
            (None, None) => self.name.split('.').next().unwrap_or(&self.name),
        }
    }
}

/// Module-level `name = value`
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    /// Bound name
    pub name: String,
    /// Lowered right-hand side
    pub value: Value,
    /// Span of the assignment
    pub span: Span,
    /// Start of the assignment
    pub position: Position,
}

/// Maps callee names to the entity kinds they construct
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstructorTable {
    aliases: HashMap<String, EntityKind>,
}

impl ConstructorTable {
    /// Build from imports of `package` (e.g. `from wetwire_github.workflow import Job as J`)
    #[must_use]
    pub fn from_imports(imports: &[Import], package: &str) -> Self {
        let mut aliases = HashMap::new();
        for import in imports {
            let from_package = import
                .module
                .as_deref()
                .is_some_and(|m| m.split('.').next() == Some(package));
            if !from_package {
                continue;
            }
            if let Some(kind) = EntityKind::from_constructor(&import.name) {
                aliases.insert(import.bound_name().to_string(), kind);
            }
        }
        Self { aliases }
    }

    /// Kind constructed by a call to `callee`.
    ///
    /// Bare constructor names are always recognized; aliases come from
    /// imports; attribute calls (`wf.Job`) match on their last segment.
    #[must_use]
    pub fn classify(&self, callee: &str) -> Option<EntityKind> {
        if let Some((_, last)) = callee.rsplit_once('.') {
            return EntityKind::from_constructor(last);
        }
        self.aliases
            .get(callee)
            .copied()
            .or_else(|| EntityKind::from_constructor(callee))
    }
}

/// Parse one Python source text into its module-level structure.
///
/// # Errors
/// Returns [`DiscoveryError::Syntax`] when the source does not parse cleanly.
pub fn parse_module(path: &Path, source: &str, package: &str) -> Result<ParsedModule> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|e| DiscoveryError::ParserInit(e.to_string()))?;
    let tree = parser
        .parse(source, None)
        .ok_or_else(|| DiscoveryError::ParserInit("parser returned no tree".into()))?;

    let root = tree.root_node();
    if let Some(bad) = first_error(root) {
        let at = position(bad);
        let message = if bad.is_missing() {
            format!("missing '{}'", bad.kind())
        } else {
            let snippet: String = Lowerer::new(source).text(bad).chars().take(40).collect();
            format!("unexpected '{}'", snippet.trim())
        };
        return Err(DiscoveryError::syntax_error(path, at.line, at.column, message));
    }

    let lowerer = Lowerer::new(source);
    let mut imports = Vec::new();
    let mut bindings = Vec::new();
    for statement in expression_children(root) {
        match statement.kind() {
            "import_from_statement" => import_from(&lowerer, statement, &mut imports),
            "import_statement" => import_plain(&lowerer, statement, &mut imports),
            "expression_statement" => {
                for child in expression_children(statement) {
                    if let Some(binding) = assignment(&lowerer, child) {
                        bindings.push(binding);
                    }
                }
            }
            _ => {}
        }
    }

    let constructors = ConstructorTable::from_imports(&imports, package);
    Ok(ParsedModule {
        path: path.to_path_buf(),
        hash: SourceHash::compute(path, source),
        imports,
        bindings,
        constructors,
    })
}

fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    let children: Vec<_> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_error)
}

fn assignment(lowerer: &Lowerer<'_>, node: Node<'_>) -> Option<Binding> {
    if node.kind() != "assignment" {
        return None;
    }
    let left = node.child_by_field_name("left")?;
    let right = node.child_by_field_name("right")?;
    if left.kind() != "identifier" || right.kind() == "assignment" {
        return None;
    }
    Some(Binding {
        name: lowerer.text(left).to_string(),
        value: lowerer.value(right),
        span: span(node),
        position: position(node),
    })
}

fn import_from(lowerer: &Lowerer<'_>, node: Node<'_>, out: &mut Vec<Import>) {
    let module = node
        .child_by_field_name("module_name")
        .map(|m| lowerer.text(m).to_string());
    let mut cursor = node.walk();
    for name in node.children_by_field_name("name", &mut cursor) {
        if let Some((name, alias)) = imported_name(lowerer, name) {
            out.push(Import {
                module: module.clone(),
                name,
                alias,
                span: span(node),
                position: position(node),
            });
        }
    }
}

fn import_plain(lowerer: &Lowerer<'_>, node: Node<'_>, out: &mut Vec<Import>) {
    let mut cursor = node.walk();
    for name in node.children_by_field_name("name", &mut cursor) {
        if let Some((name, alias)) = imported_name(lowerer, name) {
            out.push(Import {
                module: None,
                name,
                alias,
                span: span(node),
                position: position(node),
            });
        }
    }
}

fn imported_name(lowerer: &Lowerer<'_>, node: Node<'_>) -> Option<(String, Option<String>)> {
    match node.kind() {
        "dotted_name" => Some((lowerer.text(node).to_string(), None)),
        "aliased_import" => {
            let name = node.child_by_field_name("name")?;
            let alias = node.child_by_field_name("alias")?;
            Some((
                lowerer.text(name).to_string(),
                Some(lowerer.text(alias).to_string()),
            ))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wetwire_model::ValueKind;

    const PACKAGE: &str = "wetwire_github";

    fn parse(source: &str) -> ParsedModule {
        parse_module(Path::new("ci.py"), source, PACKAGE).unwrap()
    }

    #[test]
    fn collects_imports_and_bindings() {
        let module = parse(
            "from wetwire_github.workflow import Job as J, Step\nimport wetwire_github.workflow as wf\n\nbuild = J(runs_on=\"ubuntu-latest\")\nx: int = 3\n",
        );
        let bound: Vec<_> = module.imports.iter().map(Import::bound_name).collect();
        assert_eq!(bound, vec!["J", "Step", "wf"]);
        let names: Vec<_> = module.bindings.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["build", "x"]);
        assert_eq!(module.binding_kind(&module.bindings[0]), Some(EntityKind::Job));
        assert_eq!(module.bindings[0].position, Position::new(4, 0));
    }

    #[test]
    fn lowers_nested_values() {
        let module = parse(
            "job = Job(needs=[\"a\", other], outputs={\"v\": \"${{ steps.s.outputs.v }}\"}, timeout=5, flag=True, raw=1 + 2)\n",
        );
        let call = module.bindings[0].value.as_call().unwrap();
        assert_eq!(call.callee, "Job");
        let needs = call.field("needs").unwrap().value.as_list().unwrap();
        assert_eq!(needs[0].as_str(), Some("a"));
        assert_eq!(needs[1].as_name(), Some("other"));
        let outputs = call.field("outputs").unwrap().value.as_map().unwrap();
        assert_eq!(outputs[0].key_str(), Some("v"));
        assert_eq!(call.field("timeout").unwrap().value.kind, ValueKind::Int(5));
        assert_eq!(call.field("flag").unwrap().value.kind, ValueKind::Bool(true));
        assert!(matches!(call.field("raw").unwrap().value.kind, ValueKind::Opaque(_)));
    }

    #[test]
    fn spans_point_into_source() {
        let source = "step = Step(uses=\"actions/checkout\")\n";
        let module = parse(source);
        let uses = &module.bindings[0].value.as_call().unwrap().field("uses").unwrap().value;
        assert_eq!(&source[uses.span.range()], "\"actions/checkout\"");
    }

    #[test]
    fn attribute_calls_classify_on_last_segment() {
        let table = ConstructorTable::default();
        assert_eq!(table.classify("wf.Workflow"), Some(EntityKind::Workflow));
        assert_eq!(table.classify("Workflow"), Some(EntityKind::Workflow));
        assert_eq!(table.classify("make_job"), None);
    }

    #[test]
    fn aliases_from_other_packages_are_ignored() {
        let module = parse("from elsewhere import Job as Task\nbuild = Task()\n");
        assert_eq!(module.binding_kind(&module.bindings[0]), None);
    }

    #[test]
    fn syntax_error_reports_location() {
        let err = parse_module(Path::new("bad.py"), "job = Job(\n", PACKAGE).unwrap_err();
        match err {
            DiscoveryError::Syntax { path, line, .. } => {
                assert_eq!(path, PathBuf::from("bad.py"));
                assert!(line >= 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn nested_bindings_are_not_discovered() {
        let module = parse("def make():\n    job = Job()\n    return job\n\nfor i in range(3):\n    step = Step()\n");
        assert!(module.bindings.is_empty());
    }
}
