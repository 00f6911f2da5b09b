//! Python fact extraction using tree-sitter.

use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;
use streaming_iterator::StreamingIterator;
use tree_sitter::{Language, Node, Query, QueryCursor};

use super::{canonical, FunctionFact, ImportEdge, NodeKind, Span};
use crate::corpus::SourceFile;

/// Function names treated as constructors/initializers.
const INITIALIZER_NAMES: &[&str] = &["__init__", "__new__", "__post_init__"];

/// Tree-sitter query for call expressions; `@callee` is the called expression.
const CALL_QUERY: &str = r#"
(call
  function: (_) @callee
)
"#;

static PYTHON: Lazy<Language> = Lazy::new(|| tree_sitter_python::LANGUAGE.into());

static CALLS: OnceCell<Query> = OnceCell::new();

/// The tree-sitter Python grammar.
pub fn python_language() -> &'static Language {
    &PYTHON
}

fn call_query() -> anyhow::Result<&'static Query> {
    CALLS.get_or_try_init(|| {
        Query::new(python_language(), CALL_QUERY)
            .map_err(|e| anyhow::anyhow!("compiling call query: {}", e))
    })
}

/// Whether a function name denotes an initializer.
pub fn is_initializer_name(name: &str) -> bool {
    INITIALIZER_NAMES.contains(&name)
}

/// Import edges of a file, top-level and nested.
///
/// Returns an empty set for files without a syntax tree.
pub fn import_edges(file: &SourceFile) -> Vec<ImportEdge> {
    let outcome = file.parse();
    let tree = match outcome.tree() {
        Some(tree) => tree,
        None => return Vec::new(),
    };

    let mut edges = Vec::new();
    collect_imports(
        tree.root_node(),
        file.path(),
        file.text().as_bytes(),
        &mut edges,
    );
    edges
}

fn collect_imports(node: Node, path: &str, source: &[u8], edges: &mut Vec<ImportEdge>) {
    let line = node.start_position().row + 1;

    match NodeKind::of(node) {
        NodeKind::ImportStatement => {
            let mut cursor = node.walk();
            for name in node.children_by_field_name("name", &mut cursor) {
                if let Some(module) = imported_module(name, source) {
                    edges.push(ImportEdge::new(path, &module, line));
                }
            }
        }
        NodeKind::ImportFromStatement => {
            let module = node
                .child_by_field_name("module_name")
                .and_then(|n| from_module(n, source));
            if let Some(module) = module {
                let mut cursor = node.walk();
                let names = node
                    .children_by_field_name("name", &mut cursor)
                    .filter_map(|name| imported_module(name, source))
                    .collect();
                edges.push(ImportEdge::new(path, &module, line).with_names(names));
            }
        }
        NodeKind::FutureImportStatement => {
            edges.push(ImportEdge::new(path, "__future__", line));
        }
        NodeKind::Comment
        | NodeKind::String
        | NodeKind::ConcatenatedString
        | NodeKind::LineContinuation
        | NodeKind::DottedName
        | NodeKind::AliasedImport
        | NodeKind::RelativeImport
        | NodeKind::Error => {}
        NodeKind::Module
        | NodeKind::Block
        | NodeKind::ClassDefinition
        | NodeKind::FunctionDefinition
        | NodeKind::DecoratedDefinition
        | NodeKind::Call
        | NodeKind::Other => {
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                collect_imports(child, path, source, edges);
            }
        }
    }
}

/// Module named by an `import` clause (`a.b` or `a.b as c`).
fn imported_module(node: Node, source: &[u8]) -> Option<String> {
    match NodeKind::of(node) {
        NodeKind::DottedName => Some(canonical::unparse(node, source)),
        NodeKind::AliasedImport => node
            .child_by_field_name("name")
            .map(|name| canonical::unparse(name, source)),
        _ => None,
    }
}

/// Module named by a `from ... import` clause. Relative imports lose their
/// leading dots; a bare `from . import x` names no module.
fn from_module(node: Node, source: &[u8]) -> Option<String> {
    match NodeKind::of(node) {
        NodeKind::DottedName => Some(canonical::unparse(node, source)),
        NodeKind::RelativeImport => {
            let text = canonical::unparse(node, source);
            let module = text.trim_start_matches('.');
            if module.is_empty() {
                None
            } else {
                Some(module.to_string())
            }
        }
        _ => None,
    }
}

/// Every function and method definition in a file, in source order.
pub fn all_functions(file: &SourceFile) -> anyhow::Result<Vec<FunctionFact>> {
    let outcome = file.parse();
    let tree = match outcome.tree() {
        Some(tree) => tree,
        None => return Ok(Vec::new()),
    };

    let mut collector = FunctionCollector {
        file: file.path(),
        source: file.text().as_bytes(),
        query: call_query()?,
        scope: Vec::new(),
        out: Vec::new(),
    };
    collector.visit(tree.root_node());
    Ok(collector.out)
}

/// Functions whose bare name satisfies `predicate`.
pub fn functions<F>(file: &SourceFile, predicate: F) -> anyhow::Result<Vec<FunctionFact>>
where
    F: Fn(&str) -> bool,
{
    Ok(file
        .all_functions()?
        .iter()
        .filter(|f| predicate(&f.name))
        .cloned()
        .collect())
}

struct FunctionCollector<'a> {
    file: &'a str,
    source: &'a [u8],
    query: &'static Query,
    scope: Vec<String>,
    out: Vec<FunctionFact>,
}

impl FunctionCollector<'_> {
    fn visit(&mut self, node: Node) {
        match NodeKind::of(node) {
            NodeKind::FunctionDefinition => {
                let name = self.name_of(node);
                let fact = FunctionFact {
                    qualified_name: self.qualify(&name),
                    file: self.file.to_string(),
                    span: Span::from_node(node),
                    is_initializer: is_initializer_name(&name),
                    body: canonical::unparse(node, self.source),
                    calls: self.calls_in(node),
                    name: name.clone(),
                };
                self.out.push(fact);
                self.nested(node, name);
            }
            NodeKind::ClassDefinition => {
                let name = self.name_of(node);
                self.nested(node, name);
            }
            NodeKind::Comment
            | NodeKind::String
            | NodeKind::ConcatenatedString
            | NodeKind::LineContinuation
            | NodeKind::Error => {}
            NodeKind::Module
            | NodeKind::Block
            | NodeKind::DecoratedDefinition
            | NodeKind::ImportStatement
            | NodeKind::ImportFromStatement
            | NodeKind::FutureImportStatement
            | NodeKind::AliasedImport
            | NodeKind::DottedName
            | NodeKind::RelativeImport
            | NodeKind::Call
            | NodeKind::Other => self.children(node),
        }
    }

    fn nested(&mut self, node: Node, name: String) {
        self.scope.push(name);
        self.children(node);
        self.scope.pop();
    }

    fn children(&mut self, node: Node) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.visit(child);
        }
    }

    fn name_of(&self, node: Node) -> String {
        node.child_by_field_name("name")
            .and_then(|n| n.utf8_text(self.source).ok())
            .unwrap_or("")
            .to_string()
    }

    fn qualify(&self, name: &str) -> String {
        if self.scope.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", self.scope.join("."), name)
        }
    }

    fn calls_in(&self, node: Node) -> std::collections::BTreeSet<String> {
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(self.query, node, self.source);

        let mut calls = std::collections::BTreeSet::new();
        while let Some(m) = matches.next() {
            for capture in m.captures {
                calls.insert(canonical::unparse(capture.node, self.source));
            }
        }
        calls
    }
}

/// Count of non-overlapping regex matches in the raw text.
pub fn text_matches(file: &SourceFile, pattern: &Regex) -> usize {
    pattern.find_iter(file.text()).count()
}

/// 1-indexed line of each non-overlapping regex match in the raw text.
pub fn text_match_lines(file: &SourceFile, pattern: &Regex) -> Vec<usize> {
    pattern
        .find_iter(file.text())
        .map(|m| file.line_of(m.start()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(path: &str, text: &str) -> SourceFile {
        SourceFile::from_bytes(path, text.as_bytes().to_vec())
    }

    #[test]
    fn test_import_edges() {
        let file = source(
            "svc.py",
            r#"
import os
import pkg.routers.users as users, json
from pkg.routers import orders
from .local import helper
from . import sibling
from __future__ import annotations

def lazy():
    import requests
"#,
        );

        let edges = file.import_edges();
        let modules: Vec<_> = edges.iter().map(|e| e.module.as_str()).collect();
        assert_eq!(
            modules,
            vec![
                "os",
                "pkg.routers.users",
                "json",
                "pkg.routers",
                "local",
                "__future__",
                "requests"
            ]
        );

        let orders = &edges[3];
        assert_eq!(orders.names, vec!["orders"]);
        assert!(edges[0].names.is_empty());

        let users = &edges[1];
        assert_eq!(users.root, "pkg");
        assert_eq!(users.line, 3);
        assert_eq!(users.from_file, "svc.py");
    }

    #[test]
    fn test_functions_and_initializers() {
        let file = source(
            "svc.py",
            r#"
class Service:
    def __init__(self):
        self.client = OpenAI()

    def run(self):
        return requests.get(self.url)

def helper():
    def inner():
        pass
"#,
        );

        let all = file.all_functions().unwrap();
        let names: Vec<_> = all.iter().map(|f| f.qualified_name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Service.__init__", "Service.run", "helper", "helper.inner"]
        );

        let init = &all[0];
        assert!(init.is_initializer);
        assert_eq!(init.span.start_line, 3);
        assert!(init.calls.contains("OpenAI"));
        assert!(init.body.contains("self.client=OpenAI()"));

        let run = &all[1];
        assert!(!run.is_initializer);
        assert!(run.calls.contains("requests.get"));

        let inits = functions(&file, is_initializer_name).unwrap();
        assert_eq!(inits.len(), 1);
    }

    #[test]
    fn test_parse_failure_yields_no_facts() {
        let file = source("bad.py", "def broken(:\n    import os\n");
        assert!(file.import_edges().is_empty());
        assert!(file.all_functions().unwrap().is_empty());
    }

    #[test]
    fn test_text_matches() {
        let file = source("db.py", "SET ROLE a\nRESET ROLE\nSET ROLE b\n");
        let set_role = Regex::new("SET ROLE").unwrap();
        // RESET ROLE contains SET ROLE as a substring.
        assert_eq!(text_matches(&file, &set_role), 3);
        assert_eq!(text_match_lines(&file, &set_role), vec![1, 2, 3]);

        let anchored = Regex::new(r"\bSET ROLE").unwrap();
        assert_eq!(text_matches(&file, &anchored), 2);
    }
}
