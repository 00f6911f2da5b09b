//! Fact structures extracted from source files.

use std::collections::BTreeSet;
use std::fmt;

/// Source location span with byte offsets and line/column positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    /// Start byte offset (0-indexed).
    pub start_byte: usize,
    /// End byte offset (0-indexed, exclusive).
    pub end_byte: usize,
    /// Start line (1-indexed).
    pub start_line: usize,
    /// Start column (1-indexed).
    pub start_col: usize,
    /// End line (1-indexed).
    pub end_line: usize,
    /// End column (1-indexed).
    pub end_col: usize,
}

impl Span {
    /// Create a span from a tree-sitter node.
    pub fn from_node(node: tree_sitter::Node) -> Self {
        let start = node.start_position();
        let end = node.end_position();
        Self {
            start_byte: node.start_byte(),
            end_byte: node.end_byte(),
            start_line: start.row + 1, // tree-sitter is 0-indexed
            start_col: start.column + 1,
            end_line: end.row + 1,
            end_col: end.column + 1,
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start_line, self.start_col)
    }
}

/// One import statement clause, as seen from the importing file.
///
/// `from a.b import c, d` is a single edge for module `a.b` with names
/// `c` and `d`, since either name may itself be a submodule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportEdge {
    /// Importing file, corpus-relative.
    pub from_file: String,
    /// Full dotted module path (`a.b.c`).
    pub module: String,
    /// First segment of the module path (`a`).
    pub root: String,
    /// Names bound by a `from ... import` clause. Empty for plain imports.
    pub names: Vec<String>,
    /// Line of the import statement (1-indexed).
    pub line: usize,
}

impl ImportEdge {
    pub fn new(from_file: &str, module: &str, line: usize) -> Self {
        let root = module.split('.').next().unwrap_or(module).to_string();
        Self {
            from_file: from_file.to_string(),
            module: module.to_string(),
            root,
            names: Vec::new(),
            line,
        }
    }

    pub fn with_names(mut self, names: Vec<String>) -> Self {
        self.names = names;
        self
    }

    /// True if this edge imports `prefix` itself or anything below it.
    ///
    /// `a.b` covers `a.b` and `a.b.c` but not `a.bc`. `from a import b`
    /// covers `a.b`.
    pub fn is_under(&self, prefix: &str) -> bool {
        self.reached_under(prefix).is_some()
    }

    /// The imported module path that falls under `prefix`, if any.
    pub fn reached_under(&self, prefix: &str) -> Option<String> {
        if module_is_under(&self.module, prefix) {
            return Some(self.module.clone());
        }
        self.names
            .iter()
            .map(|name| format!("{}.{}", self.module, name))
            .find(|path| module_is_under(path, prefix))
    }
}

fn module_is_under(module: &str, prefix: &str) -> bool {
    match module.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('.'),
        None => false,
    }
}

/// A function or method definition.
#[derive(Debug, Clone)]
pub struct FunctionFact {
    /// Bare name (`__init__`).
    pub name: String,
    /// Enclosing classes and functions joined with `.` (`Service.__init__`).
    pub qualified_name: String,
    /// Enclosing file, corpus-relative.
    pub file: String,
    /// Span of the whole definition.
    pub span: Span,
    /// Whether this is a constructor/initializer.
    pub is_initializer: bool,
    /// Canonical unparse of the definition, insensitive to formatting.
    pub body: String,
    /// Canonical callee text of every call expression inside the definition.
    pub calls: BTreeSet<String>,
}
