//! A single file of the corpus and its lazily derived data.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use sha2::{Digest, Sha256};

use crate::analysis::{self, FunctionFact, ImportEdge, NodeKind};

/// Why a file has no syntax tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    pub reason: String,
}

impl std::fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.reason)
    }
}

/// Result of parsing a file. Failures are a marker, never an error.
pub enum ParseOutcome {
    Parsed(tree_sitter::Tree),
    Failed(ParseFailure),
}

impl ParseOutcome {
    pub fn tree(&self) -> Option<&tree_sitter::Tree> {
        match self {
            ParseOutcome::Parsed(tree) => Some(tree),
            ParseOutcome::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&ParseFailure> {
        match self {
            ParseOutcome::Parsed(_) => None,
            ParseOutcome::Failed(failure) => Some(failure),
        }
    }
}

/// A corpus file: raw text plus cached tree and facts.
///
/// The fingerprint is computed once from the bytes read at load time and
/// never changes for the lifetime of the corpus, so every rule in a run sees
/// the same snapshot.
pub struct SourceFile {
    path: String,
    text: Arc<str>,
    fingerprint: String,
    utf8: bool,
    line_starts: OnceCell<Vec<usize>>,
    tree: OnceCell<Arc<ParseOutcome>>,
    imports: OnceCell<Arc<Vec<ImportEdge>>>,
    functions: OnceCell<Arc<Vec<FunctionFact>>>,
}

impl SourceFile {
    /// Build a file from the bytes read off disk.
    pub fn from_bytes(path: impl Into<String>, bytes: Vec<u8>) -> Self {
        let fingerprint = hex::encode(Sha256::digest(&bytes));
        let (text, utf8) = match String::from_utf8(bytes) {
            Ok(text) => (text, true),
            Err(e) => (String::from_utf8_lossy(e.as_bytes()).into_owned(), false),
        };

        Self {
            path: path.into(),
            text: Arc::from(text),
            fingerprint,
            utf8,
            line_starts: OnceCell::new(),
            tree: OnceCell::new(),
            imports: OnceCell::new(),
            functions: OnceCell::new(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn shared_text(&self) -> Arc<str> {
        Arc::clone(&self.text)
    }

    /// SHA-256 of the file bytes, hex encoded.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// File stem (`routers/wfA.py` -> `wfA`).
    pub fn stem(&self) -> &str {
        let name = self.path.rsplit('/').next().unwrap_or(&self.path);
        match name.rfind('.') {
            Some(0) | None => name,
            Some(idx) => &name[..idx],
        }
    }

    pub fn is_python(&self) -> bool {
        self.path.ends_with(".py")
    }

    /// 1-indexed line containing a byte offset.
    pub fn line_of(&self, offset: usize) -> usize {
        let starts = self.line_starts.get_or_init(|| {
            std::iter::once(0)
                .chain(self.text.match_indices('\n').map(|(idx, _)| idx + 1))
                .collect()
        });
        match starts.binary_search(&offset) {
            Ok(idx) => idx + 1,
            Err(idx) => idx,
        }
    }

    /// Parse on first access; later calls return the cached outcome.
    pub fn parse(&self) -> Arc<ParseOutcome> {
        Arc::clone(self.tree.get_or_init(|| Arc::new(self.parse_uncached())))
    }

    fn parse_uncached(&self) -> ParseOutcome {
        if !self.is_python() {
            return failed("not a Python source file");
        }
        if !self.utf8 {
            return failed("file is not valid UTF-8");
        }

        let mut parser = tree_sitter::Parser::new();
        if let Err(e) = parser.set_language(analysis::python_language()) {
            return failed(format!("loading Python grammar: {}", e));
        }

        let tree = match parser.parse(self.text.as_bytes(), None) {
            Some(tree) => tree,
            None => return failed("parser produced no tree"),
        };

        let root = tree.root_node();
        if root.has_error() {
            let line = first_error_line(root).unwrap_or(root.start_position().row + 1);
            tracing::debug!(path = %self.path, line, "syntax error");
            return failed(format!("syntax error near line {}", line));
        }

        ParseOutcome::Parsed(tree)
    }

    /// Import edges, extracted once. Empty when the file failed to parse.
    pub fn import_edges(&self) -> Arc<Vec<ImportEdge>> {
        Arc::clone(
            self.imports
                .get_or_init(|| Arc::new(analysis::import_edges(self))),
        )
    }

    /// Every function definition in the file, extracted once.
    pub fn all_functions(&self) -> anyhow::Result<Arc<Vec<FunctionFact>>> {
        self.functions
            .get_or_try_init(|| analysis::all_functions(self).map(Arc::new))
            .map(Arc::clone)
    }
}

fn failed(reason: impl Into<String>) -> ParseOutcome {
    ParseOutcome::Failed(ParseFailure {
        reason: reason.into(),
    })
}

fn first_error_line(node: tree_sitter::Node) -> Option<usize> {
    if matches!(NodeKind::of(node), NodeKind::Error) {
        return Some(node.start_position().row + 1);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).find_map(first_error_line);
    found
}
