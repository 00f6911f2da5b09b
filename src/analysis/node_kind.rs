//! Closed set of Python syntax node kinds the extractors care about.

use phf::phf_map;

/// Python syntax node kinds, as a closed set.
///
/// Extractors match on this exhaustively instead of comparing kind strings,
/// so adding a variant forces every consumer to decide how to treat it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Module,
    Block,
    ClassDefinition,
    FunctionDefinition,
    DecoratedDefinition,
    ImportStatement,
    ImportFromStatement,
    FutureImportStatement,
    AliasedImport,
    DottedName,
    RelativeImport,
    Call,
    String,
    ConcatenatedString,
    Comment,
    LineContinuation,
    /// ERROR or MISSING nodes inserted by error recovery.
    Error,
    /// Anything else; traversed structurally but never special-cased.
    Other,
}

static KINDS: phf::Map<&'static str, NodeKind> = phf_map! {
    "module" => NodeKind::Module,
    "block" => NodeKind::Block,
    "class_definition" => NodeKind::ClassDefinition,
    "function_definition" => NodeKind::FunctionDefinition,
    "decorated_definition" => NodeKind::DecoratedDefinition,
    "import_statement" => NodeKind::ImportStatement,
    "import_from_statement" => NodeKind::ImportFromStatement,
    "future_import_statement" => NodeKind::FutureImportStatement,
    "aliased_import" => NodeKind::AliasedImport,
    "dotted_name" => NodeKind::DottedName,
    "relative_import" => NodeKind::RelativeImport,
    "call" => NodeKind::Call,
    "string" => NodeKind::String,
    "concatenated_string" => NodeKind::ConcatenatedString,
    "comment" => NodeKind::Comment,
    "line_continuation" => NodeKind::LineContinuation,
    "ERROR" => NodeKind::Error,
};

impl NodeKind {
    pub fn of(node: tree_sitter::Node) -> Self {
        if node.is_error() || node.is_missing() {
            return NodeKind::Error;
        }
        Self::from_kind(node.kind())
    }

    pub fn from_kind(kind: &str) -> Self {
        KINDS.get(kind).copied().unwrap_or(NodeKind::Other)
    }
}
