//! Canonical unparse of a syntax subtree.
//!
//! The canonical form is what pattern rules search, so it must not depend on
//! how the source was formatted:
//! - comments and line continuations are dropped
//! - string literals are kept verbatim
//! - one logical line per statement, no indentation
//! - tokens are joined without whitespace, except a single space between two
//!   word-like tokens and after `,`
//!
//! `requests.get (url ,timeout=3)` and `requests.get(url, timeout=3)` both
//! become `requests.get(url, timeout=3)`.

use super::NodeKind;

struct Writer<'s> {
    source: &'s [u8],
    out: String,
    last_row: Option<usize>,
    depth: usize,
}

/// Render `node` in canonical form.
pub fn unparse(node: tree_sitter::Node, source: &[u8]) -> String {
    let mut writer = Writer {
        source,
        out: String::new(),
        last_row: None,
        depth: 0,
    };
    writer.visit(node);
    writer.out
}

impl Writer<'_> {
    fn visit(&mut self, node: tree_sitter::Node) {
        match NodeKind::of(node) {
            NodeKind::Comment | NodeKind::LineContinuation => {}
            NodeKind::String => self.token(node),
            NodeKind::Module
            | NodeKind::Block
            | NodeKind::ClassDefinition
            | NodeKind::FunctionDefinition
            | NodeKind::DecoratedDefinition
            | NodeKind::ImportStatement
            | NodeKind::ImportFromStatement
            | NodeKind::FutureImportStatement
            | NodeKind::AliasedImport
            | NodeKind::DottedName
            | NodeKind::RelativeImport
            | NodeKind::Call
            | NodeKind::ConcatenatedString
            | NodeKind::Error
            | NodeKind::Other => {
                if node.child_count() == 0 {
                    self.token(node);
                    return;
                }
                let mut cursor = node.walk();
                for child in node.children(&mut cursor) {
                    self.visit(child);
                }
            }
        }
    }

    fn token(&mut self, node: tree_sitter::Node) {
        let text = node.utf8_text(self.source).unwrap_or("");
        if text.is_empty() {
            return;
        }

        let row = node.start_position().row;
        if let Some(last_row) = self.last_row {
            if row > last_row && self.depth == 0 {
                self.out.push('\n');
            } else if needs_space(&self.out, text) {
                self.out.push(' ');
            }
        }

        self.out.push_str(text);
        self.last_row = Some(node.end_position().row);

        match text {
            "(" | "[" | "{" => self.depth += 1,
            ")" | "]" | "}" => self.depth = self.depth.saturating_sub(1),
            _ => {}
        }
    }
}

/// Apply the canonical spacing rules to a plain text fragment, such as a
/// literal pattern that will be searched for in canonical bodies.
///
/// Quoted runs are copied verbatim.
pub fn canonical_text(text: &str) -> String {
    let mut out = String::new();
    let mut pending_space = false;
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        if c.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        let mut buf = [0u8; 4];
        if (pending_space || out.ends_with(',')) && needs_space(&out, c.encode_utf8(&mut buf)) {
            out.push(' ');
        }
        pending_space = false;
        out.push(c);

        if c == '"' || c == '\'' {
            while let Some(inner) = chars.next() {
                out.push(inner);
                if inner == '\\' {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                } else if inner == c {
                    break;
                }
            }
        }
    }

    out
}

fn is_wordish(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '"' || c == '\''
}

fn needs_space(out: &str, next: &str) -> bool {
    let prev = match out.chars().last() {
        Some(c) => c,
        None => return false,
    };
    if prev == '\n' {
        return false;
    }
    let first = next.chars().next().unwrap_or(' ');
    if prev == ',' {
        return !matches!(first, ')' | ']' | '}');
    }
    is_wordish(prev) && is_wordish(first)
}
