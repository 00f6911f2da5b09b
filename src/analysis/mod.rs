//! Fact extraction over Python sources.
//!
//! Facts are derived from the tree-sitter syntax tree of a [`SourceFile`]
//! and cached on the file, so every rule in a run shares one extraction:
//! - Import edges (module path, root package, line)
//! - Function definitions (qualified name, initializer flag, canonical body,
//!   called expressions)
//!
//! ```text
//! ┌─────────────┐     ┌───────────┐     ┌──────────────┐
//! │ SourceFile  │────▶│ python.rs │────▶│ ImportEdge   │
//! │ (text, tree)│     │ (walkers) │     │ FunctionFact │
//! └─────────────┘     └───────────┘     └──────────────┘
//!                           │
//!                           ▼
//!                     ┌────────────┐
//!                     │canonical.rs│ formatting-insensitive text
//!                     └────────────┘
//! ```
//!
//! Files that fail to parse yield no facts; rules see an empty set and
//! report the failure themselves.
//!
//! [`SourceFile`]: crate::corpus::SourceFile

mod canonical;
mod facts;
mod node_kind;
mod python;

pub use canonical::{canonical_text, unparse};
pub use facts::{FunctionFact, ImportEdge, Span};
pub use node_kind::NodeKind;
pub use python::{
    all_functions, functions, import_edges, is_initializer_name, python_language,
    text_match_lines, text_matches,
};
