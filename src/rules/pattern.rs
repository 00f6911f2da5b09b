//! Text patterns as written in rule declarations.

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::analysis;
use crate::corpus::SourceFile;

/// A pattern from the rule file.
///
/// A plain YAML string is matched literally; `{regex: "..."}` is a regular
/// expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextPattern {
    Literal(String),
    Regex { regex: String },
}

impl TextPattern {
    pub fn literal(text: impl Into<String>) -> Self {
        TextPattern::Literal(text.into())
    }

    pub fn regex(pattern: impl Into<String>) -> Self {
        TextPattern::Regex {
            regex: pattern.into(),
        }
    }

    /// The pattern as the user wrote it.
    pub fn source(&self) -> &str {
        match self {
            TextPattern::Literal(text) => text,
            TextPattern::Regex { regex } => regex,
        }
    }

    pub fn compile(&self) -> Result<CompiledPattern, regex::Error> {
        let regex = match self {
            TextPattern::Literal(text) => Regex::new(&regex::escape(text))?,
            TextPattern::Regex { regex } => Regex::new(regex)?,
        };
        Ok(CompiledPattern {
            regex,
            display: self.source().to_string(),
        })
    }

    /// Compile for matching against canonical function bodies. Literals get
    /// the same spacing rules as the body; regexes are used as written.
    pub fn compile_canonical(&self) -> Result<CompiledPattern, regex::Error> {
        match self {
            TextPattern::Literal(text) => Ok(CompiledPattern {
                regex: Regex::new(&regex::escape(&analysis::canonical_text(text)))?,
                display: text.clone(),
            }),
            TextPattern::Regex { .. } => self.compile(),
        }
    }
}

impl fmt::Display for TextPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.source())
    }
}

/// Pre-compiled pattern with the text it was built from.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    regex: Regex,
    display: String,
}

impl CompiledPattern {
    pub fn as_str(&self) -> &str {
        &self.display
    }

    pub fn is_match(&self, haystack: &str) -> bool {
        self.regex.is_match(haystack)
    }

    /// Non-overlapping matches in the file's raw text.
    pub fn count_in(&self, file: &SourceFile) -> usize {
        analysis::text_matches(file, &self.regex)
    }

    /// Line of each match in the file's raw text.
    pub fn lines_in(&self, file: &SourceFile) -> Vec<usize> {
        analysis::text_match_lines(file, &self.regex)
    }
}

/// Compile a list of patterns for searching canonical bodies, failing on
/// the first bad one.
pub fn compile_all_canonical(patterns: &[TextPattern]) -> anyhow::Result<Vec<CompiledPattern>> {
    patterns
        .iter()
        .map(|p| {
            p.compile_canonical()
                .map_err(|e| anyhow::anyhow!("compiling pattern {:?}: {}", p.source(), e))
        })
        .collect()
}
