//! Glob-based target selection over corpus-relative paths.

use globset::{GlobBuilder, GlobMatcher};

use crate::error::CorpusError;

/// Characters that make a path component a glob rather than a literal.
const GLOB_META: &[char] = &['*', '?', '[', '{'];

/// A compiled glob predicate over `/`-separated corpus paths.
///
/// `*` does not cross directory boundaries; use `**` for recursion.
#[derive(Debug, Clone)]
pub struct TargetSelector {
    pattern: String,
    matcher: GlobMatcher,
    base: String,
}

impl TargetSelector {
    pub fn new(pattern: &str) -> Result<Self, CorpusError> {
        let pattern = normalize(pattern);
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|source| CorpusError::Glob {
                pattern: pattern.to_string(),
                source,
            })?;

        Ok(Self {
            pattern: pattern.to_string(),
            matcher: glob.compile_matcher(),
            base: literal_base(pattern),
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The longest leading directory of the pattern that contains no glob
    /// syntax. Empty means the corpus root.
    pub fn base_dir(&self) -> &str {
        &self.base
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.matcher.is_match(path)
    }
}

/// Corpus paths never carry a leading `./`, so neither may the glob.
fn normalize(pattern: &str) -> &str {
    let mut pattern = pattern;
    while let Some(rest) = pattern.strip_prefix("./") {
        pattern = rest.trim_start_matches('/');
    }
    pattern
}

fn literal_base(pattern: &str) -> String {
    let components: Vec<&str> = pattern.split('/').collect();
    let mut base = Vec::new();

    // The last component is the file part unless the whole pattern is a
    // directory prefix, so it never contributes to the base.
    for component in &components[..components.len().saturating_sub(1)] {
        if component.contains(GLOB_META) {
            break;
        }
        if component.is_empty() || *component == "." {
            continue;
        }
        base.push(*component);
    }

    base.join("/")
}
