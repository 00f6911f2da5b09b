//! Lazy, cached view over a source tree for one run.
//!
//! The corpus provides:
//! - A directory index snapshot taken on first access
//! - Read-through caching of file text keyed by corpus path
//! - Lazily parsed syntax trees and facts (see [`SourceFile`])
//!
//! A corpus is built fresh for each run; nothing is shared between runs.

mod selector;
mod source;

pub use selector::TargetSelector;
pub use source::{ParseFailure, ParseOutcome, SourceFile};

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use once_cell::sync::OnceCell;
use walkdir::WalkDir;

use crate::error::CorpusError;

/// Directory names never indexed.
const SKIPPED_DIRS: &[&str] = &["__pycache__", "node_modules", "venv"];

/// Snapshot of the tree as it looked at first access.
#[derive(Debug, Default)]
struct Index {
    files: Vec<String>,
    dirs: BTreeSet<String>,
}

/// Indexed, cached view of a source tree.
pub struct SourceCorpus {
    root: PathBuf,
    index: OnceCell<Index>,
    cache: RwLock<HashMap<String, Arc<SourceFile>>>,
}

impl SourceCorpus {
    /// Create a corpus rooted at `root`. Nothing is read until first use.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            index: OnceCell::new(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn index(&self) -> &Index {
        self.index.get_or_init(|| build_index(&self.root))
    }

    /// All indexed file paths, sorted.
    pub fn paths(&self) -> &[String] {
        &self.index().files
    }

    /// Whether `rel` was a directory at index time. The empty path is the root.
    pub fn has_dir(&self, rel: &str) -> bool {
        self.index().dirs.contains(rel.trim_end_matches('/'))
    }

    /// Whether `rel` was a file at index time.
    pub fn has_file(&self, rel: &str) -> bool {
        self.index().files.binary_search_by(|p| p.as_str().cmp(rel)).is_ok()
    }

    /// Paths matching a selector, without loading any file.
    pub fn matching_paths<'a>(&'a self, selector: &TargetSelector) -> Vec<&'a str> {
        self.paths()
            .iter()
            .map(String::as_str)
            .filter(|p| selector.is_match(p))
            .collect()
    }

    /// Lazy, restartable sequence of files matching a selector.
    pub fn files<'a>(&'a self, selector: &TargetSelector) -> Files<'a> {
        Files {
            corpus: self,
            paths: self.matching_paths(selector),
            next: 0,
        }
    }

    /// Load a file through the cache. `None` if it is not in the index.
    pub fn file(&self, path: &str) -> Result<Option<Arc<SourceFile>>, CorpusError> {
        if !self.has_file(path) {
            return Ok(None);
        }
        self.load(path).map(Some)
    }

    /// Cached raw text of a file.
    pub fn text(&self, path: &str) -> Result<Option<Arc<str>>, CorpusError> {
        Ok(self.file(path)?.map(|f| f.shared_text()))
    }

    /// Cached parse outcome of a file.
    pub fn tree(&self, path: &str) -> Result<Option<Arc<ParseOutcome>>, CorpusError> {
        Ok(self.file(path)?.map(|f| f.parse()))
    }

    /// Number of files read from disk so far.
    pub fn loaded_count(&self) -> usize {
        self.cache.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn load(&self, path: &str) -> Result<Arc<SourceFile>, CorpusError> {
        {
            let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(file) = cache.get(path) {
                return Ok(Arc::clone(file));
            }
        }

        // Read outside the lock. Two racing readers may both read the file,
        // but only the first insert is kept and both return it.
        let bytes = fs::read(self.root.join(path)).map_err(|source| CorpusError::Read {
            path: path.to_string(),
            source,
        })?;
        let loaded = Arc::new(SourceFile::from_bytes(path, bytes));
        tracing::trace!(path, fingerprint = loaded.fingerprint(), "loaded file");

        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        let entry = cache.entry(path.to_string()).or_insert(loaded);
        Ok(Arc::clone(entry))
    }
}

/// Iterator over corpus files. Clone it to restart from the same position.
#[derive(Clone)]
pub struct Files<'a> {
    corpus: &'a SourceCorpus,
    paths: Vec<&'a str>,
    next: usize,
}

impl Iterator for Files<'_> {
    type Item = Result<Arc<SourceFile>, CorpusError>;

    fn next(&mut self) -> Option<Self::Item> {
        let path = self.paths.get(self.next)?;
        self.next += 1;
        Some(self.corpus.load(path))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.paths.len() - self.next;
        (remaining, Some(remaining))
    }
}

fn is_skipped_dir(name: &str) -> bool {
    name.starts_with('.') || SKIPPED_DIRS.contains(&name)
}

fn build_index(root: &Path) -> Index {
    let mut index = Index::default();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0
                || !e.file_type().is_dir()
                || !is_skipped_dir(&e.file_name().to_string_lossy())
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable corpus entry");
                continue;
            }
        };

        let rel = match entry.path().strip_prefix(root) {
            Ok(rel) => relative_key(rel),
            Err(_) => continue,
        };

        if entry.file_type().is_dir() {
            index.dirs.insert(rel);
        } else if entry.file_type().is_file() {
            index.files.push(rel);
        }
    }

    index.files.sort();
    tracing::debug!(
        root = %root.display(),
        files = index.files.len(),
        dirs = index.dirs.len(),
        "indexed corpus"
    );
    index
}

fn relative_key(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
