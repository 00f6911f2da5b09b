//! Typed errors for the library surface.
//!
//! Parse failures and missing targets are not errors here: they are values
//! (`ParseOutcome::Failed`, `SkipReason::MissingTarget`) that rules handle.

use thiserror::Error;

/// Errors raised while indexing or reading the corpus.
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("reading {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid glob {pattern:?}: {source}")]
    Glob {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}

/// Errors raised while loading or validating a rule file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading rule file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing rule file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("rule {rule:?}: {message}")]
    Invalid { rule: String, message: String },
}

impl ConfigError {
    pub(crate) fn invalid(rule: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            rule: rule.into(),
            message: message.into(),
        }
    }
}

/// Errors raised by the rule registry.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("rule {0:?} is already registered")]
    DuplicateRule(String),
}
