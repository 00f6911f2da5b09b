//! Lawcheck - rule-based compliance engine for Python source trees.
//!
//! Lawcheck scans a source tree, extracts structural facts (import edges,
//! function bodies, call sites, text matches) and evaluates declared rules
//! against them. Every violation carries the law it breaks, a stable finding
//! id and an actionable fix.
//!
//! # Architecture
//!
//! - `corpus`: lazy, cached view of the source tree for one run
//! - `analysis`: tree-sitter fact extraction over Python sources
//! - `rules`: the `Rule` trait and its six variants
//! - `engine`: registry and isolated, parallel driver
//! - `report`: ordered results, verdict, text and JSON output
//! - `config`: YAML rule declarations
//!
//! # Example
//!
//! ```no_run
//! use lawcheck::{config, RuleEngine, RuleFile, SourceCorpus};
//!
//! let rules = RuleFile::parse_file("lawcheck.yaml")?;
//! config::validate(&rules)?;
//! let engine = RuleEngine::from_config(&rules)?;
//! let report = engine.run(&SourceCorpus::new("."));
//! println!("{}", lawcheck::report::render(&report, lawcheck::Format::Text)?);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod analysis;
pub mod cli;
pub mod config;
pub mod corpus;
pub mod engine;
pub mod error;
pub mod report;
pub mod rules;
pub mod types;

pub use config::{CheckSpec, RuleFile, RuleSpec};
pub use corpus::{ParseOutcome, SourceCorpus, SourceFile, TargetSelector};
pub use engine::{CancelToken, RuleEngine, RunOptions};
pub use error::{ConfigError, CorpusError, EngineError};
pub use report::{Format, Report, Verdict};
pub use rules::{Evaluation, Rule, RuleMeta, SkipReason};
pub use types::{Location, Severity, Violation};
