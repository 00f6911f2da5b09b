//! Compliance rules.
//!
//! Every check is a [`Rule`]: an identified, immutable unit that evaluates
//! against a [`SourceCorpus`] and returns violations plus skip annotations.
//! Concrete rules are built from declarations by [`build`], the one factory.

mod count_threshold;
mod import_boundary;
mod paired_call;
mod pattern;
mod ratio_threshold;
mod registration;
mod scoped_pattern;

pub use count_threshold::{CountThresholdRule, Tolerance};
pub use import_boundary::ImportBoundaryRule;
pub use paired_call::PairedCallRule;
pub use pattern::{compile_all_canonical, CompiledPattern, TextPattern};
pub use ratio_threshold::RatioThresholdRule;
pub use registration::{NameTransform, RegistrationRule};
pub use scoped_pattern::{FunctionMatcher, ScopedPatternRule};

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::{CheckSpec, RuleFile, RuleSpec};
use crate::corpus::{SourceCorpus, SourceFile, TargetSelector};
use crate::types::{Location, Severity, Violation};

/// A compliance check.
///
/// Rules are pure with respect to the corpus: they read through its caches
/// and never mutate it. They may run concurrently with each other.
pub trait Rule: Send + Sync {
    fn meta(&self) -> &RuleMeta;

    fn id(&self) -> &str {
        &self.meta().id
    }

    /// Evaluate against the corpus. `Err` means the rule itself broke, not
    /// that the code under check is non-compliant.
    fn evaluate(&self, corpus: &SourceCorpus) -> anyhow::Result<Evaluation>;
}

/// Identity and reporting strings shared by every rule variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMeta {
    pub id: String,
    pub description: String,
    pub law: String,
    pub finding: String,
    pub fix: String,
    pub severity: Severity,
}

impl RuleMeta {
    pub fn from_spec(spec: &RuleSpec) -> Self {
        Self {
            id: spec.id.clone(),
            description: spec.description.clone(),
            law: spec.law.clone(),
            finding: spec.finding.clone(),
            fix: spec.fix.clone(),
            severity: spec.severity,
        }
    }

    /// Build a violation carrying this rule's citation and fix.
    pub fn violation(&self, message: impl Into<String>, locations: Vec<Location>) -> Violation {
        Violation {
            rule_id: self.id.clone(),
            law: self.law.clone(),
            finding_id: self.finding.clone(),
            severity: self.severity,
            message: message.into(),
            locations,
            fix: self.fix.clone(),
        }
    }
}

/// Why a rule, or part of one, was not evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    /// The directory or file the rule targets does not exist.
    MissingTarget(String),
    /// There is nothing to compute a heuristic over.
    InsufficientData(String),
    /// A file in scope has no syntax tree, so structural facts are unknown.
    ParseFailure { path: String, reason: String },
    /// The run deadline passed before the rule started.
    Timeout,
    /// The run was cancelled before the rule started.
    Cancelled,
}

impl SkipReason {
    /// Whether this skip leaves the run's verdict undecided.
    pub fn is_interruption(&self) -> bool {
        matches!(self, SkipReason::Timeout | SkipReason::Cancelled)
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingTarget(detail) => write!(f, "missing target: {}", detail),
            SkipReason::InsufficientData(detail) => write!(f, "insufficient data: {}", detail),
            SkipReason::ParseFailure { path, reason } => {
                write!(f, "parse failure: {}: {}", path, reason)
            }
            SkipReason::Timeout => write!(f, "timed out before start"),
            SkipReason::Cancelled => write!(f, "cancelled before start"),
        }
    }
}

/// Outcome of one rule evaluation.
#[derive(Debug, Clone, Default)]
pub struct Evaluation {
    pub violations: Vec<Violation>,
    pub skips: Vec<SkipReason>,
}

impl Evaluation {
    pub fn new() -> Self {
        Self::default()
    }

    /// An evaluation that did not run at all.
    pub fn skipped(reason: SkipReason) -> Self {
        Self {
            violations: Vec::new(),
            skips: vec![reason],
        }
    }

    pub fn push(&mut self, violation: Violation) {
        self.violations.push(violation);
    }

    pub fn skip(&mut self, reason: SkipReason) {
        self.skips.push(reason);
    }
}

/// `MissingTarget` when the selector's literal base directory is absent.
pub(crate) fn missing_target(
    corpus: &SourceCorpus,
    selector: &TargetSelector,
) -> Option<SkipReason> {
    let base = selector.base_dir();
    if corpus.has_dir(base) {
        return None;
    }
    let shown = if base.is_empty() { "." } else { base };
    Some(SkipReason::MissingTarget(format!(
        "directory {} not found for {}",
        shown,
        selector.pattern()
    )))
}

/// `ParseFailure` annotation for a file without a syntax tree.
pub(crate) fn parse_failure(file: &SourceFile) -> Option<SkipReason> {
    file.parse().failure().map(|failure| SkipReason::ParseFailure {
        path: file.path().to_string(),
        reason: failure.reason.clone(),
    })
}

/// Build one rule from its declaration.
pub fn build(spec: &RuleSpec) -> anyhow::Result<Box<dyn Rule>> {
    let meta = RuleMeta::from_spec(spec);

    let rule: Box<dyn Rule> = match &spec.check {
        CheckSpec::ImportBoundary {
            target,
            forbidden_import,
        } => Box::new(ImportBoundaryRule::new(meta, target, forbidden_import)?),
        CheckSpec::PairedCall {
            target,
            open,
            close,
        } => Box::new(PairedCallRule::new(meta, target, open, close)?),
        CheckSpec::Registration {
            sources,
            registry,
            transform,
        } => Box::new(RegistrationRule::new(
            meta,
            sources,
            registry,
            transform.clone(),
        )?),
        CheckSpec::ScopedPattern {
            target,
            functions,
            forbidden,
        } => Box::new(ScopedPatternRule::new(
            meta,
            target,
            functions.clone(),
            forbidden,
        )?),
        CheckSpec::RatioThreshold {
            target,
            superset,
            subset,
            min_ratio,
        } => Box::new(RatioThresholdRule::new(
            meta, target, superset, subset, *min_ratio,
        )?),
        CheckSpec::CountThreshold {
            groups,
            template,
            min_count,
            max_under,
            max_under_fraction,
        } => {
            let tolerance = Tolerance::from_config(*max_under, *max_under_fraction);
            Box::new(CountThresholdRule::new(
                meta, groups, template, *min_count, tolerance,
            )?)
        }
    };

    Ok(rule)
}

/// Build every rule a rule file declares, including layer-table expansions.
pub fn build_all(file: &RuleFile) -> anyhow::Result<Vec<Box<dyn Rule>>> {
    file.all_rules()
        .iter()
        .map(|spec| build(spec).map_err(|e| e.context(format!("building rule {:?}", spec.id))))
        .collect()
}
