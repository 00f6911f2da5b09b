//! Run results and their renderings.
//!
//! Supports two output formats:
//! - Text: grouped per rule for humans, optionally colored
//! - JSON: structured output for programmatic consumption
//!
//! Both renderings of the same report are byte-identical across runs.

mod json;
mod text;

pub use json::JsonReport;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::rules::SkipReason;
use crate::types::{compare_violations, Violation};

/// A rule, or part of one, that did not run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSkip {
    pub rule_id: String,
    pub reason: SkipReason,
}

/// A rule that broke while evaluating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleError {
    pub rule_id: String,
    pub error: String,
}

/// Merged, ordered result of one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Number of rules registered for the run.
    pub rules_evaluated: usize,
    pub violations: Vec<Violation>,
    #[serde(default, rename = "skipped")]
    pub skips: Vec<RuleSkip>,
    #[serde(default)]
    pub errors: Vec<RuleError>,
}

impl Report {
    pub fn new(rules_evaluated: usize) -> Self {
        Self {
            rules_evaluated,
            ..Self::default()
        }
    }

    /// Put every list into its canonical order.
    pub fn sort(&mut self) {
        self.violations.sort_by(compare_violations);
        self.skips.sort_by(|a, b| {
            a.rule_id
                .cmp(&b.rule_id)
                .then_with(|| a.reason.to_string().cmp(&b.reason.to_string()))
        });
        self.errors.sort_by(|a, b| {
            a.rule_id
                .cmp(&b.rule_id)
                .then_with(|| a.error.cmp(&b.error))
        });
    }

    pub fn verdict(&self) -> Verdict {
        verdict(self)
    }
}

/// Overall outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Pass,
    Fail,
    /// No violation was found, but some rule broke or never ran.
    Incomplete,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Pass => write!(f, "PASS"),
            Verdict::Fail => write!(f, "FAIL"),
            Verdict::Incomplete => write!(f, "INCOMPLETE"),
        }
    }
}

/// `Fail` on any violation; otherwise `Incomplete` on any internal error or
/// interrupted rule; otherwise `Pass`.
pub fn verdict(report: &Report) -> Verdict {
    if !report.violations.is_empty() {
        return Verdict::Fail;
    }
    let interrupted = report.skips.iter().any(|s| s.reason.is_interruption());
    if !report.errors.is_empty() || interrupted {
        return Verdict::Incomplete;
    }
    Verdict::Pass
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Text,
    Json,
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Format::Text),
            "json" => Ok(Format::Json),
            _ => Err(format!("invalid format {:?}, must be 'text' or 'json'", s)),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Text => write!(f, "text"),
            Format::Json => write!(f, "json"),
        }
    }
}

/// Render a report without color.
pub fn render(report: &Report, format: Format) -> anyhow::Result<String> {
    render_with(report, format, false)
}

/// Render a report; `color` only affects the text format.
pub fn render_with(report: &Report, format: Format, color: bool) -> anyhow::Result<String> {
    match format {
        Format::Text => Ok(text::render(report, color)?),
        Format::Json => json::render(report),
    }
}
