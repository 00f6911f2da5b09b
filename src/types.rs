//! Core value types produced by rule evaluation.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// Severity levels for violations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(Severity::Error),
            "warning" => Ok(Severity::Warning),
            "info" => Ok(Severity::Info),
            _ => Err(format!("unknown severity: {}", s)),
        }
    }
}

/// A place in the corpus a violation points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// Path relative to the corpus root, `/`-separated.
    pub path: String,
    /// 1-indexed line, when the finding is tied to one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

impl Location {
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            line: None,
        }
    }

    pub fn line(path: impl Into<String>, line: usize) -> Self {
        Self {
            path: path.into(),
            line: Some(line),
        }
    }

    fn cmp_key(&self) -> (&str, usize) {
        (self.path.as_str(), self.line.unwrap_or(usize::MAX))
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{}", self.path, line),
            None => write!(f, "{}", self.path),
        }
    }
}

/// One confirmed non-compliance instance.
///
/// `law` and `finding_id` are copied verbatim from the rule declaration so
/// that downstream consumers can rely on them as stable identifiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub rule_id: String,
    pub law: String,
    pub finding_id: String,
    pub severity: Severity,
    pub message: String,
    pub locations: Vec<Location>,
    pub fix: String,
}

impl Violation {
    /// First location, which is what the report is ordered by.
    pub fn primary_location(&self) -> Option<&Location> {
        self.locations.first()
    }
}

/// Total order used for reports: path, line, rule id, then tie-breakers.
///
/// Violations without a location sort after every located one.
pub fn compare_violations(a: &Violation, b: &Violation) -> Ordering {
    fn location_rank(v: &Violation) -> (u8, (&str, usize)) {
        match v.primary_location() {
            Some(loc) => (0, loc.cmp_key()),
            None => (1, ("", usize::MAX)),
        }
    }

    location_rank(a)
        .cmp(&location_rank(b))
        .then_with(|| a.rule_id.cmp(&b.rule_id))
        .then_with(|| a.finding_id.cmp(&b.finding_id))
        .then_with(|| a.message.cmp(&b.message))
        .then_with(|| {
            let rest_a = a.locations.iter().skip(1).map(Location::cmp_key);
            let rest_b = b.locations.iter().skip(1).map(Location::cmp_key);
            rest_a.cmp(rest_b)
        })
}
