//! Human-readable rendering, grouped per rule.

use std::collections::BTreeMap;
use std::fmt::{self, Write as _};

use colored::{ColoredString, Colorize};

use super::{Report, Verdict};
use crate::types::{Severity, Violation};

/// Applies color only when asked, so plain output is stable.
struct Painter {
    color: bool,
}

impl Painter {
    fn paint(&self, text: &str, style: fn(&str) -> ColoredString) -> String {
        if self.color {
            style(text).to_string()
        } else {
            text.to_string()
        }
    }

    fn verdict(&self, verdict: Verdict) -> String {
        let text = verdict.to_string();
        match verdict {
            Verdict::Pass => self.paint(&text, |s| s.green().bold()),
            Verdict::Fail => self.paint(&text, |s| s.red().bold()),
            Verdict::Incomplete => self.paint(&text, |s| s.yellow().bold()),
        }
    }

    fn severity(&self, severity: Severity) -> String {
        let text = severity.to_string();
        match severity {
            Severity::Error => self.paint(&text, |s| s.red()),
            Severity::Warning => self.paint(&text, |s| s.yellow()),
            Severity::Info => self.paint(&text, |s| s.blue()),
        }
    }
}

pub(super) fn render(report: &Report, color: bool) -> Result<String, fmt::Error> {
    let p = Painter { color };
    let verdict = report.verdict();
    let mut out = String::new();

    writeln!(
        out,
        "{} v{}  {}  {} violation(s), {} skipped, {} error(s) across {} rule(s)",
        p.paint("lawcheck", |s| s.cyan().bold()),
        env!("CARGO_PKG_VERSION"),
        p.verdict(verdict),
        report.violations.len(),
        report.skips.len(),
        report.errors.len(),
        report.rules_evaluated
    )?;

    let mut by_rule: BTreeMap<&str, Vec<&Violation>> = BTreeMap::new();
    for v in &report.violations {
        by_rule.entry(v.rule_id.as_str()).or_default().push(v);
    }

    for (rule_id, violations) in &by_rule {
        let first = violations[0];
        out.push('\n');
        writeln!(
            out,
            "{} ({}, {})",
            p.paint(rule_id, |s| s.bold()),
            p.severity(first.severity),
            violations.len()
        )?;
        writeln!(out, "  {} {}", p.paint("LAW:", |s| s.dimmed()), first.law)?;
        writeln!(
            out,
            "  {} {}",
            p.paint("FINDING:", |s| s.dimmed()),
            first.finding_id
        )?;
        for v in violations {
            let primary = v
                .primary_location()
                .map(|l| l.to_string())
                .unwrap_or_else(|| "(no location)".to_string());
            writeln!(out, "    {} {}", p.paint(&primary, |s| s.blue()), v.message)?;
            for extra in v.locations.iter().skip(1) {
                writeln!(out, "      {}", p.paint(&extra.to_string(), |s| s.dimmed()))?;
            }
        }
        writeln!(out, "  {} {}", p.paint("FIX:", |s| s.green()), first.fix)?;
    }

    if !report.skips.is_empty() {
        out.push('\n');
        writeln!(out, "{} ({}):", p.paint("Skipped", |s| s.bold()), report.skips.len())?;
        for skip in &report.skips {
            writeln!(out, "  {}: {}", skip.rule_id, skip.reason)?;
        }
    }

    if !report.errors.is_empty() {
        out.push('\n');
        writeln!(
            out,
            "{} ({}):",
            p.paint("Internal errors", |s| s.red().bold()),
            report.errors.len()
        )?;
        for error in &report.errors {
            writeln!(out, "  {}: {}", error.rule_id, error.error)?;
        }
    }

    out.push('\n');
    writeln!(out, "Verdict: {}", p.verdict(verdict))?;
    Ok(out)
}
