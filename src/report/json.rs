//! JSON rendering.

use serde::Serialize;

use super::{Report, Verdict};

/// Serialized shape: the report fields plus version and verdict.
///
/// `Report` deserializes from this output directly; the extra fields are
/// ignored.
#[derive(Serialize)]
pub struct JsonReport<'a> {
    pub version: &'a str,
    pub verdict: Verdict,
    #[serde(flatten)]
    pub report: &'a Report,
}

pub(super) fn render(report: &Report) -> anyhow::Result<String> {
    let json = JsonReport {
        version: env!("CARGO_PKG_VERSION"),
        verdict: report.verdict(),
        report,
    };
    Ok(serde_json::to_string_pretty(&json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{RuleError, RuleSkip};
    use crate::rules::SkipReason;
    use crate::types::{Location, Severity, Violation};

    fn sample() -> Report {
        Report {
            rules_evaluated: 3,
            violations: vec![Violation {
                rule_id: "SEC-role-reset".into(),
                law: "SESSION-AND-TENANT-LAW.md §Rule 4".into(),
                finding_id: "SEC-002".into(),
                severity: Severity::Error,
                message: "2 \"SET ROLE\" but only 1 \"RESET ROLE\"".into(),
                locations: vec![Location::line("src/db.py", 4)],
                fix: "Wrap SET ROLE in try/finally.".into(),
            }],
            skips: vec![RuleSkip {
                rule_id: "OPS-logs".into(),
                reason: SkipReason::InsufficientData("no files".into()),
            }],
            errors: vec![RuleError {
                rule_id: "X".into(),
                error: "boom".into(),
            }],
        }
    }

    #[test]
    fn test_json_fields() {
        let out = render(&sample()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();

        assert_eq!(value["version"], env!("CARGO_PKG_VERSION"));
        assert_eq!(value["verdict"], "fail");
        assert_eq!(value["rules_evaluated"], 3);
        assert_eq!(value["violations"][0]["law"], "SESSION-AND-TENANT-LAW.md §Rule 4");
        assert_eq!(value["violations"][0]["locations"][0]["line"], 4);
        assert_eq!(value["skipped"][0]["reason"]["kind"], "insufficient_data");
        assert_eq!(value["errors"][0]["error"], "boom");
    }

    #[test]
    fn test_report_reads_back() {
        let report = sample();
        let out = render(&report).unwrap();
        let back: Report = serde_json::from_str(&out).unwrap();
        assert_eq!(back, report);
    }
}
