//! Tests for the text and JSON report formats.
//!
//! Downstream tooling reads the JSON output, so its field names and shapes
//! are checked here against the fixture project.

use std::path::PathBuf;

use lawcheck::config::{self, RuleFile};
use lawcheck::report::{self, Format};
use lawcheck::{Report, RuleEngine, SourceCorpus};

fn testdata_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata")
}

fn run_fixture() -> Report {
    let rules = RuleFile::parse_file(testdata_path().join("lawcheck.yaml"))
        .expect("should parse fixture rules");
    config::validate(&rules).expect("fixture rules should be valid");
    let engine = RuleEngine::from_config(&rules).expect("should build rules");
    engine.run(&SourceCorpus::new(testdata_path().join("project")))
}

fn json_output() -> serde_json::Value {
    let out = report::render(&run_fixture(), Format::Json).expect("should render json");
    serde_json::from_str(&out).expect("output should be valid JSON")
}

// =============================================================================
// JSON
// =============================================================================

#[test]
fn test_json_top_level_fields() {
    let json = json_output();

    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(json["verdict"], "fail");
    assert_eq!(json["rules_evaluated"], 6);
    assert!(json["violations"].is_array());
    assert!(json["skipped"].is_array());
    assert!(json["errors"].is_array());
}

#[test]
fn test_json_violation_shape() {
    let json = json_output();
    let first = &json["violations"][0];

    assert_eq!(first["rule_id"], "SEC-role-reset");
    assert_eq!(first["law"], "SESSION-AND-TENANT-LAW.md §Rule 4");
    assert_eq!(first["finding_id"], "SEC-002");
    assert_eq!(first["severity"], "error");
    assert_eq!(first["locations"][0]["path"], "src/db/session.py");
    assert_eq!(first["locations"][0]["line"], 2);
    assert!(first["message"].as_str().unwrap().contains("SET ROLE"));
    assert!(first["fix"].as_str().unwrap().starts_with("Wrap SET ROLE"));
}

#[test]
fn test_json_file_level_location_has_no_line() {
    let json = json_output();
    let registration = json["violations"]
        .as_array()
        .unwrap()
        .iter()
        .find(|v| v["rule_id"] == "DEVOPS-router-registration")
        .unwrap();

    let location = &registration["locations"][0];
    assert_eq!(location["path"], "src/routers/wf4_billing.py");
    assert!(location.get("line").is_none());
}

#[test]
fn test_json_skip_shape() {
    let json = json_output();
    let skip = &json["skipped"][0];

    assert_eq!(skip["rule_id"], "ARCH-layer-services-routers");
    assert_eq!(skip["reason"]["kind"], "parse_failure");
    assert_eq!(skip["reason"]["detail"]["path"], "src/services/broken.py");
    assert!(skip["reason"]["detail"]["reason"]
        .as_str()
        .unwrap()
        .contains("syntax error"));
}

#[test]
fn test_json_reads_back_into_report() {
    let report = run_fixture();
    let out = report::render(&report, Format::Json).unwrap();
    let back: Report = serde_json::from_str(&out).unwrap();
    assert_eq!(back, report);
}

// =============================================================================
// Text
// =============================================================================

#[test]
fn test_text_sections() {
    let out = report::render(&run_fixture(), Format::Text).unwrap();

    assert!(out.starts_with(&format!("lawcheck v{}  FAIL  6 violation(s)", env!("CARGO_PKG_VERSION"))));
    assert!(out.contains("KRAKEN-blocking-init (error, 1)\n"));
    assert!(out.contains("  LAW: L4_Service_Guardian §Lazy Initialization\n"));
    assert!(out.contains("  FINDING: KRAKEN-001\n"));
    assert!(out.contains("    src/services/intake.py:11 \"requests.get(\" in IntakeService.__init__\n"));
    assert!(out.contains("  FIX: Use @property with _client = None pattern.\n"));
    assert!(out.contains("Skipped (2):\n"));
    assert!(!out.contains("Internal errors"));
    assert!(out.ends_with("Verdict: FAIL\n"));
}

#[test]
fn test_text_groups_in_rule_id_order() {
    let out = report::render(&run_fixture(), Format::Text).unwrap();

    let order = [
        "ARCH-layer-services-routers (",
        "DEVOPS-router-registration (",
        "KRAKEN-blocking-init (",
        "OPS-tenant-in-logs (",
        "SEC-role-reset (",
        "TEST-min-files-per-workflow (",
    ];
    let positions: Vec<_> = order.iter().map(|h| out.find(h).unwrap()).collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
}
