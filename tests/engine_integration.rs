//! Integration tests for the full rule pipeline.
//!
//! These tests build rules through the public API and run them against
//! temporary trees and the fixture project under testdata/.

use std::fs;
use std::path::{Path, PathBuf};

use lawcheck::config::{self, RuleFile};
use lawcheck::report::{self, Format};
use lawcheck::rules::{
    FunctionMatcher, ImportBoundaryRule, NameTransform, PairedCallRule, RatioThresholdRule,
    RegistrationRule, ScopedPatternRule, TextPattern,
};
use lawcheck::{
    Location, Rule, RuleEngine, RuleMeta, RunOptions, Severity, SkipReason, SourceCorpus,
    Verdict,
};
use tempfile::TempDir;

fn testdata_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata")
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn meta(id: &str, finding: &str) -> RuleMeta {
    RuleMeta {
        id: id.to_string(),
        description: String::new(),
        law: format!("LAW.md §{}", id),
        finding: finding.to_string(),
        fix: format!("fix {}", id),
        severity: Severity::Error,
    }
}

/// Run the fixture rule file against the fixture project.
fn run_fixture() -> lawcheck::Report {
    let rules = RuleFile::parse_file(testdata_path().join("lawcheck.yaml"))
        .expect("should parse fixture rules");
    config::validate(&rules).expect("fixture rules should be valid");
    let engine = RuleEngine::from_config(&rules).expect("should build rules");
    engine.run(&SourceCorpus::new(testdata_path().join("project")))
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn test_import_boundary_one_violation_per_file() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "services/a.py", "from pkg.routers import users\n");
    write(temp.path(), "services/b.py", "import pkg.routers.orders as orders\n");
    write(temp.path(), "services/c.py", "import pkg.models\n");

    let rule = ImportBoundaryRule::new(meta("ARCH", "ARCH-001"), "services/*", "pkg.routers")
        .unwrap();
    let eval = rule.evaluate(&SourceCorpus::new(temp.path())).unwrap();

    assert_eq!(eval.violations.len(), 2);
    let paths: Vec<_> = eval
        .violations
        .iter()
        .map(|v| v.locations[0].path.as_str())
        .collect();
    assert_eq!(paths, vec!["services/a.py", "services/b.py"]);
}

#[test]
fn test_paired_call_counts_per_file() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "src/a.py", "take('LOCK')\ntake('LOCK')\ngive('UNLOCK')\n");
    write(temp.path(), "src/b.py", "take('LOCK')\ngive('UNLOCK')\n");

    let rule = PairedCallRule::new(
        meta("LOCKS", "SEC-001"),
        "src/*.py",
        &TextPattern::regex(r"\bLOCK\b"),
        &TextPattern::regex(r"\bUNLOCK\b"),
    )
    .unwrap();
    let eval = rule.evaluate(&SourceCorpus::new(temp.path())).unwrap();

    assert_eq!(eval.violations.len(), 1);
    assert_eq!(eval.violations[0].locations, vec![Location::line("src/a.py", 1)]);
}

#[test]
fn test_registration_names_unregistered_file() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "routers/wfA.py", "");
    write(temp.path(), "routers/wfB.py", "");
    write(temp.path(), "main.py", "from routers import wfA\n");

    let rule = RegistrationRule::new(
        meta("REG", "DEVOPS-001"),
        "routers/*.py",
        "main.py",
        NameTransform::default(),
    )
    .unwrap();
    let eval = rule.evaluate(&SourceCorpus::new(temp.path())).unwrap();

    assert_eq!(eval.violations.len(), 1);
    assert!(eval.violations[0].message.contains("wfB"));
    assert!(!eval.violations[0].message.contains("wfA"));
}

#[test]
fn test_scoped_pattern_only_inside_named_functions() {
    let temp = TempDir::new().unwrap();
    write(
        temp.path(),
        "svc/a.py",
        "class A:\n    def __init__(self):\n        blocking_call(1)\n\n    def run(self):\n        blocking_call(2)\n",
    );
    write(
        temp.path(),
        "svc/b.py",
        "def init():\n    blocking_call(3)\n\nblocking_call(4)\n",
    );
    write(temp.path(), "svc/c.py", "def run():\n    blocking_call(5)\n");

    let rule = ScopedPatternRule::new(
        meta("INIT", "KRAKEN-001"),
        "svc/*.py",
        FunctionMatcher {
            names: vec!["init".into()],
            initializers: true,
        },
        &[TextPattern::literal("blocking_call(")],
    )
    .unwrap();
    let eval = rule.evaluate(&SourceCorpus::new(temp.path())).unwrap();

    let locations: Vec<_> = eval.violations.iter().map(|v| v.locations[0].clone()).collect();
    assert_eq!(
        locations,
        vec![Location::line("svc/a.py", 2), Location::line("svc/b.py", 1)]
    );
}

#[test]
fn test_ratio_threshold_on_ten_files() {
    let temp = TempDir::new().unwrap();
    for i in 0..7 {
        write(temp.path(), &format!("svc/quiet{}.py", i), "pass\n");
    }
    write(temp.path(), "svc/l1.py", "logger.info('a', tenant_id=t)\n");
    write(temp.path(), "svc/l2.py", "logger.info('b')\n");
    write(temp.path(), "svc/l3.py", "logger.info('c')\n");

    let rule = |target: &str| {
        RatioThresholdRule::new(
            meta("RATIO", "OPS-001"),
            target,
            &TextPattern::literal("logger."),
            &TextPattern::literal("tenant_id"),
            0.5,
        )
        .unwrap()
    };
    let corpus = SourceCorpus::new(temp.path());

    let eval = rule("svc/*.py").evaluate(&corpus).unwrap();
    assert_eq!(eval.violations.len(), 1);
    assert_eq!(eval.violations[0].locations.len(), 2);

    // Only quiet files: empty superset.
    let eval = rule("svc/quiet*.py").evaluate(&corpus).unwrap();
    assert!(eval.violations.is_empty());
    assert!(matches!(&eval.skips[..], [SkipReason::InsufficientData(_)]));
}

// =============================================================================
// Engine properties
// =============================================================================

fn sample_rules() -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(
            ImportBoundaryRule::new(meta("A-imports", "ARCH-001"), "src/*.py", "os").unwrap(),
        ),
        Box::new(
            PairedCallRule::new(
                meta("B-locks", "SEC-001"),
                "src/*.py",
                &TextPattern::literal("open("),
                &TextPattern::literal("close("),
            )
            .unwrap(),
        ),
        Box::new(
            ImportBoundaryRule::new(meta("C-missing", "ARCH-002"), "lib/*.py", "os").unwrap(),
        ),
    ]
}

fn sample_tree() -> TempDir {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "src/a.py", "import os\nf = open('x')\n");
    write(temp.path(), "src/b.py", "import os.path\nopen('y')\nopen('z')\nclose()\n");
    write(temp.path(), "src/bad.py", "import os\ndef broken(:\n");
    temp
}

#[test]
fn test_runs_are_deterministic() {
    let temp = sample_tree();

    let mut engine = RuleEngine::new();
    for rule in sample_rules() {
        engine.register(rule).unwrap();
    }

    let first = engine.run(&SourceCorpus::new(temp.path()));
    let second = engine.run(&SourceCorpus::new(temp.path()));
    assert_eq!(first, second);
    assert_eq!(
        report::render(&first, Format::Text).unwrap(),
        report::render(&second, Format::Text).unwrap()
    );
    assert_eq!(
        report::render(&first, Format::Json).unwrap(),
        report::render(&second, Format::Json).unwrap()
    );
}

#[test]
fn test_registration_order_does_not_matter() {
    let temp = sample_tree();

    let mut forward = RuleEngine::new();
    for rule in sample_rules() {
        forward.register(rule).unwrap();
    }
    let mut reverse = RuleEngine::new();
    for rule in sample_rules().into_iter().rev() {
        reverse.register(rule).unwrap();
    }

    let a = forward.run(&SourceCorpus::new(temp.path()));
    let b = reverse.run_with(&SourceCorpus::new(temp.path()), &RunOptions::default().sequential());
    assert_eq!(a, b);
}

#[test]
fn test_parse_failures_and_missing_targets_are_skips() {
    let temp = sample_tree();

    let mut engine = RuleEngine::new();
    for rule in sample_rules() {
        engine.register(rule).unwrap();
    }
    let report = engine.run(&SourceCorpus::new(temp.path()));

    // a.py and b.py import os; bad.py is skipped, not failed.
    let imports: Vec<_> = report
        .violations
        .iter()
        .filter(|v| v.rule_id == "A-imports")
        .collect();
    assert_eq!(imports.len(), 2);
    assert!(report.errors.is_empty());

    let skip_kinds: Vec<_> = report
        .skips
        .iter()
        .map(|s| (s.rule_id.as_str(), &s.reason))
        .collect();
    assert!(matches!(
        skip_kinds[..],
        [
            ("A-imports", SkipReason::ParseFailure { .. }),
            ("C-missing", SkipReason::MissingTarget(_))
        ]
    ));

    // Paired counting is textual and still sees bad.py's siblings.
    let locks: Vec<_> = report
        .violations
        .iter()
        .filter(|v| v.rule_id == "B-locks")
        .map(|v| v.locations[0].clone())
        .collect();
    assert_eq!(
        locks,
        vec![Location::line("src/a.py", 2), Location::line("src/b.py", 2)]
    );
    assert_eq!(report.verdict(), Verdict::Fail);
}

#[test]
fn test_shared_corpus_reads_each_file_once() {
    let temp = sample_tree();

    let mut engine = RuleEngine::new();
    for rule in sample_rules() {
        engine.register(rule).unwrap();
    }
    let corpus = SourceCorpus::new(temp.path());
    engine.run(&corpus);
    assert_eq!(corpus.loaded_count(), 3);
}

// =============================================================================
// Fixture project
// =============================================================================

#[test]
fn test_fixture_project_findings() {
    let report = run_fixture();

    assert_eq!(report.rules_evaluated, 6);
    assert!(report.errors.is_empty());

    let found: Vec<_> = report
        .violations
        .iter()
        .map(|v| (v.rule_id.as_str(), v.locations[0].to_string()))
        .collect();
    assert_eq!(
        found,
        vec![
            ("SEC-role-reset", "src/db/session.py:2".to_string()),
            (
                "DEVOPS-router-registration",
                "src/routers/wf4_billing.py".to_string()
            ),
            ("OPS-tenant-in-logs", "src/services/billing.py".to_string()),
            (
                "ARCH-layer-services-routers",
                "src/services/intake.py:5".to_string()
            ),
            ("KRAKEN-blocking-init", "src/services/intake.py:11".to_string()),
            ("TEST-min-files-per-workflow", "tests/integration".to_string()),
        ]
    );

    let skipped: Vec<_> = report
        .skips
        .iter()
        .map(|s| s.rule_id.as_str())
        .collect();
    assert_eq!(
        skipped,
        vec!["ARCH-layer-services-routers", "KRAKEN-blocking-init"]
    );
    assert!(report
        .skips
        .iter()
        .all(|s| matches!(&s.reason, SkipReason::ParseFailure { path, .. } if path == "src/services/broken.py")));

    assert_eq!(report.verdict(), Verdict::Fail);
}

#[test]
fn test_fixture_citations_are_verbatim() {
    let report = run_fixture();

    let role = report
        .violations
        .iter()
        .find(|v| v.rule_id == "SEC-role-reset")
        .unwrap();
    assert_eq!(role.law, "SESSION-AND-TENANT-LAW.md §Rule 4");
    assert_eq!(role.finding_id, "SEC-002");
    assert_eq!(
        role.fix,
        "Wrap SET ROLE in try/finally with RESET ROLE in finally."
    );

    let logs = report
        .violations
        .iter()
        .find(|v| v.rule_id == "OPS-tenant-in-logs")
        .unwrap();
    assert_eq!(logs.severity, Severity::Warning);
    assert_eq!(
        logs.locations,
        vec![
            Location::file("src/services/billing.py"),
            Location::file("src/services/reports.py")
        ]
    );
}

#[test]
fn test_fixture_missing_root_is_all_skips() {
    let rules = RuleFile::parse_file(testdata_path().join("lawcheck.yaml")).unwrap();
    let engine = RuleEngine::from_config(&rules).unwrap();
    let temp = TempDir::new().unwrap();
    let report = engine.run(&SourceCorpus::new(temp.path()));

    assert!(report.violations.is_empty());
    assert_eq!(report.skips.len(), 6);
    assert!(report
        .skips
        .iter()
        .all(|s| matches!(s.reason, SkipReason::MissingTarget(_))));
    assert_eq!(report.verdict(), Verdict::Pass);
}
