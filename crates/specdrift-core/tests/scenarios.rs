//! End-to-end scenarios: contract text in, report out

use std::fs;
use std::path::Path;

use specdrift_core::{
    compare, compare_sources, normalize, parse, semantic_hash, validate, validate_batch,
    validate_comparison, BatchInput, BatchOutcome, DriftStatus, Location, OverallStatus,
    ParseErrorKind, Severity, Side, SurfaceKind, ValidateOptions,
};

fn read_fixture(path: &str) -> String {
    let full = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../tests/fixtures")
        .join(path);
    fs::read_to_string(&full).unwrap_or_else(|e| panic!("Failed to read {}: {}", full.display(), e))
}

fn options() -> ValidateOptions {
    ValidateOptions::default()
}

const COUPON_HEAD: &str = r#"SIGNATURE: def validate_coupon(code: str) -> tuple
INTENT: Check a coupon code.
BEHAVIOR:
  - WHEN code is empty THEN return (False, "Coupon code cannot be empty")
  - OTHERWISE return (True, "ok")
TESTS:
"#;

// ── Validation scenarios ──────────────────────────────────

#[test]
fn three_rules_two_tests_is_invalid() {
    let report = validate(&read_fixture("invalid/too-few-tests.md"), &options()).unwrap();
    assert_eq!(report.overall_status, OverallStatus::Invalid);
    let c5 = report.findings.iter().find(|f| f.code == "C5").unwrap();
    assert_eq!(c5.severity, Severity::Fail);
}

#[test]
fn matching_value_test_covers_rule() {
    let text = format!(
        "{COUPON_HEAD}  - validate_coupon(\"\") == (False, \"Coupon code cannot be empty\")\n  - validate_coupon(\"A\") == (True, \"ok\")\n  - validate_coupon(\"B\") == (True, \"ok\")\n"
    );
    let report = validate(&text, &options()).unwrap();
    assert!(!report.findings.iter().any(|f| f.code == "X1"));
    assert_eq!(report.overall_status, OverallStatus::Valid, "{:#?}", report.findings);
}

#[test]
fn mismatched_value_test_leaves_rule_uncovered() {
    let text = format!(
        "{COUPON_HEAD}  - validate_coupon(\"\") == (False, \"Empty code\")\n  - validate_coupon(\"A\") == (True, \"ok\")\n  - validate_coupon(\"B\") == (True, \"ok\")\n"
    );
    let report = validate(&text, &options()).unwrap();
    let x1: Vec<_> = report.findings.iter().filter(|f| f.code == "X1").collect();
    assert_eq!(x1.len(), 1);
    assert_eq!(x1[0].location, Location::Rule { position: 0 });
    assert_eq!(report.overall_status, OverallStatus::Invalid);
}

#[test]
fn two_default_rules_are_ambiguous() {
    let report = validate(&read_fixture("invalid/two-defaults.md"), &options()).unwrap();
    assert_eq!(report.overall_status, OverallStatus::Invalid);
    let c4 = report.findings.iter().find(|f| f.code == "C4").unwrap();
    assert_eq!(c4.severity, Severity::Fail);
    assert!(c4.message.contains("ambiguous default rule"));
    assert_eq!(c4.location, Location::Rule { position: 1 });
}

#[test]
fn implementation_detail_only_warns() {
    let report = validate(&read_fixture("valid/age-warnings.md"), &options()).unwrap();
    assert_eq!(report.overall_status, OverallStatus::ValidWithWarnings);
    assert_eq!(report.codes(), vec!["C3"]);
}

#[test]
fn malformed_rule_is_a_located_parse_error() {
    let err = validate(&read_fixture("invalid/malformed-rule.md"), &options()).unwrap_err();
    assert!(matches!(err.kind, ParseErrorKind::MalformedRule(_)));
    assert_eq!((err.span.line, err.span.column), (4, 5));
}

#[test]
fn both_notations_validate_identically() {
    let inline = validate(&read_fixture("valid/coupon-inline.md"), &options()).unwrap();
    let kv = validate(&read_fixture("valid/coupon-kv.md"), &options()).unwrap();
    assert_eq!(inline.overall_status, OverallStatus::Valid, "{:#?}", inline.findings);
    assert_eq!(kv.overall_status, OverallStatus::Valid, "{:#?}", kv.findings);
    assert_eq!(inline.surface, SurfaceKind::Inline);
    assert_eq!(kv.surface, SurfaceKind::KeyValue);
    assert_eq!(inline.digest, kv.digest);
    assert_eq!(inline.identifier.as_deref(), Some("validate_coupon"));
}

#[test]
fn normalized_output_reparses_to_same_model() {
    let text = read_fixture("valid/coupon-inline.md");
    let model = parse(&text).unwrap().model;
    for surface in [SurfaceKind::KeyValue, SurfaceKind::Inline] {
        let normalized = normalize(&text, surface).unwrap();
        assert_eq!(parse(&normalized).unwrap().model, model);
    }
}

// ── Drift scenarios ───────────────────────────────────────

#[test]
fn changed_error_kind_is_drift_on_the_action() {
    let baseline = parse(&read_fixture("drift/baseline.md")).unwrap().model;
    let candidate = parse(&read_fixture("drift/candidate.md")).unwrap().model;
    let result = compare(&baseline, &candidate);

    assert_eq!(result.status_of(1), Some(DriftStatus::Drift));
    let drifted = result
        .rules
        .iter()
        .find(|r| r.baseline_position == Some(1))
        .unwrap();
    assert_eq!(drifted.diff.len(), 1);
    assert_eq!(drifted.diff[0].before, r#"raise ValueError "age must not be negative""#);
    assert_eq!(drifted.diff[0].after, r#"raise TypeError "age must not be negative""#);
}

#[test]
fn extra_candidate_rule_is_undocumented() {
    let baseline = parse(&read_fixture("drift/baseline.md")).unwrap().model;
    let candidate = parse(&read_fixture("drift/candidate.md")).unwrap().model;
    let result = compare(&baseline, &candidate);

    let undocumented: Vec<_> = result.undocumented().collect();
    assert_eq!(undocumented.len(), 1);
    assert_eq!(undocumented[0].candidate_position, Some(2));
    assert_eq!(result.status_of(0), Some(DriftStatus::Match));
    assert_eq!(result.status_of(2), Some(DriftStatus::Match));
    assert!(result.has_failures());
}

#[test]
fn identical_contracts_do_not_drift() {
    let text = read_fixture("drift/baseline.md");
    let result = compare_sources(&text, &text, None).unwrap();
    assert!(result.rules.iter().all(|r| r.status == DriftStatus::Match));
    assert!(result.findings.is_empty());
}

#[test]
fn unparseable_candidate_names_its_side() {
    let err = compare_sources(&read_fixture("drift/baseline.md"), "", None).unwrap_err();
    assert_eq!(err.side(), Side::Candidate);
}

#[test]
fn comparison_report_carries_drift_findings() {
    let report = validate_comparison(
        &read_fixture("drift/baseline.md"),
        &read_fixture("drift/candidate.md"),
        &options(),
    )
    .unwrap();
    assert_eq!(report.overall_status, OverallStatus::Invalid);
    assert!(report.has_code("D1"));
    assert!(report.has_code("D3"));
    assert!(report.comparison.is_some());
}

// ── Batch and determinism ─────────────────────────────────

#[test]
fn batch_reports_every_input_in_stable_order() {
    let inputs = vec![
        BatchInput::new("two-defaults.md", read_fixture("invalid/two-defaults.md")),
        BatchInput::new("malformed-rule.md", read_fixture("invalid/malformed-rule.md")),
        BatchInput::new("coupon-kv.md", read_fixture("valid/coupon-kv.md")),
    ];
    let first = validate_batch(&inputs, &options());
    let second = validate_batch(&inputs, &options());
    assert_eq!(first, second);
    assert_eq!(first.len(), 3);
    assert_eq!(first.iter().filter(|e| e.is_invalid()).count(), 2);
    assert!(first
        .iter()
        .any(|e| matches!(e.outcome, BatchOutcome::Error { .. })));
}

#[test]
fn deterministic_report_over_100_runs() {
    let text = read_fixture("valid/coupon-inline.md");
    let first = serde_json::to_string(&validate(&text, &options()).unwrap()).unwrap();
    for _ in 0..100 {
        let again = serde_json::to_string(&validate(&text, &options()).unwrap()).unwrap();
        assert_eq!(first, again);
    }
}

#[test]
fn hash_is_stable_across_notations() {
    let inline = parse(&read_fixture("valid/coupon-inline.md")).unwrap().model;
    let kv = parse(&read_fixture("valid/coupon-kv.md")).unwrap().model;
    assert_eq!(semantic_hash(&inline), semantic_hash(&kv));
}
