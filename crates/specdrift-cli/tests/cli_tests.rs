//! Integration tests for the specdrift CLI
//!
//! These tests invoke the actual specdrift binary and verify:
//! - Exit codes (0 = success, 1 = invalid or drifted, 2 = error)
//! - stdout/stderr output
//! - JSON output format

use std::path::PathBuf;
use std::process::Command;

// ── Helpers ───────────────────────────────────────────────

fn specdrift_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_specdrift"))
}

fn fixture(name: &str) -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../tests/fixtures")
        .join(name)
        .to_string_lossy()
        .into_owned()
}

fn run(args: &[&str]) -> std::process::Output {
    Command::new(specdrift_bin())
        .args(args)
        .current_dir(env!("CARGO_MANIFEST_DIR"))
        .env("NO_COLOR", "1")
        .env_remove("SPECDRIFT_LOG")
        .output()
        .expect("failed to execute specdrift")
}

fn stdout(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn temp_file(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("specdrift-{}-{name}", std::process::id()));
    std::fs::write(&path, contents).expect("write temp file");
    path
}

// ── Version ───────────────────────────────────────────────

#[test]
fn test_version_command() {
    let output = run(&["version"]);
    assert!(output.status.success(), "version should exit 0");
    let out = stdout(&output);
    assert!(out.starts_with(&format!("specdrift {}", env!("CARGO_PKG_VERSION"))));
    assert!(out.contains(&format!("(specdrift-core {})", specdrift_core::VERSION)));
}

#[test]
fn test_version_flag() {
    let output = run(&["--version"]);
    assert!(output.status.success(), "--version should exit 0");
    assert!(stdout(&output).contains(env!("CARGO_PKG_VERSION")));
}

// ── Validate ──────────────────────────────────────────────

#[test]
fn test_validate_valid_contract() {
    let output = run(&["validate", &fixture("valid/coupon-inline.md")]);
    assert!(output.status.success(), "valid contract should exit 0");
    let out = stdout(&output);
    assert!(out.starts_with("VALID validate_coupon"), "{out}");
    assert!(out.contains("inline"));
}

#[test]
fn test_validate_warnings_still_exit_zero() {
    let output = run(&["validate", &fixture("valid/age-warnings.md")]);
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.starts_with("VALID_WITH_WARNINGS"));
    assert!(out.contains("WARN [C3] INTENT"));
}

#[test]
fn test_validate_invalid_contract() {
    let output = run(&["validate", &fixture("invalid/too-few-tests.md")]);
    assert_eq!(output.status.code(), Some(1), "invalid contract should exit 1");
    let out = stdout(&output);
    assert!(out.starts_with("INVALID"));
    assert!(out.contains("FAIL [C5] TESTS"));
}

#[test]
fn test_validate_parse_error_exits_two_with_location() {
    let output = run(&["validate", &fixture("invalid/malformed-rule.md")]);
    assert_eq!(output.status.code(), Some(2));
    let err = stderr(&output);
    assert!(err.starts_with("error: malformed rule line"), "{err}");
    assert!(err.contains("at 4:5"));
    assert!(err.contains("malformed-rule.md:4:5"));
}

#[test]
fn test_validate_nonexistent_file() {
    let output = run(&["validate", "nonexistent.md"]);
    assert_eq!(output.status.code(), Some(2), "missing file should exit 2");
    assert!(stderr(&output).contains("cannot read nonexistent.md"));
}

#[test]
fn test_validate_json_output() {
    let output = run(&["validate", "--json", &fixture("valid/coupon-kv.md")]);
    assert!(output.status.success());
    let json: serde_json::Value =
        serde_json::from_str(&stdout(&output)).expect("should be valid JSON");
    assert_eq!(json["overall_status"], "VALID");
    assert_eq!(json["surface"], "key-value");
    assert_eq!(json["identifier"], "validate_coupon");
    assert_eq!(json["findings"].as_array().map(Vec::len), Some(0));
}

#[test]
fn test_validate_json_invalid() {
    let output = run(&["validate", "--json", &fixture("invalid/two-defaults.md")]);
    assert_eq!(output.status.code(), Some(1));
    let json: serde_json::Value =
        serde_json::from_str(&stdout(&output)).expect("should be valid JSON");
    assert_eq!(json["overall_status"], "INVALID");
    let codes: Vec<&str> = json["findings"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|f| f["code"].as_str())
        .collect();
    assert!(codes.contains(&"C4"));
}

#[test]
fn test_validate_forced_surface() {
    let output = run(&[
        "validate",
        "--json",
        "--surface",
        "key-value",
        &fixture("valid/coupon-kv.md"),
    ]);
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(json["surface"], "key-value");
}

#[test]
fn test_validate_rejects_unknown_surface() {
    let output = run(&["validate", "--surface", "yaml", &fixture("valid/coupon-kv.md")]);
    assert_eq!(output.status.code(), Some(2), "clap usage errors exit 2");
}

#[test]
fn test_validate_quiet_valid() {
    let output = run(&["--quiet", "validate", &fixture("valid/coupon-inline.md")]);
    assert!(output.status.success());
    assert!(stdout(&output).is_empty(), "quiet mode should produce no stdout");
}

#[test]
fn test_validate_quiet_invalid_keeps_exit_code() {
    let output = run(&["-q", "validate", &fixture("invalid/too-few-tests.md")]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).is_empty());
}

// ── Configuration ─────────────────────────────────────────

#[test]
fn test_config_extends_denylist() {
    let config = temp_file("terms.toml", "implementation_terms = [\"Cart\"]\n");
    let output = run(&[
        "--config",
        config.to_str().unwrap(),
        "validate",
        &fixture("valid/coupon-inline.md"),
    ]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("WARN [C3] INTENT"));
    let _ = std::fs::remove_file(&config);
}

#[test]
fn test_config_format_json() {
    let config = temp_file("json.toml", "format = \"json\"\n");
    let output = run(&[
        "--config",
        config.to_str().unwrap(),
        "validate",
        &fixture("valid/coupon-inline.md"),
    ]);
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(json["overall_status"], "VALID");
    let _ = std::fs::remove_file(&config);
}

#[test]
fn test_invalid_config_exits_two() {
    let config = temp_file("bad.toml", "colour = true\n");
    let output = run(&[
        "--config",
        config.to_str().unwrap(),
        "validate",
        &fixture("valid/coupon-inline.md"),
    ]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("invalid configuration"));
    let _ = std::fs::remove_file(&config);
}

// ── Compare ───────────────────────────────────────────────

#[test]
fn test_compare_identical_contracts() {
    let path = fixture("drift/baseline.md");
    let output = run(&["compare", &path, &path]);
    assert!(output.status.success(), "identical contracts should exit 0");
    assert!(stdout(&output).contains("IN SYNC"));
}

#[test]
fn test_compare_drifted_contracts() {
    let output = run(&[
        "compare",
        &fixture("drift/baseline.md"),
        &fixture("drift/candidate.md"),
    ]);
    assert_eq!(output.status.code(), Some(1));
    let out = stdout(&output);
    assert!(out.contains("DRIFT"));
    assert!(out.contains("UNDOCUMENTED"));
    assert!(out.contains(r#"+ raise TypeError "age must not be negative""#));
    assert!(out.contains("[D1]"));
}

#[test]
fn test_compare_json_output() {
    let output = run(&[
        "compare",
        "--json",
        &fixture("drift/baseline.md"),
        &fixture("drift/candidate.md"),
    ]);
    assert_eq!(output.status.code(), Some(1));
    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let rules = json["comparison"]["rules"].as_array().unwrap();
    let statuses: Vec<&str> = rules.iter().filter_map(|r| r["status"].as_str()).collect();
    assert_eq!(statuses, vec!["MATCH", "DRIFT", "MATCH", "UNDOCUMENTED"]);
}

#[test]
fn test_compare_unparseable_candidate() {
    let output = run(&[
        "compare",
        &fixture("drift/baseline.md"),
        &fixture("invalid/malformed-rule.md"),
    ]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).starts_with("error: candidate contract failed to parse"));
}

// ── Normalize ─────────────────────────────────────────────

#[test]
fn test_normalize_to_key_value() {
    let output = run(&["normalize", &fixture("valid/coupon-inline.md")]);
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("SIGNATURE: def validate_coupon"));
    assert!(!out.contains("**"));
}

#[test]
fn test_normalize_to_inline() {
    let output = run(&["normalize", "--to", "inline", &fixture("valid/coupon-kv.md")]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("**SIGNATURE:**"));
}

#[test]
fn test_normalize_invalid_contract() {
    let output = run(&["normalize", &fixture("invalid/malformed-rule.md")]);
    assert_eq!(output.status.code(), Some(2), "normalize of unreadable should exit 2");
}

#[test]
fn test_normalize_idempotent() {
    let first = run(&["normalize", &fixture("valid/coupon-inline.md")]);
    assert!(first.status.success());
    let canonical = stdout(&first);

    let temp = temp_file("idempotent.md", &canonical);
    let second = run(&["normalize", temp.to_str().unwrap()]);
    assert!(second.status.success());
    assert_eq!(canonical, stdout(&second), "normalize must be idempotent");
    let _ = std::fs::remove_file(&temp);
}

// ── Hash ──────────────────────────────────────────────────

#[test]
fn test_hash_is_notation_independent() {
    let inline = run(&["hash", &fixture("valid/coupon-inline.md")]);
    let kv = run(&["hash", &fixture("valid/coupon-kv.md")]);
    assert!(inline.status.success());
    let digest = stdout(&inline);
    assert_eq!(digest.trim().len(), 64);
    assert_eq!(digest, stdout(&kv));
}

#[test]
fn test_hash_deterministic() {
    let path = fixture("drift/baseline.md");
    let first = stdout(&run(&["hash", &path]));
    for _ in 0..10 {
        assert_eq!(first, stdout(&run(&["hash", &path])));
    }
}

// ── Batch ─────────────────────────────────────────────────

#[test]
fn test_batch_all_valid() {
    let output = run(&[
        "batch",
        &fixture("valid/coupon-inline.md"),
        &fixture("valid/coupon-kv.md"),
        &fixture("valid/age-warnings.md"),
    ]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("3 contract(s), 0 invalid"));
}

#[test]
fn test_batch_with_invalid_and_unreadable() {
    let output = run(&[
        "batch",
        "--json",
        &fixture("valid/coupon-inline.md"),
        &fixture("invalid/two-defaults.md"),
        &fixture("invalid/malformed-rule.md"),
    ]);
    assert_eq!(output.status.code(), Some(1));
    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let entries = json.as_array().unwrap();
    assert_eq!(entries.len(), 3);
    let kinds: Vec<&str> = entries
        .iter()
        .filter_map(|e| e["outcome"]["kind"].as_str())
        .collect();
    assert_eq!(kinds.iter().filter(|k| **k == "error").count(), 1);
    assert_eq!(kinds.iter().filter(|k| **k == "report").count(), 2);
}

#[test]
fn test_batch_missing_file_exits_two() {
    let output = run(&["batch", &fixture("valid/coupon-kv.md"), "nonexistent.md"]);
    assert_eq!(output.status.code(), Some(2));
}

// ── Logging ───────────────────────────────────────────────

#[test]
fn test_verbose_logs_to_stderr_only() {
    let output = run(&["-v", "validate", "--json", &fixture("valid/coupon-kv.md")]);
    assert!(output.status.success());
    let json: Result<serde_json::Value, _> = serde_json::from_str(&stdout(&output));
    assert!(json.is_ok(), "stdout must stay pure JSON with -v");
    assert!(stderr(&output).contains("DEBUG"));
}
