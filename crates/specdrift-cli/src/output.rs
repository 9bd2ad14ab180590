//! Human-readable and JSON rendering of reports

use std::fmt::Write;

use colored::{ColoredString, Colorize};
use serde::Serialize;
use specdrift_core::{
    BatchEntry, BatchOutcome, ComparisonResult, DriftStatus, Finding, OverallStatus, Severity,
    ValidationReport,
};

use crate::CliError;

pub fn json<T: Serialize>(value: &T) -> Result<String, CliError> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn severity(severity: Severity) -> ColoredString {
    match severity {
        Severity::Fail => severity.as_str().red().bold(),
        Severity::Warn => severity.as_str().yellow().bold(),
        Severity::Info => severity.as_str().blue(),
    }
}

fn status(status: OverallStatus) -> ColoredString {
    let text = status.to_string();
    match status {
        OverallStatus::Valid => text.green().bold(),
        OverallStatus::ValidWithWarnings => text.yellow().bold(),
        OverallStatus::Invalid => text.red().bold(),
    }
}

fn drift_status(status: DriftStatus) -> ColoredString {
    let text = format!("{:<12}", status.to_string());
    match status {
        DriftStatus::Match => text.green(),
        DriftStatus::Drift | DriftStatus::Missing => text.red(),
        DriftStatus::Undocumented => text.yellow(),
    }
}

fn finding_line(out: &mut String, finding: &Finding) {
    let _ = write!(
        out,
        "  {} [{}] {}",
        severity(finding.severity),
        finding.code,
        finding.location
    );
    if let Some(span) = finding.span {
        let _ = write!(out, " at {span}");
    }
    let _ = writeln!(out, ": {}", finding.message);
}

fn position(position: Option<usize>) -> String {
    position.map_or_else(|| "-".to_string(), |p| p.to_string())
}

// ── Validation ────────────────────────────────────────────

pub fn report(path: &str, report: &ValidationReport) -> String {
    let mut out = String::new();
    let name = report.identifier.as_deref().unwrap_or("<unnamed>");
    let _ = writeln!(
        out,
        "{} {} ({}, {})",
        status(report.overall_status),
        name.bold(),
        path,
        report.surface
    );
    for finding in &report.findings {
        finding_line(&mut out, finding);
    }
    let _ = writeln!(
        out,
        "{} FAIL, {} WARN, {} INFO",
        report.count(Severity::Fail),
        report.count(Severity::Warn),
        report.count(Severity::Info)
    );
    out
}

// ── Comparison ────────────────────────────────────────────

pub fn comparison(result: &ComparisonResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", "rules".bold());
    for rule in &result.rules {
        let _ = write!(
            out,
            "  {} {:>3} -> {:<3}",
            drift_status(rule.status),
            position(rule.baseline_position),
            position(rule.candidate_position)
        );
        if rule.reordered {
            let _ = write!(out, " (moved)");
        }
        let _ = writeln!(out);
        for diff in &rule.diff {
            let _ = writeln!(out, "      {} {}", "-".red(), diff.before);
            let _ = writeln!(out, "      {} {}", "+".green(), diff.after);
        }
    }

    let changed_tests = result
        .tests
        .iter()
        .filter(|t| t.status != DriftStatus::Match || !t.expectation_equal)
        .count();
    let _ = writeln!(
        out,
        "{} parameter(s), {} test(s) compared, {} test(s) changed",
        result.parameters.len(),
        result.tests.len(),
        changed_tests
    );

    if !result.findings.is_empty() {
        let _ = writeln!(out, "{}", "findings".bold());
        for finding in &result.findings {
            finding_line(&mut out, finding);
        }
    }
    let verdict = if result.has_failures() {
        "DRIFTED".red().bold()
    } else {
        "IN SYNC".green().bold()
    };
    let _ = writeln!(out, "{verdict}");
    out
}

// ── Batch ─────────────────────────────────────────────────

pub fn batch(entries: &[BatchEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        match entry.outcome {
            BatchOutcome::Report(ref r) => {
                let _ = writeln!(
                    out,
                    "{} {} ({} FAIL, {} WARN)",
                    status(r.overall_status),
                    entry.name,
                    r.count(Severity::Fail),
                    r.count(Severity::Warn)
                );
            }
            BatchOutcome::Error { ref message, .. } => {
                let _ = writeln!(out, "{} {}: {}", "ERROR".red().bold(), entry.name, message);
            }
        }
    }
    let invalid = entries.iter().filter(|e| e.is_invalid()).count();
    let _ = writeln!(out, "{} contract(s), {} invalid", entries.len(), invalid);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use specdrift_core::{compare_sources, validate, BatchInput, ValidateOptions};

    const CONTRACT: &str = "SIGNATURE: def sign(x: int) -> int\nINTENT: Sign of x.\nBEHAVIOR:\n  - WHEN x < 0 THEN return -1\n  - OTHERWISE return 1\nTESTS:\n  - sign(-2) == -1\n  - sign(3) == 1\n";

    fn plain() {
        colored::control::set_override(false);
    }

    #[test]
    fn test_report_lists_findings_and_counts() {
        plain();
        let r = validate(CONTRACT, &ValidateOptions::default()).unwrap();
        let text = report("sign.md", &r);
        assert!(text.starts_with("INVALID sign (sign.md, key-value)"));
        assert!(text.contains("FAIL [C5] TESTS"));
        assert!(text.ends_with("1 FAIL, 0 WARN, 0 INFO\n"));
    }

    #[test]
    fn test_comparison_shows_diff() {
        plain();
        let candidate = CONTRACT.replace("return -1", "return 0");
        let result = compare_sources(CONTRACT, &candidate, None).unwrap();
        let text = comparison(&result);
        assert!(text.contains("DRIFT"));
        assert!(text.contains("- return -1"));
        assert!(text.contains("+ return 0"));
        assert!(text.trim_end().ends_with("DRIFTED"));
    }

    #[test]
    fn test_comparison_labels_candidate_positions() {
        plain();
        let candidate = CONTRACT.replace(
            "  - OTHERWISE return 1",
            "  - WHEN x == 0 THEN return 0\n  - OTHERWISE return 1",
        );
        let result = compare_sources(CONTRACT, &candidate, None).unwrap();
        let text = comparison(&result);
        assert!(text.contains("WARN [D3] candidate BEHAVIOR[1]"), "{text}");
    }

    #[test]
    fn test_batch_summary() {
        plain();
        let inputs = vec![
            BatchInput::new("a.md", CONTRACT),
            BatchInput::new("b.md", ""),
        ];
        let entries = specdrift_core::validate_batch(&inputs, &ValidateOptions::default());
        let text = batch(&entries);
        assert!(text.contains("ERROR b.md: empty input at 1:1"));
        assert!(text.ends_with("2 contract(s), 2 invalid\n"));
    }

    #[test]
    fn test_json_is_pretty() {
        let r = validate(CONTRACT, &ValidateOptions::default()).unwrap();
        let text = json(&r).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["overall_status"], "INVALID");
        assert!(text.contains('\n'));
    }
}
