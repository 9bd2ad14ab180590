//! Report builder: ordered, severity-bucketed validation results

use serde::Serialize;

use crate::drift::{compare, ComparisonResult};
use crate::error::{ComparisonError, ParseError, Side};
use crate::finding::{Finding, Severity};
use crate::normalizer::semantic_hash;
use crate::parser::{parse_with, ParsedContract, SurfaceKind};
use crate::verifier::{verify, ValidateOptions};

/// INVALID if any FAIL, else VALID_WITH_WARNINGS if any WARN, else VALID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverallStatus {
    Valid,
    ValidWithWarnings,
    Invalid,
}

impl OverallStatus {
    pub fn from_findings(findings: &[Finding]) -> Self {
        if findings.iter().any(|f| f.severity == Severity::Fail) {
            OverallStatus::Invalid
        } else if findings.iter().any(|f| f.severity == Severity::Warn) {
            OverallStatus::ValidWithWarnings
        } else {
            OverallStatus::Valid
        }
    }

    pub fn is_valid(&self) -> bool {
        *self != OverallStatus::Invalid
    }
}

impl std::fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            OverallStatus::Valid => write!(f, "VALID"),
            OverallStatus::ValidWithWarnings => write!(f, "VALID_WITH_WARNINGS"),
            OverallStatus::Invalid => write!(f, "INVALID"),
        }
    }
}

/// The result of validating one contract
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    /// Metadata name, else the function name
    pub identifier: Option<String>,
    /// SHA-256 of the canonical key-value form
    pub digest: String,
    pub surface: SurfaceKind,
    pub overall_status: OverallStatus,
    pub findings: Vec<Finding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison: Option<ComparisonResult>,
}

impl ValidationReport {
    pub fn count(&self, severity: Severity) -> usize {
        self.findings.iter().filter(|f| f.severity == severity).count()
    }

    pub fn codes(&self) -> Vec<&str> {
        self.findings.iter().map(|f| f.code.as_str()).collect()
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.findings.iter().any(|f| f.code == code)
    }
}

/// Aggregates findings from whichever checkers ran
#[derive(Debug, Clone)]
pub struct ReportBuilder {
    identifier: Option<String>,
    digest: String,
    surface: SurfaceKind,
    findings: Vec<Finding>,
    comparison: Option<ComparisonResult>,
}

impl ReportBuilder {
    pub fn new(contract: &ParsedContract) -> Self {
        ReportBuilder {
            identifier: contract.model.identifier(),
            digest: semantic_hash(&contract.model),
            surface: contract.trace.surface,
            findings: Vec::new(),
            comparison: None,
        }
    }

    pub fn findings(mut self, findings: impl IntoIterator<Item = Finding>) -> Self {
        self.findings.extend(findings);
        self
    }

    /// Attach a comparison; its findings join the report
    pub fn comparison(mut self, comparison: ComparisonResult) -> Self {
        self.findings.extend(comparison.findings.iter().cloned());
        self.comparison = Some(comparison);
        self
    }

    pub fn build(mut self) -> ValidationReport {
        sort_findings(&mut self.findings);
        ValidationReport {
            identifier: self.identifier,
            digest: self.digest,
            surface: self.surface,
            overall_status: OverallStatus::from_findings(&self.findings),
            findings: self.findings,
            comparison: self.comparison,
        }
    }
}

/// Stable sort by severity, then field order; emission order breaks ties
pub fn sort_findings(findings: &mut [Finding]) {
    findings.sort_by_key(|f| (f.severity.rank(), f.location.rank()));
}

// ── Public API ────────────────────────────────────────────

/// Parse and validate contract text
///
/// # Errors
/// Only unreadable input is an error; every rule violation is a finding.
pub fn validate(text: &str, options: &ValidateOptions) -> Result<ValidationReport, ParseError> {
    let parsed = parse_with(text, options.surface)?;
    Ok(validate_model(&parsed, options))
}

/// Validate an already parsed contract
pub fn validate_model(contract: &ParsedContract, options: &ValidateOptions) -> ValidationReport {
    ReportBuilder::new(contract)
        .findings(verify(contract, options))
        .build()
}

/// Validate `baseline` and compare it with `candidate` in one report
///
/// # Errors
/// Fails fast with [`ComparisonError::Unparsed`] naming the side that does
/// not parse.
pub fn validate_comparison(
    baseline: &str,
    candidate: &str,
    options: &ValidateOptions,
) -> Result<ValidationReport, ComparisonError> {
    let unparsed = |side: Side| move |source: ParseError| ComparisonError::Unparsed { side, source };
    let before = parse_with(baseline, options.surface).map_err(unparsed(Side::Baseline))?;
    let after = parse_with(candidate, options.surface).map_err(unparsed(Side::Candidate))?;

    Ok(ReportBuilder::new(&before)
        .findings(verify(&before, options))
        .comparison(compare(&before.model, &after.model))
        .build())
}
