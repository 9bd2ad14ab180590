//! Findings: the unit of every reported problem

use serde::Serialize;

use crate::parser::scanner::Span;
use crate::Field;

/// Severity level for findings
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Fail,
    Warn,
    Info,
}

impl Severity {
    /// Report ordering: FAIL before WARN before INFO
    pub fn rank(&self) -> usize {
        *self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Fail => "FAIL",
            Severity::Warn => "WARN",
            Severity::Info => "INFO",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where in the contract a finding points
///
/// Drift findings about items that exist only in the candidate use the
/// `Candidate*` variants, whose numbers are candidate positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum Location {
    Document,
    Metadata,
    Field { field: Field },
    Rule { position: usize },
    Test { position: usize },
    Constraint { index: usize },
    EdgeCase { index: usize },
    Parameter { index: usize },
    CandidateRule { position: usize },
    CandidateTest { position: usize },
    CandidateParameter { index: usize },
}

impl Location {
    /// The contract field this location belongs to
    pub fn field(&self) -> Option<Field> {
        match self {
            Location::Document | Location::Metadata => None,
            Location::Field { field } => Some(*field),
            Location::Rule { .. } => Some(Field::Behavior),
            Location::Test { .. } => Some(Field::Tests),
            Location::Constraint { .. } => Some(Field::Constraints),
            Location::EdgeCase { .. } => Some(Field::EdgeCases),
            Location::Parameter { .. } => Some(Field::Signature),
            Location::CandidateRule { .. } => Some(Field::Behavior),
            Location::CandidateTest { .. } => Some(Field::Tests),
            Location::CandidateParameter { .. } => Some(Field::Signature),
        }
    }

    /// Report ordering: fields in declaration order, then metadata, then document
    pub fn rank(&self) -> usize {
        match (self, self.field()) {
            (_, Some(field)) => field.rank(),
            (Location::Metadata, None) => Field::ALL.len(),
            _ => Field::ALL.len() + 1,
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Location::Document => write!(f, "document"),
            Location::Metadata => write!(f, "metadata"),
            Location::Field { field } => write!(f, "{field}"),
            Location::Rule { position } => write!(f, "BEHAVIOR[{position}]"),
            Location::Test { position } => write!(f, "TESTS[{position}]"),
            Location::Constraint { index } => write!(f, "CONSTRAINTS[{index}]"),
            Location::EdgeCase { index } => write!(f, "EDGE_CASES[{index}]"),
            Location::Parameter { index } => write!(f, "SIGNATURE.param[{index}]"),
            Location::CandidateRule { position } => write!(f, "candidate BEHAVIOR[{position}]"),
            Location::CandidateTest { position } => write!(f, "candidate TESTS[{position}]"),
            Location::CandidateParameter { index } => {
                write!(f, "candidate SIGNATURE.param[{index}]")
            }
        }
    }
}

/// A single reported problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub severity: Severity,
    /// Stable code such as `S1`, `C5`, `X1`, `D2`
    pub code: String,
    pub message: String,
    pub location: Location,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

impl Finding {
    pub fn new(severity: Severity, code: &str, location: Location, message: impl Into<String>) -> Self {
        Finding {
            severity,
            code: code.to_string(),
            message: message.into(),
            location,
            span: None,
        }
    }

    pub fn fail(code: &str, location: Location, message: impl Into<String>) -> Self {
        Self::new(Severity::Fail, code, location, message)
    }

    pub fn warn(code: &str, location: Location, message: impl Into<String>) -> Self {
        Self::new(Severity::Warn, code, location, message)
    }

    pub fn info(code: &str, location: Location, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, code, location, message)
    }

    /// Attach a source position
    pub fn at(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }
}

impl std::fmt::Display for Finding {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self.span {
            Some(ref span) => write!(
                f,
                "{} [{}] {} at {}: {}",
                self.severity, self.code, self.location, span, self.message
            ),
            None => write!(
                f,
                "{} [{}] {}: {}",
                self.severity, self.code, self.location, self.message
            ),
        }
    }
}

/// Accumulates findings in emission order
#[derive(Debug, Clone, Default)]
pub struct FindingSet {
    findings: Vec<Finding>,
}

impl FindingSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, finding: Finding) {
        self.findings.push(finding);
    }

    pub fn fail(&mut self, code: &str, location: Location, message: impl Into<String>) {
        self.push(Finding::fail(code, location, message));
    }

    pub fn warn(&mut self, code: &str, location: Location, message: impl Into<String>) {
        self.push(Finding::warn(code, location, message));
    }

    pub fn info(&mut self, code: &str, location: Location, message: impl Into<String>) {
        self.push(Finding::info(code, location, message));
    }

    pub fn len(&self) -> usize {
        self.findings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter()
    }

    pub fn into_vec(self) -> Vec<Finding> {
        self.findings
    }
}

impl Extend<Finding> for FindingSet {
    fn extend<I: IntoIterator<Item = Finding>>(&mut self, iter: I) {
        self.findings.extend(iter);
    }
}
