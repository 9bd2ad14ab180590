//! specdrift core - validation and drift detection for behavioral contracts
//!
//! A contract is a function signature, an intent statement, an ordered list
//! of `WHEN ... THEN ...` rules and a list of test assertions, optionally
//! annotated with constraints and edge cases.
//!
//! # Architecture
//!
//! ```text
//! Contract text → Parser → ContractModel ─┬→ Structural Validator ─┐
//!   (key-value or inline notation)        ├→ Content Validator ────┼→ Report Builder → ValidationReport
//!                                         └→ Consistency Checker ──┘        ↑
//! ContractModel × ContractModel → Drift Comparator → ComparisonResult ──────┘
//! ```
//!
//! # Guarantees
//!
//! - **Deterministic**: same input always produces an identical report
//! - **Pure**: no I/O, no shared mutable state, no clocks
//! - **Total**: every rule violation becomes a finding; only unreadable
//!   input is an error

pub mod batch;
pub mod drift;
pub mod error;
pub mod finding;
pub mod normalizer;
pub mod parser;
pub mod report;
pub mod signature;
pub mod verifier;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use batch::{validate_batch, BatchEntry, BatchInput, BatchOutcome};
pub use drift::{compare, compare_sources, ComparisonResult, DriftStatus};
pub use error::{ComparisonError, ParseError, ParseErrorKind, Side};
pub use finding::{Finding, Location, Severity};
pub use parser::{parse, parse_with, ParsedContract, SurfaceKind, SurfaceTrace};
pub use normalizer::{normalize, semantic_hash, serialize};
pub use report::{
    validate, validate_comparison, validate_model, OverallStatus, ReportBuilder, ValidationReport,
};
pub use signature::{parse_signature, Parameter, Signature};
pub use verifier::ValidateOptions;

/// Version of this library, as published
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The normalized contract, independent of the notation it was written in
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractModel {
    pub signature: String,
    pub intent: String,
    /// Evaluated top to bottom; order is significant
    pub behavior_rules: Vec<BehaviorRule>,
    pub tests: Vec<TestCase>,
    pub constraints: Vec<ConstraintText>,
    pub edge_cases: Vec<EdgeCaseText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity: Option<String>,
}

impl ContractModel {
    /// Declared contract identifier: the metadata name, else the function name
    pub fn identifier(&self) -> Option<String> {
        self.metadata
            .as_ref()
            .and_then(|m| m.name.clone())
            .or_else(|| self.function_name())
    }

    /// Function name from the signature, when it parses
    pub fn function_name(&self) -> Option<String> {
        signature::parse_signature(&self.signature).map(|s| s.name)
    }
}

/// Optional frontmatter of a contract
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub name: Option<String>,
    pub language: Option<String>,
    pub version: Option<String>,
    /// Any other `key: value` pairs, verbatim
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

/// One `WHEN <condition> THEN <action>` or `OTHERWISE <action>` clause
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BehaviorRule {
    /// 0-based index in the rule list, stable across normalization
    pub position: usize,
    /// Empty only for the default rule
    pub condition: String,
    pub action: String,
    pub is_default: bool,
}

impl BehaviorRule {
    /// Classify the action as a returned value or a raised error
    pub fn outcome(&self) -> Outcome {
        parser::grammar::classify_action(&self.action)
    }

    pub fn is_error_like(&self) -> bool {
        matches!(self.outcome(), Outcome::Error(_))
    }
}

/// What a rule's action produces
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Value { expression: String },
    Error(ErrorDescriptor),
}

/// An error kind plus an optional literal message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDescriptor {
    pub error_kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ErrorDescriptor {
    pub fn new(error_kind: impl Into<String>, message: Option<String>) -> Self {
        ErrorDescriptor {
            error_kind: error_kind.into(),
            message,
        }
    }

    /// A generic kind accepts any concrete error kind
    pub fn is_generic(&self) -> bool {
        matches!(
            self.error_kind.as_str(),
            "error" | "Error" | "exception" | "Exception"
        )
    }

    /// True when a test expecting `raised` satisfies a rule raising `self`
    pub fn accepts(&self, raised: &ErrorDescriptor) -> bool {
        self.is_generic() || raised.is_generic() || self.error_kind == raised.error_kind
    }
}

impl std::fmt::Display for ErrorDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self.message {
            Some(ref message) => write!(f, "{} \"{}\"", self.error_kind, message),
            None => write!(f, "{}", self.error_kind),
        }
    }
}

/// One test assertion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub position: usize,
    /// Call expression; arguments may be literals or `[...]`
    pub invocation: String,
    pub expectation: Expectation,
}

impl TestCase {
    pub fn expectation_kind(&self) -> ExpectationKind {
        match self.expectation {
            Expectation::Value { .. } => ExpectationKind::Value,
            Expectation::Error(_) => ExpectationKind::Error,
        }
    }

    /// Top-level arguments of the outermost call, as written
    pub fn arguments(&self) -> Vec<String> {
        parser::grammar::call_arguments(&self.invocation)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expectation {
    Value { value: String },
    Error(ErrorDescriptor),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpectationKind {
    Value,
    Error,
}

/// A CONSTRAINTS entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConstraintText {
    pub text: String,
}

impl ConstraintText {
    pub fn new(text: impl Into<String>) -> Self {
        ConstraintText { text: text.into() }
    }

    /// Parameter the constraint is about: the first token before `:`
    pub fn subject(&self) -> Option<String> {
        subject_before_colon(&self.text)
    }

    /// Whether the text declares a bound that implies a runtime check
    pub fn implies_bound(&self) -> bool {
        const BOUND_WORDS: [&str; 17] = [
            "max", "min", "maximum", "minimum", "at most", "at least", "between", "less than",
            "greater than", "exceed", "positive", "negative", "non-negative", "length", "size",
            "limit", "range",
        ];
        let lower = self.text.to_lowercase();
        if lower.chars().any(|c| c.is_ascii_digit() || c == '<' || c == '>')
            || lower.contains("==")
            || lower.contains("!=")
        {
            return true;
        }
        let words: Vec<&str> = lower
            .split(|c: char| !(c.is_alphanumeric() || c == '-' || c == '_'))
            .filter(|w| !w.is_empty())
            .collect();
        BOUND_WORDS.iter().any(|bound| {
            let parts: Vec<&str> = bound.split(' ').collect();
            words.windows(parts.len()).any(|window| window == parts.as_slice())
        })
    }
}

/// An EDGE_CASES entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeCaseText {
    pub text: String,
}

impl EdgeCaseText {
    pub fn new(text: impl Into<String>) -> Self {
        EdgeCaseText { text: text.into() }
    }

    pub fn subject(&self) -> Option<String> {
        subject_before_colon(&self.text)
    }

    /// Text describing the triggering input: everything after the subject
    pub fn trigger(&self) -> &str {
        match self.text.split_once(':') {
            Some((_, rest)) if self.subject().is_some() => rest.trim(),
            _ => self.text.trim(),
        }
    }
}

fn subject_before_colon(text: &str) -> Option<String> {
    let (head, _) = text.split_once(':')?;
    let token = head.split_whitespace().next()?.trim_matches('`');
    let is_identifier = token
        .chars()
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && token.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '.');
    is_identifier.then(|| token.to_string())
}

/// Field labels recognized in both notations (case-sensitive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Field {
    Signature,
    Intent,
    Behavior,
    Tests,
    Constraints,
    EdgeCases,
    Dependencies,
    Examples,
    Complexity,
}

impl Field {
    pub const ALL: [Field; 9] = [
        Field::Signature,
        Field::Intent,
        Field::Behavior,
        Field::Tests,
        Field::Constraints,
        Field::EdgeCases,
        Field::Dependencies,
        Field::Examples,
        Field::Complexity,
    ];

    pub const REQUIRED: [Field; 4] = [Field::Signature, Field::Intent, Field::Behavior, Field::Tests];

    pub fn from_label(label: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|f| f.label() == label)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Field::Signature => "SIGNATURE",
            Field::Intent => "INTENT",
            Field::Behavior => "BEHAVIOR",
            Field::Tests => "TESTS",
            Field::Constraints => "CONSTRAINTS",
            Field::EdgeCases => "EDGE_CASES",
            Field::Dependencies => "DEPENDENCIES",
            Field::Examples => "EXAMPLES",
            Field::Complexity => "COMPLEXITY",
        }
    }

    pub fn is_required(&self) -> bool {
        Field::REQUIRED.contains(self)
    }

    /// Whether the field holds a list of entries rather than one text value
    pub fn is_list(&self) -> bool {
        !matches!(self, Field::Signature | Field::Intent | Field::Complexity)
    }

    /// Report ordering; declaration order doubles as rank
    pub fn rank(&self) -> usize {
        *self as usize
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
