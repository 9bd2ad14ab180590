//! Error types for specdrift
//!
//! Only structurally unreadable input is an error. Every rule violation in a
//! readable contract is reported as a [`Finding`](crate::finding::Finding)
//! inside a normally returned report.

use serde::Serialize;

use crate::parser::scanner::Span;

/// Terminal failure to read a contract document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{kind} at {span}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Span,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, span: Span) -> Self {
        ParseError { kind, span }
    }
}

/// Cause of a [`ParseError`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "cause", content = "text", rename_all = "snake_case")]
pub enum ParseErrorKind {
    #[error("empty input")]
    EmptyInput,

    #[error("no recognizable field header (expected `SIGNATURE:` or `**SIGNATURE:**`)")]
    UndetectableSurface,

    #[error("unterminated metadata block (missing closing `---`)")]
    UnterminatedFrontmatter,

    #[error("unterminated code span")]
    UnterminatedCodeSpan,

    #[error("malformed rule line `{0}`: expected `WHEN <condition> THEN <action>` or `OTHERWISE <action>`")]
    MalformedRule(String),

    #[error("malformed test line `{0}`: expected `<invocation> == <value>` or `<invocation> raises <ErrorKind>`")]
    MalformedTest(String),
}

/// Which side of a comparison a failure belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Baseline,
    Candidate,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Side::Baseline => write!(f, "baseline"),
            Side::Candidate => write!(f, "candidate"),
        }
    }
}

/// Raised by the drift comparator when one of its inputs is unusable
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ComparisonError {
    #[error("{side} contract failed to parse: {source}")]
    Unparsed {
        side: Side,
        #[source]
        source: ParseError,
    },
}

impl ComparisonError {
    pub fn side(&self) -> Side {
        match self {
            ComparisonError::Unparsed { side, .. } => *side,
        }
    }
}
