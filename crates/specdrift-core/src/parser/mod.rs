//! Contract parser: surface detection, front-ends and model assembly
//!
//! Both notations are segmented into labelled blocks by their own front-end
//! ([`keyvalue`] or [`inline`]); [`assemble`] then applies the canonical
//! [`grammar`] to every entry. Notation details are kept in a
//! [`SurfaceTrace`] next to the model and never enter [`ContractModel`].

pub mod grammar;
pub mod scanner;

mod blocks;
mod frontmatter;
mod inline;
mod keyvalue;

use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ParseError, ParseErrorKind};
use crate::{BehaviorRule, ConstraintText, ContractModel, EdgeCaseText, Field, Metadata, TestCase};
use blocks::RawBlock;
use scanner::{source_lines, SourceLine, Span};

/// The two accepted surface notations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SurfaceKind {
    /// `SIGNATURE: ...` labels at column 0
    KeyValue,
    /// `**SIGNATURE:**` labels with back-ticked code
    Inline,
}

impl SurfaceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SurfaceKind::KeyValue => "key-value",
            SurfaceKind::Inline => "inline",
        }
    }
}

impl std::fmt::Display for SurfaceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SurfaceKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "key-value" | "keyvalue" | "kv" => Ok(SurfaceKind::KeyValue),
            "inline" => Ok(SurfaceKind::Inline),
            other => Err(format!(
                "unknown surface `{other}` (expected `key-value` or `inline`)"
            )),
        }
    }
}

/// A field label as written
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelMark {
    pub label: String,
    pub span: Span,
    pub bold: bool,
}

/// A signature or test entry and whether it was wrapped in back-ticks
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeSpanMark {
    pub field: Field,
    /// Test position; 0 for the signature
    pub index: usize,
    pub span: Span,
    pub backticked: bool,
}

/// How a contract was written, for the structural validator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SurfaceTrace {
    pub surface: SurfaceKind,
    /// Known fields in first-appearance order
    pub present: Vec<Field>,
    pub has_metadata: bool,
    /// Every label in document order
    pub labels: Vec<LabelMark>,
    pub unknown_fields: Vec<LabelMark>,
    /// Second and later blocks of an already seen field
    pub duplicate_fields: Vec<LabelMark>,
    pub code_spans: Vec<CodeSpanMark>,
}

impl SurfaceTrace {
    fn new(surface: SurfaceKind, has_metadata: bool) -> Self {
        SurfaceTrace {
            surface,
            present: Vec::new(),
            has_metadata,
            labels: Vec::new(),
            unknown_fields: Vec::new(),
            duplicate_fields: Vec::new(),
            code_spans: Vec::new(),
        }
    }

    pub fn has_field(&self, field: Field) -> bool {
        self.present.contains(&field)
    }
}

/// A parsed model together with its surface trace
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedContract {
    pub model: ContractModel,
    pub trace: SurfaceTrace,
}

/// Parse contract text, auto-detecting its notation
pub fn parse(text: &str) -> Result<ParsedContract, ParseError> {
    parse_with(text, None)
}

/// Parse contract text in the given notation, or auto-detect when `None`
///
/// # Errors
/// Returns a [`ParseError`] with line and column for empty input, text with
/// no recognizable field header, unterminated metadata or code spans, and
/// malformed rule or test lines.
pub fn parse_with(text: &str, surface: Option<SurfaceKind>) -> Result<ParsedContract, ParseError> {
    if text.trim().is_empty() {
        return Err(ParseError::new(ParseErrorKind::EmptyInput, Span::new(1, 1, 0)));
    }

    let lines = source_lines(text);
    let (metadata, body_start) = frontmatter::split(&lines)?;
    let body = &lines[body_start..];

    let surface = match surface {
        Some(surface) => surface,
        None => detect_surface(body).ok_or_else(|| {
            let span = body
                .iter()
                .find(|l| !l.is_blank())
                .map_or(Span::new(1, 1, 0), |l| l.content_span());
            ParseError::new(ParseErrorKind::UndetectableSurface, span)
        })?,
    };

    let blocks = match surface {
        SurfaceKind::KeyValue => keyvalue::segment(body)?,
        SurfaceKind::Inline => inline::segment(body)?,
    };
    let parsed = assemble(surface, metadata, blocks)?;

    tracing::debug!(
        surface = %surface,
        fields = parsed.trace.present.len(),
        rules = parsed.model.behavior_rules.len(),
        tests = parsed.model.tests.len(),
        "parsed contract"
    );
    Ok(parsed)
}

/// The notation of the first recognizable field header, if any
pub fn detect_surface(lines: &[SourceLine<'_>]) -> Option<SurfaceKind> {
    lines.iter().filter(|l| !l.is_blank()).find_map(|line| {
        if let Some((name, _)) = inline::bold_label(line.content()) {
            if Field::from_label(name).is_some() {
                return Some(SurfaceKind::Inline);
            }
        }
        match plain_label(line.text) {
            Some(label) if line.indent == 0 && Field::from_label(label.name).is_some() => {
                Some(SurfaceKind::KeyValue)
            }
            _ => None,
        }
    })
}

/// A bare `NAME:` label at the start of a line
pub(crate) struct PlainLabel<'a> {
    pub name: &'a str,
    pub rest: &'a str,
    /// Byte offset of `rest` within the line
    pub rest_offset: usize,
}

fn plain_label_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([A-Z][A-Z0-9_]*):\s*(.*)$").expect("plain label regex must compile")
    })
}

pub(crate) fn plain_label(text: &str) -> Option<PlainLabel<'_>> {
    let caps = plain_label_re().captures(text)?;
    let name = caps.get(1)?.as_str();
    // Rule keywords are entries, not labels
    if matches!(name, "WHEN" | "THEN" | "OTHERWISE") {
        return None;
    }
    let rest = caps.get(2)?;
    Some(PlainLabel {
        name,
        rest: rest.as_str(),
        rest_offset: rest.start(),
    })
}

fn assemble(
    surface: SurfaceKind,
    metadata: Option<Metadata>,
    blocks: Vec<RawBlock>,
) -> Result<ParsedContract, ParseError> {
    let mut trace = SurfaceTrace::new(surface, metadata.is_some());
    let mut model = ContractModel {
        metadata,
        ..Default::default()
    };
    let mut seen = BTreeSet::new();

    for block in blocks {
        let mark = LabelMark {
            label: block.label.clone(),
            span: block.span,
            bold: block.bold,
        };
        trace.labels.push(mark.clone());

        let Some(field) = block.field else {
            trace.unknown_fields.push(mark);
            continue;
        };
        if seen.insert(field) {
            trace.present.push(field);
        } else {
            trace.duplicate_fields.push(mark);
        }

        match field {
            Field::Signature => {
                if let Some(first) = block.items.first() {
                    trace.code_spans.push(CodeSpanMark {
                        field,
                        index: 0,
                        span: first.span,
                        backticked: block.items.iter().all(|i| i.code_span),
                    });
                }
                append_text(&mut model.signature, &block.joined_text());
            }
            Field::Intent => append_text(&mut model.intent, &block.joined_text()),
            Field::Complexity => {
                let text = block.joined_text();
                if !text.is_empty() {
                    let complexity = model.complexity.get_or_insert_with(String::new);
                    append_text(complexity, &text);
                }
            }
            Field::Behavior => {
                for item in entries(&block) {
                    let parts = grammar::parse_rule(&item.text, item.span)?;
                    model.behavior_rules.push(BehaviorRule {
                        position: model.behavior_rules.len(),
                        condition: parts.condition,
                        action: parts.action,
                        is_default: parts.is_default,
                    });
                }
            }
            Field::Tests => {
                for item in entries(&block) {
                    let (invocation, expectation) = grammar::parse_test(&item.text, item.span)?;
                    let position = model.tests.len();
                    trace.code_spans.push(CodeSpanMark {
                        field,
                        index: position,
                        span: item.span,
                        backticked: item.code_span,
                    });
                    model.tests.push(TestCase {
                        position,
                        invocation,
                        expectation,
                    });
                }
            }
            Field::Constraints => model
                .constraints
                .extend(entries(&block).map(|i| ConstraintText::new(i.text.clone()))),
            Field::EdgeCases => model
                .edge_cases
                .extend(entries(&block).map(|i| EdgeCaseText::new(i.text.clone()))),
            Field::Dependencies => model
                .dependencies
                .extend(entries(&block).map(|i| i.text.clone())),
            Field::Examples => model.examples.extend(entries(&block).map(|i| i.text.clone())),
        }
    }

    Ok(ParsedContract { model, trace })
}

fn entries(block: &RawBlock) -> impl Iterator<Item = &blocks::RawItem> {
    block.items.iter().filter(|i| !i.text.trim().is_empty())
}

fn append_text(target: &mut String, text: &str) {
    if text.is_empty() {
        return;
    }
    if !target.is_empty() {
        target.push(' ');
    }
    target.push_str(text);
}
