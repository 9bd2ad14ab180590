//! Bold-label plus back-tick notation (Markdown flavoured)
//!
//! ```text
//! **SIGNATURE:** `def apply_discount(total: float, code: str) -> float`
//! **INTENT:** Apply a coupon discount to a cart total.
//! **BEHAVIOR:**
//! - WHEN total < 0 THEN raise ValueError "total must be non-negative"
//! - OTHERWISE return total
//! **TESTS:**
//! - `apply_discount(10.0, "") == 10.0`
//! ```
//!
//! Bare `NAME:` labels and un-ticked code are accepted here and recorded in
//! the surface trace, so the structural validator can flag them.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{ParseError, ParseErrorKind};
use crate::parser::blocks::{BlockBuilder, RawBlock};
use crate::parser::plain_label;
use crate::parser::scanner::SourceLine;

fn bold_label_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\*\*([A-Z][A-Z0-9_]+)(?::\*\*|\*\*:|\*\*)\s*(.*)$")
            .expect("bold label regex must compile")
    })
}

/// A `**NAME:**` label: its name and the byte offset of the rest of the line
pub(crate) fn bold_label(content: &str) -> Option<(&str, usize)> {
    let caps = bold_label_re().captures(content)?;
    let name = caps.get(1)?.as_str();
    let rest = caps.get(2).map_or(content.len(), |m| m.start());
    Some((name, rest))
}

/// Group body lines into labelled blocks
pub(crate) fn segment(lines: &[SourceLine<'_>]) -> Result<Vec<RawBlock>, ParseError> {
    let mut builder = BlockBuilder::new();
    let mut fence = None;

    for line in lines {
        let content = line.content();
        if content.starts_with("```") {
            fence = match fence {
                Some(_) => None,
                None => Some(line.content_span()),
            };
            continue;
        }
        if fence.is_some() {
            builder.code_line(line);
            continue;
        }
        if line.is_blank() {
            continue;
        }

        if let Some((name, rest)) = bold_label(content) {
            let offset = line.text.len() - content.len() + rest;
            builder.open(name, line.content_span(), true);
            builder.inline_value(&content[rest..], line.span_at(offset))?;
            continue;
        }
        if line.indent == 0 {
            if let Some(label) = plain_label(line.text) {
                builder.open(label.name, line.content_span(), false);
                builder.inline_value(label.rest, line.span_at(label.rest_offset))?;
                continue;
            }
        }
        builder.body_line(line)?;
    }

    if let Some(span) = fence {
        return Err(ParseError::new(ParseErrorKind::UnterminatedCodeSpan, span));
    }
    Ok(builder.finish())
}
