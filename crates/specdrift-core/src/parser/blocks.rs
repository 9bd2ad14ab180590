//! Field-block segmentation shared by the two surface front-ends
//!
//! A front-end decides where labels are and which lines are fenced code; the
//! [`BlockBuilder`] decides how the remaining lines group into entries.

use crate::error::{ParseError, ParseErrorKind};
use crate::parser::scanner::{SourceLine, Span};
use crate::Field;

/// One labelled block as written
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RawBlock {
    pub label: String,
    pub field: Option<Field>,
    pub span: Span,
    pub bold: bool,
    pub items: Vec<RawItem>,
}

impl RawBlock {
    fn is_list(&self) -> bool {
        // Unknown fields are skipped later; grouping them as lists is harmless
        self.field.map_or(true, |f| f.is_list())
    }

    /// Entries of a single-valued field, joined with single spaces
    pub fn joined_text(&self) -> String {
        self.items
            .iter()
            .map(|i| i.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// One entry of a block, back-ticks already removed
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RawItem {
    pub text: String,
    pub span: Span,
    pub code_span: bool,
}

#[derive(Debug, Default)]
pub(crate) struct BlockBuilder {
    blocks: Vec<RawBlock>,
    /// Indentation of the bullet that opened the current entry
    bullet_indent: Option<usize>,
}

impl BlockBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, label: &str, span: Span, bold: bool) {
        self.blocks.push(RawBlock {
            label: label.to_string(),
            field: Field::from_label(label),
            span,
            bold,
            items: Vec::new(),
        });
        self.bullet_indent = None;
    }

    /// Value written on the label line itself
    pub fn inline_value(&mut self, text: &str, span: Span) -> Result<(), ParseError> {
        if text.trim().is_empty() {
            return Ok(());
        }
        let (text, code_span) = strip_code_spans(text, span)?;
        self.push_item(text, span, code_span);
        Ok(())
    }

    /// A line of fenced code: always its own entry for lists
    pub fn code_line(&mut self, line: &SourceLine<'_>) {
        let content = line.content().trim_end();
        if content.is_empty() {
            return;
        }
        let span = line.content_span();
        let joins_text = self
            .blocks
            .last()
            .is_some_and(|b| !b.is_list() && !b.items.is_empty());
        if joins_text {
            if let Some(block) = self.blocks.last_mut() {
                append(block, content);
            }
        } else {
            self.push_item(content.to_string(), span, true);
        }
    }

    /// Any other non-blank line after a label
    pub fn body_line(&mut self, line: &SourceLine<'_>) -> Result<(), ParseError> {
        let Some(block) = self.blocks.last() else {
            return Ok(());
        };
        let is_list = block.is_list();
        let has_items = !block.items.is_empty();
        let content = line.content().trim_end();

        if let Some(rest) = strip_bullet(content) {
            let at = line.text.len() - line.text.trim_start().len() + (content.len() - rest.len());
            let span = line.span_at(at);
            let (text, code_span) = strip_code_spans(rest, span)?;
            self.push_item(text, span, code_span);
            self.bullet_indent = Some(line.indent);
            return Ok(());
        }

        let span = line.content_span();
        let (text, code_span) = strip_code_spans(content, span)?;
        let continues = if is_list {
            self.bullet_indent.is_some_and(|indent| line.indent > indent)
        } else {
            has_items
        };

        if continues && has_items {
            if let Some(block) = self.blocks.last_mut() {
                append(block, &text);
            }
        } else {
            self.push_item(text, span, code_span);
            if is_list {
                self.bullet_indent = None;
            }
        }
        Ok(())
    }

    pub fn finish(self) -> Vec<RawBlock> {
        self.blocks
    }

    fn push_item(&mut self, text: String, span: Span, code_span: bool) {
        if let Some(block) = self.blocks.last_mut() {
            block.items.push(RawItem {
                text,
                span,
                code_span,
            });
        }
    }
}

fn append(block: &mut RawBlock, text: &str) {
    if let Some(last) = block.items.last_mut() {
        if !last.text.is_empty() {
            last.text.push(' ');
        }
        last.text.push_str(text.trim());
    }
}

/// Remainder of a list entry after its bullet (`-`, `*`, `+`, `1.`, `1)`)
pub(crate) fn strip_bullet(content: &str) -> Option<&str> {
    for bullet in ["- ", "* ", "+ "] {
        if let Some(rest) = content.strip_prefix(bullet) {
            return Some(rest.trim_start());
        }
    }
    if matches!(content, "-" | "*" | "+") {
        return Some("");
    }

    let digits = content.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &content[digits..];
        if let Some(rest) = rest.strip_prefix(". ").or_else(|| rest.strip_prefix(") ")) {
            return Some(rest.trim_start());
        }
    }
    None
}

/// Remove back-tick code-span markers; reports whether any were present
pub(crate) fn strip_code_spans(text: &str, span: Span) -> Result<(String, bool), ParseError> {
    let ticks: Vec<usize> = text.match_indices('`').map(|(i, _)| i).collect();
    if ticks.is_empty() {
        return Ok((text.trim().to_string(), false));
    }
    if ticks.len() % 2 == 1 {
        let last = ticks[ticks.len() - 1];
        let column = text[..last].chars().count();
        return Err(ParseError::new(
            ParseErrorKind::UnterminatedCodeSpan,
            span.shifted(last, column),
        ));
    }
    Ok((text.replace('`', "").trim().to_string(), true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::scanner::source_lines;

    fn build(label: &str, body: &str) -> RawBlock {
        let mut builder = BlockBuilder::new();
        builder.open(label, Span::default(), true);
        for line in source_lines(body).iter().filter(|l| !l.is_blank()) {
            builder.body_line(line).unwrap();
        }
        builder.finish().remove(0)
    }

    #[test]
    fn test_bullets_start_entries() {
        let block = build("TESTS", "  - f(1) == 2\n  * f(2) == 4\n  3. f(3) == 6");
        let texts: Vec<_> = block.items.iter().map(|i| i.text.as_str()).collect();
        assert_eq!(texts, vec!["f(1) == 2", "f(2) == 4", "f(3) == 6"]);
    }

    #[test]
    fn test_deeper_indent_continues_entry() {
        let block = build("BEHAVIOR", "  - WHEN x < 0\n      THEN raise ValueError\n  - OTHERWISE return x");
        assert_eq!(block.items.len(), 2);
        assert_eq!(block.items[0].text, "WHEN x < 0 THEN raise ValueError");
    }

    #[test]
    fn test_plain_lines_are_separate_entries() {
        let block = build("CONSTRAINTS", "a: positive\nb: at most 5");
        assert_eq!(block.items.len(), 2);
    }

    #[test]
    fn test_text_field_joins_lines() {
        let block = build("INTENT", "Validate a coupon\nagainst the cart.");
        assert_eq!(block.joined_text(), "Validate a coupon against the cart.");
    }

    #[test]
    fn test_bullet_span_points_at_entry_text() {
        let block = build("TESTS", "  - f(1) == 2");
        assert_eq!(block.items[0].span.column, 5);
    }

    #[test]
    fn test_code_spans_are_stripped_and_recorded() {
        let block = build("TESTS", "- `f(1) == 2`\n- f(2) == 4");
        assert!(block.items[0].code_span);
        assert_eq!(block.items[0].text, "f(1) == 2");
        assert!(!block.items[1].code_span);
    }

    #[test]
    fn test_unterminated_code_span() {
        let err = strip_code_spans("`f(1) == 2", Span::new(2, 3, 10)).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnterminatedCodeSpan);
        assert_eq!(err.span, Span::new(2, 3, 10));
    }

    #[test]
    fn test_strip_bullet_variants() {
        assert_eq!(strip_bullet("- a"), Some("a"));
        assert_eq!(strip_bullet("12) a"), Some("a"));
        assert_eq!(strip_bullet("-1 == f()"), None);
        assert_eq!(strip_bullet("**BOLD**"), None);
    }
}
