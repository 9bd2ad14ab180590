//! Canonical normalizer: text normalization, re-serialization and hashing
//!
//! A [`ContractModel`] has exactly one canonical text per notation. The
//! key-value form is the hashing input, so two contracts that differ only
//! in notation, bullet style or line wrapping share a digest.
//!
//! # Pipeline
//!
//! `contract text → parse → ContractModel → serialize → SHA-256`
//!
//! # Guarantees
//!
//! - **Idempotent**: `normalize(normalize(x)) == normalize(x)`
//! - **Deterministic**: same input always produces same output
//! - **Round-trip**: `parse(serialize(m))` yields the same rules and tests as `m`

use sha2::{Digest, Sha256};

use crate::error::ParseError;
use crate::parser::{parse_with, SurfaceKind};
use crate::{ContractModel, Expectation, Metadata, TestCase};

// ── Public API ─────────────────────────────────────────────

/// Parse `text` (notation auto-detected) and re-serialize it canonically
///
/// # Errors
/// Returns the [`ParseError`] of the input document.
pub fn normalize(text: &str, to: SurfaceKind) -> Result<String, ParseError> {
    normalize_with(text, None, to)
}

/// Like [`normalize`], with an explicit input notation
pub fn normalize_with(
    text: &str,
    from: Option<SurfaceKind>,
    to: SurfaceKind,
) -> Result<String, ParseError> {
    let parsed = parse_with(text, from)?;
    Ok(serialize(&parsed.model, to))
}

/// SHA-256 of the canonical key-value form, lowercase hex
pub fn semantic_hash(model: &ContractModel) -> String {
    let canonical = serialize(model, SurfaceKind::KeyValue);
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    format!("{:x}", hasher.finalize())
}

// ── Text normalization ─────────────────────────────────────

/// Collapse runs of whitespace to one space and trim
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Rule-text normalization for drift matching
///
/// Lower-cases, replaces punctuation other than the operator characters
/// `< > = ! + - * / %` with spaces and collapses whitespace.
pub fn normalize_text(text: &str) -> String {
    let mapped: String = text
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_punctuation() && !"<>=!+-*/%".contains(c) {
                ' '
            } else {
                c
            }
        })
        .collect();
    collapse_whitespace(&mapped)
}

/// Message normalization for near-equality: lower-case, no punctuation
pub fn normalize_message(text: &str) -> String {
    let mapped: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_punctuation() { ' ' } else { c })
        .collect();
    collapse_whitespace(&mapped)
}

/// Expression normalization for coverage matching
///
/// Single quotes become double quotes; whitespace outside string literals
/// is removed and whitespace inside them is collapsed to one space.
pub fn normalize_expression(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut pending_space = false;

    for c in text.trim().chars() {
        let c = if c == '\'' && !escaped { '"' } else { c };
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
                pending_space = false;
                out.push(c);
                continue;
            }
            if c.is_whitespace() && !escaped {
                pending_space = true;
                continue;
            }
            if pending_space {
                out.push(' ');
                pending_space = false;
            }
            out.push(c);
        } else if c.is_whitespace() {
            continue;
        } else {
            if c == '"' {
                in_string = true;
            }
            out.push(c);
        }
    }
    out
}

/// Whether `needle` occurs in `haystack` with identifier boundaries on both sides
pub fn contains_on_token_boundaries(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let starts_word = needle.chars().next().is_some_and(is_word);
    let ends_word = needle.chars().last().is_some_and(is_word);

    haystack.match_indices(needle).any(|(at, _)| {
        let before = haystack[..at].chars().last();
        let after = haystack[at + needle.len()..].chars().next();
        !(starts_word && before.is_some_and(is_word)) && !(ends_word && after.is_some_and(is_word))
    })
}

// ── Canonical Serializer ───────────────────────────────────

/// Serialize a model in the canonical form of `surface`
///
/// Fields are written in a fixed order; optional list fields are omitted
/// when empty, required fields are always written.
pub fn serialize(model: &ContractModel, surface: SurfaceKind) -> String {
    let mut out = String::new();

    if let Some(ref metadata) = model.metadata {
        serialize_metadata(&mut out, metadata);
    }

    let mut writer = Writer { out: &mut out, surface };
    writer.text_field("SIGNATURE", &collapse_whitespace(&model.signature), true);
    writer.text_field("INTENT", &collapse_whitespace(&model.intent), false);

    writer.label("BEHAVIOR");
    for rule in &model.behavior_rules {
        let line = if rule.is_default {
            format!("OTHERWISE {}", rule.action)
        } else {
            format!("WHEN {} THEN {}", rule.condition, rule.action)
        };
        writer.entry(&line, false);
    }

    writer.label("TESTS");
    for test in &model.tests {
        writer.entry(&test_line(test), true);
    }

    writer.list_field("CONSTRAINTS", model.constraints.iter().map(|c| c.text.as_str()));
    writer.list_field("EDGE_CASES", model.edge_cases.iter().map(|e| e.text.as_str()));
    writer.list_field("DEPENDENCIES", model.dependencies.iter().map(String::as_str));
    writer.list_field("EXAMPLES", model.examples.iter().map(String::as_str));
    if let Some(ref complexity) = model.complexity {
        writer.text_field("COMPLEXITY", &collapse_whitespace(complexity), false);
    }

    out
}

/// One TESTS entry in canonical grammar
pub fn test_line(test: &TestCase) -> String {
    match test.expectation {
        Expectation::Value { ref value } => format!("{} == {}", test.invocation, value),
        Expectation::Error(ref error) => match error.message {
            Some(ref message) => format!(
                "{} raises {} {}",
                test.invocation,
                error.error_kind,
                quote(message)
            ),
            None => format!("{} raises {}", test.invocation, error.error_kind),
        },
    }
}

// ── Section serializers ────────────────────────────────────

fn serialize_metadata(out: &mut String, metadata: &Metadata) {
    out.push_str("---\n");
    let known = [
        ("name", &metadata.name),
        ("language", &metadata.language),
        ("version", &metadata.version),
    ];
    for (key, value) in known {
        if let Some(value) = value {
            out.push_str(&format!("{key}: {value}\n"));
        }
    }
    for (key, value) in &metadata.extra {
        out.push_str(&format!("{key}: {value}\n"));
    }
    out.push_str("---\n");
}

struct Writer<'a> {
    out: &'a mut String,
    surface: SurfaceKind,
}

impl Writer<'_> {
    fn label(&mut self, name: &str) {
        match self.surface {
            SurfaceKind::KeyValue => self.out.push_str(&format!("{name}:\n")),
            SurfaceKind::Inline => self.out.push_str(&format!("\n**{name}:**\n")),
        }
    }

    fn text_field(&mut self, name: &str, value: &str, code: bool) {
        match self.surface {
            SurfaceKind::KeyValue if value.is_empty() => self.out.push_str(&format!("{name}:\n")),
            SurfaceKind::KeyValue => self.out.push_str(&format!("{name}: {value}\n")),
            SurfaceKind::Inline if value.is_empty() => {
                self.out.push_str(&format!("\n**{name}:**\n"))
            }
            SurfaceKind::Inline if code => {
                self.out.push_str(&format!("\n**{name}:** `{value}`\n"))
            }
            SurfaceKind::Inline => self.out.push_str(&format!("\n**{name}:** {value}\n")),
        }
    }

    fn entry(&mut self, text: &str, code: bool) {
        match self.surface {
            SurfaceKind::KeyValue => self.out.push_str(&format!("  - {text}\n")),
            SurfaceKind::Inline if code => self.out.push_str(&format!("- `{text}`\n")),
            SurfaceKind::Inline => self.out.push_str(&format!("- {text}\n")),
        }
    }

    fn list_field<'e>(&mut self, name: &str, entries: impl Iterator<Item = &'e str>) {
        let mut entries = entries.peekable();
        if entries.peek().is_none() {
            return;
        }
        self.label(name);
        for entry in entries {
            self.entry(entry, false);
        }
    }
}

// ── Helpers ────────────────────────────────────────────────

fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
