//! Line and expression scanner for contract text
//!
//! Two layers:
//! - [`source_lines`] splits a document into lines carrying their span and
//!   indentation, which both surface front-ends consume.
//! - [`Scanner`] turns a single expression (a rule line, a test line, a
//!   signature) into a token stream so the grammar can find top-level
//!   separators without being fooled by string literals or brackets.
//!
//! Guarantees:
//! - Deterministic: same input always produces same token stream
//! - Every token carries a span (line:column plus byte offsets)

use serde::{Deserialize, Serialize};

/// Token types for contract expressions
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Quoted literal, content unescaped
    Str(String),
    /// Numeric literal exactly as written
    Number(String),
    Ident(String),
    /// `(`, `[` or `{`
    Open(char),
    /// `)`, `]` or `}`
    Close(char),
    Comma,
    /// Operators and punctuation: `==`, `->`, `::`, `<`, `.`, `...`
    Symbol(String),
    /// Anything else, kept so callers can reject it
    Other(char),
    Eof,
}

/// Position in source text for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl Span {
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Span {
            line,
            column,
            offset,
        }
    }

    /// Span of a position `bytes` further along the same line
    pub fn shifted(&self, bytes: usize, chars: usize) -> Span {
        Span {
            line: self.line,
            column: self.column + chars,
            offset: self.offset + bytes,
        }
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Token with source position. `start` and `end` are byte offsets into the
/// scanned text, so callers can slice the original spelling back out.
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub span: Span,
    pub start: usize,
    pub end: usize,
}

/// Failure while scanning an expression
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message} at {span}")]
pub struct ScanError {
    pub message: String,
    pub span: Span,
}

/// Tokenizer for a single expression
pub struct Scanner {
    input: Vec<char>,
    position: usize,
    byte_offset: usize,
    origin: Span,
    column: usize,
}

impl Scanner {
    /// Create a scanner; reported spans start at line 1, column 1
    pub fn new(text: &str) -> Self {
        Self::at(text, Span::new(1, 1, 0))
    }

    /// Create a scanner whose spans are relative to `origin`
    pub fn at(text: &str, origin: Span) -> Self {
        Scanner {
            input: text.chars().collect(),
            position: 0,
            byte_offset: 0,
            origin,
            column: 0,
        }
    }

    /// Tokenize the entire input into a stream of spanned tokens
    pub fn tokenize(&mut self) -> Result<Vec<SpannedToken>, ScanError> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace();

            if self.is_at_end() {
                tokens.push(SpannedToken {
                    token: Token::Eof,
                    span: self.current_span(),
                    start: self.byte_offset,
                    end: self.byte_offset,
                });
                break;
            }

            let token = self.next_token()?;
            tokens.push(token);
        }

        Ok(tokens)
    }

    // ── Character helpers ──────────────────────────────────

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_ahead(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn previous(&self) -> Option<char> {
        if self.position == 0 {
            None
        } else {
            self.input.get(self.position - 1).copied()
        }
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.input.get(self.position).copied();
        if let Some(c) = ch {
            self.position += 1;
            self.byte_offset += c.len_utf8();
            self.column += 1;
        }
        ch
    }

    fn current_span(&self) -> Span {
        self.origin.shifted(self.byte_offset, self.column)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn finish(&self, token: Token, span: Span, start: usize) -> SpannedToken {
        SpannedToken {
            token,
            span,
            start,
            end: self.byte_offset,
        }
    }

    // ── Main dispatch ──────────────────────────────────────

    fn next_token(&mut self) -> Result<SpannedToken, ScanError> {
        let span = self.current_span();
        let start = self.byte_offset;
        let Some(ch) = self.peek() else {
            return Ok(self.finish(Token::Eof, span, start));
        };

        match ch {
            '(' | '[' | '{' => {
                self.advance();
                Ok(self.finish(Token::Open(ch), span, start))
            }
            ')' | ']' | '}' => {
                self.advance();
                Ok(self.finish(Token::Close(ch), span, start))
            }
            ',' => {
                self.advance();
                Ok(self.finish(Token::Comma, span, start))
            }
            '"' => self.read_string('"', span, start),
            // An apostrophe inside a word ("user's") is not a quote
            '\'' if !self.previous().is_some_and(|p| p.is_alphanumeric()) => {
                self.read_string('\'', span, start)
            }
            c if c.is_ascii_digit() => Ok(self.read_number(span, start)),
            c if c.is_alphabetic() || c == '_' => Ok(self.read_identifier(span, start)),
            _ => Ok(self.read_symbol(span, start)),
        }
    }

    // ── String literals ────────────────────────────────────

    fn read_string(&mut self, quote: char, span: Span, start: usize) -> Result<SpannedToken, ScanError> {
        self.advance(); // opening quote
        let mut value = String::new();

        loop {
            match self.advance() {
                None => {
                    return Err(ScanError {
                        message: "unterminated string literal".to_string(),
                        span,
                    });
                }
                Some(c) if c == quote => break,
                Some('\\') => match self.advance() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some(c) => value.push(c),
                    None => {
                        return Err(ScanError {
                            message: "unterminated escape sequence".to_string(),
                            span: self.current_span(),
                        });
                    }
                },
                Some(c) => value.push(c),
            }
        }

        Ok(self.finish(Token::Str(value), span, start))
    }

    // ── Numbers ────────────────────────────────────────────

    fn read_number(&mut self, span: Span, start: usize) -> SpannedToken {
        let begin = self.position;
        while let Some(ch) = self.peek() {
            let fraction = ch == '.' && self.peek_ahead(1).is_some_and(|n| n.is_ascii_digit());
            if ch.is_ascii_alphanumeric() || ch == '_' || fraction {
                self.advance();
            } else {
                break;
            }
        }
        let text: String = self.input[begin..self.position].iter().collect();
        self.finish(Token::Number(text), span, start)
    }

    // ── Identifiers ────────────────────────────────────────

    fn read_identifier(&mut self, span: Span, start: usize) -> SpannedToken {
        let begin = self.position;
        while let Some(ch) = self.peek() {
            if ch.is_alphanumeric() || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }
        let text: String = self.input[begin..self.position].iter().collect();
        self.finish(Token::Ident(text), span, start)
    }

    // ── Symbols ────────────────────────────────────────────

    fn read_symbol(&mut self, span: Span, start: usize) -> SpannedToken {
        const THREE: [&str; 3] = ["...", "===", "!=="];
        const TWO: [&str; 12] = [
            "==", "!=", "<=", ">=", "->", "=>", "::", "**", "&&", "||", "<<", ">>",
        ];

        let lookahead: String = (0..3).filter_map(|i| self.peek_ahead(i)).collect();
        for candidate in THREE.iter().chain(TWO.iter()) {
            if lookahead.starts_with(candidate) {
                for _ in 0..candidate.chars().count() {
                    self.advance();
                }
                return self.finish(Token::Symbol((*candidate).to_string()), span, start);
            }
        }

        let ch = self.advance().unwrap_or_default();
        let token = if "<>=:+-*/%&|!?.@^~#;".contains(ch) {
            Token::Symbol(ch.to_string())
        } else {
            Token::Other(ch)
        };
        self.finish(token, span, start)
    }
}

/// Tokenize `text`, spans relative to `origin`
pub fn tokenize_at(text: &str, origin: Span) -> Result<Vec<SpannedToken>, ScanError> {
    Scanner::at(text, origin).tokenize()
}

/// One physical line of a document
#[derive(Debug, Clone, PartialEq)]
pub struct SourceLine<'a> {
    /// 1-based line number
    pub number: usize,
    /// Byte offset of the first character of the line
    pub offset: usize,
    /// Line text without its terminator
    pub text: &'a str,
    /// Count of leading whitespace characters (tab counts as one)
    pub indent: usize,
}

impl<'a> SourceLine<'a> {
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Text after the indentation
    pub fn content(&self) -> &'a str {
        self.text.trim_start()
    }

    /// Span of the first non-whitespace character
    pub fn content_span(&self) -> Span {
        let skipped = self.text.len() - self.content().len();
        Span::new(self.number, self.indent + 1, self.offset + skipped)
    }

    /// Span of byte index `at` within this line's text
    pub fn span_at(&self, at: usize) -> Span {
        let chars = self.text[..at.min(self.text.len())].chars().count();
        Span::new(self.number, chars + 1, self.offset + at)
    }
}

/// Split a document into lines, keeping byte offsets and indentation
pub fn source_lines(text: &str) -> Vec<SourceLine<'_>> {
    let mut lines = Vec::new();
    let mut offset = 0;
    for (index, raw) in text.split('\n').enumerate() {
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        let indent = line.chars().take_while(|c| c.is_whitespace()).count();
        lines.push(SourceLine {
            number: index + 1,
            offset,
            text: line,
            indent,
        });
        offset += raw.len() + 1;
    }
    lines
}
