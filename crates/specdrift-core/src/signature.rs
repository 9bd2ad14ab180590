//! Function-declaration analysis for SIGNATURE fields
//!
//! Accepts the common declaration shapes: Python `def`, Rust `fn`, Go
//! `func`, JavaScript/TypeScript `function`, Kotlin `fun` and C-family
//! `Type name(...)`. Anything else, prose in particular, is rejected.

use serde::{Deserialize, Serialize};

use crate::parser::grammar::top_level;
use crate::parser::scanner::{tokenize_at, Span, SpannedToken, Token};

/// A parsed function declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// Declaring keyword (`def`, `fn`, `func`, ...), absent for C-family
    pub keyword: Option<String>,
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub return_type: Option<String>,
}

impl Signature {
    pub fn parameter_names(&self) -> impl Iterator<Item = &str> {
        self.parameters.iter().map(|p| p.name.as_str())
    }

    pub fn has_parameter(&self, name: &str) -> bool {
        self.parameter_names().any(|p| p == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_annotation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

const DECLARING_KEYWORDS: [&str; 5] = ["def", "fn", "func", "function", "fun"];

const MODIFIERS: [&str; 21] = [
    "pub", "async", "export", "static", "public", "private", "protected", "const", "unsafe",
    "extern", "inline", "virtual", "override", "final", "abstract", "native", "synchronized",
    "default", "declare", "suspend", "constexpr",
];

const PRIMITIVES: [&str; 16] = [
    "void", "int", "char", "bool", "boolean", "float", "double", "long", "short", "unsigned",
    "signed", "string", "auto", "byte", "size_t", "object",
];

/// At most this many words may precede the function name
const MAX_PREFIX_WORDS: usize = 4;

/// Parse a declaration; `None` when the text is not one
pub fn parse_signature(text: &str) -> Option<Signature> {
    let text = text.trim().trim_end_matches(';').trim_end();
    if text.is_empty() {
        return None;
    }
    let tokens = tokenize_at(text, Span::default()).ok()?;

    let open = parameter_list_start(&tokens)?;
    let (name_index, name) = function_name(&tokens, open)?;
    let prefix = &tokens[..name_index];
    let keyword = declaring_keyword(prefix)?;

    let close = matching_close(&tokens, open)?;
    let parameters = split_parameters(text, &tokens[open..=close], keyword.as_deref())?;

    let tail = text[tokens[close].end..].trim();
    let return_type = match return_annotation(tail, keyword.as_deref())? {
        Some(annotation) => Some(annotation),
        None if keyword.is_none() => prefix_return_type(text, prefix),
        None => None,
    };

    Some(Signature {
        keyword,
        name,
        parameters,
        return_type,
    })
}

/// Index of the `(` that opens the parameter list
fn parameter_list_start(tokens: &[SpannedToken]) -> Option<usize> {
    let mut index = 0;
    while index < tokens.len() {
        if tokens[index].token == Token::Open('(') {
            let previous = index.checked_sub(1).map(|i| &tokens[i].token);
            // `pub(crate) fn`, Go receivers `func (s *Server) Name(...)`
            let skip = matches!(previous, Some(Token::Ident(word)) if word == "pub" || word == "func");
            if !skip {
                return Some(index);
            }
            index = matching_close(tokens, index)? + 1;
            continue;
        }
        if matches!(tokens[index].token, Token::Str(_) | Token::Eof) {
            return None;
        }
        index += 1;
    }
    None
}

/// The identifier before the parameter list, skipping a generic `<...>`
fn function_name(tokens: &[SpannedToken], open: usize) -> Option<(usize, String)> {
    let mut index = open.checked_sub(1)?;
    if matches!(&tokens[index].token, Token::Symbol(s) if s.starts_with('>')) {
        let mut depth = 0isize;
        loop {
            match &tokens[index].token {
                Token::Symbol(s) if s == ">" => depth += 1,
                Token::Symbol(s) if s == ">>" => depth += 2,
                Token::Symbol(s) if s == "<" => depth -= 1,
                _ => {}
            }
            if depth == 0 {
                break;
            }
            index = index.checked_sub(1)?;
        }
        index = index.checked_sub(1)?;
    }
    match &tokens[index].token {
        Token::Ident(name) if !DECLARING_KEYWORDS.contains(&name.as_str()) => {
            Some((index, name.clone()))
        }
        _ => None,
    }
}

/// Validate the words before the name; returns the declaring keyword
///
/// A declaring keyword must sit right before the name (after modifiers
/// only). Without one, the prefix must read as a return type.
fn declaring_keyword(prefix: &[SpannedToken]) -> Option<Option<String>> {
    if prefix
        .iter()
        .any(|t| matches!(t.token, Token::Str(_) | Token::Number(_) | Token::Comma))
    {
        return None;
    }
    // Words inside `pub(crate)` or a Go receiver do not count
    let words: Vec<&SpannedToken> = top_level(prefix)
        .filter(|t| matches!(t.token, Token::Ident(_)))
        .collect();
    if words.len() > MAX_PREFIX_WORDS {
        return None;
    }
    let word = |t: &SpannedToken| match &t.token {
        Token::Ident(w) => w.clone(),
        _ => String::new(),
    };

    if let Some(position) = words
        .iter()
        .position(|t| DECLARING_KEYWORDS.contains(&word(t).as_str()))
    {
        let before_ok = words[..position]
            .iter()
            .all(|t| MODIFIERS.contains(&word(t).as_str()));
        let after_ok = position + 1 == words.len();
        return (before_ok && after_ok).then(|| Some(word(words[position])));
    }

    let type_like = prefix.iter().enumerate().all(|(i, t)| match &t.token {
        Token::Ident(w) => {
            let next_is_type_construct = matches!(
                prefix.get(i + 1).map(|n| &n.token),
                Some(Token::Symbol(s)) if matches!(s.as_str(), "::" | "<" | "*" | "&" | "." )
            ) || matches!(prefix.get(i + 1).map(|n| &n.token), Some(Token::Open('[')));
            MODIFIERS.contains(&w.as_str())
                || PRIMITIVES.contains(&w.as_str())
                || looks_like_type(w)
                || next_is_type_construct
        }
        _ => true,
    });
    type_like.then_some(None)
}

fn looks_like_type(word: &str) -> bool {
    word.chars().next().is_some_and(|c| c.is_ascii_uppercase())
        || word.contains('_')
        || word.chars().any(|c| c.is_ascii_digit())
}

fn matching_close(tokens: &[SpannedToken], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (index, token) in tokens.iter().enumerate().skip(open) {
        match token.token {
            Token::Open(_) => depth += 1,
            Token::Close(_) => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(index);
                }
            }
            _ => {}
        }
    }
    None
}

fn split_parameters(
    text: &str,
    group: &[SpannedToken],
    keyword: Option<&str>,
) -> Option<Vec<Parameter>> {
    let inner = &group[1..group.len() - 1];
    let Some(first) = inner.first() else {
        return Some(Vec::new());
    };

    let mut parameters = Vec::new();
    let mut depth = 0usize;
    let mut start = first.start;
    for token in inner {
        match token.token {
            Token::Open(_) => depth += 1,
            Token::Close(_) => depth = depth.saturating_sub(1),
            Token::Comma if depth == 0 => {
                push_parameter(&mut parameters, &text[start..token.start], keyword)?;
                start = token.end;
            }
            _ => {}
        }
    }
    let end = group[group.len() - 1].start;
    push_parameter(&mut parameters, &text[start..end], keyword)?;
    Some(parameters)
}

fn push_parameter(
    parameters: &mut Vec<Parameter>,
    text: &str,
    keyword: Option<&str>,
) -> Option<()> {
    let text = text.trim();
    if text.is_empty() {
        return Some(());
    }
    parameters.push(parse_parameter(text, keyword)?);
    Some(())
}

fn parse_parameter(text: &str, keyword: Option<&str>) -> Option<Parameter> {
    let tokens = tokenize_at(text, Span::default()).ok()?;

    let (head, default) = match top_level(&tokens).find(|t| matches!(&t.token, Token::Symbol(s) if s == "=")) {
        Some(eq) => (text[..eq.start].trim(), Some(text[eq.end..].trim().to_string())),
        None => (text, None),
    };

    let head_tokens = tokenize_at(head, Span::default()).ok()?;
    let colon = top_level(&head_tokens).find(|t| matches!(&t.token, Token::Symbol(s) if s == ":"));
    let (name_part, type_annotation) = match colon {
        Some(colon) => (
            head[..colon.start].trim(),
            Some(head[colon.end..].trim().to_string()).filter(|t| !t.is_empty()),
        ),
        None => split_whitespace_form(head, keyword),
    };

    let name = name_part
        .rsplit(char::is_whitespace)
        .next()
        .unwrap_or(name_part)
        .trim_start_matches(['*', '&', '.'])
        .trim_end_matches('?');
    let is_identifier = name
        .chars()
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
        && name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$');
    if !is_identifier {
        return None;
    }

    Some(Parameter {
        name: name.to_string(),
        type_annotation,
        default,
    })
}

/// `name Type` (Go) or `Type name` (C-family)
fn split_whitespace_form<'a>(head: &'a str, keyword: Option<&str>) -> (&'a str, Option<String>) {
    if keyword == Some("func") {
        return match head.split_once(char::is_whitespace) {
            Some((name, ty)) => (name, Some(ty.trim().to_string())),
            None => (head, None),
        };
    }
    match head.rfind(|c: char| c.is_whitespace() || c == '*' || c == '&') {
        Some(split) => {
            let ty = head[..=split].trim();
            let name = head[split + 1..].trim();
            // `*args`, `**kwargs`
            let ty = (!ty.chars().all(|c| matches!(c, '*' | '&' | '.')))
                .then(|| ty.to_string());
            (name, ty)
        }
        None => (head, None),
    }
}

/// What follows the parameter list; `None` (outer) when it is not a declaration
fn return_annotation(tail: &str, keyword: Option<&str>) -> Option<Option<String>> {
    let tail = tail.trim_end_matches(['{', ';']).trim_end();
    if tail.is_empty() || tail == ":" {
        return Some(None);
    }

    let annotation = if let Some(rest) = tail.strip_prefix("->").or_else(|| tail.strip_prefix("=>")) {
        rest
    } else if let Some(rest) = tail.strip_prefix(':') {
        rest
    } else if keyword == Some("func") {
        tail
    } else if ["const", "noexcept", "throws", "override"]
        .iter()
        .any(|w| tail.split_whitespace().next() == Some(*w))
    {
        return Some(None);
    } else {
        return None;
    };

    let annotation = match annotation.find(" where ") {
        Some(cut) => &annotation[..cut],
        None => annotation,
    };
    let annotation = annotation.trim().trim_end_matches(':').trim_end();
    if annotation.is_empty() {
        return None;
    }
    let tokens = tokenize_at(annotation, Span::default()).ok()?;
    if tokens.iter().any(|t| matches!(t.token, Token::Str(_))) {
        return None;
    }
    Some(Some(annotation.to_string()))
}

/// C-family return type: the prefix without modifiers
fn prefix_return_type(text: &str, prefix: &[SpannedToken]) -> Option<String> {
    let start = prefix
        .iter()
        .find(|t| !matches!(&t.token, Token::Ident(w) if MODIFIERS.contains(&w.as_str())))?;
    let end = prefix.last()?.end;
    let ty = text[start.start..end].trim();
    (!ty.is_empty()).then(|| ty.to_string())
}
