//! Canonical line grammar shared by both surface notations
//!
//! ```text
//! rule  := "WHEN" condition "THEN" action | "OTHERWISE" action
//! test  := ["assert"] invocation "==" value
//!        | ["assert"] invocation "raises" ErrorKind [message]
//! error := ErrorKind [ "(" string ")" | string | ":" text ]
//! ```
//!
//! Separators (`THEN`, `==`, `raises`, `,`) only count at bracket depth 0 and
//! outside string literals, so `f("a == b") == 1` splits where a reader
//! expects it to.

use crate::error::{ParseError, ParseErrorKind};
use crate::parser::scanner::{tokenize_at, Span, SpannedToken, Token};
use crate::{ErrorDescriptor, Expectation, Outcome};

/// Components of a parsed rule line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleParts {
    pub condition: String,
    pub action: String,
    pub is_default: bool,
}

/// Parse one BEHAVIOR entry
pub fn parse_rule(text: &str, span: Span) -> Result<RuleParts, ParseError> {
    let trimmed = text.trim();
    let malformed = || ParseError::new(ParseErrorKind::MalformedRule(trimmed.to_string()), span);

    if let Some(rest) = strip_keyword(trimmed, "OTHERWISE") {
        let action = rest.trim_start_matches([':', ',']).trim();
        if action.is_empty() {
            return Err(malformed());
        }
        return Ok(RuleParts {
            condition: String::new(),
            action: action.to_string(),
            is_default: true,
        });
    }

    let rest = strip_keyword(trimmed, "WHEN").ok_or_else(malformed)?;
    let tokens = tokenize_at(rest, span).map_err(|_| malformed())?;
    let then = top_level(&tokens)
        .find(|t| matches!(&t.token, Token::Ident(word) if word == "THEN"))
        .ok_or_else(malformed)?;

    let condition = rest[..then.start].trim().trim_end_matches(',').trim_end();
    let action = rest[then.end..].trim();
    if condition.is_empty() || action.is_empty() {
        return Err(malformed());
    }

    Ok(RuleParts {
        condition: condition.to_string(),
        action: action.to_string(),
        is_default: false,
    })
}

/// Parse one TESTS entry into its invocation and expectation
pub fn parse_test(text: &str, span: Span) -> Result<(String, Expectation), ParseError> {
    let trimmed = text.trim();
    let malformed = || ParseError::new(ParseErrorKind::MalformedTest(trimmed.to_string()), span);

    let body = strip_keyword(trimmed, "assert").unwrap_or(trimmed).trim();
    let tokens = tokenize_at(body, span).map_err(|_| malformed())?;
    let separator = top_level(&tokens)
        .find(|t| match &t.token {
            Token::Symbol(s) => s == "==",
            Token::Ident(word) => word == "raises",
            _ => false,
        })
        .ok_or_else(malformed)?;

    let invocation = body[..separator.start].trim();
    let rest = body[separator.end..].trim();
    if invocation.is_empty() || rest.is_empty() {
        return Err(malformed());
    }

    let expectation = match separator.token {
        Token::Symbol(_) => Expectation::Value {
            value: rest.to_string(),
        },
        _ => Expectation::Error(parse_error_descriptor(rest).ok_or_else(malformed)?),
    };

    Ok((invocation.to_string(), expectation))
}

/// Classify a rule action as a returned value or a raised error
pub fn classify_action(action: &str) -> Outcome {
    let trimmed = action.trim();
    let (first, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((first, rest)) => (first, rest.trim()),
        None => (trimmed, ""),
    };

    match first.to_ascii_lowercase().as_str() {
        "raise" | "raises" | "throw" | "throws" => Outcome::Error(
            parse_error_descriptor(rest).unwrap_or_else(|| ErrorDescriptor::new("error", None)),
        ),
        "error" | "fail" | "fails" => {
            Outcome::Error(ErrorDescriptor::new("error", first_string_literal(rest)))
        }
        "return" | "returns" => {
            if rest.starts_with("Err(") || rest.starts_with("error ") || rest == "error" {
                Outcome::Error(ErrorDescriptor::new("error", first_string_literal(rest)))
            } else {
                Outcome::Value {
                    expression: rest.to_string(),
                }
            }
        }
        _ => Outcome::Value {
            expression: trimmed.to_string(),
        },
    }
}

/// Parse `ErrorKind [message]`; a bare message yields a generic kind
pub fn parse_error_descriptor(text: &str) -> Option<ErrorDescriptor> {
    let tokens = tokenize_at(text, Span::default()).ok()?;
    let mut index = 0;

    // "raise an error", "throw new Error(...)"
    while let Some(Token::Ident(word)) = tokens.get(index).map(|t| &t.token) {
        if matches!(word.as_str(), "a" | "an" | "the" | "new") {
            index += 1;
        } else {
            break;
        }
    }

    let mut error_kind = String::new();
    if let Some(Token::Ident(word)) = tokens.get(index).map(|t| &t.token) {
        error_kind.push_str(word);
        index += 1;
        // Qualified kinds: errors.Invalid, std::io::Error
        while let (Some(Token::Symbol(sep)), Some(Token::Ident(next))) = (
            tokens.get(index).map(|t| &t.token),
            tokens.get(index + 1).map(|t| &t.token),
        ) {
            if sep != "." && sep != "::" {
                break;
            }
            error_kind.push_str(sep);
            error_kind.push_str(next);
            index += 2;
        }
    }

    let remainder = &tokens[index.min(tokens.len())..];
    let mut message = remainder.iter().find_map(|t| match &t.token {
        Token::Str(s) => Some(s.clone()),
        _ => None,
    });

    if message.is_none() {
        if let Some(colon) = remainder
            .first()
            .filter(|t| matches!(&t.token, Token::Symbol(s) if s == ":"))
        {
            let after = text[colon.end..].trim();
            if !after.is_empty() {
                message = Some(after.to_string());
            }
        }
    }

    if error_kind.is_empty() {
        message.as_ref()?;
        error_kind.push_str("error");
    }

    Some(ErrorDescriptor::new(error_kind, message))
}

/// Top-level arguments of the first call in `invocation`, as written
pub fn call_arguments(invocation: &str) -> Vec<String> {
    let Ok(tokens) = tokenize_at(invocation, Span::default()) else {
        return Vec::new();
    };

    let Some(open) = tokens.iter().position(|t| t.token == Token::Open('(')) else {
        return Vec::new();
    };

    let mut arguments = Vec::new();
    let mut depth = 0usize;
    let mut start = tokens[open].end;
    for token in &tokens[open..] {
        match token.token {
            Token::Open(_) => depth += 1,
            Token::Close(_) => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    push_argument(&mut arguments, &invocation[start..token.start]);
                    return arguments;
                }
            }
            Token::Comma if depth == 1 => {
                push_argument(&mut arguments, &invocation[start..token.start]);
                start = token.end;
            }
            _ => {}
        }
    }

    // Unbalanced call: keep what was collected
    arguments
}

/// Value of a keyword argument (`name=value`, `name: value`); other arguments as given
pub fn argument_value(argument: &str) -> &str {
    let keyword = split_top_level(argument, |t| {
        matches!(t, Token::Symbol(s) if s == "=" || s == ":")
    });
    match keyword {
        Some((name, value)) if is_plain_name(name.trim()) => value.trim(),
        _ => argument.trim(),
    }
}

fn is_plain_name(text: &str) -> bool {
    let mut chars = text.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

fn push_argument(arguments: &mut Vec<String>, text: &str) {
    let text = text.trim();
    if !text.is_empty() {
        arguments.push(text.to_string());
    }
}

/// First quoted literal in `text`, unescaped
pub fn first_string_literal(text: &str) -> Option<String> {
    tokenize_at(text, Span::default())
        .ok()?
        .into_iter()
        .find_map(|t| match t.token {
            Token::Str(s) => Some(s),
            _ => None,
        })
}

/// Split `text` at the first depth-0 token matching `is_separator`
pub(crate) fn split_top_level<'a>(
    text: &'a str,
    is_separator: impl Fn(&Token) -> bool,
) -> Option<(&'a str, &'a str)> {
    let tokens = tokenize_at(text, Span::default()).ok()?;
    let separator = top_level(&tokens).find(|t| is_separator(&t.token))?;
    Some((&text[..separator.start], &text[separator.end..]))
}

/// Tokens at bracket depth 0, brackets themselves excluded
pub(crate) fn top_level(tokens: &[SpannedToken]) -> impl Iterator<Item = &SpannedToken> {
    let mut depth = 0usize;
    tokens.iter().filter(move |t| match t.token {
        Token::Open(_) => {
            depth += 1;
            false
        }
        Token::Close(_) => {
            depth = depth.saturating_sub(1);
            false
        }
        Token::Eof => false,
        _ => depth == 0,
    })
}

/// `text` without a leading keyword, when the keyword stands alone
fn strip_keyword<'a>(text: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = text.strip_prefix(keyword)?;
    match rest.chars().next() {
        None => Some(rest),
        Some(c) if c.is_whitespace() || c == ':' || c == ',' => Some(rest),
        Some(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span() -> Span {
        Span::new(3, 5, 40)
    }

    // ── Rules ──────────────────────────────────────────

    #[test]
    fn test_parse_when_then_rule() {
        let rule = parse_rule(
            r#"WHEN code is empty THEN return (False, "Coupon code cannot be empty")"#,
            span(),
        )
        .unwrap();
        assert_eq!(rule.condition, "code is empty");
        assert_eq!(rule.action, r#"return (False, "Coupon code cannot be empty")"#);
        assert!(!rule.is_default);
    }

    #[test]
    fn test_then_inside_string_is_not_a_separator() {
        let rule = parse_rule(r#"WHEN name == "THEN" THEN raise ValueError"#, span()).unwrap();
        assert_eq!(rule.condition, r#"name == "THEN""#);
        assert_eq!(rule.action, "raise ValueError");
    }

    #[test]
    fn test_parse_otherwise_rule() {
        let rule = parse_rule("OTHERWISE return True", span()).unwrap();
        assert!(rule.is_default);
        assert!(rule.condition.is_empty());
        assert_eq!(rule.action, "return True");
    }

    #[test]
    fn test_malformed_rule_without_then() {
        let err = parse_rule("WHEN code is empty return False", span()).unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::MalformedRule(_)));
        assert_eq!(err.span, span());
    }

    #[test]
    fn test_malformed_rule_prose() {
        assert!(parse_rule("If the code is empty, fail.", span()).is_err());
        assert!(parse_rule("OTHERWISE", span()).is_err());
        assert!(parse_rule("WHENEVER x THEN y", span()).is_err());
    }

    // ── Tests ──────────────────────────────────────────

    #[test]
    fn test_parse_value_test() {
        let (invocation, expectation) =
            parse_test(r#"validate_coupon("", 10.0) == (False, "Empty code")"#, span()).unwrap();
        assert_eq!(invocation, r#"validate_coupon("", 10.0)"#);
        assert_eq!(
            expectation,
            Expectation::Value {
                value: r#"(False, "Empty code")"#.into()
            }
        );
    }

    #[test]
    fn test_equality_inside_arguments_is_skipped() {
        let (invocation, _) = parse_test(r#"check("a == b", x == 1) == True"#, span()).unwrap();
        assert_eq!(invocation, r#"check("a == b", x == 1)"#);
    }

    #[test]
    fn test_parse_raises_test_with_message() {
        let (invocation, expectation) =
            parse_test(r#"assert age(-1) raises ValueError "Age must be positive""#, span())
                .unwrap();
        assert_eq!(invocation, "age(-1)");
        assert_eq!(
            expectation,
            Expectation::Error(ErrorDescriptor::new(
                "ValueError",
                Some("Age must be positive".into())
            ))
        );
    }

    #[test]
    fn test_parse_raises_call_style_message() {
        let (_, expectation) =
            parse_test(r#"age(-1) raises ValueError("negative")"#, span()).unwrap();
        assert_eq!(
            expectation,
            Expectation::Error(ErrorDescriptor::new("ValueError", Some("negative".into())))
        );
    }

    #[test]
    fn test_malformed_test() {
        let err = parse_test("age(-1) should fail", span()).unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::MalformedTest(_)));
        assert!(parse_test("== 3", span()).is_err());
        assert!(parse_test(r#"f("x) == 1"#, span()).is_err());
    }

    // ── Actions ────────────────────────────────────────

    #[test]
    fn test_classify_value_action() {
        assert_eq!(
            classify_action("return total * 0.9"),
            Outcome::Value {
                expression: "total * 0.9".into()
            }
        );
        assert_eq!(
            classify_action("the discounted total"),
            Outcome::Value {
                expression: "the discounted total".into()
            }
        );
    }

    #[test]
    fn test_classify_error_actions() {
        assert_eq!(
            classify_action("raise TypeError"),
            Outcome::Error(ErrorDescriptor::new("TypeError", None))
        );
        assert_eq!(
            classify_action("throw new Error('bad input')"),
            Outcome::Error(ErrorDescriptor::new("Error", Some("bad input".into())))
        );
        assert_eq!(
            classify_action("raise an error"),
            Outcome::Error(ErrorDescriptor::new("error", None))
        );
        assert_eq!(
            classify_action(r#"return Err("empty")"#),
            Outcome::Error(ErrorDescriptor::new("error", Some("empty".into())))
        );
        assert_eq!(
            classify_action("raise ValueError: cart total cannot be negative"),
            Outcome::Error(ErrorDescriptor::new(
                "ValueError",
                Some("cart total cannot be negative".into())
            ))
        );
    }

    #[test]
    fn test_qualified_error_kind() {
        let d = parse_error_descriptor(r#"std::io::Error "denied""#).unwrap();
        assert_eq!(d.error_kind, "std::io::Error");
        assert_eq!(d.message.as_deref(), Some("denied"));
    }

    // ── Arguments ──────────────────────────────────────

    #[test]
    fn test_call_arguments() {
        assert_eq!(
            call_arguments(r#"apply("a, b", [1, 2], {"k": 0}, [...])"#),
            vec![r#""a, b""#, "[1, 2]", r#"{"k": 0}"#, "[...]"]
        );
        assert_eq!(call_arguments("now()"), Vec::<String>::new());
        assert_eq!(call_arguments("cart.total(0)"), vec!["0"]);
        assert_eq!(call_arguments("not a call"), Vec::<String>::new());
    }

    #[test]
    fn test_argument_value_strips_keyword_names() {
        assert_eq!(argument_value("x=0"), "0");
        assert_eq!(argument_value("limit = -1"), "-1");
        assert_eq!(argument_value("age: 0"), "0");
        assert_eq!(argument_value("items=[1, 2]"), "[1, 2]");
        assert_eq!(argument_value(" 0 "), "0");
        assert_eq!(argument_value("a == 0"), "a == 0");
        assert_eq!(argument_value(r#""k=v""#), r#""k=v""#);
        assert_eq!(argument_value(r#"{"k": 0}"#), r#"{"k": 0}"#);
        assert_eq!(argument_value("f(x=0)"), "f(x=0)");
    }
}
