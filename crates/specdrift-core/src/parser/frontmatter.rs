//! Optional `---` metadata block at the top of a contract

use crate::error::{ParseError, ParseErrorKind};
use crate::parser::scanner::SourceLine;
use crate::Metadata;

/// Split off the metadata block; returns it and the index of the first body line
pub(crate) fn split(lines: &[SourceLine<'_>]) -> Result<(Option<Metadata>, usize), ParseError> {
    let Some(first) = lines.iter().position(|l| !l.is_blank()) else {
        return Ok((None, 0));
    };
    if lines[first].text.trim() != "---" {
        return Ok((None, 0));
    }

    let close = lines[first + 1..]
        .iter()
        .position(|l| l.text.trim() == "---")
        .ok_or_else(|| {
            ParseError::new(
                ParseErrorKind::UnterminatedFrontmatter,
                lines[first].content_span(),
            )
        })?;

    let mut metadata = Metadata::default();
    for line in &lines[first + 1..first + 1 + close] {
        let content = line.content();
        if line.is_blank() || content.starts_with('#') {
            continue;
        }
        let Some((key, value)) = content.split_once(':') else {
            continue;
        };
        let value = unquote(value.trim()).to_string();
        match key.trim() {
            "name" => metadata.name = Some(value),
            "language" => metadata.language = Some(value),
            "version" => metadata.version = Some(value),
            other => {
                metadata.extra.insert(other.to_string(), value);
            }
        }
    }

    Ok((Some(metadata), first + close + 2))
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
