//! Key-labelled block notation
//!
//! ```text
//! SIGNATURE: def apply_discount(total: float, code: str) -> float
//! INTENT: Apply a coupon discount to a cart total.
//! BEHAVIOR:
//!   - WHEN total < 0 THEN raise ValueError "total must be non-negative"
//!   - OTHERWISE return total
//! TESTS:
//!   - apply_discount(10.0, "") == 10.0
//! ```

use crate::error::ParseError;
use crate::parser::blocks::{BlockBuilder, RawBlock};
use crate::parser::plain_label;
use crate::parser::scanner::SourceLine;

/// Group body lines into labelled blocks
pub(crate) fn segment(lines: &[SourceLine<'_>]) -> Result<Vec<RawBlock>, ParseError> {
    let mut builder = BlockBuilder::new();

    for line in lines {
        if line.is_blank() {
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

    Ok(builder.finish())
}
