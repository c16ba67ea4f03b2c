//! Query-body splitting.
//!
//! A body holds one or more literals separated by commas that sit between a
//! closing and an opening delimiter at nesting depth 0:
//!
//! ```text
//! {"status": "open", "tags": {"a": 1}}, {"_id": 1, "status": 1}
//!                                     ^ split here only
//! ```
//!
//! Depth is tracked explicitly over `{}` and `[]`, skipping quoted strings, so
//! a comma between a nested `}` and a nested `{` is never a split point.

use tracing::debug;

use crate::ast::{ParsedLiteral, Span};
use crate::error::{ParseError, ParseResult};
use crate::parser::literal::parse_literal;

/// Split a body into its literals and parse each one.
///
/// An empty or whitespace-only body yields no literals.
pub fn split_query_body(body: &str) -> ParseResult<Vec<ParsedLiteral>> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }

    let commas = scan_delimiters(body)?;
    let mut literals = Vec::new();
    let mut start = 0;

    for comma in commas {
        if is_split_point(body, comma) {
            literals.push(parse_segment(body, start, comma)?);
            start = comma + 1;
        }
    }
    literals.push(parse_segment(body, start, body.len())?);

    debug!(count = literals.len(), "split query body");
    Ok(literals)
}

/// Check that `{}`, `[]` and quotes balance, returning the byte index of
/// every comma found at depth 0.
pub(crate) fn scan_delimiters(text: &str) -> ParseResult<Vec<usize>> {
    let mut stack: Vec<(char, usize)> = Vec::new();
    let mut quote: Option<(char, usize)> = None;
    let mut escaped = false;
    let mut commas = Vec::new();

    for (offset, (byte, c)) in text.char_indices().enumerate() {
        if let Some((q, _)) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '\'' | '"' => quote = Some((c, offset)),
            '{' | '[' => stack.push((c, offset)),
            '}' | ']' => {
                let expected = if c == '}' { '{' } else { '[' };
                match stack.pop() {
                    Some((open, _)) if open == expected => {}
                    _ => return Err(ParseError::unbalanced(c, offset)),
                }
            }
            ',' if stack.is_empty() => commas.push(byte),
            _ => {}
        }
    }

    if let Some((q, offset)) = quote {
        return Err(ParseError::unbalanced(q, offset));
    }
    if let Some((open, offset)) = stack.pop() {
        return Err(ParseError::unbalanced(open, offset));
    }
    Ok(commas)
}

/// A depth-0 comma splits only between `}`/`]` and `{`/`[`.
fn is_split_point(body: &str, comma: usize) -> bool {
    let left = body[..comma].trim_end().chars().last();
    let right = body[comma + 1..].trim_start().chars().next();
    matches!(left, Some('}' | ']')) && matches!(right, Some('{' | '['))
}

fn parse_segment(body: &str, start: usize, end: usize) -> ParseResult<ParsedLiteral> {
    let raw = &body[start..end];
    let text = raw.trim();
    let leading = raw.len() - raw.trim_start().len();

    let span_start = body[..start + leading].chars().count();
    let span = Span {
        start: span_start,
        end: span_start + text.chars().count(),
    };

    match parse_literal(text) {
        Ok(value) => Ok(ParsedLiteral {
            value,
            text: text.to_string(),
            span,
        }),
        Err(e) => Err(ParseError::body(text, span.start + e.offset, e.message)),
    }
}
