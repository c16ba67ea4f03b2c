//! Literal grammar for query bodies.
//!
//! A small recursive-descent parser for the python-literal-like documents
//! people type into cells:
//!
//! ```text
//! {'_id': {'$in': ['a', "b"]}, status: 'open', n: -1.5e3, ok: True, x: None}
//! ```
//!
//! Keys may be quoted or bare, strings use either quote, and trailing commas
//! are allowed. Nothing is evaluated; the result is a plain JSON value.

use nom::{
    branch::alt,
    bytes::complete::take_while1,
    character::complete::{char, digit1, multispace0, one_of},
    combinator::{cut, map, opt, recognize},
    error::{Error, ErrorKind},
    multi::separated_list0,
    sequence::{delimited, pair, tuple},
    IResult,
};
use serde_json::{Map, Number, Value};

/// Deepest container nesting a literal may have.
pub const MAX_NESTING_DEPTH: usize = 128;

/// Where and why a literal failed to parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralError {
    /// Character offset into the parsed text
    pub offset: usize,
    pub message: String,
}

/// Parse one complete mapping or array literal.
pub fn parse_literal(text: &str) -> Result<Value, LiteralError> {
    let top = delimited(
        multispace0,
        alt((|i| parse_mapping(i, 1), |i| parse_array(i, 1))),
        multispace0,
    )(text);

    match top {
        Ok(("", value)) => Ok(value),
        Ok((remaining, _)) => Err(LiteralError {
            offset: char_offset(text, remaining),
            message: format!("unexpected trailing content '{}'", remaining.trim_end()),
        }),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            let offset = char_offset(text, e.input);
            let leading = text.len() - text.trim_start().len();
            let message = if e.code == ErrorKind::TooLarge {
                format!("nesting deeper than {} levels", MAX_NESTING_DEPTH)
            } else if text.len() - e.input.len() == leading {
                "expected a '{' or '[' delimited literal".to_string()
            } else {
                describe(e.input)
            };
            Err(LiteralError { offset, message })
        }
        Err(nom::Err::Incomplete(_)) => Err(LiteralError {
            offset: text.chars().count(),
            message: "unexpected end of input".to_string(),
        }),
    }
}

/// Parse a quoted string, returning its unescaped contents.
///
/// Used for keys, values, and bracket arguments in accessor chains.
pub fn parse_string(input: &str) -> IResult<&str, String> {
    let quote = match input.chars().next() {
        Some(q @ ('\'' | '"')) => q,
        _ => return Err(nom::Err::Error(Error::new(input, ErrorKind::Char))),
    };

    let mut out = String::new();
    let mut chars = input.char_indices().skip(1);
    while let Some((i, c)) = chars.next() {
        if c == quote {
            return Ok((&input[i + c.len_utf8()..], out));
        }
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some((j, escaped)) = chars.next() else {
            break;
        };
        match escaped {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            '\\' | '\'' | '"' | '/' => out.push(escaped),
            'u' => {
                let decoded = hex_unit(&mut chars).and_then(|unit| match unit {
                    // High surrogate: only valid as the first half of a pair.
                    0xD800..=0xDBFF => {
                        let low = match (chars.next(), chars.next()) {
                            (Some((_, '\\')), Some((_, 'u'))) => hex_unit(&mut chars)?,
                            _ => return None,
                        };
                        if !(0xDC00..=0xDFFF).contains(&low) {
                            return None;
                        }
                        char::from_u32(0x10000 + ((unit - 0xD800) << 10) + (low - 0xDC00))
                    }
                    _ => char::from_u32(unit),
                });
                match decoded {
                    Some(ch) => out.push(ch),
                    None => {
                        return Err(nom::Err::Failure(Error::new(&input[j..], ErrorKind::HexDigit)));
                    }
                }
            }
            other => {
                // Unknown escapes are kept verbatim, as Python does.
                out.push('\\');
                out.push(other);
            }
        }
    }

    // Unterminated: point at the opening quote.
    Err(nom::Err::Failure(Error::new(input, ErrorKind::Char)))
}

/// Read the four hex digits of a `\uXXXX` escape.
fn hex_unit(chars: &mut impl Iterator<Item = (usize, char)>) -> Option<u32> {
    let hex: String = chars.by_ref().take(4).map(|(_, h)| h).collect();
    if hex.len() != 4 || !hex.chars().all(|h| h.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(&hex, 16).ok()
}

/// Parse any value inside a container at `depth`.
fn parse_value(input: &str, depth: usize) -> IResult<&str, Value> {
    alt((
        move |i| parse_mapping(i, depth + 1),
        move |i| parse_array(i, depth + 1),
        map(parse_string, Value::String),
        parse_number,
        parse_keyword,
    ))(input)
}

/// Parse a mapping `{key: value, ...}`.
fn parse_mapping(input: &str, depth: usize) -> IResult<&str, Value> {
    let (rest, _) = char('{')(input)?;
    too_deep(input, depth)?;
    let (input, entries) = cut(separated_list0(char(','), move |i| parse_entry(i, depth)))(rest)?;
    let (input, _) = trailing_comma(input, !entries.is_empty())?;
    let (input, _) = multispace0(input)?;
    let (input, _) = cut(char('}'))(input)?;

    let map: Map<String, Value> = entries.into_iter().collect();
    Ok((input, Value::Object(map)))
}

fn parse_entry(input: &str, depth: usize) -> IResult<&str, (String, Value)> {
    let (input, _) = multispace0(input)?;
    let (input, key) = parse_key(input)?;
    let (input, _) = multispace0(input)?;
    let (input, _) = cut(char(':'))(input)?;
    let (input, value) = cut(delimited(
        multispace0,
        move |i| parse_value(i, depth),
        multispace0,
    ))(input)?;
    Ok((input, (key, value)))
}

/// Parse a key: quoted, or a bare word like `status`, `$in`, `a.b`.
fn parse_key(input: &str) -> IResult<&str, String> {
    alt((
        parse_string,
        map(
            take_while1(|c: char| c.is_alphanumeric() || matches!(c, '_' | '$' | '.' | '-')),
            |s: &str| s.to_string(),
        ),
    ))(input)
}

/// Parse an array `[value, ...]`.
fn parse_array(input: &str, depth: usize) -> IResult<&str, Value> {
    let (rest, _) = char('[')(input)?;
    too_deep(input, depth)?;
    let (input, items) = cut(separated_list0(
        char(','),
        delimited(multispace0, move |i| parse_value(i, depth), multispace0),
    ))(rest)?;
    let (input, _) = trailing_comma(input, !items.is_empty())?;
    let (input, _) = multispace0(input)?;
    let (input, _) = cut(char(']'))(input)?;
    Ok((input, Value::Array(items)))
}

/// Fail at the opener of a container nested past the limit.
fn too_deep(opener: &str, depth: usize) -> IResult<&str, ()> {
    if depth > MAX_NESTING_DEPTH {
        return Err(nom::Err::Failure(Error::new(opener, ErrorKind::TooLarge)));
    }
    Ok((opener, ()))
}

fn trailing_comma(input: &str, allowed: bool) -> IResult<&str, ()> {
    if !allowed {
        return Ok((input, ()));
    }
    let (input, _) = multispace0(input)?;
    let (input, _) = opt(char(','))(input)?;
    Ok((input, ()))
}

/// Parse an integer or float.
fn parse_number(input: &str) -> IResult<&str, Value> {
    let (rest, text) = recognize(tuple((
        opt(char('-')),
        digit1,
        opt(pair(char('.'), digit1)),
        opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
    )))(input)?;

    let float = || text.parse::<f64>().ok().and_then(Number::from_f64);
    let number = if text.contains(['.', 'e', 'E']) {
        float()
    } else {
        text.parse::<i64>()
            .map(Number::from)
            .ok()
            .or_else(|| text.parse::<u64>().ok().map(Number::from))
            .or_else(float)
    };

    match number {
        Some(n) => Ok((rest, Value::Number(n))),
        None => Err(nom::Err::Failure(Error::new(input, ErrorKind::Float))),
    }
}

/// Parse `true`/`True`, `false`/`False`, `null`/`None`.
fn parse_keyword(input: &str) -> IResult<&str, Value> {
    let (rest, word) = take_while1(|c: char| c.is_alphanumeric() || c == '_')(input)?;
    let value = match word {
        "true" | "True" => Value::Bool(true),
        "false" | "False" => Value::Bool(false),
        "null" | "None" => Value::Null,
        _ => return Err(nom::Err::Error(Error::new(input, ErrorKind::Tag))),
    };
    Ok((rest, value))
}

fn describe(remaining: &str) -> String {
    match remaining.chars().next() {
        Some(c) => format!("unexpected '{}'", c),
        None => "unexpected end of input".to_string(),
    }
}

/// Character offset of `remaining` (a suffix of `text`).
pub(crate) fn char_offset(text: &str, remaining: &str) -> usize {
    let consumed = text.len().saturating_sub(remaining.len());
    text.get(..consumed).map_or(0, |prefix| prefix.chars().count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_python_style_mapping() {
        let value = parse_literal("{'_id': {'$in': ['a', 'b', 'c']}}").unwrap();
        assert_eq!(value, json!({"_id": {"$in": ["a", "b", "c"]}}));
    }

    #[test]
    fn test_bare_keys_and_scalars() {
        let value =
            parse_literal("{status: 'open', n: -1.5e3, qty: 42, ok: True, gone: false, x: None}")
                .unwrap();
        assert_eq!(
            value,
            json!({"status": "open", "n": -1500.0, "qty": 42, "ok": true, "gone": false, "x": null})
        );
    }

    #[test]
    fn test_key_order_preserved() {
        let value = parse_literal("{'z': 1, 'a': 2, 'm': 3}").unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_trailing_commas() {
        assert_eq!(parse_literal("{'a': [1, 2,],}").unwrap(), json!({"a": [1, 2]}));
        assert!(parse_literal("{,}").is_err());
    }

    #[test]
    fn test_escapes() {
        let value = parse_literal(r#"{"q": "it\'s \"x\"\nA"}"#).unwrap();
        assert_eq!(value, json!({"q": "it's \"x\"\nA"}));
    }

    #[test]
    fn test_unicode_escapes() {
        assert_eq!(parse_literal(r#"{"a": "caf\u00e9"}"#).unwrap(), json!({"a": "café"}));
        assert_eq!(
            parse_literal(r#"{'a': '\ud83d\ude00'}"#).unwrap(),
            json!({"a": "\u{1F600}"})
        );
    }

    #[test]
    fn test_lone_surrogates_rejected() {
        for text in [r#"{"a": "\ud83d"}"#, r#"{"a": "\ud83dx"}"#, r#"{"a": "\ude00"}"#] {
            let err = parse_literal(text).unwrap_err();
            assert_eq!(err.offset, 8, "{text}");
        }
        assert!(parse_literal(r#"{"a": "\u12"}"#).is_err());
    }

    #[test]
    fn test_empty_containers() {
        assert_eq!(parse_literal("{}").unwrap(), json!({}));
        assert_eq!(parse_literal(" [ ] ").unwrap(), json!([]));
    }

    #[test]
    fn test_scalar_top_level_rejected() {
        let err = parse_literal("5").unwrap_err();
        assert_eq!(err.offset, 0);
        assert!(err.message.contains("delimited literal"));
    }

    #[test]
    fn test_trailing_garbage() {
        let err = parse_literal("{'a': 1} x").unwrap_err();
        assert_eq!(err.offset, 9);
        assert!(err.message.contains("trailing"));
    }

    #[test]
    fn test_error_offset_points_inside() {
        let err = parse_literal("{'a': @}").unwrap_err();
        assert_eq!(err.offset, 6);
        assert_eq!(err.message, "unexpected '@'");
    }

    #[test]
    fn test_nesting_limit() {
        let at_limit = format!(
            "{}{}",
            "[".repeat(MAX_NESTING_DEPTH),
            "]".repeat(MAX_NESTING_DEPTH)
        );
        assert!(parse_literal(&at_limit).is_ok());

        let deep = format!("{}{}", "[".repeat(10_000), "]".repeat(10_000));
        let err = parse_literal(&deep).unwrap_err();
        assert_eq!(err.offset, MAX_NESTING_DEPTH);
        assert_eq!(err.message, "nesting deeper than 128 levels");

        let mixed = format!("{}{}", "{'a': [".repeat(100), "]}".repeat(100));
        let err = parse_literal(&mixed).unwrap_err();
        assert!(err.message.starts_with("nesting deeper"));
    }

    #[test]
    fn test_not_a_keyword() {
        assert!(parse_literal("{'a': trueish}").is_err());
        assert!(parse_literal("{'a': os.system}").is_err());
    }
}
