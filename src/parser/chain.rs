//! Accessor-chain resolution.
//!
//! Resolves driver-call-shaped text such as `c['shop'].orders.find({...})`
//! into a database, a collection, a method and the raw call body. The chain
//! before the method is tokenized into identifiers and bracket literals, and
//! the token sequence is matched against the fixed set of shapes below.
//!
//! ```text
//! c[<db>][<col>]   db[<col>]   c.db   c.db[<col>]
//! c[<db>].<col>    db.<col>    c.db.<col>   c.<db>.<col>
//! ```

use nom::{
    branch::alt,
    bytes::complete::take_while1,
    character::complete::{char, multispace0},
    combinator::{all_consuming, map},
    multi::{many0, separated_list1},
    sequence::{delimited, pair},
    IResult,
};
use tracing::debug;

use crate::ast::Operation;
use crate::error::{ParseError, ParseResult};
use crate::parser::literal::{char_offset, parse_string};
use crate::parser::splitter::scan_delimiters;

/// The client handle token.
pub const CLIENT_ALIAS: &str = "c";
/// The current-database handle token.
pub const DATABASE_ALIAS: &str = "db";

/// One token of an accessor chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainToken {
    /// A dotted name: `c`, `db`, `orders`
    Ident(String),
    /// A bracket argument with quotes stripped: `['orders']`
    Bracket(String),
}

/// Database and collection named by a chain. `None` means "not named".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainTarget {
    pub database: Option<String>,
    pub collection: Option<String>,
}

/// A resolved `<chain>.<method>(<body>)` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainCall<'a> {
    pub target: ChainTarget,
    /// The chain text before the method, trimmed
    pub chain: &'a str,
    pub method: Operation,
    /// Raw text between the call's parentheses
    pub body: &'a str,
}

/// Resolve an accessor-chain call.
pub fn resolve_chain(input: &str) -> ParseResult<ChainCall<'_>> {
    let input = input.trim();

    let open = find_open_paren(input).ok_or_else(|| ParseError::MissingParentheses {
        input: input.to_string(),
    })?;
    let close = find_close_paren(input, open)?;

    let trailing = input[close + 1..].trim();
    if !trailing.is_empty() {
        return Err(ParseError::syntax(trailing, "unexpected text after the closing ')'"));
    }

    let prefix = &input[..open];
    let (chain, method_name) = prefix.rsplit_once('.').unwrap_or(("", prefix));
    let method_name = method_name.trim();
    let method = match method_name.to_lowercase().parse::<Operation>() {
        Ok(op @ (Operation::Find | Operation::FindOne)) => op,
        _ => {
            return Err(ParseError::UnsupportedMethod {
                method: method_name.to_string(),
            });
        }
    };

    let chain = chain.trim();
    let target = match tokenize_chain(chain)? {
        Some(tokens) => match_chain(&tokens),
        None => ChainTarget::default(),
    };
    debug!(chain, ?target, %method, "resolved accessor chain");

    Ok(ChainCall {
        target,
        chain,
        method,
        body: &input[open + 1..close],
    })
}

/// Split chain text into tokens.
///
/// Returns `Ok(None)` for text that is balanced but not a chain.
pub fn tokenize_chain(chain: &str) -> ParseResult<Option<Vec<ChainToken>>> {
    scan_delimiters(chain)?;

    match all_consuming(parse_tokens)(chain) {
        Ok((_, segments)) => Ok(Some(segments.into_iter().flatten().collect())),
        Err(_) => Ok(None),
    }
}

/// Match a token sequence against the recognized chain shapes.
pub fn match_chain(tokens: &[ChainToken]) -> ChainTarget {
    use ChainToken::{Bracket, Ident};

    let named = |database: Option<&String>, collection: &String| ChainTarget {
        database: database.cloned(),
        collection: Some(collection.clone()),
    };

    match tokens {
        // c['db']['col']
        [Ident(c), Bracket(db), Bracket(col)] if c == CLIENT_ALIAS => named(Some(db), col),
        // db['col']
        [Ident(d), Bracket(col)] if d == DATABASE_ALIAS => named(None, col),
        // c.db
        [Ident(c), Ident(d)] if c == CLIENT_ALIAS && d == DATABASE_ALIAS => ChainTarget::default(),
        // c.db['col']
        [Ident(c), Ident(d), Bracket(col)] if c == CLIENT_ALIAS && d == DATABASE_ALIAS => {
            named(None, col)
        }
        // c['db'].col
        [Ident(c), Bracket(db), Ident(col)] if c == CLIENT_ALIAS => named(Some(db), col),
        // db.col
        [Ident(d), Ident(col)] if d == DATABASE_ALIAS => named(None, col),
        // c.db.col
        [Ident(c), Ident(d), Ident(col)] if c == CLIENT_ALIAS && d == DATABASE_ALIAS => {
            named(None, col)
        }
        // c.mydb.col
        [Ident(c), Ident(db), Ident(col)] if c == CLIENT_ALIAS => named(Some(db), col),
        _ => ChainTarget::default(),
    }
}

fn parse_tokens(input: &str) -> IResult<&str, Vec<Vec<ChainToken>>> {
    separated_list1(
        delimited(multispace0, char('.'), multispace0),
        parse_segment,
    )(input)
}

/// One dotted segment: a name followed by any number of bracket arguments.
fn parse_segment(input: &str) -> IResult<&str, Vec<ChainToken>> {
    let (input, name) = parse_name(input)?;
    let (input, brackets) = many0(parse_bracket)(input)?;

    let mut tokens = vec![ChainToken::Ident(name.to_string())];
    tokens.extend(brackets.into_iter().map(ChainToken::Bracket));
    Ok((input, tokens))
}

fn parse_name(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || matches!(c, '_' | '$' | '-'))(input)
}

/// Parse `['name']`, `["name"]` or `[name]`.
fn parse_bracket(input: &str) -> IResult<&str, String> {
    let (input, _) = pair(multispace0, char('['))(input)?;
    let (input, name) = delimited(
        multispace0,
        alt((
            parse_string,
            map(
                take_while1(|c: char| c != ']' && !c.is_whitespace()),
                |s: &str| s.to_string(),
            ),
        )),
        multispace0,
    )(input)?;
    let (input, _) = char(']')(input)?;
    Ok((input, name))
}

/// Byte index of the first `(` outside quotes.
fn find_open_paren(input: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, c) in input.char_indices() {
        if let Some(q) = quote {
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
            '\'' | '"' => quote = Some(c),
            '(' => return Some(i),
            _ => {}
        }
    }
    None
}

/// Byte index of the `)` matching the `(` at `open`.
fn find_close_paren(input: &str, open: usize) -> ParseResult<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, c) in input[open..].char_indices() {
        if let Some(q) = quote {
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
            '\'' | '"' => quote = Some(c),
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(open + i);
                }
            }
            _ => {}
        }
    }

    let offset = char_offset(input, &input[open..]);
    Err(ParseError::unbalanced('(', offset))
}
