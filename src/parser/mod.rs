//! Input resolution.
//!
//! Turns one typed input into a validated [`CommandDescriptor`]. Two
//! surfaces are accepted:
//!
//! ```text
//! chain    db['events'].find({'_id': {'$in': ['a', 'b']}})
//!          use orders | curdb | listdbs
//! flagged  show_dbs -i prod                      (line)
//!          find -i prod -d orders -c invoices    (cell, line 1)
//!          {"status": "open"}, {"_id": 1}        (cell, line 2)
//! ```
//!
//! Resolution is pure: it reads the text and borrowed session defaults and
//! returns a descriptor or a [`ParseError`].

pub mod chain;
pub mod flags;
pub mod literal;
pub mod splitter;


use tracing::{debug, warn};

use crate::ast::{CommandDescriptor, Operation, SourceForm};
use crate::error::{ParseError, ParseResult};
use crate::session::SessionDefaults;

pub use chain::{resolve_chain, ChainCall, ChainTarget, ChainToken};
pub use flags::{parse_cell_header, parse_line_command, FlagForm};
pub use splitter::split_query_body;

/// Which surface the raw input was typed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// Single-line flagged command (`%mongo ...`)
    Line,
    /// Two-line flagged cell: header and query body (`%%mongo ...`)
    Cell,
    /// Accessor chain or administrative pseudo-command
    Chain,
}

/// Resolve raw input into a validated command descriptor.
pub fn resolve(
    raw: &str,
    kind: InputKind,
    defaults: &SessionDefaults<'_>,
) -> ParseResult<CommandDescriptor> {
    debug!(?kind, input = raw, "resolving input");

    let cmd = match kind {
        InputKind::Line => resolve_line(raw)?,
        InputKind::Cell => resolve_cell(raw)?,
        InputKind::Chain => match resolve_admin(raw, defaults)? {
            Some(cmd) => cmd,
            None => resolve_chain_call(raw, defaults)?,
        },
    };

    cmd.validate()?;
    if let Some(database) = cmd.database.as_deref() {
        if defaults.knows_database(database) == Some(false) {
            warn!(database, "database is not in the known database list");
        }
    }
    Ok(cmd)
}

fn non_blank_lines(raw: &str) -> Vec<&str> {
    raw.lines().map(str::trim).filter(|line| !line.is_empty()).collect()
}

fn resolve_line(raw: &str) -> ParseResult<CommandDescriptor> {
    let lines = non_blank_lines(raw);
    if lines.len() > 1 {
        return Err(ParseError::LineCountMismatch {
            form: "line command",
            expected: 1,
            got: lines.len(),
            hint: "",
        });
    }
    parse_line_command(lines.first().copied().unwrap_or(""))
}

fn resolve_cell(raw: &str) -> ParseResult<CommandDescriptor> {
    let lines = non_blank_lines(raw);
    match lines.as_slice() {
        [header, body] => {
            let cmd = parse_cell_header(header)?;
            let args = split_query_body(body)?;
            Ok(cmd.with_query_args(args))
        }
        [header] => {
            // A bad header is the more useful error.
            parse_cell_header(header)?;
            Err(ParseError::LineCountMismatch {
                form: "cell",
                expected: 2,
                got: 1,
                hint: ". Did you forget to include a query?",
            })
        }
        _ => Err(ParseError::LineCountMismatch {
            form: "cell",
            expected: 2,
            got: lines.len(),
            hint: "",
        }),
    }
}

/// Recognize `use <db>`, `curdb` and `listdbs` by their leading token.
fn resolve_admin(
    raw: &str,
    defaults: &SessionDefaults<'_>,
) -> ParseResult<Option<CommandDescriptor>> {
    let mut tokens = raw.split_whitespace();
    let Some(head) = tokens.next() else {
        return Err(ParseError::syntax("", "empty query"));
    };
    let rest: Vec<&str> = tokens.collect();

    let cmd = match head {
        "use" => {
            let [database] = rest.as_slice() else {
                return Err(ParseError::syntax(
                    rest.get(1).copied().unwrap_or("use"),
                    "expected exactly one database name: use <database>",
                ));
            };
            if defaults.knows_database(database) == Some(false) {
                return Err(ParseError::UnknownDatabase {
                    database: database.to_string(),
                });
            }
            CommandDescriptor::new(Operation::Use, defaults.instance, SourceForm::Chain)
                .with_database(*database)
        }
        "curdb" | "listdbs" => {
            if let Some(extra) = rest.first() {
                return Err(ParseError::syntax(*extra, format!("{} takes no arguments", head)));
            }
            let operation = if head == "curdb" {
                Operation::Curdb
            } else {
                Operation::Listdbs
            };
            CommandDescriptor::new(operation, defaults.instance, SourceForm::Chain)
        }
        _ => return Ok(None),
    };
    Ok(Some(cmd))
}

fn resolve_chain_call(
    raw: &str,
    defaults: &SessionDefaults<'_>,
) -> ParseResult<CommandDescriptor> {
    let call = resolve_chain(raw)?;

    let Some(collection) = call.target.collection else {
        return Err(ParseError::UnresolvedCollection {
            chain: call.chain.to_string(),
        });
    };
    let database = call
        .target
        .database
        .or_else(|| defaults.current_database.map(String::from))
        .ok_or(ParseError::MissingDefaultDatabase)?;
    let args = split_query_body(call.body)?;

    Ok(
        CommandDescriptor::new(call.method, defaults.instance, SourceForm::Chain)
            .with_database(database)
            .with_collection(collection)
            .with_query_args(args),
    )
}
