//! Flag-based subcommand grammar.
//!
//! ```text
//! %mongo  show_dbs -i prod
//! %mongo  show_collections -i prod -d orders
//! %%mongo find -i prod -d orders -c invoices
//!         {"status": "open"}, {"_id": 1, "status": 1}
//! ```
//!
//! The grammar is declared with clap derive and parsed with
//! `try_parse_from`, so bad input becomes a [`ParseError`] instead of a
//! process exit.

use clap::error::{ContextKind, ContextValue, ErrorKind as ClapErrorKind};
use clap::{Args, CommandFactory, Parser, Subcommand};

use crate::ast::{CommandDescriptor, Operation, SourceForm};
use crate::error::{ParseError, ParseResult};

/// Line-form grammar: administrative subcommands.
#[derive(Debug, Parser)]
#[command(
    name = "%mongo",
    no_binary_name = true,
    disable_help_subcommand = true,
    disable_version_flag = true
)]
pub struct LineArgs {
    #[command(subcommand)]
    pub command: LineCommand,
}

#[derive(Debug, Subcommand)]
pub enum LineCommand {
    /// Show database names in your current connection
    #[command(name = "show_dbs")]
    ShowDbs {
        /// The instance to run the command against
        #[arg(short, long)]
        instance: String,
    },
    /// Show the collections in a database
    #[command(name = "show_collections")]
    ShowCollections {
        /// The instance to run the command against
        #[arg(short, long)]
        instance: String,
        /// The name of the database
        #[arg(short, long)]
        database: String,
    },
}

/// Cell-form grammar: the first line of a data-access cell.
#[derive(Debug, Parser)]
#[command(
    name = "%%mongo",
    no_binary_name = true,
    disable_help_subcommand = true,
    disable_version_flag = true
)]
pub struct CellArgs {
    #[command(subcommand)]
    pub command: CellCommand,
}

#[derive(Debug, Subcommand)]
pub enum CellCommand {
    /// Query the collection
    #[command(name = "find")]
    Find(CollectionArgs),
    /// Query the collection for a single document matching a query
    #[command(name = "find_one")]
    FindOne(CollectionArgs),
    /// Count the number of documents in a collection
    #[command(name = "count_documents")]
    CountDocuments(CollectionArgs),
}

#[derive(Debug, Args)]
pub struct CollectionArgs {
    /// The instance to run the command against
    #[arg(short, long)]
    pub instance: String,
    /// The name of the database that contains the collection
    #[arg(short, long)]
    pub database: String,
    /// The name of the collection
    #[arg(short, long)]
    pub collection: String,
}

/// Which flagged grammar to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagForm {
    Line,
    Cell,
}

/// Parse a line-form command into a descriptor.
pub fn parse_line_command(line: &str) -> ParseResult<CommandDescriptor> {
    let tokens = tokenize(line)?;
    let args = LineArgs::try_parse_from(tokens.iter().copied())
        .map_err(|e| syntax_error(&e, &tokens))?;

    let cmd = match args.command {
        LineCommand::ShowDbs { instance } => {
            CommandDescriptor::new(Operation::ShowDbs, instance, SourceForm::Flagged)
        }
        LineCommand::ShowCollections { instance, database } => {
            CommandDescriptor::new(Operation::ShowCollections, instance, SourceForm::Flagged)
                .with_database(database)
        }
    };
    Ok(cmd)
}

/// Parse the header line of a cell into a descriptor with no query arguments.
pub fn parse_cell_header(line: &str) -> ParseResult<CommandDescriptor> {
    let tokens = tokenize(line)?;
    let args = CellArgs::try_parse_from(tokens.iter().copied())
        .map_err(|e| syntax_error(&e, &tokens))?;

    let (operation, target) = match args.command {
        CellCommand::Find(target) => (Operation::Find, target),
        CellCommand::FindOne(target) => (Operation::FindOne, target),
        CellCommand::CountDocuments(target) => (Operation::CountDocuments, target),
    };
    Ok(
        CommandDescriptor::new(operation, target.instance, SourceForm::Flagged)
            .with_database(target.database)
            .with_collection(target.collection),
    )
}

/// Rendered help for one of the grammars.
pub fn usage(form: FlagForm) -> String {
    let mut command = match form {
        FlagForm::Line => LineArgs::command(),
        FlagForm::Cell => CellArgs::command(),
    };
    command.render_long_help().to_string()
}

fn tokenize(line: &str) -> ParseResult<Vec<&str>> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.is_empty() {
        return Err(ParseError::syntax("", "missing subcommand"));
    }
    Ok(tokens)
}

/// Turn a clap error into a syntax error naming the offending token.
fn syntax_error(err: &clap::Error, tokens: &[&str]) -> ParseError {
    if matches!(err.kind(), ClapErrorKind::DisplayHelp) {
        return ParseError::syntax("--help", err.render().to_string());
    }

    let token = [
        ContextKind::InvalidArg,
        ContextKind::InvalidSubcommand,
        ContextKind::InvalidValue,
    ]
    .into_iter()
    .find_map(|kind| match err.get(kind) {
        Some(ContextValue::String(s)) => Some(s.clone()),
        Some(ContextValue::Strings(list)) => Some(list.join(", ")),
        _ => None,
    })
    .or_else(|| tokens.first().map(|t| t.to_string()))
    .unwrap_or_default();

    let message = err.kind().as_str().unwrap_or("invalid input");
    ParseError::syntax(token, message)
}
