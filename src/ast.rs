//! Command descriptor types.
//!
//! A [`CommandDescriptor`] is the fully resolved form of one user command.
//! It is built fresh per input, handed to the dispatcher and dropped.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ParseError, ParseResult};

/// Positional query arguments a find-style operation accepts (query, filter).
pub const MAX_QUERY_ARGS: usize = 2;

/// The operation a descriptor asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// `collection.find(query, filter)`
    Find,
    /// `collection.find_one(query, filter)`
    FindOne,
    /// `collection.count_documents(query)`
    CountDocuments,
    /// List database names on the instance
    ShowDbs,
    /// List collection names in a database
    ShowCollections,
    /// Switch the session's current database
    Use,
    /// Show the session's current database
    Curdb,
    /// List the databases the session knows about
    Listdbs,
}

/// What an operation requires of the descriptor's target fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetShape {
    /// Database and collection required.
    Collection,
    /// Database required, collection absent.
    Database,
    /// Neither database nor collection.
    None,
}

impl Operation {
    pub const ALL: [Operation; 8] = [
        Operation::Find,
        Operation::FindOne,
        Operation::CountDocuments,
        Operation::ShowDbs,
        Operation::ShowCollections,
        Operation::Use,
        Operation::Curdb,
        Operation::Listdbs,
    ];

    /// The name users type for this operation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Find => "find",
            Operation::FindOne => "find_one",
            Operation::CountDocuments => "count_documents",
            Operation::ShowDbs => "show_dbs",
            Operation::ShowCollections => "show_collections",
            Operation::Use => "use",
            Operation::Curdb => "curdb",
            Operation::Listdbs => "listdbs",
        }
    }

    pub fn target_shape(&self) -> TargetShape {
        match self {
            Operation::Find | Operation::FindOne | Operation::CountDocuments => {
                TargetShape::Collection
            }
            Operation::ShowCollections | Operation::Use => TargetShape::Database,
            Operation::ShowDbs | Operation::Curdb | Operation::Listdbs => TargetShape::None,
        }
    }

    /// Whether the operation reads documents and takes query arguments.
    pub fn is_data_access(&self) -> bool {
        self.target_shape() == TargetShape::Collection
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| ParseError::syntax(s, "unknown operation"))
    }
}

/// Which input surface produced a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceForm {
    /// Driver-call-shaped accessor chain, e.g. `db['events'].find({})`.
    Chain,
    /// Flag-based subcommand, e.g. `find -i prod -d orders -c invoices`.
    Flagged,
}

/// A character range in the text a literal was parsed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// One brace/bracket-delimited literal from a query body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedLiteral {
    /// The structured value
    pub value: serde_json::Value,
    /// Original text of the literal, trimmed
    pub text: String,
    /// Character span of `text` within the body it came from
    pub span: Span,
}

/// A fully resolved user command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandDescriptor {
    pub operation: Operation,
    /// Name of the connection profile the command runs against
    pub instance: String,
    pub database: Option<String>,
    pub collection: Option<String>,
    /// Positional arguments: query, then optional filter
    #[serde(default)]
    pub query_args: Vec<ParsedLiteral>,
    pub source_form: SourceForm,
}

impl CommandDescriptor {
    /// Create a descriptor with no target and no arguments.
    pub fn new(operation: Operation, instance: impl Into<String>, source_form: SourceForm) -> Self {
        Self {
            operation,
            instance: instance.into(),
            database: None,
            collection: None,
            query_args: Vec::new(),
            source_form,
        }
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    pub fn with_query_args(mut self, args: Vec<ParsedLiteral>) -> Self {
        self.query_args = args;
        self
    }

    /// Check the per-operation invariants on target fields and arguments.
    pub fn validate(&self) -> ParseResult<()> {
        match self.operation.target_shape() {
            TargetShape::Collection => {
                if self.database.is_none() {
                    return Err(ParseError::MissingDefaultDatabase);
                }
                if self.collection.is_none() {
                    return Err(ParseError::UnresolvedCollection {
                        chain: self.operation.to_string(),
                    });
                }
                if self.query_args.len() > MAX_QUERY_ARGS {
                    return Err(ParseError::TooManyQueryArgs {
                        got: self.query_args.len(),
                        max: MAX_QUERY_ARGS,
                    });
                }
            }
            TargetShape::Database => {
                if self.database.is_none() {
                    return Err(ParseError::syntax(
                        self.operation.as_str(),
                        "a database is required",
                    ));
                }
                self.reject_collection_and_args()?;
            }
            TargetShape::None => {
                if let Some(database) = &self.database {
                    return Err(ParseError::syntax(
                        database.as_str(),
                        format!("{} does not take a database", self.operation),
                    ));
                }
                self.reject_collection_and_args()?;
            }
        }
        Ok(())
    }

    fn reject_collection_and_args(&self) -> ParseResult<()> {
        if let Some(collection) = &self.collection {
            return Err(ParseError::syntax(
                collection.as_str(),
                format!("{} does not take a collection", self.operation),
            ));
        }
        if !self.query_args.is_empty() {
            return Err(ParseError::TooManyQueryArgs {
                got: self.query_args.len(),
                max: 0,
            });
        }
        Ok(())
    }

    /// The query arguments as plain values, in order.
    pub fn query_values(&self) -> Vec<&serde_json::Value> {
        self.query_args.iter().map(|arg| &arg.value).collect()
    }
}

impl fmt::Display for CommandDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {}", self.operation, self.instance)?;
        match (&self.database, &self.collection) {
            (Some(db), Some(col)) => write!(f, " [{}.{}]", db, col)?,
            (Some(db), None) => write!(f, " [{}]", db)?,
            _ => {}
        }
        if !self.query_args.is_empty() {
            let texts: Vec<&str> = self.query_args.iter().map(|a| a.text.as_str()).collect();
            write!(f, " ({})", texts.join(", "))?;
        }
        Ok(())
    }
}
