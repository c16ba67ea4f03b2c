//! Error types for mongocell.

use std::fmt;

use thiserror::Error;

/// Failure to resolve one input into a command descriptor.
///
/// Every variant is recoverable: it ends resolution of the current input
/// only and is reported back to the caller for display.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The accessor chain has no `(` to open the method call.
    #[error("Query must have parentheses to denote what you are querying, e.g. db['mycol'].find({{}}): '{input}'")]
    MissingParentheses { input: String },

    /// The chain calls something other than `find` or `find_one`.
    #[error("Unsupported method '{method}'. Expected: find or find_one")]
    UnsupportedMethod { method: String },

    /// The chain parsed, but no collection could be identified.
    #[error("Could not identify a collection to query in '{chain}'")]
    UnresolvedCollection { chain: String },

    /// No database was named and the session has no current database.
    #[error("No database selected. Run `use <database>` first or name one in the command")]
    MissingDefaultDatabase,

    /// `use` named a database the session does not know about.
    #[error("'{database}' is not in the current database list")]
    UnknownDatabase { database: String },

    /// Unknown subcommand, missing flag, or malformed flag syntax.
    #[error("Invalid command at '{token}': {message}")]
    CommandSyntax { token: String, message: String },

    /// Wrong number of lines for the input form.
    #[error("Expected {expected} line(s) in your {form}, but got {got}{hint}")]
    LineCountMismatch {
        form: &'static str,
        expected: usize,
        got: usize,
        hint: &'static str,
    },

    /// Malformed literal text in a query body.
    #[error("Could not parse query literal at offset {offset}: {message} in '{text}'")]
    QueryBodyParse {
        text: String,
        offset: usize,
        message: String,
    },

    /// A brace, bracket, paren or quote was never closed or closed the wrong opener.
    #[error("Unbalanced '{delimiter}' at offset {offset}")]
    UnbalancedDelimiter { delimiter: char, offset: usize },

    /// More positional literals than the operation accepts.
    #[error("Got {got} query arguments, but at most {max} are accepted (query, filter)")]
    TooManyQueryArgs { got: usize, max: usize },
}

/// Stable names for [`ParseError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MissingParentheses,
    UnsupportedMethod,
    UnresolvedCollection,
    MissingDefaultDatabase,
    UnknownDatabase,
    CommandSyntax,
    LineCountMismatch,
    QueryBodyParse,
    UnbalancedDelimiter,
    TooManyQueryArgs,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::MissingParentheses => "MissingParenthesesError",
            ErrorKind::UnsupportedMethod => "UnsupportedMethodError",
            ErrorKind::UnresolvedCollection => "UnresolvedCollectionError",
            ErrorKind::MissingDefaultDatabase => "MissingDefaultDatabaseError",
            ErrorKind::UnknownDatabase => "UnknownDatabaseError",
            ErrorKind::CommandSyntax => "CommandSyntaxError",
            ErrorKind::LineCountMismatch => "LineCountMismatchError",
            ErrorKind::QueryBodyParse => "QueryBodyParseError",
            ErrorKind::UnbalancedDelimiter => "UnbalancedDelimiterError",
            ErrorKind::TooManyQueryArgs => "TooManyQueryArgsError",
        };
        f.write_str(name)
    }
}

impl ParseError {
    /// The variant's stable kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingParentheses { .. } => ErrorKind::MissingParentheses,
            Self::UnsupportedMethod { .. } => ErrorKind::UnsupportedMethod,
            Self::UnresolvedCollection { .. } => ErrorKind::UnresolvedCollection,
            Self::MissingDefaultDatabase => ErrorKind::MissingDefaultDatabase,
            Self::UnknownDatabase { .. } => ErrorKind::UnknownDatabase,
            Self::CommandSyntax { .. } => ErrorKind::CommandSyntax,
            Self::LineCountMismatch { .. } => ErrorKind::LineCountMismatch,
            Self::QueryBodyParse { .. } => ErrorKind::QueryBodyParse,
            Self::UnbalancedDelimiter { .. } => ErrorKind::UnbalancedDelimiter,
            Self::TooManyQueryArgs { .. } => ErrorKind::TooManyQueryArgs,
        }
    }

    /// Create a command syntax error naming the offending token.
    pub fn syntax(token: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CommandSyntax {
            token: token.into(),
            message: message.into(),
        }
    }

    /// Create a query body error at the given character offset.
    pub fn body(text: impl Into<String>, offset: usize, message: impl Into<String>) -> Self {
        Self::QueryBodyParse {
            text: text.into(),
            offset,
            message: message.into(),
        }
    }

    /// Create an unbalanced delimiter error.
    pub fn unbalanced(delimiter: char, offset: usize) -> Self {
        Self::UnbalancedDelimiter { delimiter, offset }
    }
}

/// Failure while handing a descriptor to a backend.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The descriptor reached dispatch without the fields its operation
    /// requires. Signals a resolver/dispatcher mismatch, not bad input.
    #[error("Contract violation dispatching '{operation}': {message}")]
    Contract {
        operation: String,
        message: String,
    },

    /// The backend failed to carry out the command.
    #[error("Backend error: {0}")]
    Backend(String),
}

impl DispatchError {
    /// Whether the error should stop the process rather than the command.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Contract { .. })
    }
}

/// Failure loading the profile configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error reading the config file.
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid toml for the expected shape.
    #[error("Invalid config: {0}")]
    Toml(#[from] toml::de::Error),

    /// No profile with this name.
    #[error("Instance '{0}' not found in instances")]
    UnknownInstance(String),
}

/// Result type alias for resolution.
pub type ParseResult<T> = Result<T, ParseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ParseError::body("{'a': }", 6, "expected a value");
        assert_eq!(
            err.to_string(),
            "Could not parse query literal at offset 6: expected a value in '{'a': }'"
        );
        assert_eq!(err.kind().to_string(), "QueryBodyParseError");
    }

    #[test]
    fn test_contract_violation_is_fatal() {
        let err = DispatchError::Contract {
            operation: "find".to_string(),
            message: "missing collection".to_string(),
        };
        assert!(err.is_fatal());
        assert!(!DispatchError::Backend("timeout".to_string()).is_fatal());
    }
}
