//! Error types for the query engine

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // Resource errors
    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    // Header errors
    #[error("Duplicate column name: {0}")]
    DuplicateColumn(String),

    // Tokenization errors
    #[error("Invalid quoting at position {position}: {line}")]
    InvalidQuoting { position: usize, line: String },

    #[error("unexpected end of input inside quoted field")]
    UnterminatedQuote,

    #[error("Line {line}: expected {expected} fields, found {found}")]
    FieldCount {
        line: usize,
        expected: usize,
        found: usize,
    },

    // SQL errors
    #[error("SQL parse error: {0}")]
    ParseError(String),

    #[error("Invalid column name: {0}")]
    InvalidColumn(String),

    #[error("aggregate functions not allowed in WHERE clause")]
    AggregateInWhere,

    #[error("Column not included in GROUP BY: {0}")]
    NotInGroupBy(String),

    #[error("ORDER BY column not included in GROUP BY: {0}")]
    OrderByNotInGroupBy(String),

    #[error("Invalid HAVING column: {0}")]
    InvalidHavingColumn(String),

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    // Execution errors
    #[error("Parameter {0} is not bound")]
    UnboundParameter(usize),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Execution error: {0}")]
    ExecutionError(String),

    #[error("Cursor is closed")]
    CursorClosed,
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}
