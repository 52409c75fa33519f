//! Error types for tabsql.

use thiserror::Error;

/// Main error type for tabsql operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Error reading or parsing an input file
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    /// Error during SQL query execution
    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    /// Invalid change to the table bindings
    #[error("{0}")]
    Session(#[from] SessionError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to reading CSV and Excel files.
#[derive(Error, Debug)]
pub enum LoadError {
    /// Extension is not one we can parse
    #[error("Unsupported file type: {file} (expected .csv or .xlsx)")]
    UnsupportedFormat { file: String },

    /// CSV parse or type inference failure
    #[error("Failed to read CSV {file}: {reason}")]
    Csv { file: String, reason: String },

    /// Workbook could not be opened or decoded
    #[error("Failed to read workbook {file}: {reason}")]
    Excel { file: String, reason: String },

    /// Workbook has no worksheet to read
    #[error("Workbook {file} contains no sheets")]
    NoSheets { file: String },

    /// File has no header row
    #[error("File {file} is empty")]
    Empty { file: String },
}

/// Errors related to SQL query execution.
#[derive(Error, Debug)]
pub enum QueryError {
    /// Query text was blank
    #[error("Query is empty")]
    Empty,

    /// SQL syntax error
    #[error("SQL syntax error: {0}")]
    Syntax(String),

    /// Unknown table
    #[error("Unknown table: {table}")]
    UnknownTable { table: String },

    /// Unknown column
    #[error("Unknown column: {column}")]
    UnknownColumn { column: String },

    /// Engine error not covered above (type mismatch, runtime failure)
    #[error("Query execution error: {0}")]
    Execution(String),

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(String),
}

/// Errors raised when changing the set of table bindings.
#[derive(Error, Debug)]
pub enum SessionError {
    /// No binding for the given file or table name
    #[error("No table bound as '{0}'")]
    NotFound(String),

    /// Another binding already uses this table name
    #[error("Table name '{0}' is already in use")]
    DuplicateTableName(String),

    /// Table names must contain a non-blank character
    #[error("Table name must not be empty")]
    EmptyTableName,
}

impl From<datafusion::error::DataFusionError> for QueryError {
    fn from(err: datafusion::error::DataFusionError) -> Self {
        crate::query::datafusion::classify_error(err)
    }
}

impl From<rusqlite::Error> for QueryError {
    fn from(err: rusqlite::Error) -> Self {
        crate::query::sqlite::classify_error(err)
    }
}

impl From<arrow::error::ArrowError> for QueryError {
    fn from(err: arrow::error::ArrowError) -> Self {
        QueryError::Arrow(err.to_string())
    }
}

impl From<datafusion::error::DataFusionError> for Error {
    fn from(err: datafusion::error::DataFusionError) -> Self {
        Error::Query(QueryError::from(err))
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Query(QueryError::from(err))
    }
}

impl From<arrow::error::ArrowError> for Error {
    fn from(err: arrow::error::ArrowError) -> Self {
        Error::Query(QueryError::from(err))
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
