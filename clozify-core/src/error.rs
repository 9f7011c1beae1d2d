//! Error types for table handling

use thiserror::Error;

/// Errors raised while building, reading or writing tables
#[derive(Error, Debug)]
pub enum ClozifyError {
    #[error("Column '{column}' not found in table '{table}'")]
    MissingColumn { column: String, table: String },

    #[error("Column '{column}' has {actual} rows but table '{table}' has {expected}")]
    LengthMismatch {
        column: String,
        table: String,
        expected: usize,
        actual: usize,
    },

    #[error("Row {row} out of bounds for table '{table}' with {len} rows")]
    RowOutOfBounds { row: usize, len: usize, table: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClozifyError {
    pub fn missing_column(column: impl Into<String>, table: impl Into<String>) -> Self {
        ClozifyError::MissingColumn {
            column: column.into(),
            table: table.into(),
        }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        ClozifyError::Parse(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        ClozifyError::Config(msg.into())
    }
}

/// Result type alias for table operations
pub type Result<T> = std::result::Result<T, ClozifyError>;
