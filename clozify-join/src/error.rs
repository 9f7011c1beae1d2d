//! Error types for joins and review corrections

use clozify_core::ClozifyError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, JoinError>;

#[derive(Debug, Error)]
pub enum JoinError {
    #[error("Column '{column}' not found in {table} table")]
    MissingColumn { column: String, table: String },

    #[error("Vocabulary table is empty; cannot match {clozes} clozes")]
    EmptyVocabulary { clozes: usize },

    #[error("Embedding dimension mismatch in {table} row {row}: expected {expected}, got {actual}")]
    DimensionMismatch {
        table: String,
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Zero-magnitude embedding in {table} row {row}; cosine similarity is undefined")]
    ZeroMagnitude { table: String, row: usize },

    #[error("Non-finite value in {table} embedding at row {row}")]
    NonFinite { table: String, row: usize },

    #[error("Invalid embedding in {table} row {row}: {source}")]
    InvalidEmbedding {
        table: String,
        row: usize,
        #[source]
        source: ClozifyError,
    },

    #[error("correct_vocab_idx {index} for cloze_idx {cloze_idx} exceeds vocabulary of {vocab_len}")]
    InvalidIndex {
        cloze_idx: usize,
        index: usize,
        vocab_len: usize,
    },

    #[error("cloze_idx {cloze_idx} in manual review is not present in the candidate join")]
    DanglingReference { cloze_idx: usize },

    #[error("Conflicting review decisions for cloze_idx {cloze_idx}")]
    ConflictingReview { cloze_idx: usize },

    #[error("Invalid manual review row {row}: {message}")]
    InvalidReview { row: usize, message: String },

    #[error(transparent)]
    Table(ClozifyError),
}

impl JoinError {
    pub fn missing_column(column: impl Into<String>, table: impl Into<String>) -> Self {
        JoinError::MissingColumn {
            column: column.into(),
            table: table.into(),
        }
    }

    pub fn invalid_review(row: usize, message: impl Into<String>) -> Self {
        JoinError::InvalidReview {
            row,
            message: message.into(),
        }
    }
}

impl From<ClozifyError> for JoinError {
    fn from(e: ClozifyError) -> Self {
        match e {
            ClozifyError::MissingColumn { column, table } => {
                JoinError::MissingColumn { column, table }
            }
            other => JoinError::Table(other),
        }
    }
}
