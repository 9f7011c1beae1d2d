//! Core types for the clozify training-data pipeline
//!
//! This crate defines the shared data structures used across the workspace:
//! the dynamic [`Table`] that scraped vocabulary and cloze data travel in,
//! the textual embedding codec, CSV storage, cloze extraction and the
//! retry policy shared by the network adapters.

pub mod codec;
pub mod error;
pub mod extract;
pub mod retry;
pub mod table;
pub mod tabular;
pub mod types;

pub use codec::{decode_embedding, encode_embedding};
pub use error::{ClozifyError, Result};
pub use extract::{extract_clozes, extract_cloze_word, parse_pages, CollectionPage};
pub use retry::{is_rate_limit, RetryPolicy, Retryable};
pub use table::{Table, Value};
pub use tabular::{read_csv, read_csv_from, write_csv, write_csv_to};
pub use types::{
    embedding_column, ClozeRow, EmbeddingVector, VocabRow, CLOZE_COL, CLOZE_IDX_COL,
    COLLECTION_COL, DEFN_COL, EMBEDDING_SUFFIX, TEXT_COL, TRANSLATION_COL, VOCAB_IDX_COL,
    WORD_COL,
};
