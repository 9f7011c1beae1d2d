//! Joining scraped vocabulary with scraped cloze sentences
//!
//! The two datasets share no key. [`Joiner::join_by_similarity`] proposes a
//! candidate join by matching every cloze word to the vocabulary word with
//! the closest embedding. A reviewer then flags wrong matches, and
//! [`ReviewMerger`] rewrites only those rows to produce the cleaned join
//! that becomes fine-tuning data.

pub mod columns;
pub mod error;
pub mod joiner;
pub mod review;
pub mod senses;
pub mod similarity;

pub use columns::{JoinColumns, CORRECT_VOCAB_IDX_COL, ISSUE_COL, VOCAB_SUFFIX};
pub use error::{JoinError, Result};
pub use joiner::{Joiner, SimilarityMatch};
pub use review::{Correction, ManualReview, ManualReviewEntry, ReviewMerger, ReviewOutcome};
pub use senses::duplicate_word_senses;
pub use similarity::{argmax_rows, cosine_similarity, embedding_matrix, similarity_matrix};
