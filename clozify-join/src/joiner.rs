//! Candidate join of cloze and vocabulary tables by embedding similarity

use std::collections::BTreeSet;

use clozify_core::{EmbeddingVector, Table, Value, CLOZE_IDX_COL, VOCAB_IDX_COL};
use tracing::{debug, info, instrument};

use crate::{
    columns::{JoinColumns, VOCAB_SUFFIX},
    error::{JoinError, Result},
    review::{ManualReview, ReviewMerger, ReviewOutcome},
    senses::duplicate_word_senses,
    similarity::{argmax_rows, embedding_matrix, similarity_matrix},
};

const CLOZE_TABLE: &str = "cloze";
const VOCAB_TABLE: &str = "vocab";

/// Best vocabulary match for one cloze row
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityMatch {
    pub cloze_idx: usize,
    pub vocab_idx: usize,
    /// Cosine similarity of the two embeddings
    pub score: f64,
}

/// Joins existing cloze and vocabulary tables for training
///
/// Both tables must already carry embedding columns. Every cloze row
/// matches exactly one vocabulary row, while a vocabulary row may be matched
/// by zero, one or many clozes.
pub struct Joiner<'a> {
    cloze: &'a Table,
    vocab: &'a Table,
    columns: JoinColumns,
}

impl<'a> Joiner<'a> {
    /// Joiner using the default column names
    pub fn new(cloze: &'a Table, vocab: &'a Table) -> Self {
        Self::with_columns(cloze, vocab, JoinColumns::default())
    }

    pub fn with_columns(cloze: &'a Table, vocab: &'a Table, columns: JoinColumns) -> Self {
        Self {
            cloze,
            vocab,
            columns,
        }
    }

    pub fn columns(&self) -> &JoinColumns {
        &self.columns
    }

    /// For each cloze row, the vocabulary row with the most similar embedding
    ///
    /// Ties go to the lowest vocabulary index.
    pub fn best_matches(&self) -> Result<Vec<SimilarityMatch>> {
        let cloze_embeddings =
            decode_embeddings(self.cloze, &self.columns.cloze_embedding, CLOZE_TABLE)?;
        let vocab_embeddings =
            decode_embeddings(self.vocab, &self.columns.word_embedding, VOCAB_TABLE)?;

        if cloze_embeddings.is_empty() {
            return Ok(Vec::new());
        }
        if vocab_embeddings.is_empty() {
            return Err(JoinError::EmptyVocabulary {
                clozes: cloze_embeddings.len(),
            });
        }

        let x = embedding_matrix(CLOZE_TABLE, &cloze_embeddings)?;
        let y = embedding_matrix(VOCAB_TABLE, &vocab_embeddings)?;
        if x.ncols() != y.ncols() {
            return Err(JoinError::DimensionMismatch {
                table: VOCAB_TABLE.to_string(),
                row: 0,
                expected: x.ncols(),
                actual: y.ncols(),
            });
        }

        let scores = similarity_matrix(&x, &y);
        Ok(argmax_rows(&scores)
            .into_iter()
            .enumerate()
            .map(|(cloze_idx, (vocab_idx, score))| {
                debug!(
                    "cloze {} -> vocab {} (score {:.4})",
                    cloze_idx, vocab_idx, score
                );
                SimilarityMatch {
                    cloze_idx,
                    vocab_idx,
                    score,
                }
            })
            .collect())
    }

    /// Propose a join of the cloze and vocabulary tables
    ///
    /// One row per cloze row, in cloze order: the cloze columns, the columns
    /// of the matched vocabulary row (suffixed `_vocab` where a name is
    /// already taken), then the `cloze_idx` and `vocab_idx` join keys.
    ///
    /// This is an imprecise match and must be reviewed. Clozes may use
    /// inflected forms, vocabulary entries may be phrases of which the cloze
    /// picks one word, and duplicate words with different senses look alike.
    #[instrument(skip(self), fields(clozes = self.cloze.len(), vocab = self.vocab.len()))]
    pub fn join_by_similarity(&self) -> Result<Table> {
        let matches = self.best_matches()?;
        let vocab_rows: Vec<usize> = matches.iter().map(|m| m.vocab_idx).collect();
        let matched_vocab = self.vocab.select_rows(&vocab_rows)?;

        let mut joined = self.cloze.clone().with_name("candidate_join");
        for name in matched_vocab.column_names() {
            let target = if joined.has_column(name) {
                format!("{name}{VOCAB_SUFFIX}")
            } else {
                name.to_string()
            };
            let values = matched_vocab.require_column(name)?.to_vec();
            joined.insert_column(target, values)?;
        }
        joined.insert_column(
            CLOZE_IDX_COL,
            matches.iter().map(|m| Value::from(m.cloze_idx)).collect(),
        )?;
        joined.insert_column(VOCAB_IDX_COL, vocab_rows.iter().copied().map(Value::from).collect())?;

        let distinct: BTreeSet<usize> = vocab_rows.into_iter().collect();
        info!(
            "Candidate join: {} clozes matched to {} of {} vocabulary rows",
            joined.len(),
            distinct.len(),
            self.vocab.len()
        );
        Ok(joined)
    }

    /// Apply a manual review to a candidate join; see [`ReviewMerger::apply`]
    pub fn apply_review(
        &self,
        candidate: &Table,
        review: &ManualReview,
        keep_intermediate_columns: bool,
    ) -> Result<ReviewOutcome> {
        ReviewMerger::new(self.vocab, &self.columns).apply(
            candidate,
            review,
            keep_intermediate_columns,
        )
    }

    /// Vocabulary words with more than one entry; see [`duplicate_word_senses`]
    pub fn duplicate_word_senses(&self) -> Result<Table> {
        duplicate_word_senses(self.vocab, &self.columns)
    }
}

/// Decode one embedding column, accepting vectors or their list literals
fn decode_embeddings(table: &Table, column: &str, role: &str) -> Result<Vec<EmbeddingVector>> {
    let values = table
        .column(column)
        .ok_or_else(|| JoinError::missing_column(column, role))?;
    values
        .iter()
        .enumerate()
        .map(|(row, value)| {
            value.to_embedding().map_err(|source| JoinError::InvalidEmbedding {
                table: role.to_string(),
                row,
                source,
            })
        })
        .collect()
}
