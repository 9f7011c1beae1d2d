//! Column configuration for joins

use clozify_core::{embedding_column, CLOZE_COL, DEFN_COL, WORD_COL};

/// Flag column of the manual review table
pub const ISSUE_COL: &str = "issue";
/// Reviewer's decision column of the manual review table
pub const CORRECT_VOCAB_IDX_COL: &str = "correct_vocab_idx";
/// Suffix given to a vocabulary column whose name is taken on the cloze side
pub const VOCAB_SUFFIX: &str = "_vocab";

/// Names of the columns a join reads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinColumns {
    /// Cloze word column
    pub cloze: String,
    pub word: String,
    pub definition: String,
    pub cloze_embedding: String,
    pub word_embedding: String,
}

impl Default for JoinColumns {
    fn default() -> Self {
        Self::new(CLOZE_COL, WORD_COL, DEFN_COL)
    }
}

impl JoinColumns {
    /// Column set whose embedding columns are derived from the text columns
    pub fn new(
        cloze: impl Into<String>,
        word: impl Into<String>,
        definition: impl Into<String>,
    ) -> Self {
        let cloze = cloze.into();
        let word = word.into();
        Self {
            cloze_embedding: embedding_column(&cloze),
            word_embedding: embedding_column(&word),
            cloze,
            word,
            definition: definition.into(),
        }
    }

    pub fn with_cloze_embedding(mut self, column: impl Into<String>) -> Self {
        self.cloze_embedding = column.into();
        self
    }

    pub fn with_word_embedding(mut self, column: impl Into<String>) -> Self {
        self.word_embedding = column.into();
        self
    }

    /// Intermediate column holding a reviewer-corrected word
    pub fn corrected_word(&self) -> String {
        format!("{}_corrected", self.word)
    }

    /// Intermediate column holding a reviewer-corrected definition
    pub fn corrected_definition(&self) -> String {
        format!("{}_corrected", self.definition)
    }
}
