//! Column names and typed rows shared by every stage of the pipeline

use serde::{Deserialize, Serialize};

use crate::table::{Table, Value};

/// Embedding vector as returned by the embedding model
pub type EmbeddingVector = Vec<f32>;

/// Vocabulary word
pub const WORD_COL: &str = "word";
/// Vocabulary definition
pub const DEFN_COL: &str = "definition";
/// Word blanked out of a cloze sentence
pub const CLOZE_COL: &str = "cloze";
/// Full cloze sentence
pub const TEXT_COL: &str = "text";
pub const TRANSLATION_COL: &str = "translation";
pub const COLLECTION_COL: &str = "collection";

/// Join key identifying the cloze row of a candidate join
pub const CLOZE_IDX_COL: &str = "cloze_idx";
/// Join key identifying the matched vocabulary row
pub const VOCAB_IDX_COL: &str = "vocab_idx";

pub const EMBEDDING_SUFFIX: &str = "_embedding";

/// Name of the embedding column derived from a text column
pub fn embedding_column(column: &str) -> String {
    format!("{column}{EMBEDDING_SUFFIX}")
}

/// One vocabulary entry (a word in one of its senses)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabRow {
    pub word: String,
    pub definition: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<EmbeddingVector>,
}

/// One scraped cloze sentence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClozeRow {
    pub text: String,
    pub translation: String,
    pub cloze: String,
    pub collection: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<EmbeddingVector>,
}

impl VocabRow {
    pub fn new(word: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            definition: definition.into(),
            embedding: None,
        }
    }

    pub fn with_embedding(mut self, embedding: EmbeddingVector) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Build a vocabulary table with `word`, `definition` and, when every row
    /// carries one, `word_embedding` columns
    pub fn to_table(rows: &[VocabRow]) -> Table {
        let mut columns = vec![
            (
                WORD_COL.to_string(),
                rows.iter().map(|r| Value::from(r.word.as_str())).collect(),
            ),
            (
                DEFN_COL.to_string(),
                rows.iter().map(|r| Value::from(r.definition.as_str())).collect(),
            ),
        ];
        if !rows.is_empty() && rows.iter().all(|r| r.embedding.is_some()) {
            columns.push((
                embedding_column(WORD_COL),
                rows.iter()
                    .map(|r| r.embedding.clone().map(Value::Vector).unwrap_or(Value::Null))
                    .collect(),
            ));
        }
        Table::from_columns("vocab", columns, rows.len())
    }
}

impl ClozeRow {
    pub fn new(
        text: impl Into<String>,
        translation: impl Into<String>,
        cloze: impl Into<String>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            translation: translation.into(),
            cloze: cloze.into(),
            collection: collection.into(),
            embedding: None,
        }
    }

    pub fn with_embedding(mut self, embedding: EmbeddingVector) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Build a cloze table with `text`, `translation`, `cloze`, `collection`
    /// and, when every row carries one, `cloze_embedding` columns
    pub fn to_table(rows: &[ClozeRow]) -> Table {
        let text = |f: fn(&ClozeRow) -> &str| -> Vec<Value> {
            rows.iter().map(|r| Value::from(f(r))).collect()
        };
        let mut columns = vec![
            (TEXT_COL.to_string(), text(|r| &r.text)),
            (TRANSLATION_COL.to_string(), text(|r| &r.translation)),
            (CLOZE_COL.to_string(), text(|r| &r.cloze)),
            (COLLECTION_COL.to_string(), text(|r| &r.collection)),
        ];
        if !rows.is_empty() && rows.iter().all(|r| r.embedding.is_some()) {
            columns.push((
                embedding_column(CLOZE_COL),
                rows.iter()
                    .map(|r| r.embedding.clone().map(Value::Vector).unwrap_or(Value::Null))
                    .collect(),
            ));
        }
        Table::from_columns("cloze", columns, rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_column_name() {
        assert_eq!(embedding_column(WORD_COL), "word_embedding");
        assert_eq!(embedding_column("custom_input"), "custom_input_embedding");
    }

    #[test]
    fn test_vocab_table_without_embeddings() {
        let table = VocabRow::to_table(&[VocabRow::new("Haus", "house")]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.column_names().collect::<Vec<_>>(), vec!["word", "definition"]);
    }

    #[test]
    fn test_cloze_table_with_embeddings() {
        let rows = vec![
            ClozeRow::new("Das {{Haus}} ist alt.", "The house is old.", "Haus", "Top 100")
                .with_embedding(vec![1.0, 0.0]),
        ];
        let table = ClozeRow::to_table(&rows);
        assert!(table.has_column("cloze_embedding"));
        assert_eq!(
            table.get("cloze_embedding", 0),
            Some(&Value::Vector(vec![1.0, 0.0]))
        );
    }
}
