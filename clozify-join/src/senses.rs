//! Words with more than one definition

use std::{borrow::Cow, collections::HashMap};

use clozify_core::{Table, Value, VOCAB_IDX_COL};
use tracing::debug;

use crate::{
    columns::JoinColumns,
    error::{JoinError, Result},
};

/// Every vocabulary row whose word occurs more than once
///
/// The result carries the row's `vocab_idx` next to the word and definition
/// and is sorted by word. The sort is stable, so the senses of one word keep
/// their vocabulary order. Words are compared exactly; empty cells are never
/// treated as duplicates of each other.
pub fn duplicate_word_senses(vocab: &Table, columns: &JoinColumns) -> Result<Table> {
    let words = vocab
        .column(&columns.word)
        .ok_or_else(|| JoinError::missing_column(&columns.word, "vocab"))?;
    let definitions = vocab
        .column(&columns.definition)
        .ok_or_else(|| JoinError::missing_column(&columns.definition, "vocab"))?;

    let keys: Vec<Option<Cow<'_, str>>> = words.iter().map(Value::as_text).collect();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for key in keys.iter().flatten() {
        *counts.entry(key.as_ref()).or_default() += 1;
    }

    let mut rows: Vec<usize> = (0..vocab.len())
        .filter(|&row| {
            keys[row]
                .as_deref()
                .and_then(|key| counts.get(key))
                .is_some_and(|&n| n > 1)
        })
        .collect();
    rows.sort_by_key(|&row| words[row].render());

    debug!(
        "{} vocabulary rows share a word with another row",
        rows.len()
    );

    let table = Table::new("word_senses")
        .with_column(
            VOCAB_IDX_COL,
            rows.iter().map(|&row| Value::from(row)).collect(),
        )?
        .with_column(
            columns.word.as_str(),
            rows.iter().map(|&row| words[row].clone()).collect(),
        )?
        .with_column(
            columns.definition.as_str(),
            rows.iter().map(|&row| definitions[row].clone()).collect(),
        )?;
    Ok(table)
}
