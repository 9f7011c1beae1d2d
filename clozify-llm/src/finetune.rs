//! Fine-tuning data from a cleaned join

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use clozify_core::{Table, Value, CLOZE_COL, DEFN_COL, TEXT_COL, TRANSLATION_COL, WORD_COL};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    error::Result,
    prompt::{format_completion, format_prompt},
};

/// One prompt/completion pair in the fine-tuning file format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingExample {
    pub prompt: String,
    pub completion: String,
}

/// Training pairs for every row of a cleaned join
///
/// Reads the `word`, `definition`, `text`, `translation` and `cloze`
/// columns. Empty cells are formatted as empty strings.
pub fn build_training_examples(table: &Table) -> Result<Vec<TrainingExample>> {
    let word = table.require_column(WORD_COL)?;
    let definition = table.require_column(DEFN_COL)?;
    let text = table.require_column(TEXT_COL)?;
    let translation = table.require_column(TRANSLATION_COL)?;
    let cloze = table.require_column(CLOZE_COL)?;

    let examples: Vec<TrainingExample> = (0..table.len())
        .map(|row| {
            if word[row].is_null() || text[row].is_null() {
                warn!("Row {} of {} has an empty word or text", row, table.name());
            }
            TrainingExample {
                prompt: format_prompt(&cell(&word[row]), &cell(&definition[row])),
                completion: format_completion(
                    &cell(&text[row]),
                    &cell(&translation[row]),
                    &cell(&cloze[row]),
                ),
            }
        })
        .collect();

    info!("Built {} training examples", examples.len());
    Ok(examples)
}

fn cell(value: &Value) -> String {
    value.as_text().map(|s| s.into_owned()).unwrap_or_default()
}

/// Write examples as JSON Lines, keeping non-ASCII text as is
pub fn write_jsonl<W: Write>(examples: &[TrainingExample], mut writer: W) -> Result<()> {
    for example in examples {
        serde_json::to_writer(&mut writer, example)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_jsonl_file<P: AsRef<Path>>(examples: &[TrainingExample], path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    write_jsonl(examples, BufWriter::new(File::create(path)?))?;
    info!("Wrote {} training examples to {}", examples.len(), path.display());
    Ok(())
}
