//! Extraction of cloze rows from scraped collection pages
//!
//! A page is the JSON body returned for one page of a cloze collection. Each
//! sentence marks its blanked word as `{{word}}` inside the text.

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{ClozifyError, Result};
use crate::table::{Table, Value};
use crate::types::{CLOZE_COL, COLLECTION_COL, TEXT_COL, TRANSLATION_COL};

const CLOZE_SPAN: &str = r"\{\{(?P<cloze>\w*)\}\}";

/// One scraped page of a cloze collection
#[derive(Debug, Clone, Deserialize)]
pub struct CollectionPage {
    pub collection: Collection,
    #[serde(rename = "collectionClozeSentences", default)]
    pub sentences: Vec<ScrapedSentence>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Collection {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScrapedSentence {
    pub text: String,
    #[serde(default)]
    pub translation: Option<String>,
}

/// Parse the scraped JSON document (a list of pages)
pub fn parse_pages(json: &str) -> Result<Vec<CollectionPage>> {
    Ok(serde_json::from_str(json)?)
}

/// Blanked word of a cloze sentence, if it has a `{{...}}` span
pub fn extract_cloze_word(text: &str) -> Option<String> {
    let pattern = Regex::new(CLOZE_SPAN).ok()?;
    cloze_word(&pattern, text)
}

fn cloze_word(pattern: &Regex, text: &str) -> Option<String> {
    pattern
        .captures(text)
        .and_then(|caps| caps.name("cloze"))
        .map(|m| m.as_str().to_string())
}

/// Flatten pages into a cloze table with `text`, `translation`, `cloze` and
/// `collection` columns, one row per sentence
pub fn extract_clozes(pages: &[CollectionPage]) -> Result<Table> {
    let pattern = Regex::new(CLOZE_SPAN).map_err(|e| ClozifyError::parse(e.to_string()))?;

    let mut text = Vec::new();
    let mut translation = Vec::new();
    let mut cloze = Vec::new();
    let mut collection = Vec::new();

    for page in pages {
        debug!(
            "Extracting {} sentences from collection {}",
            page.sentences.len(),
            page.collection.name
        );
        for sentence in &page.sentences {
            cloze.push(Value::from(cloze_word(&pattern, &sentence.text)));
            text.push(Value::from(sentence.text.as_str()));
            translation.push(Value::from(sentence.translation.clone()));
            collection.push(Value::from(page.collection.name.as_str()));
        }
    }

    let table = Table::new("cloze")
        .with_column(TEXT_COL, text)?
        .with_column(TRANSLATION_COL, translation)?
        .with_column(CLOZE_COL, cloze)?
        .with_column(COLLECTION_COL, collection)?;
    info!("Extracted {} clozes from {} pages", table.len(), pages.len());
    Ok(table)
}
