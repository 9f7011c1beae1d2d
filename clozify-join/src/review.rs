//! Applying a manual review to a candidate join
//!
//! The reviewer walks the candidate join and, for every wrong match, adds a
//! row to the review table: `issue = true`, the `cloze_idx` of the row and
//! either the vocabulary index it should have matched or the literal
//! `None` when no vocabulary entry fits. Only flagged rows are touched.

use std::collections::{btree_map::Entry, BTreeMap, BTreeSet, HashMap};

use clozify_core::{Table, Value, CLOZE_IDX_COL, VOCAB_IDX_COL};
use tracing::{debug, info, instrument};

use crate::{
    columns::{JoinColumns, CORRECT_VOCAB_IDX_COL, ISSUE_COL},
    error::{JoinError, Result},
};

const NO_MATCH_MARKER: &str = "None";
const CANDIDATE_TABLE: &str = "candidate join";
const REVIEW_TABLE: &str = "manual review";

/// Reviewer's decision for one candidate row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Correction {
    /// Flagged but no decision recorded yet; ignored
    Unresolved,
    /// No vocabulary entry fits this cloze; the row is removed
    NoMatch,
    /// The cloze belongs to this vocabulary row
    Vocab(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualReviewEntry {
    pub issue: bool,
    pub cloze_idx: usize,
    pub correction: Correction,
}

impl ManualReviewEntry {
    /// A flagged row carrying a decision
    pub fn flagged(cloze_idx: usize, correction: Correction) -> Self {
        Self {
            issue: true,
            cloze_idx,
            correction,
        }
    }

    /// A row the reviewer looked at and accepted
    pub fn accepted(cloze_idx: usize) -> Self {
        Self {
            issue: false,
            cloze_idx,
            correction: Correction::Unresolved,
        }
    }
}

/// The reviewer's decisions for a candidate join
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManualReview {
    entries: Vec<ManualReviewEntry>,
}

impl ManualReview {
    pub fn new(entries: Vec<ManualReviewEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[ManualReviewEntry] {
        &self.entries
    }

    /// Entries with `issue = true`
    pub fn flagged(&self) -> impl Iterator<Item = &ManualReviewEntry> {
        self.entries.iter().filter(|entry| entry.issue)
    }

    /// Read a review table with `issue`, `cloze_idx` and `correct_vocab_idx`
    /// columns
    ///
    /// A missing or empty `issue` counts as not flagged, and rows that are
    /// not flagged are never validated further. A flagged row must have a
    /// non-negative integer `cloze_idx`; its `correct_vocab_idx` is an
    /// integer, `None`, or empty.
    pub fn from_table(table: &Table) -> Result<Self> {
        let issues = table
            .column(ISSUE_COL)
            .ok_or_else(|| JoinError::missing_column(ISSUE_COL, REVIEW_TABLE))?;
        let cloze_ids = table
            .column(CLOZE_IDX_COL)
            .ok_or_else(|| JoinError::missing_column(CLOZE_IDX_COL, REVIEW_TABLE))?;
        let corrections = table.column(CORRECT_VOCAB_IDX_COL);

        let mut entries = Vec::with_capacity(table.len());
        for row in 0..table.len() {
            let issue = match &issues[row] {
                Value::Null => false,
                value => value.as_bool().ok_or_else(|| {
                    JoinError::invalid_review(row, format!("issue '{}' is not a boolean", value))
                })?,
            };
            if !issue {
                if let Some(cloze_idx) = cloze_ids[row].as_int().and_then(to_index) {
                    entries.push(ManualReviewEntry::accepted(cloze_idx));
                }
                continue;
            }

            let cloze_idx = cloze_ids[row]
                .as_int()
                .and_then(to_index)
                .ok_or_else(|| {
                    JoinError::invalid_review(
                        row,
                        format!("cloze_idx '{}' is not a row index", cloze_ids[row]),
                    )
                })?;
            let correction = match corrections.map(|values| &values[row]) {
                None | Some(Value::Null) => Correction::Unresolved,
                Some(value) => parse_correction(row, value)?,
            };
            entries.push(ManualReviewEntry::flagged(cloze_idx, correction));
        }
        Ok(Self { entries })
    }
}

fn to_index(i: i64) -> Option<usize> {
    usize::try_from(i).ok()
}

fn parse_correction(row: usize, value: &Value) -> Result<Correction> {
    if value.as_text().as_deref().map(str::trim) == Some(NO_MATCH_MARKER) {
        return Ok(Correction::NoMatch);
    }
    match value.as_int() {
        Some(index) => to_index(index).map(Correction::Vocab).ok_or_else(|| {
            JoinError::invalid_review(row, format!("correct_vocab_idx {index} is negative"))
        }),
        None => Err(JoinError::invalid_review(
            row,
            format!("correct_vocab_idx '{}' is neither an index nor '{NO_MATCH_MARKER}'", value),
        )),
    }
}

/// Outcome of applying a review
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewOutcome {
    /// The cleaned join
    pub table: Table,
    /// Rows whose vocabulary match was replaced
    pub corrected: usize,
    /// Rows removed as having no vocabulary match
    pub removed: usize,
}

/// Rewrites flagged rows of a candidate join against a vocabulary table
pub struct ReviewMerger<'a> {
    vocab: &'a Table,
    columns: &'a JoinColumns,
}

impl<'a> ReviewMerger<'a> {
    pub fn new(vocab: &'a Table, columns: &'a JoinColumns) -> Self {
        Self { vocab, columns }
    }

    /// Produce the cleaned join
    ///
    /// For every flagged row with a vocabulary index, the word, definition
    /// and `vocab_idx` of the matching `cloze_idx` are replaced by that
    /// vocabulary row's. Rows flagged `None` are removed. Everything else
    /// passes through unchanged. Embedding columns are dropped unless
    /// `keep_intermediate_columns` is set, in which case the
    /// `correct_vocab_idx`, `<word>_corrected` and `<definition>_corrected`
    /// bookkeeping columns are added as well.
    ///
    /// Fails with `DanglingReference` if a decided `cloze_idx` is not in the
    /// candidate join and with `InvalidIndex` if a vocabulary index is out of
    /// bounds; the candidate is left untouched in both cases.
    #[instrument(skip_all, fields(rows = candidate.len(), flagged = review.flagged().count()))]
    pub fn apply(
        &self,
        candidate: &Table,
        review: &ManualReview,
        keep_intermediate_columns: bool,
    ) -> Result<ReviewOutcome> {
        let decisions = decisions(review)?;
        let positions = cloze_positions(candidate)?;
        self.validate(&decisions, &positions)?;

        let len = candidate.len();
        let mut table = candidate.clone().with_name("cleaned_join");
        let mut correct_vocab_idx = vec![Value::Null; len];
        let mut corrected_word = vec![Value::Null; len];
        let mut corrected_definition = vec![Value::Null; len];
        let mut removed = BTreeSet::new();
        let mut corrected = 0;

        for (cloze_idx, correction) in &decisions {
            for &row in &positions[cloze_idx] {
                match *correction {
                    Correction::Vocab(vocab_idx) => {
                        let word = self.vocab_value(&self.columns.word, vocab_idx)?;
                        let definition = self.vocab_value(&self.columns.definition, vocab_idx)?;
                        set_candidate(&mut table, &self.columns.word, row, word.clone())?;
                        let definition_col = self.columns.definition.as_str();
                        set_candidate(&mut table, definition_col, row, definition.clone())?;
                        set_candidate(&mut table, VOCAB_IDX_COL, row, Value::from(vocab_idx))?;
                        correct_vocab_idx[row] = Value::from(vocab_idx);
                        corrected_word[row] = word;
                        corrected_definition[row] = definition;
                        corrected += 1;
                        debug!("cloze_idx {} corrected to vocab_idx {}", cloze_idx, vocab_idx);
                    }
                    Correction::NoMatch => {
                        correct_vocab_idx[row] = Value::from(NO_MATCH_MARKER);
                        removed.insert(row);
                        debug!("cloze_idx {} has no vocabulary match; removing", cloze_idx);
                    }
                    Correction::Unresolved => {}
                }
            }
        }

        if keep_intermediate_columns {
            table.insert_column(CORRECT_VOCAB_IDX_COL, correct_vocab_idx)?;
            table.insert_column(self.columns.corrected_word(), corrected_word)?;
            table.insert_column(self.columns.corrected_definition(), corrected_definition)?;
        } else {
            table.drop_columns(&[
                self.columns.cloze_embedding.as_str(),
                self.columns.word_embedding.as_str(),
            ]);
        }

        let kept: Vec<usize> = (0..len).filter(|row| !removed.contains(row)).collect();
        let table = table.select_rows(&kept)?;

        info!(
            "Cleaned join: {} rows ({} corrected, {} removed)",
            table.len(),
            corrected,
            removed.len()
        );
        Ok(ReviewOutcome {
            table,
            corrected,
            removed: removed.len(),
        })
    }

    fn validate(
        &self,
        decisions: &BTreeMap<usize, Correction>,
        positions: &HashMap<usize, Vec<usize>>,
    ) -> Result<()> {
        for (&cloze_idx, correction) in decisions {
            if !positions.contains_key(&cloze_idx) {
                return Err(JoinError::DanglingReference { cloze_idx });
            }
            if let Correction::Vocab(index) = *correction {
                if index >= self.vocab.len() {
                    return Err(JoinError::InvalidIndex {
                        cloze_idx,
                        index,
                        vocab_len: self.vocab.len(),
                    });
                }
            }
        }
        Ok(())
    }

    fn vocab_value(&self, column: &str, row: usize) -> Result<Value> {
        self.vocab
            .column(column)
            .ok_or_else(|| JoinError::missing_column(column, "vocab"))
            .map(|values| values[row].clone())
    }
}

/// Decided corrections per `cloze_idx`; unresolved flags are dropped
fn decisions(review: &ManualReview) -> Result<BTreeMap<usize, Correction>> {
    let mut decisions = BTreeMap::new();
    for entry in review.flagged() {
        if entry.correction == Correction::Unresolved {
            debug!("Skipping incomplete correction for cloze_idx {}", entry.cloze_idx);
            continue;
        }
        match decisions.entry(entry.cloze_idx) {
            Entry::Vacant(slot) => {
                slot.insert(entry.correction);
            }
            Entry::Occupied(existing) if *existing.get() != entry.correction => {
                return Err(JoinError::ConflictingReview {
                    cloze_idx: entry.cloze_idx,
                });
            }
            Entry::Occupied(_) => {}
        }
    }
    Ok(decisions)
}

/// Candidate rows by `cloze_idx`
fn cloze_positions(candidate: &Table) -> Result<HashMap<usize, Vec<usize>>> {
    let cloze_ids = candidate
        .column(CLOZE_IDX_COL)
        .ok_or_else(|| JoinError::missing_column(CLOZE_IDX_COL, CANDIDATE_TABLE))?;
    let mut positions: HashMap<usize, Vec<usize>> = HashMap::new();
    for (row, value) in cloze_ids.iter().enumerate() {
        let cloze_idx = value.as_int().and_then(to_index).ok_or_else(|| {
            JoinError::Table(clozify_core::ClozifyError::parse(format!(
                "candidate join row {row} has invalid cloze_idx '{value}'"
            )))
        })?;
        positions.entry(cloze_idx).or_default().push(row);
    }
    Ok(positions)
}

fn set_candidate(table: &mut Table, column: &str, row: usize, value: Value) -> Result<()> {
    if !table.has_column(column) {
        return Err(JoinError::missing_column(column, CANDIDATE_TABLE));
    }
    table.set(column, row, value)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_vocab() -> Table {
        Table::new("vocab")
            .with_column("word", vec!["word_a".into(), "word_b".into()])
            .unwrap()
            .with_column(
                "definition",
                vec!["define word_a".into(), "define word_b".into()],
            )
            .unwrap()
            .with_column("word_embedding", vec!["[1, 0, 1]".into(), "[0, 1, 0]".into()])
            .unwrap()
    }

    /// Candidate where cloze 0 matched word_b and cloze 1 matched word_a
    fn sample_candidate() -> Table {
        Table::new("candidate")
            .with_column("cloze", vec!["cloze1".into(), "cloze2".into()])
            .unwrap()
            .with_column(
                "cloze_embedding",
                vec!["[0.1, 0.9, 0.1]".into(), "[0.9, 0.1, 0.9]".into()],
            )
            .unwrap()
            .with_column("word", vec!["word_b".into(), "word_a".into()])
            .unwrap()
            .with_column(
                "definition",
                vec!["define word_b".into(), "define word_a".into()],
            )
            .unwrap()
            .with_column("word_embedding", vec!["[0, 1, 0]".into(), "[1, 0, 1]".into()])
            .unwrap()
            .with_column("cloze_idx", vec![Value::Int(0), Value::Int(1)])
            .unwrap()
            .with_column("vocab_idx", vec![Value::Int(1), Value::Int(0)])
            .unwrap()
    }

    fn apply(review: Vec<ManualReviewEntry>, keep: bool) -> Result<ReviewOutcome> {
        let vocab = sample_vocab();
        let columns = JoinColumns::default();
        let review = ManualReview::new(review);
        ReviewMerger::new(&vocab, &columns).apply(&sample_candidate(), &review, keep)
    }

    #[test]
    fn test_clean_join_from_review() {
        let outcome = apply(
            vec![
                ManualReviewEntry::flagged(0, Correction::NoMatch),
                ManualReviewEntry::flagged(1, Correction::Vocab(1)),
            ],
            false,
        )
        .unwrap();

        let expected = Table::new("cleaned_join")
            .with_column("cloze", vec!["cloze2".into()])
            .unwrap()
            .with_column("word", vec!["word_b".into()])
            .unwrap()
            .with_column("definition", vec!["define word_b".into()])
            .unwrap()
            .with_column("cloze_idx", vec![Value::Int(1)])
            .unwrap()
            .with_column("vocab_idx", vec![Value::Int(1)])
            .unwrap();
        assert_eq!(outcome.table, expected);
        assert_eq!(outcome.corrected, 1);
        assert_eq!(outcome.removed, 1);
    }

    #[test]
    fn test_unflagged_and_unresolved_rows_pass_through() {
        let outcome = apply(
            vec![
                ManualReviewEntry::accepted(0),
                ManualReviewEntry {
                    issue: false,
                    cloze_idx: 1,
                    correction: Correction::NoMatch,
                },
                ManualReviewEntry::flagged(1, Correction::Unresolved),
            ],
            false,
        )
        .unwrap();

        let mut expected = sample_candidate().with_name("cleaned_join");
        expected.drop_columns(&["cloze_embedding", "word_embedding"]);
        assert_eq!(outcome.table, expected);
        assert_eq!((outcome.corrected, outcome.removed), (0, 0));
    }

    #[test]
    fn test_rows_missing_from_review_are_untouched() {
        let candidate = Table::new("candidate")
            .with_column(
                "cloze",
                vec!["cloze1".into(), "cloze2".into(), "cloze3".into()],
            )
            .unwrap()
            .with_column(
                "word",
                vec!["word_b".into(), "word_a".into(), "word_b".into()],
            )
            .unwrap()
            .with_column(
                "definition",
                vec![
                    "define word_b".into(),
                    "define word_a".into(),
                    "define word_b".into(),
                ],
            )
            .unwrap()
            .with_column(
                "cloze_idx",
                vec![Value::Int(0), Value::Int(1), Value::Int(2)],
            )
            .unwrap()
            .with_column(
                "vocab_idx",
                vec![Value::Int(1), Value::Int(0), Value::Int(1)],
            )
            .unwrap();
        let review = ManualReview::new(vec![
            ManualReviewEntry::flagged(0, Correction::NoMatch),
            ManualReviewEntry::flagged(1, Correction::Vocab(1)),
        ]);
        let vocab = sample_vocab();
        let columns = JoinColumns::default();

        let outcome = ReviewMerger::new(&vocab, &columns)
            .apply(&candidate, &review, false)
            .unwrap();

        let table = &outcome.table;
        assert_eq!(table.len(), 2);
        assert_eq!((outcome.corrected, outcome.removed), (1, 1));
        assert_eq!(table.get("word", 0), Some(&Value::from("word_b")));
        assert_eq!(table.get("vocab_idx", 0), Some(&Value::Int(1)));

        let untouched: Vec<&Value> = table.row_values(1).collect();
        let original: Vec<&Value> = candidate.row_values(2).collect();
        assert_eq!(untouched, original);
        assert_eq!(table.get("cloze", 1), Some(&Value::from("cloze3")));
        assert_eq!(table.get("definition", 1), Some(&Value::from("define word_b")));
    }

    #[test]
    fn test_keep_intermediate_columns() {
        let outcome = apply(
            vec![
                ManualReviewEntry::flagged(0, Correction::NoMatch),
                ManualReviewEntry::flagged(1, Correction::Vocab(1)),
            ],
            true,
        )
        .unwrap();

        let table = &outcome.table;
        assert!(table.has_column("cloze_embedding"));
        assert!(table.has_column("word_embedding"));
        assert_eq!(table.get("correct_vocab_idx", 0), Some(&Value::Int(1)));
        assert_eq!(table.get("word_corrected", 0), Some(&Value::from("word_b")));
        assert_eq!(
            table.get("definition_corrected", 0),
            Some(&Value::from("define word_b"))
        );
    }

    #[test]
    fn test_out_of_bounds_vocab_index() {
        let err = apply(vec![ManualReviewEntry::flagged(1, Correction::Vocab(7))], false)
            .unwrap_err();
        assert!(matches!(
            err,
            JoinError::InvalidIndex { cloze_idx: 1, index: 7, vocab_len: 2 }
        ));
    }

    #[test]
    fn test_dangling_cloze_idx() {
        let err = apply(vec![ManualReviewEntry::flagged(9, Correction::NoMatch)], false)
            .unwrap_err();
        assert!(matches!(err, JoinError::DanglingReference { cloze_idx: 9 }));
    }

    #[test]
    fn test_conflicting_decisions() {
        let err = apply(
            vec![
                ManualReviewEntry::flagged(0, Correction::Vocab(0)),
                ManualReviewEntry::flagged(0, Correction::NoMatch),
            ],
            false,
        )
        .unwrap_err();
        assert!(matches!(err, JoinError::ConflictingReview { cloze_idx: 0 }));

        let repeated = apply(
            vec![
                ManualReviewEntry::flagged(0, Correction::Vocab(0)),
                ManualReviewEntry::flagged(0, Correction::Vocab(0)),
            ],
            false,
        )
        .unwrap();
        assert_eq!(repeated.corrected, 1);
    }

    #[test]
    fn test_review_from_csv_style_table() {
        let table = Table::new("review")
            .with_column(
                "issue",
                vec!["True".into(), "True".into(), "False".into(), "True".into(), Value::Null],
            )
            .unwrap()
            .with_column(
                "cloze_idx",
                vec!["0".into(), "1".into(), "2".into(), "3".into(), "4".into()],
            )
            .unwrap()
            .with_column(
                "correct_vocab_idx",
                vec!["None".into(), "1.0".into(), "None".into(), Value::Null, "2".into()],
            )
            .unwrap();

        let review = ManualReview::from_table(&table).unwrap();

        assert_eq!(
            review.entries(),
            &[
                ManualReviewEntry::flagged(0, Correction::NoMatch),
                ManualReviewEntry::flagged(1, Correction::Vocab(1)),
                ManualReviewEntry::accepted(2),
                ManualReviewEntry::flagged(3, Correction::Unresolved),
                ManualReviewEntry::accepted(4),
            ]
        );
        assert_eq!(review.flagged().count(), 3);
    }

    #[test]
    fn test_review_rejects_bad_flagged_rows() {
        let review = |correction: Value| {
            Table::new("review")
                .with_column("issue", vec![Value::Bool(true)])
                .unwrap()
                .with_column("cloze_idx", vec![Value::Int(0)])
                .unwrap()
                .with_column("correct_vocab_idx", vec![correction])
                .unwrap()
        };

        assert!(matches!(
            ManualReview::from_table(&review("-1".into())),
            Err(JoinError::InvalidReview { row: 0, .. })
        ));
        assert!(matches!(
            ManualReview::from_table(&review("word_a".into())),
            Err(JoinError::InvalidReview { row: 0, .. })
        ));
    }

    #[test]
    fn test_review_requires_issue_and_cloze_idx() {
        let table = Table::new("review")
            .with_column("cloze_idx", vec![Value::Int(0)])
            .unwrap();
        assert!(matches!(
            ManualReview::from_table(&table),
            Err(JoinError::MissingColumn { ref column, .. }) if column == "issue"
        ));
    }
}
