//! Dynamic column-oriented table
//!
//! Scraped vocabulary and cloze data arrive with whatever columns the
//! scraper produced, and every pipeline stage adds or drops a few. A
//! [`Table`] keeps named columns in insertion order, all of equal length,
//! and its [`Value`] cells parse their textual form on access so a table
//! read from CSV behaves like one built in memory.

use std::borrow::Cow;
use std::fmt;

use indexmap::IndexMap;

use crate::codec::{decode_embedding, encode_embedding};
use crate::error::{ClozifyError, Result};
use crate::types::EmbeddingVector;

/// A single table cell
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Vector(EmbeddingVector),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the cell kind, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Vector(_) => "vector",
        }
    }

    /// Text content of the cell; scalars are rendered, `Null` has none
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Value::Null => None,
            Value::Text(s) => Some(Cow::Borrowed(s.as_str())),
            other => Some(Cow::Owned(other.render())),
        }
    }

    /// Integer content, accepting `"3"` and whole floats such as `3.0`
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) => whole_float(*f),
            Value::Text(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().and_then(whole_float))
            }
            _ => None,
        }
    }

    /// Boolean content, accepting `true/True/1` and `false/False/0`
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Int(0) => Some(false),
            Value::Int(1) => Some(true),
            Value::Text(s) => match s.trim() {
                "true" | "True" | "TRUE" | "1" => Some(true),
                "false" | "False" | "FALSE" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Embedding content of the cell, decoding a textual list literal if needed
    pub fn to_embedding(&self) -> Result<EmbeddingVector> {
        match self {
            Value::Vector(v) => Ok(v.clone()),
            Value::Text(s) => decode_embedding(s),
            other => Err(ClozifyError::parse(format!(
                "expected an embedding, found {} cell",
                other.kind()
            ))),
        }
    }

    /// Flat-file rendering of the cell (`Null` is empty)
    pub fn render(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(true) => "True".to_string(),
            Value::Bool(false) => "False".to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Text(s) => s.clone(),
            Value::Vector(v) => encode_embedding(v),
        }
    }
}

fn whole_float(f: f64) -> Option<i64> {
    (f.is_finite() && f.fract() == 0.0).then_some(f as i64)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<usize> for Value {
    fn from(i: usize) -> Self {
        Value::Int(i as i64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<EmbeddingVector> for Value {
    fn from(v: EmbeddingVector) -> Self {
        Value::Vector(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Ordered named columns of equal length
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: String,
    columns: IndexMap<String, Vec<Value>>,
    len: usize,
}

impl Table {
    /// Create an empty table; `name` shows up in error messages
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: IndexMap::new(),
            len: 0,
        }
    }

    /// Build from columns already known to have `len` rows each
    pub(crate) fn from_columns(
        name: impl Into<String>,
        columns: Vec<(String, Vec<Value>)>,
        len: usize,
    ) -> Self {
        debug_assert!(columns.iter().all(|(_, values)| values.len() == len));
        Self {
            name: name.into(),
            columns: columns.into_iter().collect(),
            len,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains_key(column)
    }

    pub fn column(&self, column: &str) -> Option<&[Value]> {
        self.columns.get(column).map(Vec::as_slice)
    }

    /// Column values, or `MissingColumn` naming this table
    pub fn require_column(&self, column: &str) -> Result<&[Value]> {
        self.column(column)
            .ok_or_else(|| ClozifyError::missing_column(column, &self.name))
    }

    /// Builder-style [`Table::insert_column`]
    pub fn with_column(mut self, column: impl Into<String>, values: Vec<Value>) -> Result<Self> {
        self.insert_column(column, values)?;
        Ok(self)
    }

    /// Append a column, or replace it in place if the name already exists
    ///
    /// The first column of a table fixes its row count.
    pub fn insert_column(&mut self, column: impl Into<String>, values: Vec<Value>) -> Result<()> {
        let column = column.into();
        if self.columns.is_empty() {
            self.len = values.len();
        } else if values.len() != self.len {
            return Err(ClozifyError::LengthMismatch {
                column,
                table: self.name.clone(),
                expected: self.len,
                actual: values.len(),
            });
        }
        self.columns.insert(column, values);
        Ok(())
    }

    /// Remove a column keeping the order of the others
    pub fn remove_column(&mut self, column: &str) -> Option<Vec<Value>> {
        self.columns.shift_remove(column)
    }

    /// Remove every listed column that exists; unknown names are ignored
    pub fn drop_columns(&mut self, columns: &[&str]) {
        for column in columns {
            self.columns.shift_remove(*column);
        }
    }

    pub fn get(&self, column: &str, row: usize) -> Option<&Value> {
        self.columns.get(column).and_then(|values| values.get(row))
    }

    pub fn set(&mut self, column: &str, row: usize, value: Value) -> Result<()> {
        let len = self.len;
        let values = self
            .columns
            .get_mut(column)
            .ok_or_else(|| ClozifyError::missing_column(column, &self.name))?;
        let slot = values.get_mut(row).ok_or_else(|| ClozifyError::RowOutOfBounds {
            row,
            len,
            table: self.name.clone(),
        })?;
        *slot = value;
        Ok(())
    }

    /// Cells of one row in column order
    pub fn row_values(&self, row: usize) -> impl Iterator<Item = &Value> {
        self.columns.values().filter_map(move |values| values.get(row))
    }

    /// New table holding the given rows, in the given order
    pub fn select_rows(&self, rows: &[usize]) -> Result<Table> {
        if let Some(&row) = rows.iter().find(|&&row| row >= self.len) {
            return Err(ClozifyError::RowOutOfBounds {
                row,
                len: self.len,
                table: self.name.clone(),
            });
        }
        let columns = self
            .columns
            .iter()
            .map(|(name, values)| {
                (
                    name.clone(),
                    rows.iter().map(|&row| values[row].clone()).collect(),
                )
            })
            .collect();
        Ok(Self {
            name: self.name.clone(),
            columns,
            len: rows.len(),
        })
    }

    /// New table holding only the given columns, in the given order
    pub fn project(&self, columns: &[&str]) -> Result<Table> {
        let mut projected = Table::new(self.name.clone());
        for column in columns {
            projected.insert_column(*column, self.require_column(column)?.to_vec())?;
        }
        projected.len = self.len;
        Ok(projected)
    }
}
