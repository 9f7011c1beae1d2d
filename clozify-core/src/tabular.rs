//! CSV storage for tables
//!
//! Every field is read back as text; [`Value`] accessors take care of
//! numbers, booleans and embedding literals when a stage needs them.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use tracing::{debug, info};

use crate::error::{ClozifyError, Result};
use crate::table::{Table, Value};

/// Read a headed CSV file into a table named after the file stem
pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Table> {
    let path = path.as_ref();
    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "table".to_string());
    let file = File::open(path)?;
    let table = read_csv_from(file, &name)?;
    info!("Read {} rows from {}", table.len(), path.display());
    Ok(table)
}

/// Read headed CSV data from any reader
///
/// Empty fields become `Null`. A leading column with an empty header is an
/// index written by another tool and is dropped.
pub fn read_csv_from<R: Read>(reader: R, name: &str) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(reader);
    let headers = reader.headers()?.clone();
    let skip_index = headers.get(0).is_some_and(str::is_empty);

    let mut columns: Vec<Vec<Value>> = vec![Vec::new(); headers.len()];
    for record in reader.records() {
        let record = record?;
        for (values, field) in columns.iter_mut().zip(record.iter()) {
            values.push(if field.is_empty() {
                Value::Null
            } else {
                Value::Text(field.to_string())
            });
        }
    }

    let mut table = Table::new(name);
    for (position, (header, values)) in headers.iter().zip(columns).enumerate() {
        if position == 0 && skip_index {
            debug!("Dropping unnamed index column from {}", name);
            continue;
        }
        if table.has_column(header) {
            return Err(ClozifyError::parse(format!(
                "duplicate column '{header}' in {name}"
            )));
        }
        table.insert_column(header, values)?;
    }
    Ok(table)
}

/// Write a table to a CSV file, creating parent directories as needed
pub fn write_csv<P: AsRef<Path>>(table: &Table, path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    write_csv_to(table, file)?;
    info!("Wrote {} rows to {}", table.len(), path.display());
    Ok(())
}

/// Write a table as headed CSV to any writer
pub fn write_csv_to<W: Write>(table: &Table, writer: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(table.column_names())?;
    for row in 0..table.len() {
        writer.write_record(table.row_values(row).map(Value::render))?;
    }
    writer.flush()?;
    Ok(())
}
