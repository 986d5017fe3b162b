//! Persistence for processed dimension and fact tables.
//!
//! One file per table under the target directory, named
//! `<table>.<extension>`. JSON Lines keeps cell types intact across a round
//! trip; CSV re-infers them on reload. Each run fully overwrites whatever is
//! already there.

use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::config::OutputFormat;
use crate::error::{StorageError, StorageResult};
use crate::parser;
use crate::table::{value_to_string, Row, Table};

/// Path of a persisted artifact.
pub fn artifact_path(dir: &Path, name: &str, format: OutputFormat) -> PathBuf {
    dir.join(format!("{}.{}", name, format.extension()))
}

/// Persist a table under `dir` as `name.<ext>`, overwriting any previous file.
pub fn save_table(table: &Table, dir: &Path, name: &str, format: OutputFormat) -> StorageResult<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = artifact_path(dir, name, format);

    match format {
        OutputFormat::Csv => save_csv(table, &path)?,
        OutputFormat::Jsonl => save_jsonl(table, &path)?,
    }

    Ok(path)
}

/// Reload a persisted table. Missing files surface as an IO error.
pub fn load_table(dir: &Path, name: &str, format: OutputFormat) -> StorageResult<Table> {
    let path = artifact_path(dir, name, format);

    match format {
        OutputFormat::Csv => load_csv(&path),
        OutputFormat::Jsonl => load_jsonl(&path),
    }
}

fn save_csv(table: &Table, path: &Path) -> StorageResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(table.columns())?;
    for row in table.rows() {
        let record: Vec<String> = table
            .columns()
            .iter()
            .map(|column| value_to_string(row.get(column).unwrap_or(&Value::Null)))
            .collect();
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

fn load_csv(path: &Path) -> StorageResult<Table> {
    let content = fs::read_to_string(path)?;
    Ok(parser::parse_csv(&content, ',')?)
}

fn save_jsonl(table: &Table, path: &Path) -> StorageResult<()> {
    let mut file = fs::File::create(path)?;
    for row in table.rows() {
        let line = serde_json::to_string(row)?;
        writeln!(file, "{}", line)?;
    }
    // Header object keeps the column set when the table has zero rows
    if table.is_empty() {
        let header = serde_json::json!({ "__columns": table.columns() });
        writeln!(file, "{}", header)?;
    }
    Ok(())
}

fn load_jsonl(path: &Path) -> StorageResult<Table> {
    let file = fs::File::open(path)?;
    let reader = BufReader::new(file);

    let mut columns: Vec<String> = Vec::new();
    let mut rows: Vec<Row> = Vec::new();

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let row: Row = serde_json::from_str(&line)?;
        if let Some(declared) = row.get("__columns").and_then(Value::as_array) {
            for column in declared {
                if let Some(name) = column.as_str() {
                    if !columns.contains(&name.to_string()) {
                        columns.push(name.to_string());
                    }
                }
            }
            continue;
        }
        for key in row.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
        rows.push(row);
    }

    Ok(Table::from_rows(columns, rows))
}
