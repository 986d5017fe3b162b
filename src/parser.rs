//! Raw CSV reader with encoding and delimiter auto-detection.
//!
//! Converts a raw extract into a [`Table`] with typed cells. Exports arrive
//! from several tools with mixed encodings and separators, so both are
//! detected per file before parsing. No star-schema logic here.

use std::path::Path;

use serde_json::Value;

use crate::error::{CsvError, CsvResult};
use crate::table::{Row, Table};

/// Result of parsing one raw extract, with detection metadata.
#[derive(Debug, Clone)]
pub struct ParsedSource {
    /// Parsed rows with typed cells.
    pub table: Table,
    /// Detected or assumed encoding.
    pub encoding: String,
    /// Detected delimiter.
    pub delimiter: char,
}

/// Detect the encoding of raw bytes using chardet.
pub fn detect_encoding(bytes: &[u8]) -> String {
    let (charset, _confidence, _) = chardet::detect(bytes);

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes to a string using the detected encoding.
///
/// Unknown encodings fall back to lossy UTF-8 rather than failing the load.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    match encoding.to_lowercase().as_str() {
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => {
            encoding_rs::ISO_8859_15.decode(bytes).0.into_owned()
        }
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Detect the delimiter by counting candidates in the header line.
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Infer a typed cell from a raw CSV field.
///
/// Empty → null, then integer, float, boolean, and finally string.
pub fn infer_value(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    if let Ok(int) = trimmed.parse::<i64>() {
        return Value::from(int);
    }
    if let Ok(float) = trimmed.parse::<f64>() {
        return Value::from(float);
    }
    match trimmed.to_lowercase().as_str() {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(trimmed.to_string()),
    }
}

/// Parse CSV text into a table with an explicit delimiter.
pub fn parse_csv(content: &str, delimiter: char) -> CsvResult<Table> {
    if content.trim().is_empty() {
        return Err(CsvError::EmptyFile);
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| CsvError::ParseError(e.to_string()))?
        .iter()
        .map(|h| h.trim_matches('"').to_string())
        .collect();

    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(CsvError::NoHeaders);
    }

    let mut table = Table::new(headers.clone());
    for record in reader.records() {
        let record = record.map_err(|e| CsvError::ParseError(e.to_string()))?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        let mut row = Row::new();
        for (i, header) in headers.iter().enumerate() {
            let raw = record.get(i).unwrap_or("");
            row.insert(header.clone(), infer_value(raw));
        }
        table.push_row(row);
    }

    Ok(table)
}

/// Parse raw CSV bytes with auto-detection of encoding and delimiter.
pub fn parse_bytes_auto(bytes: &[u8]) -> CsvResult<ParsedSource> {
    if bytes.is_empty() {
        return Err(CsvError::EmptyFile);
    }

    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    let delimiter = detect_delimiter(&content);
    let table = parse_csv(&content, delimiter)?;

    Ok(ParsedSource { table, encoding, delimiter })
}

/// Parse a CSV file with auto-detection of encoding and delimiter.
pub fn parse_csv_file_auto<P: AsRef<Path>>(path: P) -> CsvResult<ParsedSource> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_bytes_auto(&bytes)
}
