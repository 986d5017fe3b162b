//! In-memory row-oriented table.
//!
//! [`Table`] is the single data currency of the pipeline: every raw extract,
//! dimension, and fact is one of these. Cells are [`serde_json::Value`]s so a
//! column can hold ints, floats, bools, strings, or nulls without a schema
//! declared up front. Column order lives in [`Table::columns`], not in the row
//! maps (`serde_json::Map` does not preserve insertion order).

use serde_json::{Map, Value};

/// A single row: column name → cell value.
pub type Row = Map<String, Value>;

/// A named-column row collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    /// Create an empty table with the given column set.
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns, rows: Vec::new() }
    }

    /// Create a table with no columns and no rows.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a table from prepared rows.
    ///
    /// Rows are normalized: cells for missing columns become null, cells for
    /// unknown columns are dropped.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Row>) -> Self {
        let mut table = Self::new(columns);
        for row in rows {
            table.push_row(row);
        }
        table
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column names in display order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// True if the table declares the given column.
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// All rows.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Append a row, normalizing it against the declared columns.
    pub fn push_row(&mut self, row: Row) {
        let mut normalized = Row::new();
        for column in &self.columns {
            let value = row.get(column).cloned().unwrap_or(Value::Null);
            normalized.insert(column.clone(), value);
        }
        self.rows.push(normalized);
    }

    /// Cell at (row, column). Null for out-of-range rows or unknown columns.
    pub fn get(&self, row: usize, column: &str) -> &Value {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&Value::Null)
    }

    /// All values of one column, in row order.
    pub fn column_values<'a>(&'a self, column: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
        self.rows
            .iter()
            .map(move |row| row.get(column).unwrap_or(&Value::Null))
    }

    /// Append a computed column. Shorter value vectors are null-padded.
    pub fn add_column(&mut self, name: &str, values: Vec<Value>) {
        if !self.has_column(name) {
            self.columns.push(name.to_string());
        }
        let mut values = values.into_iter();
        for row in &mut self.rows {
            row.insert(name.to_string(), values.next().unwrap_or(Value::Null));
        }
    }

    /// Project onto a fixed column set, in the given order.
    ///
    /// Unknown columns come back all-null rather than failing, so a caller can
    /// shape a fact table even when an upstream join contributed nothing.
    pub fn select(&self, columns: &[&str]) -> Table {
        let selected: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
        let mut table = Table::new(selected);
        for row in &self.rows {
            table.push_row(row.clone());
        }
        table
    }
}

// =============================================================================
// Cell Coercion Helpers
// =============================================================================

/// Coerce a cell to f64: numbers directly, numeric strings by parsing.
pub fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Coerce a cell to i64: integer numbers directly, integral floats and
/// numeric strings by conversion.
pub fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Render a cell for flat-text output (CSV cells, report cells).
///
/// Nulls render as the empty string; integral floats drop the trailing `.0`
/// so a value survives a CSV round trip as the same scalar.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else {
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < 9e15 => format!("{}", f as i64),
                    Some(f) => f.to_string(),
                    None => n.to_string(),
                }
            }
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(pairs: &[(&str, Value)]) -> Row {
        let mut row = Row::new();
        for (k, v) in pairs {
            row.insert(k.to_string(), v.clone());
        }
        row
    }

    #[test]
    fn test_push_row_normalizes_missing_columns() {
        let mut table = Table::new(vec!["a".into(), "b".into()]);
        table.push_row(row(&[("a", json!(1))]));

        assert_eq!(table.len(), 1);
        assert_eq!(table.get(0, "a"), &json!(1));
        assert_eq!(table.get(0, "b"), &Value::Null);
    }

    #[test]
    fn test_push_row_drops_unknown_columns() {
        let mut table = Table::new(vec!["a".into()]);
        table.push_row(row(&[("a", json!(1)), ("zzz", json!(2))]));

        assert!(!table.has_column("zzz"));
        assert_eq!(table.get(0, "zzz"), &Value::Null);
    }

    #[test]
    fn test_get_out_of_range() {
        let table = Table::new(vec!["a".into()]);
        assert_eq!(table.get(7, "a"), &Value::Null);
    }

    #[test]
    fn test_add_column_pads_with_null() {
        let mut table = Table::new(vec!["a".into()]);
        table.push_row(row(&[("a", json!(1))]));
        table.push_row(row(&[("a", json!(2))]));
        table.add_column("key", vec![json!(10)]);

        assert_eq!(table.get(0, "key"), &json!(10));
        assert_eq!(table.get(1, "key"), &Value::Null);
        assert_eq!(table.columns(), &["a".to_string(), "key".to_string()]);
    }

    #[test]
    fn test_select_projects_and_reorders() {
        let mut table = Table::new(vec!["a".into(), "b".into()]);
        table.push_row(row(&[("a", json!(1)), ("b", json!("x"))]));

        let projected = table.select(&["b", "a"]);
        assert_eq!(projected.columns(), &["b".to_string(), "a".to_string()]);
        assert_eq!(projected.get(0, "b"), &json!("x"));
    }

    #[test]
    fn test_value_coercions() {
        assert_eq!(value_as_f64(&json!(2.5)), Some(2.5));
        assert_eq!(value_as_f64(&json!("3.5")), Some(3.5));
        assert_eq!(value_as_i64(&json!(4.0)), Some(4));
        assert_eq!(value_as_i64(&json!("17")), Some(17));
        assert_eq!(value_as_i64(&json!("abc")), None);
        assert_eq!(value_as_i64(&Value::Null), None);
    }

    #[test]
    fn test_value_to_string() {
        assert_eq!(value_to_string(&Value::Null), "");
        assert_eq!(value_to_string(&json!(20240101)), "20240101");
        assert_eq!(value_to_string(&json!(30.0)), "30");
        assert_eq!(value_to_string(&json!(29.5)), "29.5");
        assert_eq!(value_to_string(&json!(true)), "true");
    }
}
