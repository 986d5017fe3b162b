//! Join and surrogate-key primitives for the star schema.
//!
//! The invariants live here: left joins never drop unmatched rows (their
//! right-side columns become null), surrogate keys are a dense 1-based
//! sequence in row order, and null join keys never match anything.

use std::collections::HashMap;

use serde_json::Value;

use crate::table::{Row, Table};

/// Canonical string form of a join key.
///
/// `None` for nulls and empty strings (they never match). Integral floats
/// collapse onto their integer form so `101` and `101.0` join.
pub fn join_key(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i.to_string())
            } else {
                n.as_f64().map(|f| {
                    if f.fract() == 0.0 && f.abs() < 9e15 {
                        format!("{}", f as i64)
                    } else {
                        f.to_string()
                    }
                })
            }
        }
        _ => None,
    }
}

/// Left join `left` with `right` on `left[left_key] = right[right_key]`.
///
/// Result columns are the left columns followed by the right columns; when
/// both keys share one name the key column is emitted once. Overlapping
/// non-key column names take the given suffixes. A left row with no match
/// (or a null key) survives with null right-side cells; a key matching
/// several right rows multiplies, as in a relational left join.
pub fn left_join(
    left: &Table,
    right: &Table,
    left_key: &str,
    right_key: &str,
    suffixes: (&str, &str),
) -> Table {
    let shared_key = left_key == right_key;

    // Right columns carried into the result, minus a same-named key
    let right_carried: Vec<&String> = right
        .columns()
        .iter()
        .filter(|column| !(shared_key && column.as_str() == right_key))
        .collect();

    let overlap: Vec<&String> = right_carried
        .iter()
        .copied()
        .filter(|column| left.has_column(column))
        .collect();

    let rename = |column: &str, suffix: &str| -> String {
        if overlap.iter().any(|c| c.as_str() == column) {
            format!("{}{}", column, suffix)
        } else {
            column.to_string()
        }
    };

    let mut columns: Vec<String> = left
        .columns()
        .iter()
        .map(|column| {
            if column == left_key {
                column.clone()
            } else {
                rename(column, suffixes.0)
            }
        })
        .collect();
    for column in &right_carried {
        columns.push(rename(column, suffixes.1));
    }

    // Index right rows by key
    let mut index: HashMap<String, Vec<usize>> = HashMap::new();
    for (i, row) in right.rows().iter().enumerate() {
        if let Some(key) = join_key(row.get(right_key).unwrap_or(&Value::Null)) {
            index.entry(key).or_default().push(i);
        }
    }

    let mut result = Table::new(columns);
    for left_row in left.rows() {
        let matches = join_key(left_row.get(left_key).unwrap_or(&Value::Null))
            .and_then(|key| index.get(&key).cloned())
            .unwrap_or_default();

        if matches.is_empty() {
            result.push_row(join_row(left, left_row, None, left_key, &right_carried, suffixes, &overlap));
        } else {
            for right_idx in matches {
                let right_row = &right.rows()[right_idx];
                result.push_row(join_row(
                    left,
                    left_row,
                    Some(right_row),
                    left_key,
                    &right_carried,
                    suffixes,
                    &overlap,
                ));
            }
        }
    }

    result
}

fn join_row(
    left: &Table,
    left_row: &Row,
    right_row: Option<&Row>,
    left_key: &str,
    right_carried: &[&String],
    suffixes: (&str, &str),
    overlap: &[&String],
) -> Row {
    let suffixed = |column: &str, suffix: &str| -> String {
        if overlap.iter().any(|c| c.as_str() == column) {
            format!("{}{}", column, suffix)
        } else {
            column.to_string()
        }
    };

    let mut row = Row::new();
    for column in left.columns() {
        let name = if column == left_key {
            column.clone()
        } else {
            suffixed(column, suffixes.0)
        };
        row.insert(name, left_row.get(column).cloned().unwrap_or(Value::Null));
    }
    for column in right_carried {
        let value = right_row
            .and_then(|r| r.get(column.as_str()).cloned())
            .unwrap_or(Value::Null);
        row.insert(suffixed(column, suffixes.1), value);
    }
    row
}

/// Append a dense 1-based surrogate key column in row order.
pub fn with_surrogate_key(mut table: Table, key_column: &str) -> Table {
    let keys: Vec<Value> = (1..=table.len() as i64).map(Value::from).collect();
    table.add_column(key_column, keys);
    table
}

/// Build a natural-key → selected-columns lookup over a dimension.
///
/// First match wins; dimension natural keys are unique by the time this runs
/// (the raw extracts passed the uniqueness checks).
pub fn lookup(dim: &Table, key_column: &str, value_columns: &[&str]) -> HashMap<String, Row> {
    let mut map = HashMap::with_capacity(dim.len());
    for row in dim.rows() {
        let Some(key) = join_key(row.get(key_column).unwrap_or(&Value::Null)) else {
            continue;
        };
        map.entry(key).or_insert_with(|| {
            let mut selected = Row::new();
            for column in value_columns {
                selected.insert(
                    column.to_string(),
                    row.get(*column).cloned().unwrap_or(Value::Null),
                );
            }
            selected
        });
    }
    map
}
