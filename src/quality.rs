//! Data quality checks over the raw extracts.
//!
//! [`QualityValidator`] accumulates named pass/fail results in invocation
//! order. Every check is vacuously true on empty input: an extract that
//! failed to load is already reported by the loader, and an empty table has
//! nothing to violate. The driver treats any failed check as fatal.

use std::collections::HashSet;

use serde_json::Value;

use crate::logs::log_error;
use crate::table::Table;

const KEY_SEPARATOR: &str = "\u{1f}";
const NULL_SENTINEL: &str = "\u{1}";

/// Accumulator of named data-quality results.
#[derive(Debug, Default)]
pub struct QualityValidator {
    passed: Vec<String>,
    failed: Vec<String>,
}

/// Aggregated pass/fail counts plus the failing labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualitySummary {
    pub total_passed: usize,
    pub total_failed: usize,
    pub failed_checks: Vec<String>,
}

impl QualityValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check that `columns` form a unique key over `table`.
    pub fn check_uniqueness(&mut self, table: &Table, columns: &[&str], table_name: &str) -> bool {
        let label = format!("DQ_UNIQUE: {} on {:?}", table_name, columns);
        if table.is_empty() {
            return self.record(label, true, None);
        }

        let mut seen = HashSet::with_capacity(table.len());
        let mut unique = true;
        for row in table.rows() {
            let key: Vec<String> = columns
                .iter()
                .map(|column| canonical_cell(row.get(*column).unwrap_or(&Value::Null)))
                .collect();
            if !seen.insert(key.join(KEY_SEPARATOR)) {
                unique = false;
                break;
            }
        }

        self.record(label, unique, (!unique).then(|| "Duplicate values found".into()))
    }

    /// Check that no cell in `columns` is null or absent.
    pub fn check_nulls(&mut self, table: &Table, columns: &[&str], table_name: &str) -> bool {
        let label = format!("DQ_NULL: {} on {:?}", table_name, columns);
        if table.is_empty() {
            return self.record(label, true, None);
        }

        let has_nulls = table.rows().iter().any(|row| {
            columns
                .iter()
                .any(|column| matches!(row.get(*column), None | Some(Value::Null)))
        });

        self.record(label, !has_nulls, has_nulls.then(|| "NULL values found".into()))
    }

    /// Check that every distinct child key exists among the parent keys.
    ///
    /// Null child keys are skipped: null is the absence of a value, not an
    /// orphan. Orphan values are reported sorted.
    pub fn check_referential_integrity(
        &mut self,
        parent: &Table,
        child: &Table,
        parent_key: &str,
        child_key: &str,
        relationship_name: &str,
    ) -> bool {
        let label = format!("DQ_REF_INTEGRITY: {}", relationship_name);
        if parent.is_empty() || child.is_empty() {
            return self.record(label, true, None);
        }

        let parent_keys: HashSet<String> = parent
            .column_values(parent_key)
            .filter(|v| !v.is_null())
            .map(canonical_cell)
            .collect();

        let mut orphans: Vec<String> = child
            .column_values(child_key)
            .filter(|v| !v.is_null())
            .map(canonical_cell)
            .filter(|key| !parent_keys.contains(key))
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        orphans.sort();

        let ok = orphans.is_empty();
        let detail = (!ok).then(|| format!("Orphan keys found: [{}]", orphans.join(", ")));
        self.record(label, ok, detail)
    }

    /// Labels of all passed checks, in invocation order.
    pub fn passed(&self) -> &[String] {
        &self.passed
    }

    /// Labels of all failed checks, in invocation order.
    pub fn failed(&self) -> &[String] {
        &self.failed
    }

    /// True if any check has failed so far.
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    /// Aggregate result for the driver.
    pub fn summary(&self) -> QualitySummary {
        QualitySummary {
            total_passed: self.passed.len(),
            total_failed: self.failed.len(),
            failed_checks: self.failed.clone(),
        }
    }

    fn record(&mut self, label: String, passed: bool, detail: Option<String>) -> bool {
        if passed {
            self.passed.push(label);
        } else {
            let detail = detail.unwrap_or_default();
            log_error(format!("FAILED: {} - {}", label, detail));
            self.failed.push(label);
        }
        passed
    }
}

/// Canonical string form of a cell for key comparison.
///
/// Integral floats collapse onto their integer form so a key compares equal
/// across the CSV and JSONL round trips.
fn canonical_cell(value: &Value) -> String {
    match value {
        Value::Null => NULL_SENTINEL.to_string(),
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
    use crate::table::Row;
    use serde_json::json;

    fn table_of(column: &str, values: Vec<Value>) -> Table {
        let mut table = Table::new(vec![column.to_string()]);
        for value in values {
            let mut row = Row::new();
            row.insert(column.to_string(), value);
            table.push_row(row);
        }
        table
    }

    #[test]
    fn test_check_uniqueness_pass() {
        let mut dq = QualityValidator::new();
        let table = table_of("id", vec![json!(1), json!(2), json!(3)]);

        assert!(dq.check_uniqueness(&table, &["id"], "test"));
        assert_eq!(dq.passed().len(), 1);
        assert!(!dq.has_failures());
    }

    #[test]
    fn test_check_uniqueness_fail() {
        let mut dq = QualityValidator::new();
        let table = table_of("id", vec![json!(1), json!(2), json!(2)]);

        assert!(!dq.check_uniqueness(&table, &["id"], "test"));
        assert_eq!(dq.failed().len(), 1);
        assert!(dq.failed()[0].contains("DQ_UNIQUE"));
    }

    #[test]
    fn test_check_uniqueness_multi_column() {
        let mut dq = QualityValidator::new();
        let mut table = Table::new(vec!["a".into(), "b".into()]);
        for (a, b) in [(1, 1), (1, 2), (2, 1)] {
            let mut row = Row::new();
            row.insert("a".into(), json!(a));
            row.insert("b".into(), json!(b));
            table.push_row(row);
        }

        assert!(dq.check_uniqueness(&table, &["a", "b"], "test"));
        assert!(!dq.check_uniqueness(&table, &["a"], "test"));
    }

    #[test]
    fn test_checks_vacuous_on_empty_table() {
        let mut dq = QualityValidator::new();
        let empty = Table::empty();

        assert!(dq.check_uniqueness(&empty, &["id"], "test"));
        assert!(dq.check_nulls(&empty, &["id"], "test"));
        assert!(dq.check_referential_integrity(&empty, &empty, "id", "id", "test_rel"));
        assert_eq!(dq.summary().total_passed, 3);
    }

    #[test]
    fn test_check_nulls_pass_and_fail() {
        let mut dq = QualityValidator::new();
        let clean = table_of("id", vec![json!(1), json!(2)]);
        let dirty = table_of("id", vec![json!(1), Value::Null]);

        assert!(dq.check_nulls(&clean, &["id"], "clean"));
        assert!(!dq.check_nulls(&dirty, &["id"], "dirty"));
        assert_eq!(dq.summary().total_passed, 1);
        assert_eq!(dq.summary().total_failed, 1);
    }

    #[test]
    fn test_check_nulls_missing_column_counts_as_null() {
        let mut dq = QualityValidator::new();
        let table = table_of("id", vec![json!(1)]);
        assert!(!dq.check_nulls(&table, &["other"], "test"));
    }

    #[test]
    fn test_referential_integrity_pass() {
        let mut dq = QualityValidator::new();
        let parent = table_of("id", vec![json!(1), json!(2), json!(3)]);
        let child = table_of("fk_id", vec![json!(1), json!(2), json!(2)]);

        assert!(dq.check_referential_integrity(&parent, &child, "id", "fk_id", "test_rel"));
    }

    #[test]
    fn test_referential_integrity_fail_reports_orphans() {
        let mut dq = QualityValidator::new();
        let parent = table_of("id", vec![json!(1), json!(2)]);
        let child = table_of("fk_id", vec![json!(1), json!(3)]);

        assert!(!dq.check_referential_integrity(&parent, &child, "id", "fk_id", "test_rel"));
        assert_eq!(dq.failed(), &["DQ_REF_INTEGRITY: test_rel".to_string()]);
    }

    #[test]
    fn test_referential_integrity_null_child_keys_skipped() {
        let mut dq = QualityValidator::new();
        let parent = table_of("id", vec![json!(1)]);
        let child = table_of("fk_id", vec![json!(1), Value::Null]);

        assert!(dq.check_referential_integrity(&parent, &child, "id", "fk_id", "test_rel"));
    }

    #[test]
    fn test_cross_format_key_equality() {
        // 101 as i64 and 101.0 as f64 must compare equal
        let mut dq = QualityValidator::new();
        let parent = table_of("id", vec![json!(101)]);
        let child = table_of("fk_id", vec![json!(101.0)]);

        assert!(dq.check_referential_integrity(&parent, &child, "id", "fk_id", "test_rel"));
    }

    #[test]
    fn test_summary_lists_failed_labels_in_order() {
        let mut dq = QualityValidator::new();
        let dup = table_of("id", vec![json!(1), json!(1)]);
        let dirty = table_of("id", vec![Value::Null]);

        dq.check_uniqueness(&dup, &["id"], "first");
        dq.check_nulls(&dirty, &["id"], "second");

        let summary = dq.summary();
        assert_eq!(summary.total_failed, 2);
        assert!(summary.failed_checks[0].contains("first"));
        assert!(summary.failed_checks[1].contains("second"));
    }
}
