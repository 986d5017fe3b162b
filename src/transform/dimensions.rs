//! Dimension construction.
//!
//! Every dimension except dim_date starts as a copy of its raw table
//! (optionally left-joined with a lookup) and gains a dense 1-based surrogate
//! key in source row order. Surrogate keys are stable only within one run.

use crate::config::{PipelineConfig, SourceName};
use crate::error::TransformResult;
use crate::loader::RawTables;
use crate::table::Table;

use super::dates::build_dim_date;
use super::join::{left_join, with_surrogate_key};

/// The six dimension tables of one run.
///
/// Fact construction takes this struct as an explicit argument, so "facts
/// before dimensions" cannot be expressed.
#[derive(Debug, Clone)]
pub struct Dimensions {
    pub dim_date: Table,
    pub dim_channel: Table,
    pub dim_status: Table,
    pub dim_payment_method: Table,
    pub dim_plan: Table,
    pub dim_user: Table,
}

impl Dimensions {
    /// Name/table pairs, in persistence order.
    pub fn tables(&self) -> [(&'static str, &Table); 6] {
        [
            ("dim_date", &self.dim_date),
            ("dim_channel", &self.dim_channel),
            ("dim_status", &self.dim_status),
            ("dim_payment_method", &self.dim_payment_method),
            ("dim_plan", &self.dim_plan),
            ("dim_user", &self.dim_user),
        ]
    }
}

/// Build all six dimensions from the validated raw tables.
pub fn build_dimensions(raw: &RawTables, config: &PipelineConfig) -> TransformResult<Dimensions> {
    Ok(Dimensions {
        dim_date: build_dim_date(config.date_dim_start, config.date_dim_end)?,
        dim_channel: build_dim_channel(raw),
        dim_status: build_dim_status(raw),
        dim_payment_method: build_dim_payment_method(raw),
        dim_plan: build_dim_plan(raw),
        dim_user: build_dim_user(raw),
    })
}

/// 1:1 copy of the channel reference table plus `channel_key`.
fn build_dim_channel(raw: &RawTables) -> Table {
    with_surrogate_key(raw.get(SourceName::Channel).clone(), "channel_key")
}

/// 1:1 copy of the status reference table plus `status_key`.
fn build_dim_status(raw: &RawTables) -> Table {
    with_surrogate_key(raw.get(SourceName::Status).clone(), "status_key")
}

/// 1:1 copy of the payment-detail table plus `payment_detail_key`.
fn build_dim_payment_method(raw: &RawTables) -> Table {
    with_surrogate_key(raw.get(SourceName::PaymentDetail).clone(), "payment_detail_key")
}

/// Plan joined with its payment-frequency description, plus `plan_key`.
///
/// A plan whose frequency code has no lookup row keeps a null description.
fn build_dim_plan(raw: &RawTables) -> Table {
    let joined = left_join(
        raw.get(SourceName::Plan),
        raw.get(SourceName::PaymentFrequency),
        "payment_frequency_code",
        "payment_frequency_code",
        ("_plan", "_frequency"),
    );
    with_surrogate_key(joined, "plan_key")
}

/// User account joined with its registration profile, plus `user_key`.
///
/// Users without a registration row survive with null profile fields.
fn build_dim_user(raw: &RawTables) -> Table {
    let joined = left_join(
        raw.get(SourceName::User),
        raw.get(SourceName::Registration),
        "user_id",
        "user_id",
        ("_account", "_profile"),
    );
    with_surrogate_key(joined, "user_key")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{value_as_i64, Row};
    use serde_json::{json, Value};

    fn table(columns: &[&str], rows: &[&[Value]]) -> Table {
        let mut t = Table::new(columns.iter().map(|c| c.to_string()).collect());
        for cells in rows {
            let mut row = Row::new();
            for (column, value) in columns.iter().zip(cells.iter()) {
                row.insert(column.to_string(), value.clone());
            }
            t.push_row(row);
        }
        t
    }

    fn sample_raw() -> RawTables {
        RawTables::from_tables(vec![
            (
                SourceName::Channel,
                table(
                    &["play_session_channel_code", "english_description"],
                    &[
                        &[json!("MOBILE"), json!("Mobile App")],
                        &[json!("ONLINE"), json!("Online")],
                    ],
                ),
            ),
            (
                SourceName::Status,
                table(
                    &["play_session_status_code", "english_description"],
                    &[&[json!("COMPLETED"), json!("Completed")]],
                ),
            ),
            (
                SourceName::User,
                table(
                    &["user_id", "ip_address"],
                    &[&[json!(1), json!("1.1.1.1")], &[json!(2), json!("2.2.2.2")]],
                ),
            ),
            (
                SourceName::Registration,
                table(
                    &["user_registration_id", "user_id", "username"],
                    &[&[json!(101), json!(1), json!("user1")]],
                ),
            ),
            (
                SourceName::Plan,
                table(
                    &["plan_id", "payment_frequency_code", "cost_amount"],
                    &[
                        &[json!(10), json!("M"), json!(9.99)],
                        &[json!(11), json!("??"), json!(120.0)],
                    ],
                ),
            ),
            (
                SourceName::PaymentFrequency,
                table(
                    &["payment_frequency_code", "english_description"],
                    &[&[json!("M"), json!("Monthly")]],
                ),
            ),
            (
                SourceName::PaymentDetail,
                table(
                    &["payment_detail_id", "payment_method_code"],
                    &[&[json!(501), json!("CREDIT_CARD")]],
                ),
            ),
        ])
    }

    #[test]
    fn test_dimensions_get_dense_surrogate_keys() {
        let dims = build_dimensions(&sample_raw(), &PipelineConfig::default()).unwrap();

        for (name, dim) in [("dim_channel", &dims.dim_channel), ("dim_user", &dims.dim_user)] {
            let key_column = match name {
                "dim_channel" => "channel_key",
                _ => "user_key",
            };
            let keys: Vec<i64> = dim
                .column_values(key_column)
                .map(|v| value_as_i64(v).unwrap())
                .collect();
            let expected: Vec<i64> = (1..=dim.len() as i64).collect();
            assert_eq!(keys, expected, "{} keys not dense", name);
        }
    }

    #[test]
    fn test_dim_user_preserves_users_without_registration() {
        let dims = build_dimensions(&sample_raw(), &PipelineConfig::default()).unwrap();
        let dim_user = &dims.dim_user;

        assert_eq!(dim_user.len(), 2);
        assert_eq!(dim_user.get(0, "username"), &json!("user1"));
        assert_eq!(dim_user.get(1, "username"), &Value::Null);
        assert_eq!(dim_user.get(1, "user_registration_id"), &Value::Null);
        assert_eq!(dim_user.get(1, "ip_address"), &json!("2.2.2.2"));
    }

    #[test]
    fn test_dim_plan_unmatched_frequency_keeps_null_description() {
        let dims = build_dimensions(&sample_raw(), &PipelineConfig::default()).unwrap();
        let dim_plan = &dims.dim_plan;

        assert_eq!(dim_plan.len(), 2);
        assert_eq!(dim_plan.get(0, "english_description"), &json!("Monthly"));
        assert_eq!(dim_plan.get(1, "english_description"), &Value::Null);
    }

    #[test]
    fn test_empty_raw_sources_yield_empty_dimensions() {
        let dims = build_dimensions(&RawTables::new(), &PipelineConfig::default()).unwrap();

        assert!(dims.dim_channel.is_empty());
        assert!(dims.dim_user.is_empty());
        // dim_date is synthesized, not raw-derived
        assert!(!dims.dim_date.is_empty());
    }

    #[test]
    fn test_dim_date_spans_configured_range() {
        let config = PipelineConfig::default();
        let dims = build_dimensions(&RawTables::new(), &config).unwrap();

        // 2024 (leap) + 2025
        assert_eq!(dims.dim_date.len(), 366 + 365);
    }
}
