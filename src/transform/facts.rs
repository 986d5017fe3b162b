//! Fact construction.
//!
//! Facts reference dimension rows through surrogate keys resolved by left
//! lookups: a fact row whose natural key has no dimension match keeps a null
//! foreign key and is never dropped. Derived measures (duration, activity)
//! degrade to null when their source timestamps do not parse.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::config::SourceName;
use crate::loader::RawTables;
use crate::table::{Row, Table};

use super::dates::{date_key, parse_stamp};
use super::dimensions::Dimensions;
use super::join::{join_key, lookup};

/// The two fact tables of one run.
#[derive(Debug, Clone)]
pub struct Facts {
    pub fact_play_session: Table,
    pub fact_subscription: Table,
}

impl Facts {
    /// Name/table pairs, in persistence order.
    pub fn tables(&self) -> [(&'static str, &Table); 2] {
        [
            ("fact_play_session", &self.fact_play_session),
            ("fact_subscription", &self.fact_subscription),
        ]
    }
}

/// Build both fact tables.
///
/// `as_of` pins the activity cutoff for `is_active`, keeping the build pure:
/// the caller decides what "now" means.
pub fn build_facts(raw: &RawTables, dims: &Dimensions, as_of: DateTime<Utc>) -> Facts {
    Facts {
        fact_play_session: build_fact_play_session(raw, dims),
        fact_subscription: build_fact_subscription(raw, dims, as_of),
    }
}

const PLAY_SESSION_COLUMNS: [&str; 8] = [
    "play_session_id",
    "user_key",
    "channel_key",
    "status_key",
    "start_date_key",
    "end_date_key",
    "total_score",
    "duration_minutes",
];

/// One row per raw play session, with resolved surrogate keys, date keys,
/// and the derived duration in minutes.
fn build_fact_play_session(raw: &RawTables, dims: &Dimensions) -> Table {
    let sessions = raw.get(SourceName::PlaySession);

    let users = lookup(&dims.dim_user, "user_id", &["user_key"]);
    let channels = lookup(&dims.dim_channel, "play_session_channel_code", &["channel_key"]);
    let statuses = lookup(&dims.dim_status, "play_session_status_code", &["status_key"]);

    let mut fact = Table::new(PLAY_SESSION_COLUMNS.iter().map(|c| c.to_string()).collect());
    for session in sessions.rows() {
        let mut row = Row::new();
        row.insert(
            "play_session_id".into(),
            session.get("play_session_id").cloned().unwrap_or(Value::Null),
        );
        row.insert("user_key".into(), resolve(&users, session.get("user_id"), "user_key"));
        row.insert(
            "channel_key".into(),
            resolve(&channels, session.get("channel_code"), "channel_key"),
        );
        row.insert(
            "status_key".into(),
            resolve(&statuses, session.get("status_code"), "status_key"),
        );

        let start = session.get("start_datetime").and_then(parse_stamp);
        let end = session.get("end_datetime").and_then(parse_stamp);

        // Date keys use the clock face as written in the source
        row.insert(
            "start_date_key".into(),
            start.map_or(Value::Null, |s| Value::from(date_key(s.local.date()))),
        );
        row.insert(
            "end_date_key".into(),
            end.map_or(Value::Null, |s| Value::from(date_key(s.local.date()))),
        );
        row.insert(
            "total_score".into(),
            session.get("total_score").cloned().unwrap_or(Value::Null),
        );

        // Elapsed wall time; negative when the source timestamps are inverted
        let duration = match (start, end) {
            (Some(s), Some(e)) => {
                Value::from((e.utc - s.utc).num_milliseconds() as f64 / 60_000.0)
            }
            _ => Value::Null,
        };
        row.insert("duration_minutes".into(), duration);

        fact.push_row(row);
    }

    fact
}

const SUBSCRIPTION_COLUMNS: [&str; 7] = [
    "user_key",
    "plan_key",
    "payment_detail_key",
    "start_date_key",
    "end_date_key",
    "cost_amount",
    "is_active",
];

/// One row per raw user_plan row, with resolved surrogate keys, UTC date
/// keys, the plan cost, and the `is_active` flag relative to `as_of`.
fn build_fact_subscription(raw: &RawTables, dims: &Dimensions, as_of: DateTime<Utc>) -> Table {
    let user_plans = raw.get(SourceName::UserPlan);

    let users = lookup(&dims.dim_user, "user_registration_id", &["user_key"]);
    let plans = lookup(&dims.dim_plan, "plan_id", &["plan_key", "cost_amount"]);
    let payments = lookup(&dims.dim_payment_method, "payment_detail_id", &["payment_detail_key"]);

    let mut fact = Table::new(SUBSCRIPTION_COLUMNS.iter().map(|c| c.to_string()).collect());
    for user_plan in user_plans.rows() {
        let mut row = Row::new();
        row.insert(
            "user_key".into(),
            resolve(&users, user_plan.get("user_registration_id"), "user_key"),
        );

        let plan = user_plan
            .get("plan_id")
            .and_then(|v| join_key(v))
            .and_then(|key| plans.get(&key));
        row.insert(
            "plan_key".into(),
            plan.and_then(|p| p.get("plan_key").cloned()).unwrap_or(Value::Null),
        );
        row.insert(
            "payment_detail_key".into(),
            resolve(&payments, user_plan.get("payment_detail_id"), "payment_detail_key"),
        );

        // Subscription dates are timezone-aware; keys use the UTC calendar day
        let start = user_plan.get("start_date").and_then(parse_stamp);
        let end = user_plan.get("end_date").and_then(parse_stamp);
        row.insert(
            "start_date_key".into(),
            start.map_or(Value::Null, |s| Value::from(date_key(s.utc.date_naive()))),
        );
        row.insert(
            "end_date_key".into(),
            end.map_or(Value::Null, |s| Value::from(date_key(s.utc.date_naive()))),
        );

        row.insert(
            "cost_amount".into(),
            plan.and_then(|p| p.get("cost_amount").cloned()).unwrap_or(Value::Null),
        );
        row.insert(
            "is_active".into(),
            end.map_or(Value::Null, |e| Value::Bool(e.utc > as_of)),
        );

        fact.push_row(row);
    }

    fact
}

/// Resolve one surrogate key through a dimension lookup; null when unmatched.
fn resolve(
    map: &std::collections::HashMap<String, Row>,
    natural: Option<&Value>,
    surrogate: &str,
) -> Value {
    natural
        .and_then(|v| join_key(v))
        .and_then(|key| map.get(&key))
        .and_then(|row| row.get(surrogate).cloned())
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::transform::dimensions::build_dimensions;
    use chrono::TimeZone;
    use serde_json::json;

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
                SourceName::User,
                table(&["user_id", "ip_address"], &[&[json!(1), json!("1.1.1.1")], &[json!(2), json!("2.2.2.2")]]),
            ),
            (
                SourceName::Registration,
                table(
                    &["user_registration_id", "user_id", "username"],
                    &[
                        &[json!(101), json!(1), json!("user1")],
                        &[json!(102), json!(2), json!("user2")],
                    ],
                ),
            ),
            (
                SourceName::Channel,
                table(
                    &["play_session_channel_code", "english_description"],
                    &[&[json!("MOBILE"), json!("Mobile App")]],
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
                SourceName::PlaySession,
                table(
                    &[
                        "play_session_id",
                        "user_id",
                        "start_datetime",
                        "end_datetime",
                        "channel_code",
                        "status_code",
                        "total_score",
                    ],
                    &[&[
                        json!(1001),
                        json!(1),
                        json!("2024-01-01T10:00:00.000-06:00"),
                        json!("2024-01-01T10:30:00.000-06:00"),
                        json!("MOBILE"),
                        json!("COMPLETED"),
                        json!(150),
                    ]],
                ),
            ),
            (
                SourceName::Plan,
                table(
                    &["plan_id", "payment_frequency_code", "cost_amount"],
                    &[&[json!(10), json!("M"), json!(9.99)]],
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
            (
                SourceName::UserPlan,
                table(
                    &["user_registration_id", "plan_id", "payment_detail_id", "start_date", "end_date"],
                    &[&[json!(101), json!(10), json!(501), json!("2024-03-01"), json!("2099-03-01")]],
                ),
            ),
        ])
    }

    fn as_of() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_play_session_duration_and_date_keys() {
        let raw = sample_raw();
        let dims = build_dimensions(&raw, &PipelineConfig::default()).unwrap();
        let facts = build_facts(&raw, &dims, as_of());
        let fact = &facts.fact_play_session;

        assert_eq!(fact.len(), 1);
        assert_eq!(fact.get(0, "duration_minutes"), &json!(30.0));
        assert_eq!(fact.get(0, "start_date_key"), &json!(20240101));
        assert_eq!(fact.get(0, "end_date_key"), &json!(20240101));
        assert_eq!(fact.get(0, "user_key"), &json!(1));
        assert_eq!(fact.get(0, "channel_key"), &json!(1));
        assert_eq!(fact.get(0, "status_key"), &json!(1));
        assert_eq!(fact.get(0, "total_score"), &json!(150));
    }

    #[test]
    fn test_play_session_negative_duration_not_clamped() {
        let mut raw = sample_raw();
        raw.insert(
            SourceName::PlaySession,
            table(
                &["play_session_id", "user_id", "start_datetime", "end_datetime", "channel_code", "status_code", "total_score"],
                &[&[
                    json!(1002),
                    json!(1),
                    json!("2024-01-01T11:00:00.000-06:00"),
                    json!("2024-01-01T10:15:00.000-06:00"),
                    json!("MOBILE"),
                    json!("COMPLETED"),
                    json!(0),
                ]],
            ),
        );
        let dims = build_dimensions(&raw, &PipelineConfig::default()).unwrap();
        let facts = build_facts(&raw, &dims, as_of());

        assert_eq!(facts.fact_play_session.get(0, "duration_minutes"), &json!(-45.0));
    }

    #[test]
    fn test_play_session_unknown_codes_keep_null_keys() {
        let mut raw = sample_raw();
        raw.insert(
            SourceName::PlaySession,
            table(
                &["play_session_id", "user_id", "start_datetime", "end_datetime", "channel_code", "status_code", "total_score"],
                &[&[
                    json!(1003),
                    json!(999),
                    json!("2024-01-02T08:00:00.000-06:00"),
                    json!("2024-01-02T08:05:00.000-06:00"),
                    json!("CONSOLE"),
                    json!("COMPLETED"),
                    json!(40),
                ]],
            ),
        );
        let dims = build_dimensions(&raw, &PipelineConfig::default()).unwrap();
        let facts = build_facts(&raw, &dims, as_of());
        let fact = &facts.fact_play_session;

        // Row survives, unresolved keys are null
        assert_eq!(fact.len(), 1);
        assert_eq!(fact.get(0, "user_key"), &Value::Null);
        assert_eq!(fact.get(0, "channel_key"), &Value::Null);
        assert_eq!(fact.get(0, "status_key"), &json!(1));
    }

    #[test]
    fn test_play_session_bad_timestamps_degrade_to_null() {
        let mut raw = sample_raw();
        raw.insert(
            SourceName::PlaySession,
            table(
                &["play_session_id", "user_id", "start_datetime", "end_datetime", "channel_code", "status_code", "total_score"],
                &[&[json!(1004), json!(1), json!("???"), Value::Null, json!("MOBILE"), json!("COMPLETED"), json!(5)]],
            ),
        );
        let dims = build_dimensions(&raw, &PipelineConfig::default()).unwrap();
        let facts = build_facts(&raw, &dims, as_of());
        let fact = &facts.fact_play_session;

        assert_eq!(fact.get(0, "start_date_key"), &Value::Null);
        assert_eq!(fact.get(0, "end_date_key"), &Value::Null);
        assert_eq!(fact.get(0, "duration_minutes"), &Value::Null);
    }

    #[test]
    fn test_subscription_keys_cost_and_activity() {
        let raw = sample_raw();
        let dims = build_dimensions(&raw, &PipelineConfig::default()).unwrap();
        let facts = build_facts(&raw, &dims, as_of());
        let fact = &facts.fact_subscription;

        assert_eq!(fact.len(), 1);
        assert_eq!(fact.get(0, "user_key"), &json!(1));
        assert_eq!(fact.get(0, "plan_key"), &json!(1));
        assert_eq!(fact.get(0, "payment_detail_key"), &json!(1));
        assert_eq!(fact.get(0, "start_date_key"), &json!(20240301));
        assert_eq!(fact.get(0, "end_date_key"), &json!(20990301));
        assert_eq!(fact.get(0, "cost_amount"), &json!(9.99));
        assert_eq!(fact.get(0, "is_active"), &json!(true));
    }

    #[test]
    fn test_subscription_is_active_depends_on_as_of() {
        let raw = sample_raw();
        let dims = build_dimensions(&raw, &PipelineConfig::default()).unwrap();
        let later = Utc.with_ymd_and_hms(2100, 1, 1, 0, 0, 0).unwrap();
        let facts = build_facts(&raw, &dims, later);

        assert_eq!(facts.fact_subscription.get(0, "is_active"), &json!(false));
    }

    #[test]
    fn test_facts_against_empty_dimensions_yield_null_keys() {
        // The degenerate case: every dimension empty. Foreign keys must be
        // deterministically null, never fabricated.
        let raw = sample_raw();
        let empty_dims = build_dimensions(&RawTables::new(), &PipelineConfig::default()).unwrap();
        let facts = build_facts(&raw, &empty_dims, as_of());

        let play = &facts.fact_play_session;
        assert_eq!(play.len(), 1);
        for column in ["user_key", "channel_key", "status_key"] {
            assert_eq!(play.get(0, column), &Value::Null, "{} not null", column);
        }

        let sub = &facts.fact_subscription;
        assert_eq!(sub.len(), 1);
        for column in ["user_key", "plan_key", "payment_detail_key", "cost_amount"] {
            assert_eq!(sub.get(0, column), &Value::Null, "{} not null", column);
        }
        // Date keys still derive from the raw row itself
        assert_eq!(sub.get(0, "start_date_key"), &json!(20240301));
    }
}
