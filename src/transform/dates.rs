//! Calendar derivations: the date dimension, date keys, timestamp parsing.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

use crate::error::{TransformError, TransformResult};
use crate::table::{Row, Table};

/// YYYYMMDD integer key for a calendar date.
pub fn date_key(date: NaiveDate) -> i64 {
    date.year() as i64 * 10_000 + date.month() as i64 * 100 + date.day() as i64
}

/// A parsed source timestamp.
///
/// `local` is the clock face as written in the source (offset preserved, not
/// shifted), which drives the date keys. `utc` is the absolute instant, which
/// drives durations and activity comparisons.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParsedStamp {
    pub local: NaiveDateTime,
    pub utc: DateTime<Utc>,
}

const NAIVE_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
];

/// Parse a timestamp cell.
///
/// Accepts RFC 3339 with offset (the play-session export format), a few
/// naive datetime layouts, and bare ISO dates (midnight). Naive values are
/// taken as UTC. Returns `None` for nulls and unparseable text; the fact
/// builders degrade those rows' derived fields to null instead of aborting.
pub fn parse_stamp(value: &Value) -> Option<ParsedStamp> {
    let text = value.as_str()?.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(ParsedStamp {
            local: dt.naive_local(),
            utc: dt.with_timezone(&Utc),
        });
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(ParsedStamp {
                local: naive,
                utc: Utc.from_utc_datetime(&naive),
            });
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        let naive = date.and_hms_opt(0, 0, 0)?;
        return Some(ParsedStamp {
            local: naive,
            utc: Utc.from_utc_datetime(&naive),
        });
    }

    None
}

/// Build the synthesized date dimension covering `[start, end]` inclusive.
///
/// One row per calendar day, in calendar order, no gaps.
pub fn build_dim_date(start: NaiveDate, end: NaiveDate) -> TransformResult<Table> {
    if start > end {
        return Err(TransformError::InvalidDateRange {
            start: start.to_string(),
            end: end.to_string(),
        });
    }

    let columns = vec![
        "date_key".to_string(),
        "full_date".to_string(),
        "year".to_string(),
        "quarter".to_string(),
        "month".to_string(),
        "month_name".to_string(),
        "day".to_string(),
        "day_of_week".to_string(),
    ];
    let mut table = Table::new(columns);

    let mut day = start;
    loop {
        let mut row = Row::new();
        row.insert("date_key".into(), Value::from(date_key(day)));
        row.insert("full_date".into(), Value::from(day.format("%Y-%m-%d").to_string()));
        row.insert("year".into(), Value::from(day.year() as i64));
        row.insert("quarter".into(), Value::from((day.month() as i64 + 2) / 3));
        row.insert("month".into(), Value::from(day.month() as i64));
        row.insert("month_name".into(), Value::from(day.format("%B").to_string()));
        row.insert("day".into(), Value::from(day.day() as i64));
        row.insert("day_of_week".into(), Value::from(day.format("%A").to_string()));
        table.push_row(row);

        if day == end {
            break;
        }
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }

    Ok(table)
}
