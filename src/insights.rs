//! Business-insight report generation.
//!
//! Reads the persisted dimension/fact artifacts back (read-only) and computes
//! the eight fixed reports. Each report declares its required inputs up
//! front; a report whose inputs are empty or missing is skipped, never an
//! error. The result is one Markdown file with a section per report.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;

use serde_json::Value;

use crate::config::PipelineConfig;
use crate::error::InsightResult;
use crate::logs::{log_error, log_info, log_success, log_warning};
use crate::markdown::{format_fixed2, format_money, format_number, render_table};
use crate::storage::load_table;
use crate::table::{value_as_f64, value_as_i64, value_to_string, Table};
use crate::transform::join::{join_key, lookup};

/// The revenue-trend report is pinned to this calendar year.
const REVENUE_TREND_YEAR: i64 = 2024;

// =============================================================================
// Artifact References
// =============================================================================

/// Which store an artifact lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Dimension,
    Fact,
}

/// A named persisted artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtifactRef {
    pub kind: ArtifactKind,
    pub name: &'static str,
}

impl ArtifactRef {
    pub const fn dim(name: &'static str) -> Self {
        Self { kind: ArtifactKind::Dimension, name }
    }

    pub const fn fact(name: &'static str) -> Self {
        Self { kind: ArtifactKind::Fact, name }
    }
}

const FACT_PLAY_SESSION: ArtifactRef = ArtifactRef::fact("fact_play_session");
const FACT_SUBSCRIPTION: ArtifactRef = ArtifactRef::fact("fact_subscription");
const DIM_CHANNEL: ArtifactRef = ArtifactRef::dim("dim_channel");
const DIM_STATUS: ArtifactRef = ArtifactRef::dim("dim_status");
const DIM_PLAN: ArtifactRef = ArtifactRef::dim("dim_plan");
const DIM_PAYMENT_METHOD: ArtifactRef = ArtifactRef::dim("dim_payment_method");
const DIM_USER: ArtifactRef = ArtifactRef::dim("dim_user");
const DIM_DATE: ArtifactRef = ArtifactRef::dim("dim_date");

// =============================================================================
// The Eight Reports
// =============================================================================

/// The fixed set of insight reports, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insight {
    SessionsByChannel,
    SubscribersByPlan,
    GrossRevenue,
    SessionOutcomes,
    PaymentMethodPopularity,
    TopUsersByScore,
    MonthlyRevenueTrend,
    AvgSessionDuration,
}

impl Insight {
    pub const ALL: [Insight; 8] = [
        Insight::SessionsByChannel,
        Insight::SubscribersByPlan,
        Insight::GrossRevenue,
        Insight::SessionOutcomes,
        Insight::PaymentMethodPopularity,
        Insight::TopUsersByScore,
        Insight::MonthlyRevenueTrend,
        Insight::AvgSessionDuration,
    ];

    /// Section title.
    pub fn title(self) -> &'static str {
        match self {
            Insight::SessionsByChannel => "Insight 1: Play Sessions by Channel",
            Insight::SubscribersByPlan => "Insight 2: Unique Users by Plan Type",
            Insight::GrossRevenue => "Insight 3: Gross Revenue",
            Insight::SessionOutcomes => "Insight 4: Play Session Outcomes",
            Insight::PaymentMethodPopularity => "Insight 5: Popularity of Payment Method Types",
            Insight::TopUsersByScore => "Insight 6: Top 10 Users by Total Score",
            Insight::MonthlyRevenueTrend => "Insight 7: Monthly Revenue Trend (2024)",
            Insight::AvgSessionDuration => "Insight 8: Average Session Duration by Channel",
        }
    }

    /// Explanatory note under the title, where the report carries one.
    pub fn note(self) -> Option<&'static str> {
        match self {
            Insight::SessionsByChannel | Insight::SubscribersByPlan | Insight::GrossRevenue => None,
            Insight::SessionOutcomes => Some(
                "This shows the final status of all games played, indicating user engagement or potential issues (like timeouts or aborts).",
            ),
            Insight::PaymentMethodPopularity => {
                Some("This helps understand what payment platforms are most trusted by users.")
            }
            Insight::TopUsersByScore => Some(
                "Identifying top players is key for marketing, rewards, and community building.",
            ),
            Insight::MonthlyRevenueTrend => Some(
                "Understanding monthly revenue is critical for forecasting and identifying seasonal trends.",
            ),
            Insight::AvgSessionDuration => Some(
                "This shows how engaged users are on each platform. Longer sessions might indicate a better user experience.",
            ),
        }
    }

    /// Artifacts this report reads. All must be present and non-empty.
    pub fn required_tables(self) -> &'static [ArtifactRef] {
        match self {
            Insight::SessionsByChannel => &[FACT_PLAY_SESSION, DIM_CHANNEL],
            Insight::SubscribersByPlan => &[FACT_SUBSCRIPTION, DIM_PLAN],
            Insight::GrossRevenue => &[FACT_SUBSCRIPTION],
            Insight::SessionOutcomes => &[FACT_PLAY_SESSION, DIM_STATUS],
            Insight::PaymentMethodPopularity => &[FACT_SUBSCRIPTION, DIM_PAYMENT_METHOD],
            Insight::TopUsersByScore => &[FACT_PLAY_SESSION, DIM_USER],
            Insight::MonthlyRevenueTrend => &[FACT_SUBSCRIPTION, DIM_DATE],
            Insight::AvgSessionDuration => &[FACT_PLAY_SESSION, DIM_CHANNEL],
        }
    }
}

// =============================================================================
// Artifact Store
// =============================================================================

/// Persisted artifacts loaded once per report run.
struct ArtifactStore {
    tables: HashMap<&'static str, Table>,
}

impl ArtifactStore {
    /// Load every artifact any report references. A load failure is
    /// reported and leaves that artifact empty, which skips the reports
    /// depending on it.
    fn load(config: &PipelineConfig) -> Self {
        let mut tables = HashMap::new();
        for insight in Insight::ALL {
            for reference in insight.required_tables() {
                if tables.contains_key(reference.name) {
                    continue;
                }
                let dir = match reference.kind {
                    ArtifactKind::Dimension => config.dim_dir(),
                    ArtifactKind::Fact => config.fact_dir(),
                };
                let table = match load_table(&dir, reference.name, config.output_format) {
                    Ok(table) => table,
                    Err(e) => {
                        log_error(format!("Could not load artifact {}: {}", reference.name, e));
                        Table::empty()
                    }
                };
                tables.insert(reference.name, table);
            }
        }
        Self { tables }
    }

    fn get(&self, reference: ArtifactRef) -> &Table {
        self.tables
            .get(reference.name)
            .expect("artifact preloaded for every declared reference")
    }

    fn all_present(&self, references: &[ArtifactRef]) -> bool {
        references
            .iter()
            .all(|reference| !self.get(*reference).is_empty())
    }
}

// =============================================================================
// Generator
// =============================================================================

/// Computes all eight reports and writes the Markdown analysis file.
pub struct InsightGenerator {
    config: PipelineConfig,
}

impl InsightGenerator {
    pub fn new(config: &PipelineConfig) -> Self {
        Self { config: config.clone() }
    }

    /// Run every report and write the combined file. Returns the report text.
    pub fn generate_all(&self) -> InsightResult<String> {
        log_info("Generating insights...");
        let store = ArtifactStore::load(&self.config);

        let mut sections = vec!["# 2024 Game Platform Analysis Report\n".to_string()];
        for insight in Insight::ALL {
            if !store.all_present(insight.required_tables()) {
                log_warning(format!("Skipping '{}': required inputs missing or empty", insight.title()));
                continue;
            }

            let mut section = format!("## {}\n", insight.title());
            if let Some(note) = insight.note() {
                section.push_str(&format!("{}\n\n", note));
            }
            section.push_str(&compute(insight, &store));
            sections.push(section);
        }

        let report = sections.join("\n");
        if let Some(parent) = self.config.report_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.config.report_path, &report)?;
        log_success(format!("Analysis report saved to {}", self.config.report_path.display()));

        Ok(report)
    }
}

fn compute(insight: Insight, store: &ArtifactStore) -> String {
    match insight {
        Insight::SessionsByChannel => sessions_by_channel(store),
        Insight::SubscribersByPlan => subscribers_by_plan(store),
        Insight::GrossRevenue => gross_revenue(store),
        Insight::SessionOutcomes => session_outcomes(store),
        Insight::PaymentMethodPopularity => payment_method_popularity(store),
        Insight::TopUsersByScore => top_users_by_score(store),
        Insight::MonthlyRevenueTrend => monthly_revenue_trend(store),
        Insight::AvgSessionDuration => avg_session_duration(store),
    }
}

// =============================================================================
// Report Computations
// =============================================================================

/// Resolve a fact row's surrogate key to one dimension attribute.
///
/// `None` drops the row: unresolved keys behave like an inner join, and null
/// attributes never form a group.
fn resolve_attr(
    fact_row: &crate::table::Row,
    fact_key: &str,
    dim_lookup: &HashMap<String, crate::table::Row>,
    attr: &str,
) -> Option<String> {
    let key = join_key(fact_row.get(fact_key).unwrap_or(&Value::Null))?;
    let dim_row = dim_lookup.get(&key)?;
    let value = dim_row.get(attr)?;
    if value.is_null() {
        return None;
    }
    Some(value_to_string(value))
}

/// How many play sessions took place on each channel?
fn sessions_by_channel(store: &ArtifactStore) -> String {
    let fact = store.get(FACT_PLAY_SESSION);
    let channels = lookup(store.get(DIM_CHANNEL), "channel_key", &["english_description"]);

    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for row in fact.rows() {
        if let Some(label) = resolve_attr(row, "channel_key", &channels, "english_description") {
            *counts.entry(label).or_insert(0) += 1;
        }
    }

    let rows: Vec<Vec<String>> = counts
        .into_iter()
        .map(|(label, count)| vec![label, count.to_string()])
        .collect();
    render_table(&["Channel", "Total Sessions"], &rows)
}

/// How many distinct subscribers does each plan type have?
fn subscribers_by_plan(store: &ArtifactStore) -> String {
    let fact = store.get(FACT_SUBSCRIPTION);
    let plans = lookup(store.get(DIM_PLAN), "plan_key", &["english_description"]);

    let mut users: BTreeMap<String, HashSet<String>> = BTreeMap::new();
    for row in fact.rows() {
        let Some(label) = resolve_attr(row, "plan_key", &plans, "english_description") else {
            continue;
        };
        if let Some(user) = join_key(row.get("user_key").unwrap_or(&Value::Null)) {
            users.entry(label).or_default().insert(user);
        }
    }

    let rows: Vec<Vec<String>> = users
        .into_iter()
        .map(|(label, set)| vec![label, set.len().to_string()])
        .collect();
    render_table(&["Plan Type", "Unique Users"], &rows)
}

/// Total gross revenue plus its breakdown by plan type.
fn gross_revenue(store: &ArtifactStore) -> String {
    let fact = store.get(FACT_SUBSCRIPTION);
    let plans = lookup(store.get(DIM_PLAN), "plan_key", &["english_description"]);

    let total: f64 = fact
        .column_values("cost_amount")
        .filter_map(value_as_f64)
        .sum();

    let mut by_plan: BTreeMap<String, f64> = BTreeMap::new();
    for row in fact.rows() {
        let Some(label) = resolve_attr(row, "plan_key", &plans, "english_description") else {
            continue;
        };
        let amount = row.get("cost_amount").and_then(value_as_f64).unwrap_or(0.0);
        *by_plan.entry(label).or_insert(0.0) += amount;
    }

    let rows: Vec<Vec<String>> = by_plan
        .into_iter()
        .map(|(label, sum)| vec![label, format_number(sum)])
        .collect();

    format!(
        "**Total Gross Revenue (2024): ${}**\n\n### Revenue Breakdown by Plan Type\n{}",
        format_money(total),
        render_table(&["Plan Type", "Total Revenue"], &rows)
    )
}

/// What are the outcomes of all play sessions?
fn session_outcomes(store: &ArtifactStore) -> String {
    let fact = store.get(FACT_PLAY_SESSION);
    let statuses = lookup(store.get(DIM_STATUS), "status_key", &["english_description"]);

    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for row in fact.rows() {
        if let Some(label) = resolve_attr(row, "status_key", &statuses, "english_description") {
            *counts.entry(label).or_insert(0) += 1;
        }
    }

    let mut entries: Vec<(String, usize)> = counts.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1));

    let rows: Vec<Vec<String>> = entries
        .into_iter()
        .map(|(label, count)| vec![label, count.to_string()])
        .collect();
    render_table(&["Session Outcome", "Total Sessions"], &rows)
}

/// Which payment method types do distinct users rely on?
fn payment_method_popularity(store: &ArtifactStore) -> String {
    let fact = store.get(FACT_SUBSCRIPTION);
    let methods = lookup(
        store.get(DIM_PAYMENT_METHOD),
        "payment_detail_key",
        &["payment_method_code"],
    );

    let mut users: BTreeMap<String, HashSet<String>> = BTreeMap::new();
    for row in fact.rows() {
        let Some(label) = resolve_attr(row, "payment_detail_key", &methods, "payment_method_code") else {
            continue;
        };
        if let Some(user) = join_key(row.get("user_key").unwrap_or(&Value::Null)) {
            users.entry(label).or_default().insert(user);
        }
    }

    let mut entries: Vec<(String, usize)> = users
        .into_iter()
        .map(|(label, set)| (label, set.len()))
        .collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1));

    let rows: Vec<Vec<String>> = entries
        .into_iter()
        .map(|(label, count)| vec![label, count.to_string()])
        .collect();
    render_table(&["Payment Type", "Unique Users"], &rows)
}

/// Top 10 users by summed score, with their profile names.
fn top_users_by_score(store: &ArtifactStore) -> String {
    let fact = store.get(FACT_PLAY_SESSION);
    let users = lookup(
        store.get(DIM_USER),
        "user_key",
        &["username", "first_name", "last_name"],
    );

    let mut scores: BTreeMap<String, f64> = BTreeMap::new();
    for row in fact.rows() {
        let Some(user) = join_key(row.get("user_key").unwrap_or(&Value::Null)) else {
            continue;
        };
        let score = row.get("total_score").and_then(value_as_f64).unwrap_or(0.0);
        *scores.entry(user).or_insert(0.0) += score;
    }

    let mut entries: Vec<(String, f64)> = scores
        .into_iter()
        .filter(|(user, _)| users.contains_key(user))
        .collect();
    entries.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    entries.truncate(10);

    let rows: Vec<Vec<String>> = entries
        .into_iter()
        .map(|(user, score)| {
            let profile = &users[&user];
            vec![
                value_to_string(profile.get("username").unwrap_or(&Value::Null)),
                value_to_string(profile.get("first_name").unwrap_or(&Value::Null)),
                value_to_string(profile.get("last_name").unwrap_or(&Value::Null)),
                format_number(score),
            ]
        })
        .collect();
    render_table(&["username", "first_name", "last_name", "total_score"], &rows)
}

/// Monthly revenue across the fixed trend year.
fn monthly_revenue_trend(store: &ArtifactStore) -> String {
    let fact = store.get(FACT_SUBSCRIPTION);
    let dates = lookup(
        store.get(DIM_DATE),
        "date_key",
        &["year", "month", "month_name"],
    );

    let mut by_month: BTreeMap<i64, (String, f64)> = BTreeMap::new();
    for row in fact.rows() {
        let Some(key) = join_key(row.get("start_date_key").unwrap_or(&Value::Null)) else {
            continue;
        };
        let Some(date_row) = dates.get(&key) else {
            continue;
        };
        if date_row.get("year").and_then(value_as_i64) != Some(REVENUE_TREND_YEAR) {
            continue;
        }
        let Some(month) = date_row.get("month").and_then(value_as_i64) else {
            continue;
        };
        let month_name = value_to_string(date_row.get("month_name").unwrap_or(&Value::Null));
        let amount = row.get("cost_amount").and_then(value_as_f64).unwrap_or(0.0);
        let entry = by_month.entry(month).or_insert((month_name, 0.0));
        entry.1 += amount;
    }

    let rows: Vec<Vec<String>> = by_month
        .into_values()
        .map(|(month_name, sum)| vec![month_name, format_number(sum)])
        .collect();
    render_table(&["month_name", "Total Revenue"], &rows)
}

/// Average play-session duration per channel, rounded to two decimals.
fn avg_session_duration(store: &ArtifactStore) -> String {
    let fact = store.get(FACT_PLAY_SESSION);
    let channels = lookup(store.get(DIM_CHANNEL), "channel_key", &["english_description"]);

    let mut sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for row in fact.rows() {
        let Some(label) = resolve_attr(row, "channel_key", &channels, "english_description") else {
            continue;
        };
        if let Some(duration) = row.get("duration_minutes").and_then(value_as_f64) {
            let entry = sums.entry(label).or_insert((0.0, 0));
            entry.0 += duration;
            entry.1 += 1;
        }
    }

    let rows: Vec<Vec<String>> = sums
        .into_iter()
        .map(|(label, (sum, count))| {
            let mean = sum / count as f64;
            let rounded = (mean * 100.0).round() / 100.0;
            vec![label, format_fixed2(rounded)]
        })
        .collect();
    render_table(&["Channel", "Avg. Duration (Minutes)"], &rows)
}
