//! Pipeline driver.
//!
//! Strictly sequential: load → validate → transform (build + persist) →
//! report. Any failed quality check aborts before transformation with
//! [`PipelineError::QualityFailed`]; the CLI turns that into a non-zero exit.

use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::config::{PipelineConfig, SourceName};
use crate::error::{PipelineError, PipelineResult};
use crate::insights::InsightGenerator;
use crate::loader::{RawTables, SourceLoader};
use crate::logs::{log_error, log_info, log_success};
use crate::quality::{QualitySummary, QualityValidator};
use crate::transform::StarSchemaBuilder;

/// What one full run produced.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Sources that loaded with at least one row.
    pub sources_loaded: usize,
    /// Quality check results.
    pub quality: QualitySummary,
    /// Where the analysis report landed.
    pub report_path: PathBuf,
}

/// Run the standard quality checks over the raw tables.
///
/// Uniqueness of the three natural keys facts join through, non-null primary
/// identifiers, and the three parent/child relationships.
pub fn run_quality_checks(raw: &RawTables) -> QualityValidator {
    let mut dq = QualityValidator::new();

    let user = raw.get(SourceName::User);
    let registration = raw.get(SourceName::Registration);
    let plan = raw.get(SourceName::Plan);

    dq.check_uniqueness(user, &["user_id"], "user");
    dq.check_uniqueness(registration, &["user_registration_id"], "registration");
    dq.check_uniqueness(plan, &["plan_id"], "plan");

    dq.check_nulls(user, &["user_id"], "user");
    dq.check_nulls(registration, &["user_registration_id"], "registration");

    dq.check_referential_integrity(user, registration, "user_id", "user_id", "user->registration");
    dq.check_referential_integrity(
        user,
        raw.get(SourceName::PlaySession),
        "user_id",
        "user_id",
        "user->play_session",
    );
    dq.check_referential_integrity(
        plan,
        raw.get(SourceName::UserPlan),
        "plan_id",
        "plan_id",
        "plan->user_plan",
    );

    dq
}

fn log_quality_summary(summary: &QualitySummary) {
    log_info("--- Data Quality Check Summary ---");
    log_info(format!("Total Passed: {}", summary.total_passed));
    log_info(format!("Total Failed: {}", summary.total_failed));
    for failure in &summary.failed_checks {
        log_error(format!("- {}", failure));
    }
}

/// Execute the full pipeline.
///
/// `as_of` pins every wall-clock-dependent derivation (the subscription
/// `is_active` flag), so two runs with the same inputs and the same `as_of`
/// produce identical outputs.
pub fn run(config: &PipelineConfig, as_of: DateTime<Utc>) -> PipelineResult<RunSummary> {
    log_info("Starting ETL pipeline...");

    // 1. Load
    log_info("Loading all raw data sources...");
    let loader = SourceLoader::new(config);
    let raw = loader.load_all();

    // 2. Validate
    let dq = run_quality_checks(&raw);
    let summary = dq.summary();
    log_quality_summary(&summary);
    if dq.has_failures() {
        log_error("Critical data quality checks failed. Aborting pipeline.");
        return Err(PipelineError::QualityFailed { failed: summary.failed_checks });
    }
    log_success("Data quality checks passed.");

    // 3. Transform
    log_info("Building star schema...");
    let builder = StarSchemaBuilder::new(config);
    builder.build(&raw, as_of)?;
    log_success("ETL transformation complete. Data warehouse built.");

    // 4. Report
    let generator = InsightGenerator::new(config);
    generator.generate_all()?;

    log_success("Pipeline finished successfully.");
    Ok(RunSummary {
        sources_loaded: raw.loaded_count(),
        quality: summary,
        report_path: config.report_path.clone(),
    })
}

/// Load and validate only; no transformation.
pub fn check(config: &PipelineConfig) -> PipelineResult<QualitySummary> {
    let loader = SourceLoader::new(config);
    let raw = loader.load_all();

    let dq = run_quality_checks(&raw);
    let summary = dq.summary();
    log_quality_summary(&summary);
    if dq.has_failures() {
        return Err(PipelineError::QualityFailed { failed: summary.failed_checks });
    }
    Ok(summary)
}

/// Load, validate, and build the star schema; no report.
pub fn build(config: &PipelineConfig, as_of: DateTime<Utc>) -> PipelineResult<()> {
    let loader = SourceLoader::new(config);
    let raw = loader.load_all();

    let dq = run_quality_checks(&raw);
    let summary = dq.summary();
    log_quality_summary(&summary);
    if dq.has_failures() {
        return Err(PipelineError::QualityFailed { failed: summary.failed_checks });
    }

    let builder = StarSchemaBuilder::new(config);
    builder.build(&raw, as_of)?;
    Ok(())
}

/// Generate the report from already-persisted artifacts.
pub fn report(config: &PipelineConfig) -> PipelineResult<String> {
    let generator = InsightGenerator::new(config);
    Ok(generator.generate_all()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Row, Table};
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

    #[test]
    fn test_quality_checks_vacuous_on_empty_run() {
        let dq = run_quality_checks(&RawTables::new());
        assert!(!dq.has_failures());
        assert_eq!(dq.summary().total_passed, 8);
    }

    #[test]
    fn test_quality_checks_catch_duplicate_user_ids() {
        let raw = RawTables::from_tables(vec![(
            SourceName::User,
            table(&["user_id"], &[&[json!(1)], &[json!(1)]]),
        )]);

        let dq = run_quality_checks(&raw);
        assert!(dq.has_failures());
        assert!(dq.failed()[0].contains("DQ_UNIQUE: user"));
    }

    #[test]
    fn test_quality_checks_catch_orphan_play_sessions() {
        let raw = RawTables::from_tables(vec![
            (SourceName::User, table(&["user_id"], &[&[json!(1)]])),
            (SourceName::PlaySession, table(&["user_id"], &[&[json!(7)]])),
        ]);

        let dq = run_quality_checks(&raw);
        assert!(dq.has_failures());
        assert!(dq.failed()[0].contains("user->play_session"));
    }
}
