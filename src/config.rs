//! Pipeline configuration.
//!
//! All knobs are fixed at process start: directory roots, output format,
//! date-dimension bounds, and the closed set of raw sources. Components take
//! a [`PipelineConfig`] at construction instead of reading ambient globals,
//! so tests can run isolated pipelines side by side.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::NaiveDate;

use crate::logs::log_warning;

// =============================================================================
// Raw Sources
// =============================================================================

/// The nine raw extracts, as a closed set.
///
/// Each source maps to a fixed file name under the raw-data directory. Using
/// an enum instead of a string-keyed map means a misspelled source name is a
/// compile error, not a first-use runtime surprise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceName {
    Channel,
    Plan,
    PaymentFrequency,
    Status,
    User,
    PaymentDetail,
    UserPlan,
    PlaySession,
    Registration,
}

impl SourceName {
    /// Every source, in load order.
    pub const ALL: [SourceName; 9] = [
        SourceName::Channel,
        SourceName::Plan,
        SourceName::PaymentFrequency,
        SourceName::Status,
        SourceName::User,
        SourceName::PaymentDetail,
        SourceName::UserPlan,
        SourceName::PlaySession,
        SourceName::Registration,
    ];

    /// File name of this extract under the raw-data directory.
    pub fn file_name(self) -> &'static str {
        match self {
            SourceName::Channel => "channel_code.csv",
            SourceName::Plan => "plan.csv",
            SourceName::PaymentFrequency => "plan_payment_frequency.csv",
            SourceName::Status => "status_code.csv",
            SourceName::User => "user.csv",
            SourceName::PaymentDetail => "user_payment_detail.csv",
            SourceName::UserPlan => "user_plan.csv",
            SourceName::PlaySession => "user_play_session.csv",
            SourceName::Registration => "user_registration.csv",
        }
    }

    /// Logical name, used in logs and the CLI.
    pub fn as_str(self) -> &'static str {
        match self {
            SourceName::Channel => "channel",
            SourceName::Plan => "plan",
            SourceName::PaymentFrequency => "payment_frequency",
            SourceName::Status => "status",
            SourceName::User => "user",
            SourceName::PaymentDetail => "payment_detail",
            SourceName::UserPlan => "user_plan",
            SourceName::PlaySession => "play_session",
            SourceName::Registration => "registration",
        }
    }
}

impl fmt::Display for SourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SourceName::ALL
            .into_iter()
            .find(|source| source.as_str() == s)
            .ok_or_else(|| format!("unknown source '{}'", s))
    }
}

// =============================================================================
// Output Format
// =============================================================================

/// Serialization format for processed dimension/fact artifacts.
///
/// JSON Lines is the default: cell types survive a round trip exactly, which
/// the insight stage relies on when it reloads the persisted tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Jsonl,
    Csv,
}

impl OutputFormat {
    /// File extension for artifacts in this format.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jsonl => "jsonl",
            OutputFormat::Csv => "csv",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "jsonl" | "json" => Ok(OutputFormat::Jsonl),
            "csv" => Ok(OutputFormat::Csv),
            other => Err(format!("unknown output format '{}' (expected jsonl or csv)", other)),
        }
    }
}

// =============================================================================
// Pipeline Configuration
// =============================================================================

/// Everything a single pipeline run needs to know.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Directory holding the nine raw CSV extracts.
    pub raw_dir: PathBuf,
    /// Root for processed artifacts; dimensions/ and facts/ live below it.
    pub processed_dir: PathBuf,
    /// Path of the generated Markdown analysis report.
    pub report_path: PathBuf,
    /// Serialization format for processed artifacts.
    pub output_format: OutputFormat,
    /// First day covered by dim_date (inclusive).
    pub date_dim_start: NaiveDate,
    /// Last day covered by dim_date (inclusive).
    pub date_dim_end: NaiveDate,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("data/raw"),
            processed_dir: PathBuf::from("data/processed"),
            report_path: PathBuf::from("analysis_report.md"),
            output_format: OutputFormat::default(),
            // 2025 included for forecasting
            date_dim_start: NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date literal"),
            date_dim_end: NaiveDate::from_ymd_opt(2025, 12, 31).expect("valid date literal"),
        }
    }
}

impl PipelineConfig {
    /// Build a config from defaults plus `PLAYMART_*` environment overrides.
    ///
    /// Recognized variables: `PLAYMART_RAW_DIR`, `PLAYMART_PROCESSED_DIR`,
    /// `PLAYMART_REPORT_PATH`, `PLAYMART_OUTPUT_FORMAT`,
    /// `PLAYMART_DATE_DIM_START`, `PLAYMART_DATE_DIM_END` (ISO dates).
    /// Invalid values are warned about and ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(dir) = std::env::var("PLAYMART_RAW_DIR") {
            config.raw_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("PLAYMART_PROCESSED_DIR") {
            config.processed_dir = PathBuf::from(dir);
        }
        if let Ok(path) = std::env::var("PLAYMART_REPORT_PATH") {
            config.report_path = PathBuf::from(path);
        }
        if let Ok(format) = std::env::var("PLAYMART_OUTPUT_FORMAT") {
            match format.parse() {
                Ok(parsed) => config.output_format = parsed,
                Err(e) => log_warning(format!("PLAYMART_OUTPUT_FORMAT ignored: {}", e)),
            }
        }
        if let Ok(start) = std::env::var("PLAYMART_DATE_DIM_START") {
            match NaiveDate::parse_from_str(&start, "%Y-%m-%d") {
                Ok(date) => config.date_dim_start = date,
                Err(e) => log_warning(format!("PLAYMART_DATE_DIM_START ignored: {}", e)),
            }
        }
        if let Ok(end) = std::env::var("PLAYMART_DATE_DIM_END") {
            match NaiveDate::parse_from_str(&end, "%Y-%m-%d") {
                Ok(date) => config.date_dim_end = date,
                Err(e) => log_warning(format!("PLAYMART_DATE_DIM_END ignored: {}", e)),
            }
        }

        config
    }

    /// Directory for persisted dimension tables.
    pub fn dim_dir(&self) -> PathBuf {
        self.processed_dir.join("dimensions")
    }

    /// Directory for persisted fact tables.
    pub fn fact_dir(&self) -> PathBuf {
        self.processed_dir.join("facts")
    }

    /// Full path of one raw extract.
    pub fn source_path(&self, source: SourceName) -> PathBuf {
        self.raw_dir.join(source.file_name())
    }

    /// Re-root every path under `base`. Used by tests and the CLI overrides.
    pub fn rooted_at(mut self, base: &Path) -> Self {
        self.raw_dir = base.join(&self.raw_dir);
        self.processed_dir = base.join(&self.processed_dir);
        self.report_path = base.join(&self.report_path);
        self
    }
}
