//! Error types for the Playmart ETL pipeline.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`CsvError`] - raw CSV parsing errors
//! - [`StorageError`] - processed-artifact read/write errors
//! - [`TransformError`] - star-schema construction errors
//! - [`InsightError`] - report generation errors
//! - [`PipelineError`] - top-level orchestration errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// CSV Parsing Errors
// =============================================================================

/// Errors while reading a raw CSV extract.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to decode file content.
    #[error("Failed to decode content: {0}")]
    EncodingError(String),

    /// Invalid CSV format.
    #[error("Invalid CSV format: {0}")]
    ParseError(String),

    /// Empty file.
    #[error("CSV file is empty")]
    EmptyFile,

    /// No headers found.
    #[error("No headers found in CSV")]
    NoHeaders,
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Errors while persisting or reloading a processed table.
#[derive(Debug, Error)]
pub enum StorageError {
    /// IO error.
    #[error("Storage IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// CSV serialization error.
    #[error("CSV write error: {0}")]
    CsvError(#[from] csv::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Reload of a persisted CSV artifact failed.
    #[error("Artifact parse error: {0}")]
    ParseError(#[from] CsvError),
}

// =============================================================================
// Transformation Errors
// =============================================================================

/// Errors during star-schema construction.
#[derive(Debug, Error)]
pub enum TransformError {
    /// A raw source required by a builder is missing a column.
    #[error("Table '{table}' is missing column '{column}'")]
    MissingColumn { table: String, column: String },

    /// The configured date-dimension range is inverted.
    #[error("Invalid date dimension range: {start} > {end}")]
    InvalidDateRange { start: String, end: String },
}

// =============================================================================
// Insight Errors
// =============================================================================

/// Errors during insight report generation.
#[derive(Debug, Error)]
pub enum InsightError {
    /// A persisted artifact could not be loaded.
    #[error("Failed to load artifact '{name}': {source}")]
    Artifact {
        name: String,
        #[source]
        source: StorageError,
    },

    /// Failed to write the final report.
    #[error("Failed to write report: {0}")]
    ReportError(#[from] std::io::Error),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline orchestration errors.
///
/// This is the main error type returned by [`crate::pipeline::run`].
/// It wraps all lower-level errors and adds pipeline-specific variants.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Raw CSV parsing error.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// Storage error.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Transformation error.
    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),

    /// Insight error.
    #[error("Insight error: {0}")]
    Insight(#[from] InsightError),

    /// Data quality checks failed; the pipeline aborted before transformation.
    #[error("{} data quality check(s) failed: {}", .failed.len(), .failed.join(", "))]
    QualityFailed { failed: Vec<String> },
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for raw CSV operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type for transformation operations.
pub type TransformResult<T> = Result<T, TransformError>;

/// Result type for insight operations.
pub type InsightResult<T> = Result<T, InsightError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
