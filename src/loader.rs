//! Loading of the raw source extracts.
//!
//! A missing or unparseable file is reported and degrades to an empty table;
//! it never blocks the other sources. Downstream quality checks pass
//! vacuously on empty tables, so a fully absent extract surfaces later as an
//! empty dimension rather than a crash here.

use std::collections::HashMap;

use crate::config::{PipelineConfig, SourceName};
use crate::error::CsvResult;
use crate::logs::{log_error, log_success};
use crate::parser::parse_csv_file_auto;
use crate::table::Table;

/// The raw tables of one run, keyed by source.
#[derive(Debug, Clone, Default)]
pub struct RawTables {
    tables: HashMap<SourceName, Table>,
    empty: Table,
}

impl RawTables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from explicit (source, table) pairs. Used by tests.
    pub fn from_tables(tables: Vec<(SourceName, Table)>) -> Self {
        let mut raw = Self::new();
        for (source, table) in tables {
            raw.insert(source, table);
        }
        raw
    }

    pub fn insert(&mut self, source: SourceName, table: Table) {
        self.tables.insert(source, table);
    }

    /// Table for a source; an empty table if it never loaded.
    pub fn get(&self, source: SourceName) -> &Table {
        self.tables.get(&source).unwrap_or(&self.empty)
    }

    /// Number of sources with at least one row.
    pub fn loaded_count(&self) -> usize {
        self.tables.values().filter(|t| !t.is_empty()).count()
    }
}

/// Reads the configured raw extracts into [`RawTables`].
pub struct SourceLoader {
    config: PipelineConfig,
}

impl SourceLoader {
    pub fn new(config: &PipelineConfig) -> Self {
        Self { config: config.clone() }
    }

    /// Fallible load of one source.
    pub fn try_load(&self, source: SourceName) -> CsvResult<Table> {
        let path = self.config.source_path(source);
        let parsed = parse_csv_file_auto(&path)?;
        Ok(parsed.table)
    }

    /// Load one source, degrading to an empty table on failure.
    pub fn load(&self, source: SourceName) -> Table {
        match self.try_load(source) {
            Ok(table) => {
                log_success(format!(
                    "Loaded {} ({} rows) from {}",
                    source,
                    table.len(),
                    source.file_name()
                ));
                table
            }
            Err(e) => {
                log_error(format!("Could not load {}: {}", source, e));
                Table::empty()
            }
        }
    }

    /// Load every configured source. A failed source never blocks the rest.
    pub fn load_all(&self) -> RawTables {
        let mut raw = RawTables::new();
        for source in SourceName::ALL {
            raw.insert(source, self.load(source));
        }
        raw
    }
}
