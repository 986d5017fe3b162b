//! Star-schema transformation.
//!
//! - [`dates`] - date dimension and timestamp derivations
//! - [`join`] - left-join and surrogate-key primitives
//! - [`dimensions`] - the six dimension builders
//! - [`facts`] - the two fact builders
//!
//! [`StarSchemaBuilder`] ties them together and persists every artifact.

pub mod dates;
pub mod dimensions;
pub mod facts;
pub mod join;

use chrono::{DateTime, Utc};

use crate::config::PipelineConfig;
use crate::error::TransformResult;
use crate::loader::RawTables;
use crate::logs::{log_error, log_success};
use crate::storage::save_table;
use crate::table::Table;

pub use dimensions::{build_dimensions, Dimensions};
pub use facts::{build_facts, Facts};

/// Builds the full star schema from validated raw tables and persists it.
///
/// Dimension and fact construction are plain functions; this type adds the
/// persistence pass. Facts always receive the freshly built dimensions, so
/// there is no build-order state to get wrong.
pub struct StarSchemaBuilder<'a> {
    config: &'a PipelineConfig,
}

impl<'a> StarSchemaBuilder<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self { config }
    }

    /// Build all dimensions and facts, persisting each table as it lands.
    ///
    /// A failed save is reported and does not block sibling saves; the
    /// in-memory tables are returned either way.
    pub fn build(&self, raw: &RawTables, as_of: DateTime<Utc>) -> TransformResult<(Dimensions, Facts)> {
        let dims = build_dimensions(raw, self.config)?;
        let dim_dir = self.config.dim_dir();
        for (name, table) in dims.tables() {
            self.persist(table, &dim_dir, name);
        }

        let facts = build_facts(raw, &dims, as_of);
        let fact_dir = self.config.fact_dir();
        for (name, table) in facts.tables() {
            self.persist(table, &fact_dir, name);
        }

        Ok((dims, facts))
    }

    fn persist(&self, table: &Table, dir: &std::path::Path, name: &str) {
        match save_table(table, dir, name, self.config.output_format) {
            Ok(path) => log_success(format!("Saved {} ({} rows) to {}", name, table.len(), path.display())),
            Err(e) => log_error(format!("Could not save {}: {}", name, e)),
        }
    }
}
