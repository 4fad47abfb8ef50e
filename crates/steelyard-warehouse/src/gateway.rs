//! Warehouse gateway trait definitions.
//!
//! These traits define the consumed warehouse surface:
//! - `WarehouseGateway`: SQL execution, table introspection, bulk-load start
//! - `LoadJobHandle`: pollable status handle for an asynchronous load job
//!
//! All traits are async and backend-agnostic. In-memory fakes are provided
//! for testing via the `fakes` module.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::WarehouseResult;
use crate::row::Row;

/// Fully-qualified table reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableRef {
    pub project: String,
    pub dataset: String,
    pub table: String,
}

impl TableRef {
    pub fn new(
        project: impl Into<String>,
        dataset: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            dataset: dataset.into(),
            table: table.into(),
        }
    }

    /// Sibling table in the same project and dataset.
    pub fn sibling(&self, table: impl Into<String>) -> Self {
        Self {
            project: self.project.clone(),
            dataset: self.dataset.clone(),
            table: table.into(),
        }
    }
}

impl std::fmt::Display for TableRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.project, self.dataset, self.table)
    }
}

/// One column of a table schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub name: String,
    pub field_type: String,
    pub nullable: bool,
}

/// Storage-level table statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableStats {
    pub num_rows: u64,
    pub num_bytes: u64,
}

impl TableStats {
    /// Table size in GiB, for log lines.
    pub fn gib(&self) -> f64 {
        self.num_bytes as f64 / (1024.0 * 1024.0 * 1024.0)
    }
}

/// Bulk-load source formats recognised by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceFormat {
    Csv,
}

/// Overwrite policy for the destination table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WriteDisposition {
    /// Replace the destination table contents.
    #[serde(rename = "WRITE_TRUNCATE")]
    Truncate,
    /// Append to the destination table.
    #[serde(rename = "WRITE_APPEND")]
    Append,
}

/// Bulk-load job configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadJobConfig {
    pub source_uri: String,
    pub destination: TableRef,
    pub source_format: SourceFormat,
    pub skip_leading_rows: u32,
    pub autodetect: bool,
    pub write_disposition: WriteDisposition,
    pub max_bad_records: u32,
}

impl LoadJobConfig {
    /// Standard configuration for the compressed-CSV bulk load: skip the
    /// header row, autodetect the schema, truncate the destination, and
    /// tolerate up to 1000 bad records.
    pub fn csv(source_uri: impl Into<String>, destination: TableRef) -> Self {
        Self {
            source_uri: source_uri.into(),
            destination,
            source_format: SourceFormat::Csv,
            skip_leading_rows: 1,
            autodetect: true,
            write_disposition: WriteDisposition::Truncate,
            max_bad_records: 1000,
        }
    }
}

/// Externally-owned load job lifecycle, observed by polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LoadJobState {
    Pending,
    Running,
    Done,
}

impl std::fmt::Display for LoadJobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LoadJobState::Pending => "PENDING",
            LoadJobState::Running => "RUNNING",
            LoadJobState::Done => "DONE",
        };
        write!(f, "{s}")
    }
}

/// Pollable handle to an asynchronous bulk-load job.
#[async_trait]
pub trait LoadJobHandle: Send {
    /// Re-fetch job status from the warehouse.
    async fn refresh(&mut self) -> WarehouseResult<()>;

    /// Whether the job reached a terminal state as of the last refresh.
    fn done(&self) -> bool;

    /// Last observed state.
    fn state(&self) -> LoadJobState;

    /// Errors reported by the job (empty on success).
    fn errors(&self) -> &[String];
}

/// Analytical warehouse gateway.
///
/// Guarantees:
/// - `query` returns one `Row` per result row, in result order.
/// - `ensure_dataset` is idempotent (already-exists is success).
/// - `start_load` returns a handle whose `errors()` is authoritative once
///   `done()` is true.
#[async_trait]
pub trait WarehouseGateway: Send + Sync {
    /// Execute SQL and collect the result rows.
    async fn query(&self, sql: &str) -> WarehouseResult<Vec<Row>>;

    /// Introspect the column schema of a table.
    async fn table_schema(&self, table: &TableRef) -> WarehouseResult<Vec<FieldSchema>>;

    /// Fetch storage statistics for a table.
    async fn table_stats(&self, table: &TableRef) -> WarehouseResult<TableStats>;

    /// Create the dataset if it does not already exist.
    async fn ensure_dataset(&self, dataset: &str, location: &str) -> WarehouseResult<()>;

    /// Submit a bulk-load job and return its pollable handle.
    async fn start_load(&self, config: &LoadJobConfig)
        -> WarehouseResult<Box<dyn LoadJobHandle>>;
}
