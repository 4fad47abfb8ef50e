//! Application configuration, built once at startup.
//!
//! The original tooling read project/dataset identifiers from the environment
//! at module load time; here everything is collected into an explicit
//! [`AppConfig`] constructed in `main` and passed by reference into every
//! component constructor, so tests can build fixtures without touching the
//! process environment.

use std::path::PathBuf;

use crate::error::{Result, SteelyardError};

/// Placeholder used when `PROJECT_ID` is not set.
pub const DEFAULT_PROJECT_ID: &str = "your-project-id";

/// Target warehouse and artifact-path configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Warehouse project identifier.
    pub project_id: String,

    /// Dataset holding the analytical tables.
    pub dataset: String,

    /// Raw shipments table name.
    pub table: String,

    /// Object-store URI of the compressed CSV to bulk-load.
    pub source_uri: String,

    /// Dataset location (region) used when creating the dataset.
    pub location: String,

    /// Directory receiving quality report artifacts.
    pub reports_dir: PathBuf,

    /// Directory receiving EDA artifacts (JSON summary and charts).
    pub notebooks_dir: PathBuf,

    /// Columns whose non-null fraction gates the completeness check.
    pub required_columns: Vec<String>,

    /// Downstream model tables that must all contain rows.
    pub downstream_tables: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            project_id: DEFAULT_PROJECT_ID.to_string(),
            dataset: "steel_analysis".to_string(),
            table: "shipments_raw".to_string(),
            source_uri: "gs://steelyard-ingest/shipments_raw.csv.gz".to_string(),
            location: "US".to_string(),
            reports_dir: PathBuf::from("reports"),
            notebooks_dir: PathBuf::from("notebooks"),
            required_columns: vec!["_PARTITIONTIME".to_string(), "_FILE_NAME".to_string()],
            downstream_tables: vec![
                "stg_shipments".to_string(),
                "int_daily_metrics".to_string(),
                "mart_business_insights".to_string(),
            ],
        }
    }
}

impl AppConfig {
    /// Build a configuration from the process environment.
    ///
    /// Recognised variables: `PROJECT_ID`, `WAREHOUSE_DATASET`,
    /// `WAREHOUSE_TABLE`, `SOURCE_URI`, `WAREHOUSE_LOCATION`. Anything absent
    /// falls back to the defaults above; this never fails.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            project_id: std::env::var("PROJECT_ID").unwrap_or(defaults.project_id),
            dataset: std::env::var("WAREHOUSE_DATASET").unwrap_or(defaults.dataset),
            table: std::env::var("WAREHOUSE_TABLE").unwrap_or(defaults.table),
            source_uri: std::env::var("SOURCE_URI").unwrap_or(defaults.source_uri),
            location: std::env::var("WAREHOUSE_LOCATION").unwrap_or(defaults.location),
            ..defaults
        }
    }

    /// Reject configurations that cannot address a real warehouse.
    ///
    /// The placeholder project id exists so the defaults are always
    /// constructible; running against it would only produce 404s.
    pub fn validate(&self) -> Result<()> {
        if self.project_id.is_empty() || self.project_id == DEFAULT_PROJECT_ID {
            return Err(SteelyardError::InvalidConfig(
                "PROJECT_ID is not set; export it before running".to_string(),
            ));
        }
        Ok(())
    }

    /// Fully-qualified `project.dataset.table` identifier of the raw table.
    pub fn table_id(&self) -> String {
        format!("{}.{}.{}", self.project_id, self.dataset, self.table)
    }

    /// `project.dataset` prefix used when addressing sibling tables.
    pub fn dataset_id(&self) -> String {
        format!("{}.{}", self.project_id, self.dataset)
    }
}
