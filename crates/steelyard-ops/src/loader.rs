//! Bulk-load pipeline.
//!
//! Strictly sequential: ensure dataset, submit the load job, poll until the
//! job reaches a terminal state, then validate the loaded table. There is no
//! retry or rollback; any step failure is terminal and propagates to the
//! caller. Load jobs run for hours, so the poll is a fixed-interval sleep
//! raced against a cancellation signal.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{error, info};

use steelyard_core::AppConfig;
use steelyard_warehouse::{
    LoadJobConfig, LoadJobHandle, TableRef, WarehouseError, WarehouseGateway,
};

/// Hand-tuned poll cadence; job runtimes are hours, so poll overhead is noise.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Terminal load pipeline failures.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The job finished but reported loader errors; validation is skipped.
    #[error("load job failed with {} error(s): {}", errors.len(), errors.join("; "))]
    JobFailed { errors: Vec<String> },

    /// The operator cancelled the wait.
    #[error("load cancelled before completion")]
    Cancelled,

    /// Gateway failure in any step.
    #[error(transparent)]
    Warehouse(#[from] WarehouseError),
}

/// Statistics gathered by post-load validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadOutcome {
    pub success: bool,
    pub rows_loaded: u64,
    pub bytes: u64,
    pub files_processed: i64,
}

/// Sequential load pipeline against one destination table.
pub struct LoadPipeline {
    gateway: Arc<dyn WarehouseGateway>,
    config: AppConfig,
    table: TableRef,
    poll_interval: Duration,
}

impl LoadPipeline {
    pub fn new(gateway: Arc<dyn WarehouseGateway>, config: AppConfig) -> Self {
        let table = TableRef::new(&config.project_id, &config.dataset, &config.table);
        Self {
            gateway,
            config,
            table,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Override the poll cadence (tests shrink it to milliseconds).
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Run the pipeline to completion.
    ///
    /// `cancel` aborts the poll wait when it observes `true`; the load job
    /// itself keeps running in the warehouse (this tool only stops watching).
    pub async fn run(&self, cancel: watch::Receiver<bool>) -> Result<LoadOutcome, LoadError> {
        info!(dataset = %self.config.dataset, "ensuring destination dataset");
        self.gateway
            .ensure_dataset(&self.config.dataset, &self.config.location)
            .await?;

        let job_config = LoadJobConfig::csv(&self.config.source_uri, self.table.clone());
        info!(
            source_uri = %job_config.source_uri,
            destination = %job_config.destination,
            "submitting load job"
        );
        let mut job = self.gateway.start_load(&job_config).await?;

        self.wait_for_job(&mut job, cancel).await?;

        let errors = job.errors();
        if !errors.is_empty() {
            error!(error_count = errors.len(), "load job reported errors");
            return Err(LoadError::JobFailed {
                errors: errors.to_vec(),
            });
        }

        self.validate().await
    }

    /// Poll the job until terminal, sleeping `poll_interval` between polls.
    /// The sleep races the cancellation signal so an operator can abort the
    /// wait without killing the process.
    async fn wait_for_job(
        &self,
        job: &mut Box<dyn LoadJobHandle>,
        mut cancel: watch::Receiver<bool>,
    ) -> Result<(), LoadError> {
        loop {
            if *cancel.borrow() {
                return Err(LoadError::Cancelled);
            }

            job.refresh().await?;
            if job.done() {
                return Ok(());
            }
            info!(state = %job.state(), "load job in progress");

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                changed = cancel.changed() => match changed {
                    Ok(()) if *cancel.borrow() => return Err(LoadError::Cancelled),
                    Ok(()) => {}
                    // Sender gone: nobody can cancel any more, plain sleep.
                    Err(_) => tokio::time::sleep(self.poll_interval).await,
                },
            }
        }
    }

    /// Post-load validation: aggregate counts, schema log, storage stats.
    async fn validate(&self) -> Result<LoadOutcome, LoadError> {
        let sql = format!(
            "SELECT \
                COUNT(*) as total_rows, \
                COUNT(DISTINCT _FILE_NAME) as files_processed, \
                MIN(_FILE_LOAD_TIME) as earliest_load, \
                MAX(_FILE_LOAD_TIME) as latest_load \
             FROM `{}`",
            self.table
        );
        let rows = self.gateway.query(&sql).await?;
        let row = rows
            .first()
            .ok_or_else(|| WarehouseError::NoRows("load validation".to_string()))?;

        let files_processed = row.i64("files_processed")?;
        info!(
            files_processed = files_processed,
            earliest_load = row.str("earliest_load").unwrap_or("unknown"),
            latest_load = row.str("latest_load").unwrap_or("unknown"),
            "load validation aggregates"
        );

        let schema = self.gateway.table_schema(&self.table).await?;
        for field in &schema {
            info!(column = %field.name, field_type = %field.field_type, "loaded column");
        }

        let stats = self.gateway.table_stats(&self.table).await?;
        info!(
            rows_loaded = stats.num_rows,
            table_gib = stats.gib(),
            "load completed"
        );

        Ok(LoadOutcome {
            success: true,
            rows_loaded: stats.num_rows,
            bytes: stats.num_bytes,
            files_processed,
        })
    }
}
