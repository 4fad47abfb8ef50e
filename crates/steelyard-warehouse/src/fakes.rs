//! In-memory fakes for the gateway traits (testing only)
//!
//! Provides `MemoryWarehouse` and `FakeLoadJob` that satisfy the trait
//! contracts without any network access. Query results are scripted by SQL
//! substring so tests do not have to reproduce full statements.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{WarehouseError, WarehouseResult};
use crate::gateway::{
    FieldSchema, LoadJobConfig, LoadJobHandle, LoadJobState, TableRef, TableStats,
    WarehouseGateway,
};
use crate::row::Row;

/// Scripted response for one query pattern.
enum Scripted {
    Rows(Vec<Row>),
    Failure(String),
}

/// In-memory warehouse with substring-matched scripted queries.
#[derive(Default)]
pub struct MemoryWarehouse {
    queries: Mutex<Vec<(String, Scripted)>>,
    schemas: Mutex<HashMap<String, Vec<FieldSchema>>>,
    stats: Mutex<HashMap<String, TableStats>>,
    datasets: Mutex<Vec<String>>,
    load_job: Mutex<Option<FakeLoadJob>>,
    load_configs: Mutex<Vec<LoadJobConfig>>,
}

impl MemoryWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script rows for any query containing `pattern`. Patterns are matched
    /// in registration order; first match wins.
    pub fn script_rows(&self, pattern: impl Into<String>, rows: Vec<Row>) {
        self.queries
            .lock()
            .unwrap()
            .push((pattern.into(), Scripted::Rows(rows)));
    }

    /// Script a failure for any query containing `pattern`.
    pub fn script_failure(&self, pattern: impl Into<String>, message: impl Into<String>) {
        self.queries
            .lock()
            .unwrap()
            .push((pattern.into(), Scripted::Failure(message.into())));
    }

    pub fn script_schema(&self, table: &TableRef, fields: Vec<FieldSchema>) {
        self.schemas
            .lock()
            .unwrap()
            .insert(table.to_string(), fields);
    }

    pub fn script_stats(&self, table: &TableRef, stats: TableStats) {
        self.stats.lock().unwrap().insert(table.to_string(), stats);
    }

    /// Install the job that the next `start_load` call hands out.
    pub fn script_load_job(&self, job: FakeLoadJob) {
        *self.load_job.lock().unwrap() = Some(job);
    }

    /// Datasets that `ensure_dataset` was asked for, in call order.
    pub fn created_datasets(&self) -> Vec<String> {
        self.datasets.lock().unwrap().clone()
    }

    /// Load configurations submitted via `start_load`, in call order.
    pub fn submitted_loads(&self) -> Vec<LoadJobConfig> {
        self.load_configs.lock().unwrap().clone()
    }
}

#[async_trait]
impl WarehouseGateway for MemoryWarehouse {
    async fn query(&self, sql: &str) -> WarehouseResult<Vec<Row>> {
        let queries = self.queries.lock().unwrap();
        for (pattern, scripted) in queries.iter() {
            if sql.contains(pattern.as_str()) {
                return match scripted {
                    Scripted::Rows(rows) => Ok(rows.clone()),
                    Scripted::Failure(message) => Err(WarehouseError::Job(message.clone())),
                };
            }
        }
        Err(WarehouseError::Unscripted(sql.to_string()))
    }

    async fn table_schema(&self, table: &TableRef) -> WarehouseResult<Vec<FieldSchema>> {
        self.schemas
            .lock()
            .unwrap()
            .get(&table.to_string())
            .cloned()
            .ok_or_else(|| WarehouseError::Unscripted(format!("schema for {table}")))
    }

    async fn table_stats(&self, table: &TableRef) -> WarehouseResult<TableStats> {
        self.stats
            .lock()
            .unwrap()
            .get(&table.to_string())
            .copied()
            .ok_or_else(|| WarehouseError::Unscripted(format!("stats for {table}")))
    }

    async fn ensure_dataset(&self, dataset: &str, _location: &str) -> WarehouseResult<()> {
        self.datasets.lock().unwrap().push(dataset.to_string());
        Ok(())
    }

    async fn start_load(
        &self,
        config: &LoadJobConfig,
    ) -> WarehouseResult<Box<dyn LoadJobHandle>> {
        self.load_configs.lock().unwrap().push(config.clone());
        let job = self
            .load_job
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| WarehouseError::Job("no scripted load job".to_string()))?;
        Ok(Box::new(job))
    }
}

/// Fake load job stepping through a predefined state sequence.
///
/// Each `refresh` advances one step; the final state is held thereafter.
#[derive(Debug, Clone)]
pub struct FakeLoadJob {
    states: Vec<LoadJobState>,
    errors: Vec<String>,
    position: usize,
    refresh_count: Arc<Mutex<usize>>,
}

impl FakeLoadJob {
    /// Job that runs through `states` and finishes with the given errors.
    pub fn with_states(states: Vec<LoadJobState>, errors: Vec<String>) -> Self {
        assert!(!states.is_empty(), "state script must not be empty");
        Self {
            states,
            errors,
            position: 0,
            refresh_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Job that completes cleanly after `polls` running observations.
    pub fn succeeding_after(polls: usize) -> Self {
        let mut states = vec![LoadJobState::Running; polls];
        states.push(LoadJobState::Done);
        Self::with_states(states, vec![])
    }

    /// Job that terminates with the given error list.
    pub fn failing_with(errors: Vec<String>) -> Self {
        Self::with_states(vec![LoadJobState::Running, LoadJobState::Done], errors)
    }

    /// Shared counter observing how often the pipeline polled.
    pub fn refresh_counter(&self) -> Arc<Mutex<usize>> {
        Arc::clone(&self.refresh_count)
    }
}

#[async_trait]
impl LoadJobHandle for FakeLoadJob {
    async fn refresh(&mut self) -> WarehouseResult<()> {
        *self.refresh_count.lock().unwrap() += 1;
        if self.position + 1 < self.states.len() {
            self.position += 1;
        }
        Ok(())
    }

    fn done(&self) -> bool {
        self.states[self.position] == LoadJobState::Done
    }

    fn state(&self) -> LoadJobState {
        self.states[self.position]
    }

    fn errors(&self) -> &[String] {
        if self.done() {
            &self.errors
        } else {
            &[]
        }
    }
}
