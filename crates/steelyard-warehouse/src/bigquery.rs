//! BigQuery REST v2 implementation of the warehouse gateway.
//!
//! Covers the subset of the API the pipelines consume: synchronous queries
//! (`jobs.query` + `jobs.getQueryResults`), table introspection
//! (`tables.get`), dataset creation (`datasets.insert`), and bulk-load jobs
//! (`jobs.insert` + `jobs.get`).
//!
//! Authentication is a bearer token supplied by the caller (typically minted
//! by the platform metadata service or `gcloud auth print-access-token`).

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{WarehouseError, WarehouseResult};
use crate::gateway::{
    FieldSchema, LoadJobConfig, LoadJobHandle, LoadJobState, TableRef, TableStats,
    WarehouseGateway, WriteDisposition,
};
use crate::row::Row;

const DEFAULT_BASE_URL: &str = "https://bigquery.googleapis.com/bigquery/v2";

/// Env var holding the OAuth bearer token.
pub const ACCESS_TOKEN_ENV: &str = "WAREHOUSE_ACCESS_TOKEN";

/// Warehouse gateway backed by the BigQuery REST API.
#[derive(Debug, Clone)]
pub struct BigQueryGateway {
    http: reqwest::Client,
    base_url: String,
    project: String,
    token: String,
}

impl BigQueryGateway {
    /// Build a gateway for the given project with an explicit bearer token.
    pub fn new(project: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            project: project.into(),
            token: token.into(),
        }
    }

    /// Build a gateway reading the bearer token from [`ACCESS_TOKEN_ENV`].
    pub fn from_env(project: impl Into<String>) -> WarehouseResult<Self> {
        let token = std::env::var(ACCESS_TOKEN_ENV)
            .map_err(|_| WarehouseError::Auth(format!("{ACCESS_TOKEN_ENV} not set")))?;
        Ok(Self::new(project, token))
    }

    /// Override the API endpoint (emulators and tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn post(&self, path: &str, body: &Value) -> WarehouseResult<reqwest::Response> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;
        check_status(response).await
    }

    async fn get(&self, path: &str) -> WarehouseResult<reqwest::Response> {
        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.token)
            .send()
            .await?;
        check_status(response).await
    }
}

async fn check_status(response: reqwest::Response) -> WarehouseResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(WarehouseError::Api {
        status: status.as_u16(),
        message,
    })
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    schema: Option<WireSchema>,
    rows: Option<Vec<WireRow>>,
    job_complete: Option<bool>,
    job_reference: Option<JobReference>,
}

#[derive(Debug, Deserialize)]
struct WireSchema {
    fields: Vec<WireField>,
}

#[derive(Debug, Deserialize)]
struct WireField {
    name: String,
    #[serde(rename = "type")]
    field_type: String,
    mode: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireRow {
    f: Vec<WireCell>,
}

#[derive(Debug, Deserialize)]
struct WireCell {
    v: Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobReference {
    job_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobResponse {
    job_reference: JobReference,
    status: JobStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobStatus {
    state: String,
    #[serde(default)]
    errors: Vec<JobError>,
}

#[derive(Debug, Deserialize)]
struct JobError {
    #[serde(default)]
    reason: String,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TableResponse {
    schema: Option<WireSchema>,
    num_rows: Option<String>,
    num_bytes: Option<String>,
}

/// Convert the positional `rows[].f[].v` wire encoding into named rows.
///
/// The API delivers every scalar as a JSON string (or null); values are kept
/// as-is and coerced lazily by the `Row` accessors.
fn parse_rows(schema: &WireSchema, rows: &[WireRow]) -> Vec<Row> {
    rows.iter()
        .map(|wire_row| {
            let mut row = Row::new();
            for (field, cell) in schema.fields.iter().zip(wire_row.f.iter()) {
                row = row.with(field.name.clone(), cell.v.clone());
            }
            row
        })
        .collect()
}

fn parse_state(state: &str) -> LoadJobState {
    match state {
        "DONE" => LoadJobState::Done,
        "RUNNING" => LoadJobState::Running,
        _ => LoadJobState::Pending,
    }
}

// ---------------------------------------------------------------------------
// Gateway implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl WarehouseGateway for BigQueryGateway {
    async fn query(&self, sql: &str) -> WarehouseResult<Vec<Row>> {
        debug!(project = %self.project, "submitting query");
        let body = json!({
            "query": sql,
            "useLegacySql": false,
        });
        let mut response: QueryResponse = self
            .post(&format!("/projects/{}/queries", self.project), &body)
            .await?
            .json()
            .await?;

        // Long queries fall back to polling getQueryResults on the job id.
        while response.job_complete == Some(false) {
            let job_id = response
                .job_reference
                .clone()
                .ok_or_else(|| WarehouseError::Job("incomplete query without job id".to_string()))?
                .job_id;
            response = self
                .get(&format!(
                    "/projects/{}/queries/{}?timeoutMs=10000",
                    self.project, job_id
                ))
                .await?
                .json()
                .await?;
        }

        let schema = response
            .schema
            .ok_or_else(|| WarehouseError::NoRows("response carried no schema".to_string()))?;
        Ok(parse_rows(&schema, response.rows.as_deref().unwrap_or(&[])))
    }

    async fn table_schema(&self, table: &TableRef) -> WarehouseResult<Vec<FieldSchema>> {
        let response: TableResponse = self
            .get(&format!(
                "/projects/{}/datasets/{}/tables/{}",
                table.project, table.dataset, table.table
            ))
            .await?
            .json()
            .await?;

        let schema = response
            .schema
            .ok_or_else(|| WarehouseError::NoRows(format!("table {table} has no schema")))?;
        Ok(schema
            .fields
            .into_iter()
            .map(|f| FieldSchema {
                nullable: f.mode.as_deref() != Some("REQUIRED"),
                name: f.name,
                field_type: f.field_type,
            })
            .collect())
    }

    async fn table_stats(&self, table: &TableRef) -> WarehouseResult<TableStats> {
        let response: TableResponse = self
            .get(&format!(
                "/projects/{}/datasets/{}/tables/{}",
                table.project, table.dataset, table.table
            ))
            .await?
            .json()
            .await?;

        let parse = |field: Option<String>| {
            field
                .unwrap_or_else(|| "0".to_string())
                .parse::<u64>()
                .unwrap_or(0)
        };
        Ok(TableStats {
            num_rows: parse(response.num_rows),
            num_bytes: parse(response.num_bytes),
        })
    }

    async fn ensure_dataset(&self, dataset: &str, location: &str) -> WarehouseResult<()> {
        let body = json!({
            "datasetReference": {
                "projectId": self.project,
                "datasetId": dataset,
            },
            "location": location,
        });
        match self
            .post(&format!("/projects/{}/datasets", self.project), &body)
            .await
        {
            Ok(_) => Ok(()),
            // 409 means the dataset already exists, which is fine.
            Err(WarehouseError::Api { status: 409, .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn start_load(
        &self,
        config: &LoadJobConfig,
    ) -> WarehouseResult<Box<dyn LoadJobHandle>> {
        let write_disposition = match config.write_disposition {
            WriteDisposition::Truncate => "WRITE_TRUNCATE",
            WriteDisposition::Append => "WRITE_APPEND",
        };
        let body = json!({
            "configuration": {
                "load": {
                    "sourceUris": [config.source_uri],
                    "destinationTable": {
                        "projectId": config.destination.project,
                        "datasetId": config.destination.dataset,
                        "tableId": config.destination.table,
                    },
                    "sourceFormat": "CSV",
                    "skipLeadingRows": config.skip_leading_rows,
                    "autodetect": config.autodetect,
                    "writeDisposition": write_disposition,
                    "maxBadRecords": config.max_bad_records,
                }
            }
        });
        let response: JobResponse = self
            .post(&format!("/projects/{}/jobs", self.project), &body)
            .await?
            .json()
            .await?;

        Ok(Box::new(BigQueryLoadJob {
            gateway: self.clone(),
            job_id: response.job_reference.job_id,
            state: parse_state(&response.status.state),
            errors: collect_errors(&response.status),
        }))
    }
}

fn collect_errors(status: &JobStatus) -> Vec<String> {
    status
        .errors
        .iter()
        .map(|e| {
            if e.reason.is_empty() {
                e.message.clone()
            } else {
                format!("{}: {}", e.reason, e.message)
            }
        })
        .collect()
}

/// Pollable handle over `jobs.get`.
struct BigQueryLoadJob {
    gateway: BigQueryGateway,
    job_id: String,
    state: LoadJobState,
    errors: Vec<String>,
}

#[async_trait]
impl LoadJobHandle for BigQueryLoadJob {
    async fn refresh(&mut self) -> WarehouseResult<()> {
        let response: JobResponse = self
            .gateway
            .get(&format!(
                "/projects/{}/jobs/{}",
                self.gateway.project, self.job_id
            ))
            .await?
            .json()
            .await?;
        self.state = parse_state(&response.status.state);
        self.errors = collect_errors(&response.status);
        Ok(())
    }

    fn done(&self) -> bool {
        self.state == LoadJobState::Done
    }

    fn state(&self) -> LoadJobState {
        self.state
    }

    fn errors(&self) -> &[String] {
        &self.errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rows_zips_schema_and_cells() {
        let response: QueryResponse = serde_json::from_value(json!({
            "schema": {
                "fields": [
                    {"name": "total_records", "type": "INTEGER"},
                    {"name": "latest_partition", "type": "TIMESTAMP", "mode": "NULLABLE"},
                ]
            },
            "rows": [
                {"f": [{"v": "1204567"}, {"v": "2025-03-01 00:00:00 UTC"}]},
                {"f": [{"v": "98"}, {"v": null}]},
            ],
            "jobComplete": true,
        }))
        .unwrap();

        let rows = parse_rows(&response.schema.unwrap(), &response.rows.unwrap());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].i64("total_records").unwrap(), 1204567);
        assert_eq!(
            rows[0].str("latest_partition").unwrap(),
            "2025-03-01 00:00:00 UTC"
        );
        assert!(rows[1].is_null("latest_partition"));
    }

    #[test]
    fn test_parse_state() {
        assert_eq!(parse_state("PENDING"), LoadJobState::Pending);
        assert_eq!(parse_state("RUNNING"), LoadJobState::Running);
        assert_eq!(parse_state("DONE"), LoadJobState::Done);
        // Unknown states are treated as still pending.
        assert_eq!(parse_state("UNKNOWN"), LoadJobState::Pending);
    }

    #[test]
    fn test_collect_errors_formats_reason() {
        let status: JobStatus = serde_json::from_value(json!({
            "state": "DONE",
            "errors": [
                {"reason": "invalid", "message": "bad row at line 12"},
                {"message": "truncated file"},
            ]
        }))
        .unwrap();
        let errors = collect_errors(&status);
        assert_eq!(errors[0], "invalid: bad row at line 12");
        assert_eq!(errors[1], "truncated file");
    }

    #[test]
    fn test_table_response_parses_counts() {
        let response: TableResponse = serde_json::from_value(json!({
            "numRows": "1204567",
            "numBytes": "121712345600",
            "schema": {"fields": [{"name": "order_id", "type": "STRING"}]}
        }))
        .unwrap();
        assert_eq!(response.num_rows.as_deref(), Some("1204567"));
        assert!(response.schema.is_some());
    }
}
