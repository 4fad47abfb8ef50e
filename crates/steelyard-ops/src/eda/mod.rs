//! Exploratory analysis over the loaded table.
//!
//! Runs a fixed sequence of descriptive aggregations and renders two charts
//! plus one JSON summary. Every step is best-effort: a failing step is
//! logged at warn level and later steps still run. Unlike the quality
//! report there is no structured verdict here; logs are the only signal.

pub mod plots;

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use steelyard_core::AppConfig;
use steelyard_warehouse::{TableRef, WarehouseGateway};

/// Per-column quality scan stops after this many schema columns.
pub const COLUMN_SCAN_LIMIT: usize = 10;

/// Filename of the JSON summary artifact.
pub const SUMMARY_FILENAME: &str = "eda_summary_report.json";

/// Headline counts over the whole table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataOverview {
    pub total_records: i64,
    pub unique_dates: i64,
    pub earliest_date: NaiveDate,
    pub latest_date: NaiveDate,
    pub source_files: i64,
    pub duration_days: i64,
    pub duration_years: f64,
}

/// Column listing included in the summary artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaSummary {
    pub total_columns: usize,
    pub columns: Vec<String>,
}

/// Null/empty/cardinality metrics for one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnQuality {
    pub total_rows: i64,
    pub null_count: i64,
    pub null_percentage: f64,
    pub empty_count: i64,
    pub empty_percentage: f64,
    pub unique_values: i64,
}

/// One day of ingestion volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyVolume {
    pub date: NaiveDate,
    pub records: i64,
    pub files: i64,
}

/// Consolidated summary written to `notebooks/eda_summary_report.json`.
/// The `data_quality` object lists scanned columns in schema order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdaSummary {
    pub timestamp: DateTime<Utc>,
    pub target_identifier: String,
    pub data_overview: Option<DataOverview>,
    pub schema: Option<SchemaSummary>,
    #[serde(with = "columns_map")]
    pub data_quality: Vec<(String, ColumnQuality)>,
}

/// Serialize the scanned-column list as a JSON object keyed by column name,
/// keeping schema order; a plain map type would re-sort the keys.
mod columns_map {
    use super::ColumnQuality;
    use serde::de::{MapAccess, Visitor};
    use serde::ser::SerializeMap;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        columns: &[(String, ColumnQuality)],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(columns.len()))?;
        for (name, quality) in columns {
            map.serialize_entry(name, quality)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<(String, ColumnQuality)>, D::Error> {
        struct ColumnsVisitor;

        impl<'de> Visitor<'de> for ColumnsVisitor {
            type Value = Vec<(String, ColumnQuality)>;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a map of column name to quality metrics")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut columns = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some(entry) = access.next_entry::<String, ColumnQuality>()? {
                    columns.push(entry);
                }
                Ok(columns)
            }
        }

        deserializer.deserialize_map(ColumnsVisitor)
    }
}

/// Runs the descriptive-analysis sequence against one table.
pub struct EdaReporter {
    gateway: Arc<dyn WarehouseGateway>,
    config: AppConfig,
    table: TableRef,
}

impl EdaReporter {
    pub fn new(gateway: Arc<dyn WarehouseGateway>, config: AppConfig) -> Self {
        let table = TableRef::new(&config.project_id, &config.dataset, &config.table);
        Self {
            gateway,
            config,
            table,
        }
    }

    /// Headline counts: totals, date span, source file count.
    pub async fn data_overview(&self) -> anyhow::Result<DataOverview> {
        let sql = format!(
            "SELECT \
                COUNT(*) as total_records, \
                COUNT(DISTINCT DATE(_PARTITIONTIME)) as unique_dates, \
                MIN(DATE(_PARTITIONTIME)) as earliest_date, \
                MAX(DATE(_PARTITIONTIME)) as latest_date, \
                COUNT(DISTINCT _FILE_NAME) as source_files \
             FROM `{}`",
            self.table
        );
        let rows = self.gateway.query(&sql).await?;
        let row = rows.first().context("overview query returned no rows")?;

        let earliest_date = row.date("earliest_date")?;
        let latest_date = row.date("latest_date")?;
        let duration_days = (latest_date - earliest_date).num_days();
        let overview = DataOverview {
            total_records: row.i64("total_records")?,
            unique_dates: row.i64("unique_dates")?,
            earliest_date,
            latest_date,
            source_files: row.i64("source_files")?,
            duration_days,
            duration_years: duration_days as f64 / 365.0,
        };

        info!(
            total_records = overview.total_records,
            unique_dates = overview.unique_dates,
            earliest = %overview.earliest_date,
            latest = %overview.latest_date,
            source_files = overview.source_files,
            duration_years = overview.duration_years,
            "data overview"
        );
        Ok(overview)
    }

    /// Column name/type listing from table introspection.
    pub async fn schema(&self) -> anyhow::Result<SchemaSummary> {
        let fields = self.gateway.table_schema(&self.table).await?;
        for field in &fields {
            info!(
                column = %field.name,
                field_type = %field.field_type,
                nullable = field.nullable,
                "schema column"
            );
        }
        Ok(SchemaSummary {
            total_columns: fields.len(),
            columns: fields.into_iter().map(|f| f.name).collect(),
        })
    }

    /// Per-day volumes in ascending date order, plus both rendered charts.
    pub async fn temporal_patterns(&self) -> anyhow::Result<Vec<DailyVolume>> {
        let sql = format!(
            "SELECT \
                DATE(_PARTITIONTIME) as date, \
                COUNT(*) as daily_records, \
                COUNT(DISTINCT _FILE_NAME) as daily_files \
             FROM `{}` \
             WHERE _PARTITIONTIME IS NOT NULL \
             GROUP BY DATE(_PARTITIONTIME) \
             ORDER BY date",
            self.table
        );
        let rows = self.gateway.query(&sql).await?;
        let mut daily = Vec::with_capacity(rows.len());
        for row in &rows {
            daily.push(DailyVolume {
                date: row.date("date")?,
                records: row.i64("daily_records")?,
                files: row.i64("daily_files")?,
            });
        }

        fs::create_dir_all(&self.config.notebooks_dir).with_context(|| {
            format!(
                "creating notebooks directory {}",
                self.config.notebooks_dir.display()
            )
        })?;

        let temporal_path = self.config.notebooks_dir.join("temporal_patterns.png");
        plots::render_temporal(&temporal_path, &daily)?;
        info!(path = %temporal_path.display(), "temporal chart written");

        let monthly = monthly_means(&daily);
        let monthly_path = self.config.notebooks_dir.join("monthly_patterns.png");
        plots::render_monthly(&monthly_path, &monthly)?;
        info!(path = %monthly_path.display(), "monthly chart written");

        Ok(daily)
    }

    /// Null/empty/cardinality scan over the first [`COLUMN_SCAN_LIMIT`]
    /// schema columns, in schema order. A column whose scan query fails
    /// (e.g. the empty-string comparison on a non-string column) is skipped
    /// with a warning.
    pub async fn column_quality(&self, columns: &[String]) -> Vec<(String, ColumnQuality)> {
        let mut metrics = Vec::new();
        for column in columns.iter().take(COLUMN_SCAN_LIMIT) {
            let sql = format!(
                "SELECT \
                    COUNT(*) as total_rows, \
                    COUNTIF({column} IS NULL) as null_count, \
                    COUNTIF({column} = '') as empty_count, \
                    COUNT(DISTINCT {column}) as unique_values \
                 FROM `{}`",
                self.table
            );
            match self.scan_column(&sql).await {
                Ok(quality) => {
                    info!(
                        column = %column,
                        null_pct = quality.null_percentage,
                        empty_pct = quality.empty_percentage,
                        unique_values = quality.unique_values,
                        "column quality"
                    );
                    metrics.push((column.clone(), quality));
                }
                Err(e) => {
                    warn!(column = %column, error = %e, "column scan skipped");
                }
            }
        }
        metrics
    }

    async fn scan_column(&self, sql: &str) -> anyhow::Result<ColumnQuality> {
        let rows = self.gateway.query(sql).await?;
        let row = rows.first().context("column scan returned no rows")?;
        let total_rows = row.i64("total_rows")?;
        let null_count = row.i64("null_count")?;
        let empty_count = row.i64("empty_count")?;
        let pct = |count: i64| {
            if total_rows > 0 {
                count as f64 / total_rows as f64 * 100.0
            } else {
                0.0
            }
        };
        Ok(ColumnQuality {
            total_rows,
            null_count,
            null_percentage: pct(null_count),
            empty_count,
            empty_percentage: pct(empty_count),
            unique_values: row.i64("unique_values")?,
        })
    }

    /// Write the consolidated JSON summary, creating the directory if absent.
    pub fn write_summary(&self, summary: &EdaSummary) -> anyhow::Result<PathBuf> {
        fs::create_dir_all(&self.config.notebooks_dir).with_context(|| {
            format!(
                "creating notebooks directory {}",
                self.config.notebooks_dir.display()
            )
        })?;
        let path = self.config.notebooks_dir.join(SUMMARY_FILENAME);
        let json = serde_json::to_string_pretty(summary)?;
        fs::write(&path, json)
            .with_context(|| format!("writing EDA summary to {}", path.display()))?;
        info!(path = %path.display(), "EDA summary written");
        Ok(path)
    }

    /// Full sequence: overview, schema, temporal charts, column scan, summary.
    ///
    /// Steps do not depend on each other's success; each failure is logged
    /// and the corresponding summary section is left empty.
    pub async fn run_all(&self) -> anyhow::Result<EdaSummary> {
        let data_overview = match self.data_overview().await {
            Ok(overview) => Some(overview),
            Err(e) => {
                warn!(error = %e, "data overview failed");
                None
            }
        };

        let schema = match self.schema().await {
            Ok(schema) => Some(schema),
            Err(e) => {
                warn!(error = %e, "schema analysis failed");
                None
            }
        };

        if let Err(e) = self.temporal_patterns().await {
            warn!(error = %e, "temporal pattern analysis failed");
        }

        let columns = schema
            .as_ref()
            .map(|s| s.columns.clone())
            .unwrap_or_default();
        let data_quality = self.column_quality(&columns).await;

        let summary = EdaSummary {
            timestamp: Utc::now(),
            target_identifier: self.table.to_string(),
            data_overview,
            schema,
            data_quality,
        };
        self.write_summary(&summary)?;
        Ok(summary)
    }
}

/// Mean daily record count per calendar month (1-12), months with data only.
pub fn monthly_means(daily: &[DailyVolume]) -> Vec<(u32, f64)> {
    let mut sums: BTreeMap<u32, (i64, usize)> = BTreeMap::new();
    for day in daily {
        let entry = sums.entry(day.date.month()).or_insert((0, 0));
        entry.0 += day.records;
        entry.1 += 1;
    }
    sums.into_iter()
        .map(|(month, (sum, count))| (month, sum as f64 / count as f64))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32, records: i64) -> DailyVolume {
        DailyVolume {
            date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            records,
            files: 1,
        }
    }

    #[test]
    fn test_monthly_means_groups_by_calendar_month() {
        let daily = vec![
            day(2024, 1, 1, 100),
            day(2024, 1, 2, 200),
            day(2024, 2, 1, 50),
            day(2025, 1, 5, 300),
        ];
        let monthly = monthly_means(&daily);
        // January pools both years: (100 + 200 + 300) / 3.
        assert_eq!(monthly, vec![(1, 200.0), (2, 50.0)]);
    }

    #[test]
    fn test_monthly_means_empty() {
        assert!(monthly_means(&[]).is_empty());
    }

    #[test]
    fn test_summary_serialization_shape() {
        let summary = EdaSummary {
            timestamp: Utc::now(),
            target_identifier: "p.d.t".to_string(),
            data_overview: None,
            schema: Some(SchemaSummary {
                total_columns: 1,
                columns: vec!["order_id".to_string()],
            }),
            data_quality: vec![],
        };
        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["target_identifier"], "p.d.t");
        assert_eq!(value["schema"]["total_columns"], 1);
        assert!(value["data_overview"].is_null());
    }

    fn column_scan(total_rows: i64) -> ColumnQuality {
        ColumnQuality {
            total_rows,
            null_count: 0,
            null_percentage: 0.0,
            empty_count: 0,
            empty_percentage: 0.0,
            unique_values: total_rows,
        }
    }

    #[test]
    fn test_data_quality_keeps_schema_order() {
        let summary = EdaSummary {
            timestamp: Utc::now(),
            target_identifier: "p.d.t".to_string(),
            data_overview: None,
            schema: None,
            // Deliberately not alphabetical.
            data_quality: vec![
                ("weight_tons".to_string(), column_scan(10)),
                ("carrier".to_string(), column_scan(10)),
                ("order_id".to_string(), column_scan(10)),
            ],
        };

        let json = serde_json::to_string(&summary).unwrap();
        let weight = json.find("weight_tons").unwrap();
        let carrier = json.find("carrier").unwrap();
        let order = json.find("order_id").unwrap();
        assert!(weight < carrier && carrier < order);

        let back: EdaSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(back, summary);
    }
}
