//! Quality check definitions and threshold logic.
//!
//! The SQL does the aggregation; the verdicts are derived in memory from a
//! handful of pure threshold functions so the decision logic is testable
//! without a warehouse.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use tracing::{info, warn};

use steelyard_core::AppConfig;
use steelyard_warehouse::{TableRef, WarehouseGateway};

/// Hours after which the freshness check fails.
pub const FRESHNESS_MAX_HOURS: f64 = 24.0;

/// Minimum non-null fraction per required column.
pub const COMPLETENESS_MIN_FRACTION: f64 = 0.95;

/// Maximum coefficient of variation (percent) for the daily series.
pub const CONSISTENCY_MAX_CV: f64 = 50.0;

/// Trailing window of daily counts inspected by the consistency check.
pub const CONSISTENCY_WINDOW_DAYS: usize = 30;

/// One registered quality check.
#[async_trait]
pub trait Check: Send + Sync {
    /// Stable name used as the report key.
    fn name(&self) -> &str;

    /// Evaluate the check. `Err` means the check could not run at all
    /// (infrastructure failure), not that the data is bad.
    async fn evaluate(&self) -> anyhow::Result<bool>;
}

/// Builtin quality checks, in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckKind {
    Freshness,
    Completeness,
    Consistency,
    DownstreamModels,
}

impl CheckKind {
    pub fn name(&self) -> &'static str {
        match self {
            CheckKind::Freshness => "data_freshness",
            CheckKind::Completeness => "data_completeness",
            CheckKind::Consistency => "data_consistency",
            CheckKind::DownstreamModels => "downstream_models",
        }
    }
}

/// Runs the builtin check SQL against the target table.
pub struct QualityChecker {
    gateway: Arc<dyn WarehouseGateway>,
    config: AppConfig,
    table: TableRef,
}

impl QualityChecker {
    pub fn new(gateway: Arc<dyn WarehouseGateway>, config: AppConfig) -> Self {
        let table = TableRef::new(&config.project_id, &config.dataset, &config.table);
        Self {
            gateway,
            config,
            table,
        }
    }

    /// The standard check list, in report order.
    pub fn builtin_checks(checker: &Arc<Self>) -> Vec<Box<dyn Check>> {
        [
            CheckKind::Freshness,
            CheckKind::Completeness,
            CheckKind::Consistency,
            CheckKind::DownstreamModels,
        ]
        .into_iter()
        .map(|kind| {
            Box::new(BuiltinCheck {
                kind,
                checker: Arc::clone(checker),
            }) as Box<dyn Check>
        })
        .collect()
    }

    /// Hours since the latest ingestion partition, must be under 24.
    pub async fn check_freshness(&self) -> anyhow::Result<bool> {
        let sql = format!(
            "SELECT \
                MAX(_PARTITIONTIME) as latest_partition, \
                TIMESTAMP_DIFF(CURRENT_TIMESTAMP(), MAX(_PARTITIONTIME), HOUR) as hours_since_update \
             FROM `{}` \
             WHERE _PARTITIONTIME IS NOT NULL",
            self.table
        );
        let rows = self.gateway.query(&sql).await?;
        let row = rows.first().context("freshness query returned no rows")?;
        let hours = row.f64("hours_since_update")?;

        info!(
            latest_partition = row.str("latest_partition").unwrap_or("unknown"),
            hours_since_update = hours,
            "freshness check"
        );
        Ok(is_fresh(hours))
    }

    /// Non-null fraction of every required column must exceed 95%. The
    /// `_FILE_LOAD_TIME` fraction is also queried and logged, but it is not
    /// a decision column and never affects the verdict.
    pub async fn check_completeness(&self) -> anyhow::Result<bool> {
        let countifs: Vec<String> = self
            .config
            .required_columns
            .iter()
            .enumerate()
            .map(|(i, column)| format!("COUNTIF({column} IS NOT NULL) as valid_{i}"))
            .collect();
        let sql = format!(
            "SELECT COUNT(*) as total_records, {}, \
             COUNTIF(_FILE_LOAD_TIME IS NOT NULL) as load_time_valid FROM `{}`",
            countifs.join(", "),
            self.table
        );
        let rows = self.gateway.query(&sql).await?;
        let row = rows.first().context("completeness query returned no rows")?;

        let total = row.i64("total_records")?;
        if total == 0 {
            warn!("completeness check found an empty table");
            return Ok(false);
        }

        let mut fractions = Vec::with_capacity(self.config.required_columns.len());
        for (i, column) in self.config.required_columns.iter().enumerate() {
            let valid = row.i64(&format!("valid_{i}"))?;
            let fraction = valid as f64 / total as f64;
            info!(column = %column, completeness_pct = fraction * 100.0, "column completeness");
            fractions.push(fraction);
        }

        // Informational only, like the consistency check's moving average.
        if let Ok(load_time_valid) = row.i64("load_time_valid") {
            info!(
                column = "_FILE_LOAD_TIME",
                completeness_pct = load_time_valid as f64 / total as f64 * 100.0,
                "column completeness (non-binding)"
            );
        }

        Ok(meets_completeness(&fractions))
    }

    /// Coefficient of variation of the trailing 30-day daily-count series
    /// must stay under 50%. The 7-day moving average is fetched for operator
    /// display only; the verdict uses the full-window variation.
    pub async fn check_consistency(&self) -> anyhow::Result<bool> {
        let sql = format!(
            "SELECT \
                DATE(_PARTITIONTIME) as date, \
                COUNT(*) as daily_records, \
                COUNT(DISTINCT _FILE_NAME) as daily_files, \
                AVG(COUNT(*)) OVER (ORDER BY DATE(_PARTITIONTIME) \
                    ROWS BETWEEN 6 PRECEDING AND CURRENT ROW) as moving_avg_7d \
             FROM `{}` \
             WHERE _PARTITIONTIME IS NOT NULL \
             GROUP BY DATE(_PARTITIONTIME) \
             ORDER BY date DESC \
             LIMIT {}",
            self.table, CONSISTENCY_WINDOW_DAYS
        );
        let rows = self.gateway.query(&sql).await?;
        if rows.is_empty() {
            warn!("no daily data to assess consistency");
            return Ok(false);
        }

        let mut daily = Vec::with_capacity(rows.len());
        for row in &rows {
            daily.push(row.f64("daily_records")?);
            if let Ok(smoothed) = row.f64("moving_avg_7d") {
                // Display metric only; never feeds the verdict.
                info!(
                    date = row.str("date").unwrap_or("unknown"),
                    moving_avg_7d = smoothed,
                    "smoothed daily volume"
                );
            }
        }

        let cv = coefficient_of_variation(&daily);
        info!(
            days = daily.len(),
            mean = mean(&daily),
            coefficient_of_variation = cv,
            "consistency check"
        );
        Ok(is_consistent(cv))
    }

    /// Every downstream model table must report a non-zero row count. A table
    /// whose count query fails is treated as empty rather than erroring the
    /// whole check.
    pub async fn check_downstream_models(&self) -> anyhow::Result<bool> {
        let mut all_have_rows = true;
        for model in &self.config.downstream_tables {
            let table = self.table.sibling(model.clone());
            let sql = format!("SELECT COUNT(*) as record_count FROM `{table}`");
            let count = match self.gateway.query(&sql).await {
                Ok(rows) => rows
                    .first()
                    .and_then(|row| row.i64("record_count").ok())
                    .unwrap_or(0),
                Err(e) => {
                    warn!(model = %model, error = %e, "downstream table query failed");
                    0
                }
            };
            info!(model = %model, record_count = count, "downstream model rows");
            if count == 0 {
                all_have_rows = false;
            }
        }
        Ok(all_have_rows)
    }
}

/// A builtin check bound to a shared [`QualityChecker`].
pub struct BuiltinCheck {
    kind: CheckKind,
    checker: Arc<QualityChecker>,
}

#[async_trait]
impl Check for BuiltinCheck {
    fn name(&self) -> &str {
        self.kind.name()
    }

    async fn evaluate(&self) -> anyhow::Result<bool> {
        match self.kind {
            CheckKind::Freshness => self.checker.check_freshness().await,
            CheckKind::Completeness => self.checker.check_completeness().await,
            CheckKind::Consistency => self.checker.check_consistency().await,
            CheckKind::DownstreamModels => self.checker.check_downstream_models().await,
        }
    }
}

// ---------------------------------------------------------------------------
// Threshold logic
// ---------------------------------------------------------------------------

/// Data is fresh when the last update is strictly under 24 hours old.
pub fn is_fresh(hours_since_update: f64) -> bool {
    hours_since_update < FRESHNESS_MAX_HOURS
}

/// Every column's non-null fraction must strictly exceed 0.95.
pub fn meets_completeness(fractions: &[f64]) -> bool {
    !fractions.is_empty() && fractions.iter().all(|f| *f > COMPLETENESS_MIN_FRACTION)
}

fn mean(series: &[f64]) -> f64 {
    if series.is_empty() {
        return 0.0;
    }
    series.iter().sum::<f64>() / series.len() as f64
}

/// Sample standard deviation over mean, as a percentage.
///
/// `None` when the series has fewer than two points or a zero mean; the
/// consistency verdict treats that as failed, not errored.
pub fn coefficient_of_variation(series: &[f64]) -> Option<f64> {
    if series.len() < 2 {
        return None;
    }
    let mean = mean(series);
    if mean == 0.0 {
        return None;
    }
    let variance = series.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
        / (series.len() - 1) as f64;
    Some(variance.sqrt() / mean * 100.0)
}

/// The daily series is consistent when its variation is strictly under 50%.
pub fn is_consistent(cv: Option<f64>) -> bool {
    matches!(cv, Some(v) if v < CONSISTENCY_MAX_CV)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_freshness_threshold() {
        assert!(is_fresh(23.9));
        assert!(!is_fresh(24.1));
        assert!(!is_fresh(24.0));
        assert!(is_fresh(0.0));
    }

    #[test]
    fn test_completeness_threshold() {
        // total=100: 96 non-null passes, 94 fails.
        assert!(meets_completeness(&[0.96]));
        assert!(!meets_completeness(&[0.94]));
        assert!(!meets_completeness(&[0.96, 0.94]));
        // Exactly at the threshold is not enough.
        assert!(!meets_completeness(&[0.95]));
        assert!(!meets_completeness(&[]));
    }

    /// Build a 30-point series with a chosen coefficient of variation by
    /// alternating around a mean of 100.
    fn series_with_cv(target_cv: f64) -> Vec<f64> {
        // For values mean +/- d, the sample stddev of n alternating points is
        // d * sqrt(n / (n - 1)); solve d for the requested cv.
        let n: f64 = 30.0;
        let d = target_cv * (n - 1.0).sqrt() / n.sqrt();
        (0..30)
            .map(|i| if i % 2 == 0 { 100.0 + d } else { 100.0 - d })
            .collect()
    }

    #[test]
    fn test_consistency_threshold() {
        let calm = series_with_cv(49.0);
        let cv = coefficient_of_variation(&calm).unwrap();
        assert!((cv - 49.0).abs() < 1e-6);
        assert!(is_consistent(Some(cv)));

        let noisy = series_with_cv(51.0);
        let cv = coefficient_of_variation(&noisy).unwrap();
        assert!((cv - 51.0).abs() < 1e-6);
        assert!(!is_consistent(Some(cv)));
    }

    #[test]
    fn test_consistency_empty_series_fails_without_error() {
        assert_eq!(coefficient_of_variation(&[]), None);
        assert!(!is_consistent(None));
    }

    #[test]
    fn test_cv_uses_sample_stddev() {
        // stddev([2,4,4,4,5,5,7,9]) with ddof=1 is ~2.138, mean 5.
        let series = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let cv = coefficient_of_variation(&series).unwrap();
        assert!((cv - 42.7617987).abs() < 1e-4);
    }

    #[test]
    fn test_check_kind_names() {
        assert_eq!(CheckKind::Freshness.name(), "data_freshness");
        assert_eq!(CheckKind::Completeness.name(), "data_completeness");
        assert_eq!(CheckKind::Consistency.name(), "data_consistency");
        assert_eq!(CheckKind::DownstreamModels.name(), "downstream_models");
    }
}
