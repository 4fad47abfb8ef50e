//! Integration tests for the quality report run with MemoryWarehouse.

use std::sync::Arc;

use steelyard_core::{AppConfig, QualityReport, QualityTier, Verdict};
use steelyard_ops::quality::{QualityChecker, ReportBuilder};
use steelyard_warehouse::fakes::MemoryWarehouse;
use steelyard_warehouse::Row;

fn test_config(reports_dir: &std::path::Path) -> AppConfig {
    AppConfig {
        project_id: "test-project".to_string(),
        reports_dir: reports_dir.to_path_buf(),
        ..AppConfig::default()
    }
}

fn script_freshness(warehouse: &MemoryWarehouse, hours: f64) {
    warehouse.script_rows(
        "hours_since_update",
        vec![Row::new()
            .with("latest_partition", "2025-03-01 00:00:00 UTC")
            .with("hours_since_update", hours)],
    );
}

fn script_completeness(warehouse: &MemoryWarehouse, total: i64, valid: i64) {
    warehouse.script_rows(
        "valid_0",
        vec![Row::new()
            .with("total_records", total)
            .with("valid_0", valid)
            .with("valid_1", total)
            .with("load_time_valid", total)],
    );
}

/// Thirty days of alternating volume around `mean` with spread `spread`.
fn script_consistency(warehouse: &MemoryWarehouse, mean: f64, spread: f64) {
    let rows: Vec<Row> = (0..30)
        .map(|i| {
            let value = if i % 2 == 0 { mean + spread } else { mean - spread };
            Row::new()
                .with("date", format!("2025-02-{:02}", (i % 28) + 1))
                .with("daily_records", value)
                .with("daily_files", 3)
                .with("moving_avg_7d", mean)
        })
        .collect();
    warehouse.script_rows("moving_avg_7d", rows);
}

fn script_downstream(warehouse: &MemoryWarehouse, counts: [i64; 3]) {
    for (table, count) in ["stg_shipments", "int_daily_metrics", "mart_business_insights"]
        .into_iter()
        .zip(counts)
    {
        warehouse.script_rows(table, vec![Row::new().with("record_count", count)]);
    }
}

async fn run_report(warehouse: Arc<MemoryWarehouse>, config: AppConfig) -> QualityReport {
    let checker = Arc::new(QualityChecker::new(warehouse, config.clone()));
    let builder = ReportBuilder::new(&config);
    builder
        .run(&QualityChecker::builtin_checks(&checker))
        .await
        .expect("report run failed")
}

/// Test: all four checks pass and the artifact scores 100.
#[tokio::test]
async fn test_all_checks_pass() {
    let tmp = tempfile::tempdir().unwrap();
    let config = test_config(tmp.path());
    let warehouse = Arc::new(MemoryWarehouse::new());
    script_freshness(&warehouse, 5.5);
    script_completeness(&warehouse, 100, 96);
    script_consistency(&warehouse, 1000.0, 50.0);
    script_downstream(&warehouse, [10, 20, 30]);

    let report = run_report(warehouse, config).await;

    assert_eq!(report.summary.total_checks, 4);
    assert_eq!(report.summary.passed_checks, 4);
    assert!((report.overall_score - 100.0).abs() < f64::EPSILON);
    assert_eq!(report.tier(), QualityTier::Excellent);

    let names: Vec<&str> = report.checks.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "data_freshness",
            "data_completeness",
            "data_consistency",
            "downstream_models"
        ]
    );
}

/// Test: one erroring check is recorded as `error` and the remaining checks
/// still run and report their own verdicts.
#[tokio::test]
async fn test_erroring_check_is_isolated() {
    let tmp = tempfile::tempdir().unwrap();
    let config = test_config(tmp.path());
    let warehouse = Arc::new(MemoryWarehouse::new());
    script_freshness(&warehouse, 26.0); // stale -> failed
    script_completeness(&warehouse, 100, 96); // passed
    warehouse.script_failure("moving_avg_7d", "quota exceeded"); // error
    script_downstream(&warehouse, [10, 0, 30]); // one empty table -> failed

    let report = run_report(warehouse, config).await;

    assert_eq!(report.checks[0].verdict, Verdict::Failed);
    assert_eq!(report.checks[1].verdict, Verdict::Passed);
    assert!(matches!(report.checks[2].verdict, Verdict::Error(ref m) if m.contains("quota")));
    assert_eq!(report.checks[3].verdict, Verdict::Failed);

    // 1 of 4 passed.
    assert!((report.overall_score - 25.0).abs() < 1e-9);
    assert_eq!(report.tier(), QualityTier::NeedsAttention);
}

/// Test: a poor `_FILE_LOAD_TIME` fraction is reported but never gates the
/// completeness verdict; only the decision columns do.
#[tokio::test]
async fn test_load_time_fraction_is_non_binding() {
    let tmp = tempfile::tempdir().unwrap();
    let config = test_config(tmp.path());
    let warehouse = Arc::new(MemoryWarehouse::new());
    script_freshness(&warehouse, 1.0);
    warehouse.script_rows(
        "valid_0",
        vec![Row::new()
            .with("total_records", 100)
            .with("valid_0", 100)
            .with("valid_1", 100)
            .with("load_time_valid", 10)],
    );
    script_consistency(&warehouse, 500.0, 10.0);
    script_downstream(&warehouse, [1, 1, 1]);

    let report = run_report(warehouse, config).await;

    assert_eq!(report.checks[1].name, "data_completeness");
    assert_eq!(report.checks[1].verdict, Verdict::Passed);
}

/// Test: an empty consistency window fails rather than errors.
#[tokio::test]
async fn test_empty_consistency_window_fails() {
    let tmp = tempfile::tempdir().unwrap();
    let config = test_config(tmp.path());
    let warehouse = Arc::new(MemoryWarehouse::new());
    script_freshness(&warehouse, 1.0);
    script_completeness(&warehouse, 100, 100);
    warehouse.script_rows("moving_avg_7d", vec![]);
    script_downstream(&warehouse, [1, 1, 1]);

    let report = run_report(warehouse, config).await;

    assert_eq!(report.checks[2].name, "data_consistency");
    assert_eq!(report.checks[2].verdict, Verdict::Failed);
    assert!((report.overall_score - 75.0).abs() < 1e-9);
    assert_eq!(report.tier(), QualityTier::Acceptable);
}

/// Test: a downstream table whose query fails counts as zero rows and fails
/// the check instead of erroring it.
#[tokio::test]
async fn test_downstream_query_failure_fails_not_errors() {
    let tmp = tempfile::tempdir().unwrap();
    let config = test_config(tmp.path());
    let warehouse = Arc::new(MemoryWarehouse::new());
    script_freshness(&warehouse, 1.0);
    script_completeness(&warehouse, 100, 100);
    script_consistency(&warehouse, 500.0, 10.0);
    warehouse.script_rows("stg_shipments", vec![Row::new().with("record_count", 5)]);
    warehouse.script_failure("int_daily_metrics", "table not found");
    warehouse.script_rows(
        "mart_business_insights",
        vec![Row::new().with("record_count", 7)],
    );

    let report = run_report(warehouse, config).await;

    assert_eq!(report.checks[3].name, "downstream_models");
    assert_eq!(report.checks[3].verdict, Verdict::Failed);
}

/// Test: the persisted artifact re-reads into a structurally identical report.
#[tokio::test]
async fn test_artifact_round_trip() {
    let tmp = tempfile::tempdir().unwrap();
    let config = test_config(tmp.path());
    let warehouse = Arc::new(MemoryWarehouse::new());
    script_freshness(&warehouse, 23.9);
    script_completeness(&warehouse, 100, 94); // 94% -> failed
    script_consistency(&warehouse, 1000.0, 50.0);
    script_downstream(&warehouse, [1, 1, 1]);

    let report = run_report(warehouse, config.clone()).await;

    let entries: Vec<_> = std::fs::read_dir(&config.reports_dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(entries.len(), 1);

    let raw = std::fs::read_to_string(&entries[0]).unwrap();
    let back: QualityReport = serde_json::from_str(&raw).unwrap();
    assert_eq!(back, report);
    assert_eq!(back.checks[1].verdict, Verdict::Failed);
    assert_eq!(back.summary.quality_score, "75.0%");
}
