//! Report run orchestration.
//!
//! Runs every registered check in order, captures verdicts (converting a
//! check's error into an `error` status instead of aborting the run), and
//! persists the scored artifact under the reports directory.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use steelyard_core::{AppConfig, CheckOutcome, QualityReport, SteelyardError, Verdict};

use crate::quality::checks::Check;

/// Filename prefix of persisted quality reports.
pub const REPORT_PREFIX: &str = "data_quality_report";

/// Builds and persists quality reports for one target dataset.
pub struct ReportBuilder {
    target_identifier: String,
    reports_dir: PathBuf,
}

impl ReportBuilder {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            target_identifier: config.dataset_id(),
            reports_dir: config.reports_dir.clone(),
        }
    }

    /// Evaluate every check in registration order and roll up the report.
    ///
    /// A check returning `Err` is recorded as an `error` verdict; it never
    /// prevents later checks from running. This is pure aggregation: nothing
    /// is written to disk.
    pub async fn generate(&self, checks: &[Box<dyn Check>]) -> QualityReport {
        let mut outcomes = Vec::with_capacity(checks.len());
        for check in checks {
            info!(check = check.name(), "running quality check");
            let verdict = match check.evaluate().await {
                Ok(passed) => {
                    info!(
                        check = check.name(),
                        passed = passed,
                        "quality check finished"
                    );
                    Verdict::from_bool(passed)
                }
                Err(e) => {
                    warn!(check = check.name(), error = %e, "quality check errored");
                    Verdict::Error(e.to_string())
                }
            };
            outcomes.push(CheckOutcome::new(check.name(), verdict));
        }

        let report = QualityReport::from_outcomes(&self.target_identifier, outcomes);
        info!(
            overall_score = report.overall_score,
            passed = report.summary.passed_checks,
            total = report.summary.total_checks,
            tier = report.tier().label(),
            "quality report generated"
        );
        report
    }

    /// Write the report as pretty UTF-8 JSON under the reports directory,
    /// creating it if absent. The write error propagates; the report is the
    /// primary artifact and a silent failure would hide it.
    pub fn persist(&self, report: &QualityReport) -> steelyard_core::Result<PathBuf> {
        fs::create_dir_all(&self.reports_dir)?;

        let filename = format!(
            "{REPORT_PREFIX}_{}.json",
            report.timestamp.format("%Y%m%d_%H%M%S")
        );
        let path = self.reports_dir.join(filename);
        let json = serde_json::to_string_pretty(report)?;
        fs::write(&path, json)
            .map_err(|e| SteelyardError::ReportWrite(format!("{}: {e}", path.display())))?;

        info!(path = %path.display(), "quality report written");
        Ok(path)
    }

    /// Full report run: generate, persist, return the in-memory report.
    pub async fn run(&self, checks: &[Box<dyn Check>]) -> anyhow::Result<QualityReport> {
        let report = self.generate(checks).await;
        self.persist(&report)?;
        Ok(report)
    }

    pub fn reports_dir(&self) -> &Path {
        &self.reports_dir
    }
}
