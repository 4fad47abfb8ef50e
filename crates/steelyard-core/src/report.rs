//! Quality report domain model.
//!
//! A report run evaluates an ordered set of named checks; each check yields a
//! [`Verdict`] and the run rolls everything up into a scored [`QualityReport`]
//! that is persisted as JSON. Check order in the artifact is the registration
//! order, so report diffs stay stable across runs.

use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Outcome of one quality check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The check's threshold condition held.
    Passed,
    /// The check ran to completion and the condition did not hold.
    Failed,
    /// The check could not be evaluated (infrastructure failure).
    Error(String),
}

impl Verdict {
    /// Wire status string used in the JSON artifact.
    pub fn status(&self) -> &'static str {
        match self {
            Verdict::Passed => "passed",
            Verdict::Failed => "failed",
            Verdict::Error(_) => "error",
        }
    }

    pub fn is_passed(&self) -> bool {
        matches!(self, Verdict::Passed)
    }

    /// Build a verdict from a boolean check result.
    pub fn from_bool(passed: bool) -> Self {
        if passed {
            Verdict::Passed
        } else {
            Verdict::Failed
        }
    }
}

/// One check's recorded result. Appended to the report, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    pub name: String,
    pub verdict: Verdict,
    pub timestamp: DateTime<Utc>,
}

impl CheckOutcome {
    pub fn new(name: impl Into<String>, verdict: Verdict) -> Self {
        Self {
            name: name.into(),
            verdict,
            timestamp: Utc::now(),
        }
    }
}

/// Human-facing classification of an overall score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityTier {
    Excellent,
    Acceptable,
    NeedsAttention,
}

impl QualityTier {
    /// Classify a score in `[0, 100]`.
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            QualityTier::Excellent
        } else if score >= 60.0 {
            QualityTier::Acceptable
        } else {
            QualityTier::NeedsAttention
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            QualityTier::Excellent => "excellent",
            QualityTier::Acceptable => "acceptable",
            QualityTier::NeedsAttention => "needs attention",
        }
    }
}

/// Aggregate counters included in the artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_checks: usize,
    pub passed_checks: usize,
    pub failed_checks: usize,
    /// Formatted score, e.g. `"75.0%"`.
    pub quality_score: String,
}

/// Scored report over an ordered sequence of check outcomes.
///
/// Invariants: `summary.total_checks == checks.len()` and
/// `summary.passed_checks <= summary.total_checks`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub timestamp: DateTime<Utc>,
    pub target_identifier: String,
    #[serde(with = "checks_map")]
    pub checks: Vec<CheckOutcome>,
    pub overall_score: f64,
    pub summary: ReportSummary,
}

impl QualityReport {
    /// Roll an ordered outcome list into a scored report.
    pub fn from_outcomes(target_identifier: impl Into<String>, checks: Vec<CheckOutcome>) -> Self {
        let total = checks.len();
        let passed = checks.iter().filter(|c| c.verdict.is_passed()).count();
        let overall_score = if total == 0 {
            0.0
        } else {
            100.0 * passed as f64 / total as f64
        };

        Self {
            timestamp: Utc::now(),
            target_identifier: target_identifier.into(),
            checks,
            overall_score,
            summary: ReportSummary {
                total_checks: total,
                passed_checks: passed,
                failed_checks: total - passed,
                quality_score: format!("{:.1}%", overall_score),
            },
        }
    }

    pub fn tier(&self) -> QualityTier {
        QualityTier::from_score(self.overall_score)
    }
}

/// Serialize the ordered outcome list as a JSON object keyed by check name,
/// and read it back in document order. A plain map type would re-sort keys
/// and break the registration-order display contract.
mod checks_map {
    use super::*;

    #[derive(Serialize, Deserialize)]
    struct Entry {
        status: String,
        timestamp: DateTime<Utc>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    }

    pub fn serialize<S: Serializer>(
        checks: &[CheckOutcome],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(checks.len()))?;
        for check in checks {
            let entry = Entry {
                status: check.verdict.status().to_string(),
                timestamp: check.timestamp,
                error: match &check.verdict {
                    Verdict::Error(message) => Some(message.clone()),
                    _ => None,
                },
            };
            map.serialize_entry(&check.name, &entry)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<CheckOutcome>, D::Error> {
        struct ChecksVisitor;

        impl<'de> Visitor<'de> for ChecksVisitor {
            type Value = Vec<CheckOutcome>;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a map of check name to check entry")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut checks = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, entry)) = access.next_entry::<String, Entry>()? {
                    let verdict = match entry.status.as_str() {
                        "passed" => Verdict::Passed,
                        "failed" => Verdict::Failed,
                        _ => Verdict::Error(entry.error.unwrap_or_default()),
                    };
                    checks.push(CheckOutcome {
                        name,
                        verdict,
                        timestamp: entry.timestamp,
                    });
                }
                Ok(checks)
            }
        }

        deserializer.deserialize_map(ChecksVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> QualityReport {
        QualityReport::from_outcomes(
            "acme-prod.steel_analysis",
            vec![
                CheckOutcome::new("data_freshness", Verdict::Passed),
                CheckOutcome::new("data_completeness", Verdict::Failed),
                CheckOutcome::new("data_consistency", Verdict::Error("timeout".to_string())),
                CheckOutcome::new("downstream_models", Verdict::Passed),
            ],
        )
    }

    #[test]
    fn test_score_is_passed_fraction() {
        let report = sample_report();
        assert_eq!(report.summary.total_checks, 4);
        assert_eq!(report.summary.passed_checks, 2);
        assert_eq!(report.summary.failed_checks, 2);
        assert!((report.overall_score - 50.0).abs() < f64::EPSILON);
        assert_eq!(report.summary.quality_score, "50.0%");
    }

    #[test]
    fn test_empty_report_scores_zero() {
        let report = QualityReport::from_outcomes("t", vec![]);
        assert_eq!(report.overall_score, 0.0);
        assert_eq!(report.summary.total_checks, 0);
    }

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(QualityTier::from_score(100.0), QualityTier::Excellent);
        assert_eq!(QualityTier::from_score(80.0), QualityTier::Excellent);
        assert_eq!(QualityTier::from_score(79.9), QualityTier::Acceptable);
        assert_eq!(QualityTier::from_score(60.0), QualityTier::Acceptable);
        assert_eq!(QualityTier::from_score(59.9), QualityTier::NeedsAttention);
        assert_eq!(QualityTier::from_score(0.0), QualityTier::NeedsAttention);
    }

    #[test]
    fn test_json_shape() {
        let report = sample_report();
        let value = serde_json::to_value(&report).expect("serialize");

        assert_eq!(value["checks"]["data_freshness"]["status"], "passed");
        assert_eq!(value["checks"]["data_consistency"]["status"], "error");
        assert_eq!(value["checks"]["data_consistency"]["error"], "timeout");
        // Non-error entries must omit the error key entirely.
        assert!(value["checks"]["data_freshness"].get("error").is_none());
        assert_eq!(value["summary"]["total_checks"], 4);
    }

    #[test]
    fn test_round_trip_preserves_order_and_score() {
        let report = sample_report();
        let json = serde_json::to_string_pretty(&report).expect("serialize");
        let back: QualityReport = serde_json::from_str(&json).expect("deserialize");

        assert_eq!(back, report);
        let names: Vec<&str> = back.checks.iter().map(|c| c.name.as_str()).collect();
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

    #[test]
    fn test_verdict_status_strings() {
        assert_eq!(Verdict::Passed.status(), "passed");
        assert_eq!(Verdict::Failed.status(), "failed");
        assert_eq!(Verdict::Error("x".to_string()).status(), "error");
        assert_eq!(Verdict::from_bool(true), Verdict::Passed);
        assert_eq!(Verdict::from_bool(false), Verdict::Failed);
    }
}
