//! Steelyard Core - shared domain types for the warehouse tooling
//!
//! Provides:
//! - Quality report domain model (verdicts, outcomes, scored reports)
//! - Application configuration built once at startup
//! - Error taxonomy and tracing initialisation

pub mod config;
pub mod error;
pub mod report;
pub mod telemetry;

// Re-export key types
pub use config::{AppConfig, DEFAULT_PROJECT_ID};
pub use error::{Result, SteelyardError};
pub use report::{CheckOutcome, QualityReport, QualityTier, ReportSummary, Verdict};
pub use telemetry::init_tracing;
