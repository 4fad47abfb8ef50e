//! Steelyard Ops - the three operational pipelines
//!
//! - `quality`: check registry, threshold checks, and the scored report run
//! - `loader`: bulk-load pipeline with cancellable job polling
//! - `eda`: descriptive analysis, charts, and the JSON summary artifact

pub mod eda;
pub mod loader;
pub mod quality;

// Re-export key types
pub use eda::{EdaReporter, EdaSummary};
pub use loader::{LoadError, LoadOutcome, LoadPipeline};
pub use quality::{BuiltinCheck, Check, CheckKind, QualityChecker, ReportBuilder};
