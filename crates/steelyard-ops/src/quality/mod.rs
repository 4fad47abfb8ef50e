//! Data-quality checks and report aggregation.
//!
//! A check is a named, zero-argument evaluation yielding pass/fail or an
//! infrastructure error. The [`ReportBuilder`] runs a registered check list
//! in order, converts errors into `error` verdicts without aborting later
//! checks, and persists the scored report artifact.

pub mod checks;
pub mod report;

pub use checks::{BuiltinCheck, Check, CheckKind, QualityChecker};
pub use report::ReportBuilder;
