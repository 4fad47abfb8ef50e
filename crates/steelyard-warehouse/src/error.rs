//! Error types for the warehouse gateway layer.

use thiserror::Error;

/// Errors that can occur when talking to the warehouse.
#[derive(Error, Debug)]
pub enum WarehouseError {
    /// Transport-level failure (connect, TLS, timeout).
    #[error("warehouse request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("warehouse api error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Credentials missing or rejected.
    #[error("warehouse auth error: {0}")]
    Auth(String),

    /// A queried column was absent from the result row.
    #[error("column not found in result row: {column}")]
    MissingColumn { column: String },

    /// A column value could not be read as the requested type.
    #[error("column {column} is not a {expected}")]
    TypeMismatch {
        column: String,
        expected: &'static str,
    },

    /// A query that must return rows returned none.
    #[error("query returned no rows: {0}")]
    NoRows(String),

    /// Load-job submission or polling failure.
    #[error("load job error: {0}")]
    Job(String),

    /// No scripted result for this query (in-memory fake only).
    #[error("no scripted result for query: {0}")]
    Unscripted(String),
}

/// Result type for warehouse operations.
pub type WarehouseResult<T> = std::result::Result<T, WarehouseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WarehouseError::Api {
            status: 403,
            message: "forbidden".to_string(),
        };
        assert!(err.to_string().contains("403"));
        assert!(err.to_string().contains("forbidden"));

        let err = WarehouseError::MissingColumn {
            column: "daily_records".to_string(),
        };
        assert!(err.to_string().contains("daily_records"));

        let err = WarehouseError::TypeMismatch {
            column: "total_rows".to_string(),
            expected: "number",
        };
        assert!(err.to_string().contains("total_rows"));
        assert!(err.to_string().contains("number"));
    }
}
