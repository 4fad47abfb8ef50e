//! Domain-level error taxonomy for Steelyard.

/// Steelyard domain errors.
#[derive(Debug, thiserror::Error)]
pub enum SteelyardError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("report write failed: {0}")]
    ReportWrite(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for Steelyard domain operations.
pub type Result<T> = std::result::Result<T, SteelyardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SteelyardError::InvalidConfig("empty project id".to_string());
        assert!(err.to_string().contains("invalid configuration"));

        let err = SteelyardError::ReportWrite("disk full".to_string());
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: SteelyardError = io.into();
        assert!(err.to_string().contains("denied"));
    }
}
