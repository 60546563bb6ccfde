//! Error types for dbconnector

use thiserror::Error;

/// Main error type for connector operations
#[derive(Error, Debug)]
pub enum ConnectorError {
    /// The server could not be reached or rejected the handshake
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// An operation ran on a closed connector, or every dial attempt failed
    #[error("Not connected: {0}")]
    NotConnected(String),

    /// Unknown or invalid database, collection or table
    #[error("Invalid context: {0}")]
    InvalidContext(String),

    /// Data of the wrong shape or type for the requested operation
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// A filter selected no entries
    #[error("No match: {0}")]
    NoMatch(String),

    /// A decision point received an answer outside its branch table
    #[error("Invalid selection: {0}")]
    InvalidModeSelection(String),

    /// Reading or writing a data file failed
    #[error("IO failure: {0}")]
    IoFailure(String),

    /// Statement or command execution error reported by the server
    #[error("Query execution failed: {0}")]
    Query(String),

    /// Profile file parsing error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Profile validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Environment variable not found
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<std::io::Error> for ConnectorError {
    fn from(err: std::io::Error) -> Self {
        ConnectorError::IoFailure(err.to_string())
    }
}

impl ConnectorError {
    /// Returns true if this error should be logged at error level.
    ///
    /// Empty results and rejected choices are expected outcomes of normal use
    /// and are logged as warnings instead.
    pub fn is_error(&self) -> bool {
        !matches!(
            self,
            ConnectorError::NoMatch(_) | ConnectorError::InvalidModeSelection(_)
        )
    }

    /// Returns true if the caller can fix the failure by changing its input
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ConnectorError::InvalidContext(_)
                | ConnectorError::MalformedInput(_)
                | ConnectorError::NoMatch(_)
                | ConnectorError::InvalidModeSelection(_)
                | ConnectorError::Validation(_)
        )
    }

    /// Sanitize the error message to avoid leaking connection details
    pub fn sanitized_message(&self) -> String {
        match self {
            ConnectorError::ConnectionFailed(_) => "Database connection error".to_string(),
            ConnectorError::NotConnected(_) => "Database is not connected".to_string(),
            _ => self.to_string(),
        }
    }

    /// Emit this error on the diagnostic channel at the matching level
    pub fn report(&self, operation: &str) {
        if self.is_error() {
            tracing::error!(operation, "{}", self);
        } else {
            tracing::warn!(operation, "{}", self);
        }
    }
}

/// Result type alias using ConnectorError
pub type Result<T> = std::result::Result<T, ConnectorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_levels() {
        assert!(ConnectorError::ConnectionFailed("refused".into()).is_error());
        assert!(ConnectorError::MalformedInput("bad".into()).is_error());
        assert!(!ConnectorError::NoMatch("age=3".into()).is_error());
        assert!(!ConnectorError::InvalidModeSelection("all".into()).is_error());
    }

    #[test]
    fn test_error_sanitization() {
        let err = ConnectorError::ConnectionFailed("mysql://root:secret@db".into());
        assert_eq!(err.sanitized_message(), "Database connection error");

        let err = ConnectorError::NoMatch("no such entry".into());
        assert_eq!(err.sanitized_message(), "No match: no such entry");
    }

    #[test]
    fn test_error_is_client_error() {
        assert!(ConnectorError::InvalidContext("users".into()).is_client_error());
        assert!(!ConnectorError::Query("syntax".into()).is_client_error());
        assert!(!ConnectorError::NotConnected("closed".into()).is_client_error());
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.csv");
        let err: ConnectorError = io.into();
        assert!(matches!(err, ConnectorError::IoFailure(ref m) if m.contains("missing.csv")));
    }
}
