use std::path::PathBuf;

use thiserror::Error;

use crate::validate::ValidationFailure;

/// Everything that can go wrong while certifying the API.
///
/// Setup-stage variants abort the whole run (see [`HarnessError::is_fatal`]);
/// the rest fail a single scenario and are recorded in the report.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("City catalog at {path} is unavailable: {reason}")]
    DataUnavailable { path: PathBuf, reason: String },

    #[error("City catalog is empty, no test subject can be selected")]
    EmptyCatalog,

    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    #[error("Request failed: {0}")]
    TransportFailure(String),

    #[error("Expected HTTP status {expected}, got {actual}: {body}")]
    UnexpectedStatus {
        expected: u16,
        actual: u16,
        body: String,
    },

    #[error("Expected content type '{expected}', got '{actual}'")]
    UnexpectedContentType { expected: String, actual: String },

    #[error(transparent)]
    Validation(#[from] ValidationFailure),

    #[error("Body does not match {expected}: {reason}")]
    SchemaMismatch {
        expected: &'static str,
        reason: String,
    },

    #[error("{0}")]
    Assertion(String),

    #[error("Failed to write report: {0}")]
    Report(String),
}

impl HarnessError {
    /// Errors raised while preparing the run, before any scenario executes.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            HarnessError::DataUnavailable { .. }
                | HarnessError::EmptyCatalog
                | HarnessError::Client(_)
        )
    }
}

pub type Result<T, E = HarnessError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_errors_are_fatal() {
        let missing = HarnessError::DataUnavailable {
            path: PathBuf::from("city.list.json"),
            reason: "No such file".into(),
        };
        assert!(missing.is_fatal());
        assert!(HarnessError::EmptyCatalog.is_fatal());
        assert!(HarnessError::Client("tls".into()).is_fatal());
    }

    #[test]
    fn scenario_errors_are_not_fatal() {
        let status = HarnessError::UnexpectedStatus {
            expected: 200,
            actual: 500,
            body: String::new(),
        };
        assert!(!status.is_fatal());
        assert!(!HarnessError::TransportFailure("refused".into()).is_fatal());
        assert!(!HarnessError::Assertion("name mismatch".into()).is_fatal());
    }

    #[test]
    fn unexpected_status_mentions_both_codes() {
        let err = HarnessError::UnexpectedStatus {
            expected: 404,
            actual: 200,
            body: "{}".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("404"));
        assert!(msg.contains("200"));
    }
}
