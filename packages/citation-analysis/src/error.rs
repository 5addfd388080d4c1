//! Typed errors for the analysis pipeline.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so the queue can
//! branch on failure kind when deciding whether to retry.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::CompanyId;

/// Errors returned by a completion service.
#[derive(Debug, Clone, Error)]
pub enum CompletionError {
    /// The call did not finish within the configured timeout
    #[error("completion timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// Connection failed, TLS error, broken stream
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-2xx response or an error body from the provider
    #[error("API error: {0}")]
    Api(String),

    /// The provider answered without any text
    #[error("completion returned no content")]
    EmptyResponse,

    /// Provider-side throttling
    #[error("rate limited by completion service")]
    RateLimited,
}

/// Shape violations in the model's structured output.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Payload is not parseable JSON
    #[error("payload is not valid JSON: {0}")]
    NotJson(String),

    /// Payload parsed but the top level is not an object
    #[error("payload is not a JSON object")]
    NotAnObject,

    /// A required key is absent
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    /// A key is present with the wrong JSON type
    #[error("field `{field}` must be {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },

    /// A key has the right type but an unknown value
    #[error("field `{field}` has invalid value {value}")]
    InvalidValue { field: &'static str, value: String },
}

/// Why a single extraction failed.
#[derive(Debug, Clone, Error)]
pub enum ExtractionFailure {
    /// Prompts missing or inactive. Retrying cannot fix this.
    #[error("prompt configuration missing: {}", missing.join(", "))]
    Configuration { missing: Vec<String> },

    /// The completion service failed or timed out
    #[error("upstream failure: {0}")]
    Upstream(#[from] CompletionError),

    /// The completion payload failed schema validation
    #[error("validation failure: {0}")]
    Validation(#[from] ValidationError),

    /// A persistence round trip failed (prompt read or record write)
    #[error("storage failure: {0}")]
    Storage(String),
}

impl ExtractionFailure {
    /// Classify this failure for retry bookkeeping.
    pub fn kind(&self) -> FailureKind {
        match self {
            ExtractionFailure::Configuration { .. } => FailureKind::Configuration,
            ExtractionFailure::Upstream(_) => FailureKind::Upstream,
            ExtractionFailure::Validation(_) => FailureKind::Validation,
            ExtractionFailure::Storage(_) => FailureKind::Storage,
        }
    }
}

impl From<StoreError> for ExtractionFailure {
    fn from(err: StoreError) -> Self {
        ExtractionFailure::Storage(err.to_string())
    }
}

/// Failure category recorded on a work unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Configuration,
    Upstream,
    Validation,
    Storage,
}

impl FailureKind {
    /// Whether this failure kind may be resubmitted by a retry pass
    pub fn is_retryable(&self) -> bool {
        !matches!(self, FailureKind::Configuration)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Configuration => "configuration",
            FailureKind::Upstream => "upstream",
            FailureKind::Validation => "validation",
            FailureKind::Storage => "storage",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from the persistence store.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Query or connection failure
    #[error("database error: {0}")]
    Database(String),

    /// A stored JSON column could not be (de)serialized
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Requested row does not exist
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

/// Errors that abort a whole queue operation.
///
/// Per-item failures never surface here; they are recorded on work units.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Prompts are entirely missing, no item in the batch could succeed
    #[error("prompt configuration missing: {}", missing.join(", "))]
    Configuration { missing: Vec<String> },

    /// No company profile for the requested company
    #[error("company not found: {company_id}")]
    CompanyNotFound { company_id: CompanyId },

    /// start id is greater than end id
    #[error("invalid id range: {start}..={end}")]
    InvalidRange { start: i64, end: i64 },

    /// Reading pending responses failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result type alias for queue operations.
pub type QueueResult<T> = std::result::Result<T, QueueError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_configuration_is_terminal() {
        assert!(!FailureKind::Configuration.is_retryable());
        assert!(FailureKind::Upstream.is_retryable());
        assert!(FailureKind::Validation.is_retryable());
        assert!(FailureKind::Storage.is_retryable());
    }

    #[test]
    fn test_failure_kind_mapping() {
        let failure = ExtractionFailure::from(CompletionError::Timeout { seconds: 30 });
        assert_eq!(failure.kind(), FailureKind::Upstream);

        let failure = ExtractionFailure::from(ValidationError::NotAnObject);
        assert_eq!(failure.kind(), FailureKind::Validation);

        let failure = ExtractionFailure::Configuration {
            missing: vec!["analysis_user".into()],
        };
        assert_eq!(failure.kind(), FailureKind::Configuration);
        assert_eq!(
            failure.to_string(),
            "prompt configuration missing: analysis_user"
        );
    }
}
