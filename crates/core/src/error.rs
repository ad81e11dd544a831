//! Error types shared across the workspace

use thiserror::Error;

/// Result alias used by every capability trait
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by external capabilities and their adapters
///
/// None of these cross the pipeline boundary: the component that invoked a
/// capability converts the error into its documented fallback decision.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Classifier error: {0}")]
    Classifier(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Executor error: {0}")]
    Executor(String),

    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Build a timeout error for a named operation
    pub fn timeout(operation: impl Into<String>, timeout: std::time::Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms: timeout.as_millis() as u64,
        }
    }

    /// True when the error came from an elapsed deadline
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
