//! LLM integration for query admission
//!
//! Features:
//! - Ollama chat backend with retry and exponential backoff
//! - Prompt-based domain classifier implementing the core `Classifier` trait

pub mod backend;
pub mod classifier;
pub mod prompt;

pub use backend::{GenerationResult, LlmBackend, LlmConfig, OllamaBackend};
pub use classifier::LlmDomainClassifier;
pub use prompt::{Message, Role};

use thiserror::Error;

/// LLM errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

impl From<LlmError> for poultry_assistant_core::Error {
    fn from(err: LlmError) -> Self {
        poultry_assistant_core::Error::Llm(err.to_string())
    }
}
