//! Domain classifier capability

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Language, Result};

/// Fast, opinionated in/out-of-domain classifier (typically a small LLM)
///
/// Implementations:
/// - `LlmDomainClassifier` - prompt-based verdict over an `LlmBackend`
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify a query
    ///
    /// # Arguments
    /// * `query` - Raw query text
    /// * `language` - Query language
    /// * `prior_intent` - Intent classification from an earlier stage, if any
    async fn classify(
        &self,
        query: &str,
        language: &Language,
        prior_intent: Option<&serde_json::Value>,
    ) -> Result<ClassifierVerdict>;

    /// Name for logging
    fn name(&self) -> &str;
}

/// Classifier answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierVerdict {
    /// `Some(true)` in-domain, `Some(false)` out-of-domain, `None` undecided
    pub verdict: Option<bool>,
    /// Confidence in the verdict (0.0 - 1.0)
    pub confidence: f32,
    /// Free-form diagnostic payload
    #[serde(default)]
    pub diagnostic: serde_json::Value,
}

impl ClassifierVerdict {
    pub fn in_domain(confidence: f32) -> Self {
        Self {
            verdict: Some(true),
            confidence: confidence.clamp(0.0, 1.0),
            diagnostic: serde_json::Value::Null,
        }
    }

    pub fn out_of_domain(confidence: f32) -> Self {
        Self {
            verdict: Some(false),
            confidence: confidence.clamp(0.0, 1.0),
            diagnostic: serde_json::Value::Null,
        }
    }

    pub fn unknown() -> Self {
        Self {
            verdict: None,
            confidence: 0.0,
            diagnostic: serde_json::Value::Null,
        }
    }

    pub fn with_diagnostic(mut self, diagnostic: serde_json::Value) -> Self {
        self.diagnostic = diagnostic;
        self
    }
}
