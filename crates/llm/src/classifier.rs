//! Prompt-based domain classifier

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use poultry_assistant_core::{Classifier, ClassifierVerdict, Language, Result};

use crate::backend::LlmBackend;
use crate::prompt::Message;
use crate::LlmError;

const SYSTEM_PROMPT: &str = "You are the admission filter of an assistant for poultry production \
(broilers, layers, breeders, hatcheries, flock health, nutrition, housing, performance standards). \
Decide whether the user question belongs to that domain. Questions may be in French, English or Spanish. \
Reply with a single JSON object and nothing else: \
{\"in_domain\": true | false | null, \"confidence\": <number between 0 and 1>, \"reason\": \"<short reason>\"}. \
Use null when you cannot tell.";

#[derive(Debug, Deserialize)]
struct LlmVerdict {
    in_domain: Option<bool>,
    #[serde(default)]
    confidence: f32,
    #[serde(default)]
    reason: String,
}

/// Domain classifier asking a small LLM for a yes/no verdict
pub struct LlmDomainClassifier {
    backend: Arc<dyn LlmBackend>,
}

impl LlmDomainClassifier {
    pub fn new(backend: Arc<dyn LlmBackend>) -> Self {
        Self { backend }
    }

    fn build_messages(
        query: &str,
        language: &Language,
        prior_intent: Option<&serde_json::Value>,
    ) -> Vec<Message> {
        let mut user = format!("Language: {}\nQuestion: {}", language.code(), query);
        if let Some(intent) = prior_intent {
            user.push_str(&format!("\nPrior intent: {}", intent));
        }
        vec![Message::system(SYSTEM_PROMPT), Message::user(user)]
    }

    /// Parse the JSON verdict, tolerating text around the object
    fn parse_verdict(response: &str) -> std::result::Result<ClassifierVerdict, LlmError> {
        let json_str = match (response.find('{'), response.rfind('}')) {
            (Some(start), Some(end)) if start < end => &response[start..=end],
            _ => response,
        };

        let parsed: LlmVerdict = serde_json::from_str(json_str)
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse classifier verdict: {}", e)))?;

        let diagnostic = serde_json::json!({ "reason": parsed.reason });
        let verdict = match parsed.in_domain {
            Some(true) => ClassifierVerdict::in_domain(parsed.confidence),
            Some(false) => ClassifierVerdict::out_of_domain(parsed.confidence),
            None => ClassifierVerdict::unknown(),
        };

        Ok(verdict.with_diagnostic(diagnostic))
    }
}

#[async_trait]
impl Classifier for LlmDomainClassifier {
    async fn classify(
        &self,
        query: &str,
        language: &Language,
        prior_intent: Option<&serde_json::Value>,
    ) -> Result<ClassifierVerdict> {
        let messages = Self::build_messages(query, language, prior_intent);
        let result = self.backend.generate(&messages).await?;

        let verdict = Self::parse_verdict(&result.text)?;
        tracing::debug!(
            model = self.backend.model_name(),
            verdict = ?verdict.verdict,
            confidence = verdict.confidence,
            elapsed_ms = result.total_time_ms,
            "LLM domain verdict"
        );

        Ok(verdict)
    }

    fn name(&self) -> &str {
        "llm-domain-classifier"
    }
}
