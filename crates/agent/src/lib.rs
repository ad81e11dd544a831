//! Query admission pipeline for the poultry assistant
//!
//! Features:
//! - Pipeline coordinator sequencing domain gate, entity validation and
//!   decomposition
//! - LLM-backed domain classifier wiring from settings
//! - Tracing bootstrap

pub mod coordinator;
pub mod telemetry;

pub use coordinator::{enrich_query_text, PipelineCoordinator, PipelineOutcome, PipelineResult};
pub use telemetry::init_tracing;

use std::sync::Arc;

use poultry_assistant_config::LlmSettings;
use poultry_assistant_core::Classifier;
use poultry_assistant_llm::{LlmConfig, LlmDomainClassifier, LlmError, OllamaBackend};

/// Build the Ollama-backed domain classifier described by `settings`
pub fn build_llm_classifier(settings: &LlmSettings) -> Result<Arc<dyn Classifier>, LlmError> {
    let backend = OllamaBackend::new(LlmConfig::from(settings))?;
    tracing::debug!(endpoint = %settings.endpoint, model = %settings.model, "Domain classifier backend ready");
    Ok(Arc::new(LlmDomainClassifier::new(Arc::new(backend))))
}
