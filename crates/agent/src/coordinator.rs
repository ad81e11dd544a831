//! Pipeline coordinator
//!
//! Sequences admission for one query:
//! 1. Domain gate. Out-of-domain queries are rejected and nothing else runs.
//! 2. Entity validation. Queries lacking critical context get a
//!    clarification question.
//! 3. Decomposition. Simple queries go to the executor once, complex ones
//!    are split, executed in parallel and aggregated.
//!
//! Capability failures never escape: they surface as fallback decisions or
//! as per-sub-query errors inside the result.

use std::sync::Arc;

use serde::Serialize;
use tracing::Instrument;
use uuid::Uuid;

use poultry_assistant_config::{DomainVocabulary, Settings};
use poultry_assistant_core::{
    Classifier, ContentSearch, EntitySet, Language, Query, SlotName, SubQueryExecutor,
};
use poultry_assistant_rag::{
    AggregatedResult, DecisionCache, DecompositionResult, DomainGate, OodDecision, QueryDecomposer,
    SubQueryOutcome,
};
use poultry_assistant_text_processing::{
    detect_age_days, detect_breed, detect_sex, EntityValidator, ValidationResult,
};

/// Answer produced for an admitted query
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineResult {
    /// Simple query answered by a single executor call
    Direct(SubQueryOutcome),
    /// Complex query answered factor by factor
    Aggregated(AggregatedResult),
}

/// Final state of a pipeline run
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PipelineOutcome {
    Rejected {
        decision: OodDecision,
        message: String,
    },
    ClarificationNeeded {
        decision: OodDecision,
        validation: ValidationResult,
        message: String,
    },
    Answered {
        decision: OodDecision,
        validation: ValidationResult,
        decomposition: DecompositionResult,
        result: PipelineResult,
    },
}

impl PipelineOutcome {
    pub fn admitted(&self) -> bool {
        !matches!(self, Self::Rejected { .. })
    }

    pub fn clarification(&self) -> Option<&str> {
        match self {
            Self::ClarificationNeeded { message, .. } => Some(message),
            _ => None,
        }
    }

    pub fn result(&self) -> Option<&PipelineResult> {
        match self {
            Self::Answered { result, .. } => Some(result),
            _ => None,
        }
    }

    /// Rejection or clarification text for the user
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Rejected { message, .. } | Self::ClarificationNeeded { message, .. } => Some(message),
            Self::Answered { .. } => None,
        }
    }

    pub fn decision(&self) -> &OodDecision {
        match self {
            Self::Rejected { decision, .. }
            | Self::ClarificationNeeded { decision, .. }
            | Self::Answered { decision, .. } => decision,
        }
    }

    /// Label used in logs and metrics
    pub fn label(&self) -> &'static str {
        match self {
            Self::Rejected { .. } => "rejected",
            Self::ClarificationNeeded { .. } => "clarification_needed",
            Self::Answered {
                result: PipelineResult::Direct(_),
                ..
            } => "answered_direct",
            Self::Answered {
                result: PipelineResult::Aggregated(_),
                ..
            } => "answered_aggregated",
        }
    }
}

/// Admission pipeline over injected capabilities
pub struct PipelineCoordinator {
    gate: DomainGate,
    validator: EntityValidator,
    decomposer: QueryDecomposer,
    executor: Arc<dyn SubQueryExecutor>,
    metrics_enabled: bool,
}

impl PipelineCoordinator {
    pub fn new(
        gate: DomainGate,
        validator: EntityValidator,
        decomposer: QueryDecomposer,
        executor: Arc<dyn SubQueryExecutor>,
    ) -> Self {
        Self {
            gate,
            validator,
            decomposer,
            executor,
            metrics_enabled: true,
        }
    }

    /// Wire every component from settings
    ///
    /// A decision cache is created when `gate.cache.enabled` is set.
    pub fn from_settings(
        settings: &Settings,
        vocabulary: DomainVocabulary,
        classifier: Arc<dyn Classifier>,
        search: Arc<dyn ContentSearch>,
        executor: Arc<dyn SubQueryExecutor>,
    ) -> Self {
        let validator = EntityValidator::new(settings.validator.clone(), &vocabulary);
        let mut gate = DomainGate::new(classifier, search, settings.gate.clone(), vocabulary);
        if settings.gate.cache.enabled {
            gate = gate.with_cache(Arc::new(DecisionCache::from_config(&settings.gate.cache)));
        }

        Self {
            gate,
            validator,
            decomposer: QueryDecomposer::new(settings.decomposer.clone()),
            executor,
            metrics_enabled: settings.observability.metrics_enabled,
        }
    }

    pub fn with_metrics(mut self, enabled: bool) -> Self {
        self.metrics_enabled = enabled;
        self
    }

    /// Run a raw query with optional entities extracted upstream
    pub async fn run_pipeline(
        &self,
        text: &str,
        language: &Language,
        prior_entities: Option<EntitySet>,
    ) -> PipelineOutcome {
        let mut query = Query::new(text, language.clone());
        if let Some(entities) = prior_entities {
            query = query.with_entities(entities);
        }
        self.run(&query).await
    }

    pub async fn run(&self, query: &Query) -> PipelineOutcome {
        let span = tracing::info_span!(
            "pipeline",
            request_id = %Uuid::new_v4(),
            language = %query.language()
        );

        let outcome = self.run_stages(query).instrument(span).await;

        if self.metrics_enabled {
            metrics::counter!("pipeline_outcomes_total", "outcome" => outcome.label()).increment(1);
        }
        outcome
    }

    async fn run_stages(&self, query: &Query) -> PipelineOutcome {
        let decision = self
            .gate
            .admit_query(query)
            .instrument(tracing::debug_span!("domain_gate"))
            .await;

        if !decision.is_in_domain() {
            tracing::info!(
                method = decision.method().as_str(),
                confidence = decision.confidence(),
                "Query rejected as out of domain"
            );
            return PipelineOutcome::Rejected {
                message: rejection_message(query.language()),
                decision,
            };
        }

        let validation = {
            let _stage = tracing::debug_span!("entity_validation").entered();
            let entities = query.entities().cloned().unwrap_or_default();
            self.validator.enhance(&entities, query)
        };

        if validation.needs_fallback() {
            tracing::info!(missing = ?validation.missing, "Query needs clarification");
            return PipelineOutcome::ClarificationNeeded {
                message: validation.message.clone(),
                decision,
                validation,
            };
        }

        let enriched = enrich_query_text(query.text(), &validation.enhanced_entities, query.language());
        let decomposition = self.decomposer.decompose(&enriched);

        let result = if decomposition.is_complex {
            let outcomes = self
                .decomposer
                .execute_subqueries(&decomposition.sub_queries, self.executor.as_ref())
                .instrument(tracing::debug_span!("sub_queries", count = decomposition.sub_queries.len()))
                .await;
            PipelineResult::Aggregated(self.decomposer.aggregate_results(
                outcomes,
                decomposition.aggregation_strategy,
                &decomposition.original_query,
            ))
        } else {
            let outcome = self
                .decomposer
                .execute_one(&decomposition.sub_queries[0], self.executor.as_ref())
                .instrument(tracing::debug_span!("executor"))
                .await;
            PipelineResult::Direct(outcome)
        };

        tracing::info!(
            complex = decomposition.is_complex,
            sub_queries = decomposition.sub_queries.len(),
            "Query answered"
        );

        PipelineOutcome::Answered {
            decision,
            validation,
            decomposition,
            result,
        }
    }
}

fn rejection_message(language: &Language) -> String {
    match language {
        Language::French => "Je suis spécialisé en production avicole (élevage, santé, nutrition, \
            performances des volailles). Votre question semble sortir de ce domaine."
            .to_string(),
        Language::Spanish => "Estoy especializado en producción avícola (crianza, salud, nutrición, \
            rendimiento de las aves). Su pregunta parece estar fuera de este ámbito."
            .to_string(),
        _ => "I specialise in poultry production (husbandry, health, nutrition, flock performance). \
            Your question seems to be outside this domain."
            .to_string(),
    }
}

/// Append breed, age and sex values the text does not already mention
pub fn enrich_query_text(text: &str, entities: &EntitySet, language: &Language) -> String {
    let mut additions = Vec::new();

    if let Some(breed) = &entities.breed {
        let mentioned = detect_breed(text).is_some() || text.to_lowercase().contains(&breed.to_lowercase());
        if !mentioned {
            additions.push(breed.clone());
        }
    }

    if let Some(days) = entities.age_days {
        if detect_age_days(text).is_none() {
            additions.push(match language {
                Language::French => format!("{} jours", days),
                Language::Spanish => format!("{} días", days),
                _ => format!("{} days", days),
            });
        }
    }

    if let Some(sex) = entities.value_string(SlotName::Sex) {
        if detect_sex(text).is_none() {
            additions.push(sex_label(&sex, language));
        }
    }

    if additions.is_empty() {
        return text.to_string();
    }

    let body = text.trim_end_matches(|c: char| c.is_whitespace() || matches!(c, '?' | '!' | '.'));
    let tail = text[body.len()..].trim();
    format!("{} {}{}", body, additions.join(" "), tail)
}

fn sex_label(sex: &str, language: &Language) -> String {
    let label = match (language, sex) {
        (Language::French, "male") => "mâles",
        (Language::French, "female") => "femelles",
        (Language::French, "mixed") => "mixtes",
        (_, "male") => "males",
        (_, "female") => "females",
        (_, "mixed") => "mixed",
        _ => sex,
    };
    label.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enrich_appends_missing_values_before_question_mark() {
        let mut entities = EntitySet::default();
        entities.set_breed("Ross 308");
        entities.set_age_days(21);
        entities.set_sex("male");

        let enriched = enrich_query_text("Quel poids ?", &entities, &Language::French);
        assert_eq!(enriched, "Quel poids Ross 308 21 jours mâles?");
    }

    #[test]
    fn test_enrich_skips_values_already_mentioned() {
        let mut entities = EntitySet::default();
        entities.set_breed("Ross 308");
        entities.set_age_days(35);
        entities.set_sex("male");

        let text = "FCR mâles Ross 308 à 35 jours";
        assert_eq!(enrich_query_text(text, &entities, &Language::French), text);
    }

    #[test]
    fn test_enrich_in_english() {
        let mut entities = EntitySet::default();
        entities.set_age_days(42);

        let enriched = enrich_query_text("Cobb 500 body weight", &entities, &Language::English);
        assert_eq!(enriched, "Cobb 500 body weight 42 days");
    }

    #[test]
    fn test_rejection_message_language() {
        assert!(rejection_message(&Language::French).contains("avicole"));
        assert!(rejection_message(&Language::from_code("it")).contains("poultry"));
    }
}
