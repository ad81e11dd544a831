//! Entity completeness validation
//!
//! Takes the entities extracted upstream, repairs impossible values, fills
//! absent slots from the query text and decides whether the query carries
//! enough context to be answered precisely.
//!
//! # Example
//!
//! ```ignore
//! use poultry_assistant_text_processing::{EntityValidator, ValidationStatus};
//!
//! let validator = EntityValidator::default();
//! let query = Query::new("Quel poids?", "fr");
//! let result = validator.enhance(&EntitySet::default(), &query);
//!
//! assert_eq!(result.status, ValidationStatus::NeedsFallback);
//! ```

pub mod detectors;
mod messages;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use poultry_assistant_config::{DomainVocabulary, ValidatorConfig};
use poultry_assistant_core::{EntitySet, Query, SlotName};

use detectors::{metrics, BreedMatcher};

/// Slots a precise answer needs, in reporting order
const REQUIRED_SLOTS: [SlotName; 3] = [SlotName::Breed, SlotName::AgeDays, SlotName::MetricType];

/// Metric values upstream extractors emit that are really sex labels or placeholders
const INVALID_METRIC_TOKENS: &[&str] = &[
    "as_hatched",
    "mixed",
    "mixte",
    "mixtes",
    "none",
    "null",
    "unknown",
    "",
    "male",
    "males",
    "female",
    "females",
    "mâle",
    "mâles",
    "femelle",
    "femelles",
];

/// Completeness verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    /// Every required slot is filled
    Complete,
    /// One non-critical slot is missing; the answer can still be attempted
    IncompleteButProcessable,
    /// The user must be asked for more context
    NeedsFallback,
}

/// Outcome of [`EntityValidator::enhance`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub status: ValidationStatus,
    pub enhanced_entities: EntitySet,
    /// Missing required slots, in reporting order
    pub missing: Vec<SlotName>,
    /// Clarification or hint for the user; empty when complete
    pub message: String,
}

impl ValidationResult {
    pub fn needs_fallback(&self) -> bool {
        self.status == ValidationStatus::NeedsFallback
    }
}

/// Entity completeness validator
#[derive(Debug, Clone)]
pub struct EntityValidator {
    config: ValidatorConfig,
    vocabulary: DomainVocabulary,
    breeds: BreedMatcher,
}

impl EntityValidator {
    pub fn new(config: ValidatorConfig, vocabulary: &DomainVocabulary) -> Self {
        Self {
            config,
            breeds: BreedMatcher::from_vocabulary(vocabulary),
            vocabulary: vocabulary.clone(),
        }
    }

    /// Repair, enrich and grade the entities attached to a query
    ///
    /// Never fails: malformed values degrade to missing slots.
    pub fn enhance(&self, entities: &EntitySet, query: &Query) -> ValidationResult {
        let text = query.text();
        let mut enhanced = entities.clone();

        self.invalidate_impossible_values(&mut enhanced);

        if !enhanced.has(SlotName::Breed) {
            if let Some(breed) = self.breeds.detect(text) {
                tracing::debug!(breed = %breed, "Detected breed from query text");
                enhanced.set_breed(breed);
            }
        }

        if !enhanced.has(SlotName::AgeDays) {
            if let Some(days) = detectors::detect_age_days_within(text, self.config.max_age_days) {
                tracing::debug!(age_days = days, "Detected age from query text");
                enhanced.set_age_days(days);
            }
        }

        if !enhanced.has(SlotName::MetricType) {
            if let Some(metric) = detectors::detect_metric_type(text) {
                tracing::debug!(metric, "Detected metric from query text");
                enhanced.set_metric_type(metric);
            }
        }

        if !enhanced.has(SlotName::Sex) {
            if let Some(sex) = detectors::detect_sex(text) {
                enhanced.set_sex(sex);
            }
        }

        if !enhanced.has(SlotName::Weight) && !enhanced.is_invalidated(SlotName::Weight) {
            if let Some(grams) = detectors::detect_weight_grams(text) {
                enhanced.set_weight(grams);
            }
        }

        restore_lost_keys(entities, &mut enhanced);

        let missing = self.missing_slots(&enhanced, text);
        let status = match missing.as_slice() {
            [] => ValidationStatus::Complete,
            [slot] if *slot != SlotName::Breed => ValidationStatus::IncompleteButProcessable,
            _ => ValidationStatus::NeedsFallback,
        };

        let message = match status {
            ValidationStatus::Complete => String::new(),
            ValidationStatus::IncompleteButProcessable => {
                messages::processable_hint(&missing, query.language())
            },
            ValidationStatus::NeedsFallback => {
                messages::clarification(&missing, query.language())
            },
        };

        tracing::debug!(
            status = ?status,
            missing = ?missing,
            "Entity validation finished"
        );

        ValidationResult {
            status,
            enhanced_entities: enhanced,
            missing,
            message,
        }
    }

    /// Sanity-check the slots that hold a value
    ///
    /// Diagnostic only; absent slots are not reported.
    pub fn validate_entity_values(&self, entities: &EntitySet) -> BTreeMap<SlotName, bool> {
        let mut checks = BTreeMap::new();

        if let Some(days) = entities.age_days {
            checks.insert(SlotName::AgeDays, days <= self.config.max_age_days);
        }
        if let Some(breed) = &entities.breed {
            checks.insert(SlotName::Breed, self.vocabulary.canonical_breed(breed).is_some());
        }
        if let Some(sex) = &entities.sex {
            checks.insert(SlotName::Sex, detectors::detect_sex(sex).is_some());
        }
        if let Some(metric) = &entities.metric_type {
            checks.insert(SlotName::MetricType, metrics::is_canonical(metric));
        }
        if let Some(grams) = entities.weight {
            checks.insert(SlotName::Weight, grams > 0.0);
        }

        checks
    }

    fn invalidate_impossible_values(&self, entities: &mut EntitySet) {
        if let Some(metric) = entities.metric_type.clone() {
            let token = normalize_token(&metric);
            if INVALID_METRIC_TOKENS.contains(&token.as_str()) || detectors::is_sex_label(&metric) {
                tracing::debug!(metric = %metric, "Clearing nonsensical metric value");
                entities.invalidate(SlotName::MetricType);
            } else if !metrics::is_canonical(&metric) {
                match detectors::detect_metric_type(&metric) {
                    Some(canonical) => entities.set_metric_type(canonical),
                    None => {
                        tracing::debug!(metric = %metric, "Clearing unrecognized metric value");
                        entities.invalidate(SlotName::MetricType);
                    },
                }
            }
        }

        if let Some(days) = entities.age_days {
            if days > self.config.max_age_days {
                tracing::debug!(age_days = days, "Clearing out-of-range age");
                entities.invalidate(SlotName::AgeDays);
            }
        }

        if let Some(breed) = entities.breed.clone() {
            if let Some(canonical) = self.vocabulary.canonical_breed(&breed) {
                if canonical != breed {
                    entities.set_breed(canonical.to_string());
                }
            }
        }
    }

    fn missing_slots(&self, entities: &EntitySet, text: &str) -> Vec<SlotName> {
        let general = !entities.has(SlotName::AgeDays) && detectors::is_general_question(text);

        REQUIRED_SLOTS
            .iter()
            .copied()
            .filter(|slot| !(general && matches!(slot, SlotName::Breed | SlotName::AgeDays)))
            .filter(|slot| !entities.has(*slot))
            .collect()
    }
}

impl Default for EntityValidator {
    fn default() -> Self {
        Self::new(ValidatorConfig::default(), &DomainVocabulary::default())
    }
}

fn normalize_token(value: &str) -> String {
    value
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() || c == '-' { '_' } else { c })
        .collect()
}

fn restore_lost_keys(input: &EntitySet, enhanced: &mut EntitySet) {
    let output_keys = enhanced.keys();
    for key in input.keys().difference(&output_keys) {
        tracing::warn!(key = %key, "Entity key lost during enrichment, restoring");
        enhanced.restore_key(input, key);
    }

    debug_assert!(input.keys().is_subset(&enhanced.keys()));
}
