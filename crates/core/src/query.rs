//! Incoming query value

use serde::{Deserialize, Serialize};

use crate::{EntitySet, Language};

/// A user query entering the admission pipeline
///
/// Immutable once built; every stage borrows it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    text: String,
    language: Language,
    #[serde(default)]
    entities: Option<EntitySet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    prior_intent: Option<serde_json::Value>,
}

impl Query {
    /// Create a query from raw text and an ISO language code
    pub fn new(text: impl Into<String>, language: impl Into<Language>) -> Self {
        Self {
            text: text.into(),
            language: language.into(),
            entities: None,
            prior_intent: None,
        }
    }

    /// Attach entities extracted upstream
    pub fn with_entities(mut self, entities: EntitySet) -> Self {
        self.entities = Some(entities);
        self
    }

    /// Attach a prior intent classification
    pub fn with_prior_intent(mut self, intent: serde_json::Value) -> Self {
        self.prior_intent = Some(intent);
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn language(&self) -> &Language {
        &self.language
    }

    pub fn entities(&self) -> Option<&EntitySet> {
        self.entities.as_ref()
    }

    pub fn prior_intent(&self) -> Option<&serde_json::Value> {
        self.prior_intent.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_builder() {
        let mut entities = EntitySet::default();
        entities.breed = Some("Ross 308".to_string());

        let query = Query::new("Quel poids à 21 jours ?", "fr")
            .with_entities(entities)
            .with_prior_intent(serde_json::json!({"intent": "performance"}));

        assert_eq!(query.language(), &Language::French);
        assert_eq!(query.entities().and_then(|e| e.breed.as_deref()), Some("Ross 308"));
        assert!(query.prior_intent().is_some());
    }
}
