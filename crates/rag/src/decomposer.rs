//! Multi-criteria query decomposition
//!
//! A question such as "Impact nutrition, température et densité sur FCR
//! mâles Ross 308" bundles three independent factors. Each factor becomes its
//! own sub-query carrying the metric, sex, breed and age of the original
//! question, sub-queries run through the injected executor, and the answers
//! are recombined by the chosen strategy.
//!
//! Decomposition needs extractable factors: a query that merely looks
//! complex but yields fewer than `min_factors` factors stays simple.

use futures::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use poultry_assistant_config::DecomposerConfig;
use poultry_assistant_core::SubQueryExecutor;
use poultry_assistant_text_processing::BreedMatcher;

use crate::aggregation::{aggregate_results, AggregatedResult, SubQueryError, SubQueryOutcome};

/// How sub-query answers are recombined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationStrategy {
    /// Simple query, nothing to recombine
    None,
    Combine,
    Compare,
    Synthesize,
}

impl AggregationStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Combine => "combine",
            Self::Compare => "compare",
            Self::Synthesize => "synthesize",
        }
    }
}

/// Where a factor came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorSource {
    /// Listed between "impact ... sur/on"
    ExplicitList,
    /// Matched by a factor category keyword
    Keyword,
    /// Simple query passed through unchanged
    Original,
}

/// Traceability data attached to a sub-query and its outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubQueryContext {
    pub factor: String,
    pub index: usize,
    pub source: FactorSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubQuery {
    pub text: String,
    pub context: SubQueryContext,
    pub priority: u8,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecompositionResult {
    pub is_complex: bool,
    pub original_query: String,
    pub sub_queries: Vec<SubQuery>,
    pub aggregation_strategy: AggregationStrategy,
}

const CONJUNCTION: &str = r"(?:et|and|ou|or)";

static COMPLEXITY_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // two or more conjunctions
        format!(r"(?i)\b{c}\b.*\b{c}\b", c = CONJUNCTION),
        // comma list of three items
        r"[^,]+,[^,]+,[^,]+".to_string(),
        // two items and a conjunction
        format!(r"(?i)\w+\s*,\s*\w+\s+{}\s+\w+", CONJUNCTION),
        // impact/effect construction followed by a list marker
        format!(
            r"(?i)\b(?:impacts?|effets?|effects?|influences?|rôle|role)\b[^?]*?(?:,|\b{}\b)",
            CONJUNCTION
        ),
        // several questions
        r"\?.*\?".to_string(),
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Factor categories used for complexity detection
static FACTOR_CATEGORIES: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    vec![
        (
            "nutrition",
            Regex::new(r"(?i)\b(?:nutrition\w*|alimentation|aliments?|feed(?:ing)?|diet|ration|régime|protéines?|proteins?|énergie|energy)\b").unwrap(),
        ),
        (
            "temperature",
            Regex::new(r"(?i)\b(?:températures?|temperatures?|chaleur|heat|froid|cold|thermique|thermal)\b").unwrap(),
        ),
        (
            "density",
            Regex::new(r"(?i)\b(?:densité|density|stocking|chargement)\b").unwrap(),
        ),
        (
            "lighting",
            Regex::new(r"(?i)\b(?:éclairage|lighting|lumière|light|photopériode|photoperiod|luminosité)\b").unwrap(),
        ),
        (
            "ventilation",
            Regex::new(r"(?i)\b(?:ventilation|aération|airflow|air\s+speed|vitesse\s+d'air)\b").unwrap(),
        ),
        (
            "humidity",
            Regex::new(r"(?i)\b(?:humidité|humidity|hygrométrie|hygrometry)\b").unwrap(),
        ),
        (
            "age",
            Regex::new(r"(?i)(?:\b\d{1,3}\s*(?:jours?|j|days?|semaines?|weeks?)\b|\bâge\b|\bage\b)").unwrap(),
        ),
        (
            "sex",
            Regex::new(r"(?i)\b(?:mâles?|femelles?|males?|females?|mixtes?|mixed|sexe|sex)\b").unwrap(),
        ),
        (
            "breed",
            Regex::new(r"(?i)\b(?:ross|cobb|hubbard|isa|lohmann|hy-?line|dekalb|novogen|race|breed|souche|strain)\b").unwrap(),
        ),
    ]
});

/// Only these categories become keyword factors
const ENVIRONMENT_FACTORS: [(&str, &str, &str); 6] = [
    ("nutrition", "nutrition", "nutrition"),
    ("temperature", "température", "temperature"),
    ("density", "densité", "density"),
    ("lighting", "éclairage", "lighting"),
    ("ventilation", "ventilation", "ventilation"),
    ("humidity", "humidité", "humidity"),
];

static EXPLICIT_LIST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:impacts?|effets?|effects?|influences?|rôle|role)\s+(?:(?:de\s+la|du|des|de|of\s+the|of)\s+|de\s+l'|d')?(.+?)\s+(?:sur|on)\b",
    )
    .unwrap()
});

static LIST_SEPARATOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)\s*,\s*(?:{c}\s+)?|\s+{c}\s+", c = CONJUNCTION)).unwrap()
});

static LEADING_ARTICLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:(?:de\s+la|la|le|les|du|des|de|the|a|an)\s+|de\s+l'|l'|d')+").unwrap()
});

static COMPARE_VOCABULARY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:compar\w*|vs\.?|versus|différences?|differences?|diferencias?)(?:\W|$)").unwrap()
});

static SYNTHESIZE_VOCABULARY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:overall|global\w*|synthèse|synthesis|synthesize)\b").unwrap()
});

static FRENCH_FUNCTION_WORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|\s)(?:le|la|les|du|des|de|sur|et|ou|pour|avec|quel|quelle|quels|quelles|est|à|au|aux|chez)(?:\s|$)").unwrap()
});

// Base-question components, matched on the original query as written
static METRIC_MENTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:indice\s+de\s+consommation|conversion\s+alimentaire|feed\s+conversion(?:\s+ratio)?|gain\s+moyen\s+quotidien|average\s+daily\s+gain|poids\s+vif|body\s+weight|consommation\s+d'(?:eau|aliment)|feed\s+intake|water\s+intake|fcr|gmq|adg|epef|poids|weight|mortalité|mortality|homogénéité|uniformity|rendement(?:\s+\w+)?|yield|ponte|egg\s+production)\b",
    )
    .unwrap()
});

static SEX_MENTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:mâles?|femelles?|males?|females?|mixtes?|mixed|as\s+hatched)\b").unwrap()
});

static AGE_MENTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:\b(?:à|at|a)\s+)?\b(?:\d{1,3}\s*(?:jours?|j|days?|semaines?|weeks?)|(?:jour|day|j|d)\s?\d{1,3})\b").unwrap()
});

static BREEDS: Lazy<BreedMatcher> = Lazy::new(BreedMatcher::default);

/// Query decomposer
#[derive(Debug, Clone, Default)]
pub struct QueryDecomposer {
    config: DecomposerConfig,
}

impl QueryDecomposer {
    pub fn new(config: DecomposerConfig) -> Self {
        Self { config }
    }

    /// Whether the query looks like it bundles several criteria
    pub fn detect_complexity(&self, query: &str) -> bool {
        if COMPLEXITY_PATTERNS.iter().any(|p| p.is_match(query)) {
            return true;
        }

        let categories = FACTOR_CATEGORIES
            .iter()
            .filter(|(_, pattern)| pattern.is_match(query))
            .count();
        categories >= 3
    }

    pub fn determine_aggregation_strategy(&self, query: &str) -> AggregationStrategy {
        if COMPARE_VOCABULARY.is_match(query) {
            AggregationStrategy::Compare
        } else if SYNTHESIZE_VOCABULARY.is_match(query) {
            AggregationStrategy::Synthesize
        } else {
            AggregationStrategy::Combine
        }
    }

    /// Split a query into factor sub-queries, or pass it through unchanged
    pub fn decompose(&self, query: &str) -> DecompositionResult {
        if !self.detect_complexity(query) {
            return Self::simple(query);
        }

        let Some((factors, source)) = self.extract_factors(query) else {
            tracing::debug!("Complex-looking query without extractable factors, keeping it whole");
            return Self::simple(query);
        };

        let french = is_french(query);
        let components = base_components(query);
        let sub_queries: Vec<SubQuery> = factors
            .into_iter()
            .enumerate()
            .map(|(index, factor)| SubQuery {
                text: sub_query_text(&factor, &components, french),
                context: SubQueryContext {
                    factor,
                    index,
                    source,
                },
                priority: 1,
                index,
            })
            .collect();

        let strategy = self.determine_aggregation_strategy(query);
        tracing::debug!(
            sub_queries = sub_queries.len(),
            strategy = strategy.as_str(),
            source = ?source,
            "Decomposed query"
        );

        DecompositionResult {
            is_complex: true,
            original_query: query.to_string(),
            sub_queries,
            aggregation_strategy: strategy,
        }
    }

    /// Run every sub-query through the executor
    ///
    /// Calls run concurrently up to `max_concurrency`, each under the
    /// executor timeout. Outcomes come back in `sub_query_index` order and a
    /// failing call only affects its own slot.
    pub async fn execute_subqueries(
        &self,
        sub_queries: &[SubQuery],
        executor: &dyn SubQueryExecutor,
    ) -> Vec<SubQueryOutcome> {
        let mut outcomes: Vec<SubQueryOutcome> = stream::iter(sub_queries)
            .map(|sub_query| self.execute_one(sub_query, executor))
            .buffer_unordered(self.config.max_concurrency.max(1))
            .collect()
            .await;

        outcomes.sort_by_key(|o| o.sub_query_index);
        outcomes
    }

    /// Run a single sub-query under the executor timeout
    pub async fn execute_one(&self, sub_query: &SubQuery, executor: &dyn SubQueryExecutor) -> SubQueryOutcome {
        let timeout = self.config.executor_timeout();
        let result = match tokio::time::timeout(timeout, executor.execute(&sub_query.text)).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => {
                tracing::warn!(index = sub_query.index, factor = %sub_query.context.factor, error = %e, "Sub-query failed");
                Err(SubQueryError::Executor {
                    message: e.to_string(),
                })
            },
            Err(_elapsed) => {
                tracing::warn!(index = sub_query.index, factor = %sub_query.context.factor, "Sub-query timed out");
                Err(SubQueryError::Timeout {
                    timeout_ms: timeout.as_millis() as u64,
                })
            },
        };

        SubQueryOutcome::new(sub_query, result)
    }

    pub fn aggregate_results(
        &self,
        results: Vec<SubQueryOutcome>,
        strategy: AggregationStrategy,
        original_query: &str,
    ) -> AggregatedResult {
        aggregate_results(results, strategy, original_query)
    }

    fn extract_factors(&self, query: &str) -> Option<(Vec<String>, FactorSource)> {
        let explicit = explicit_factors(query);
        if explicit.len() >= self.config.min_factors {
            return Some((explicit, FactorSource::ExplicitList));
        }

        let keyword = keyword_factors(query);
        if keyword.len() >= self.config.min_factors {
            return Some((keyword, FactorSource::Keyword));
        }

        None
    }

    fn simple(query: &str) -> DecompositionResult {
        DecompositionResult {
            is_complex: false,
            original_query: query.to_string(),
            sub_queries: vec![SubQuery {
                text: query.to_string(),
                context: SubQueryContext {
                    factor: String::new(),
                    index: 0,
                    source: FactorSource::Original,
                },
                priority: 1,
                index: 0,
            }],
            aggregation_strategy: AggregationStrategy::None,
        }
    }
}

fn explicit_factors(query: &str) -> Vec<String> {
    let Some(list) = EXPLICIT_LIST.captures(query).and_then(|c| c.get(1)) else {
        return Vec::new();
    };

    LIST_SEPARATOR
        .split(list.as_str())
        .map(|item| LEADING_ARTICLE.replace(item.trim(), "").trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

fn keyword_factors(query: &str) -> Vec<String> {
    let french = is_french(query);
    ENVIRONMENT_FACTORS
        .iter()
        .filter(|(category, _, _)| {
            FACTOR_CATEGORIES
                .iter()
                .any(|(name, pattern)| name == category && pattern.is_match(query))
        })
        .map(|(_, fr, en)| if french { fr.to_string() } else { en.to_string() })
        .collect()
}

fn is_french(query: &str) -> bool {
    FRENCH_FUNCTION_WORDS.is_match(query)
}

/// Metric, sex, breed and age as written in the query
fn base_components(query: &str) -> Vec<String> {
    let mut components = Vec::new();
    if let Some(m) = METRIC_MENTION.find(query) {
        components.push(m.as_str().to_string());
    }
    if let Some(m) = SEX_MENTION.find(query) {
        components.push(m.as_str().to_string());
    }
    if let Some(breed) = BREEDS.find_mention(query) {
        components.push(breed.to_string());
    }
    if let Some(m) = AGE_MENTION.find(query) {
        components.push(m.as_str().to_string());
    }
    components
}

fn sub_query_text(factor: &str, components: &[String], french: bool) -> String {
    match (french, components.is_empty()) {
        (true, false) => format!("Impact {} sur {}", factor, components.join(" ")),
        (true, true) => format!("Impact {} sur les performances", factor),
        (false, false) => format!("Impact of {} on {}", factor, components.join(" ")),
        (false, true) => format!("Impact of {} on performance", factor),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use poultry_assistant_core::{Error, ExecutorResponse, Result};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const FRENCH_EXAMPLE: &str = "Impact nutrition, température et densité sur FCR mâles Ross 308";

    #[test]
    fn test_french_example_decomposes_into_three_factors() {
        let decomposer = QueryDecomposer::default();

        assert!(decomposer.detect_complexity(FRENCH_EXAMPLE));

        let result = decomposer.decompose(FRENCH_EXAMPLE);
        assert!(result.is_complex);
        assert_eq!(result.aggregation_strategy, AggregationStrategy::Combine);

        let factors: Vec<_> = result.sub_queries.iter().map(|s| s.context.factor.as_str()).collect();
        assert_eq!(factors, vec!["nutrition", "température", "densité"]);

        assert_eq!(result.sub_queries.len(), 3);
        for (i, sub_query) in result.sub_queries.iter().enumerate() {
            assert!(sub_query.text.contains("FCR"), "{}", sub_query.text);
            assert!(sub_query.text.contains("Ross 308"), "{}", sub_query.text);
            assert!(sub_query.text.contains("mâles"), "{}", sub_query.text);
            assert!(sub_query.text.starts_with("Impact "));
            assert!(sub_query.text.contains(" sur "));
            assert_eq!(sub_query.index, i);
            assert_eq!(sub_query.priority, 1);
            assert_eq!(sub_query.context.source, FactorSource::ExplicitList);
        }
    }

    #[test]
    fn test_english_sub_query_phrasing() {
        let decomposer = QueryDecomposer::default();
        let result = decomposer.decompose("Effect of lighting and density on body weight of Cobb 500 females");

        assert!(result.is_complex);
        let texts: Vec<_> = result.sub_queries.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "Impact of lighting on body weight females Cobb 500",
                "Impact of density on body weight females Cobb 500",
            ]
        );
    }

    #[test]
    fn test_simple_query_is_passed_through() {
        let decomposer = QueryDecomposer::default();
        let query = "Quel poids pour Ross 308 à 35 jours ?";

        assert!(!decomposer.detect_complexity(query));
        let result = decomposer.decompose(query);

        assert!(!result.is_complex);
        assert_eq!(result.sub_queries.len(), 1);
        assert_eq!(result.sub_queries[0].text, query);
        assert_eq!(result.aggregation_strategy, AggregationStrategy::None);
    }

    #[test]
    fn test_complexity_without_factors_stays_simple() {
        let decomposer = QueryDecomposer::default();
        let query = "Poids et FCR et mortalité Ross 308";

        assert!(decomposer.detect_complexity(query));
        let result = decomposer.decompose(query);

        assert!(!result.is_complex);
        assert_eq!(result.sub_queries[0].text, query);
    }

    #[test]
    fn test_keyword_factors_in_declaration_order() {
        let decomposer = QueryDecomposer::default();
        let query = "Quelle humidité et quelle ventilation pour la température des poulets ?";

        let result = decomposer.decompose(query);

        assert!(result.is_complex);
        let factors: Vec<_> = result.sub_queries.iter().map(|s| s.context.factor.as_str()).collect();
        assert_eq!(factors, vec!["température", "ventilation", "humidité"]);
        assert!(result
            .sub_queries
            .iter()
            .all(|s| s.context.source == FactorSource::Keyword));
    }

    #[test]
    fn test_three_categories_trigger_complexity() {
        let decomposer = QueryDecomposer::default();
        assert!(decomposer.detect_complexity("lighting program Ross 308 males"));
    }

    #[test]
    fn test_multiple_question_marks_trigger_complexity() {
        let decomposer = QueryDecomposer::default();
        assert!(decomposer.detect_complexity("Quel poids ? Quelle mortalité ?"));
    }

    #[test]
    fn test_aggregation_strategy() {
        let decomposer = QueryDecomposer::default();
        assert_eq!(
            decomposer.determine_aggregation_strategy("Compare lighting vs density"),
            AggregationStrategy::Compare
        );
        assert_eq!(
            decomposer.determine_aggregation_strategy("Différence entre Ross et Cobb"),
            AggregationStrategy::Compare
        );
        assert_eq!(
            decomposer.determine_aggregation_strategy("Impact global de la nutrition et de la densité"),
            AggregationStrategy::Synthesize
        );
        assert_eq!(
            decomposer.determine_aggregation_strategy(FRENCH_EXAMPLE),
            AggregationStrategy::Combine
        );
    }

    /// Answers with the sub-query text, after a delay that shrinks with the index
    struct DelayedExecutor {
        calls: AtomicUsize,
        fail_on: Option<&'static str>,
    }

    #[async_trait]
    impl SubQueryExecutor for DelayedExecutor {
        async fn execute(&self, text: &str) -> Result<ExecutorResponse> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) as u64;
            tokio::time::sleep(Duration::from_millis(30u64.saturating_sub(call * 10))).await;
            if self.fail_on.is_some_and(|needle| text.contains(needle)) {
                return Err(Error::Executor("retrieval failed".to_string()));
            }
            Ok(ExecutorResponse::new(format!("answer: {}", text)))
        }
    }

    struct HangingExecutor;

    #[async_trait]
    impl SubQueryExecutor for HangingExecutor {
        async fn execute(&self, _text: &str) -> Result<ExecutorResponse> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(ExecutorResponse::new("too late"))
        }
    }

    #[tokio::test]
    async fn test_execution_preserves_order() {
        let decomposer = QueryDecomposer::default();
        let result = decomposer.decompose(FRENCH_EXAMPLE);
        let executor = DelayedExecutor {
            calls: AtomicUsize::new(0),
            fail_on: None,
        };

        let outcomes = decomposer.execute_subqueries(&result.sub_queries, &executor).await;

        assert_eq!(outcomes.len(), 3);
        for (i, (outcome, sub_query)) in outcomes.iter().zip(&result.sub_queries).enumerate() {
            assert_eq!(outcome.sub_query_index, i);
            assert_eq!(outcome.answer(), Some(format!("answer: {}", sub_query.text).as_str()));
        }
    }

    #[tokio::test]
    async fn test_partial_failure_is_isolated() {
        let decomposer = QueryDecomposer::default();
        let result = decomposer.decompose(FRENCH_EXAMPLE);
        let executor = DelayedExecutor {
            calls: AtomicUsize::new(0),
            fail_on: Some("température"),
        };

        let outcomes = decomposer.execute_subqueries(&result.sub_queries, &executor).await;
        assert!(outcomes[0].is_success());
        assert!(!outcomes[1].is_success());
        assert!(outcomes[2].is_success());
        assert_eq!(outcomes[1].sub_query_context.factor, "température");

        let aggregated = decomposer.aggregate_results(outcomes, result.aggregation_strategy, FRENCH_EXAMPLE);
        assert_eq!(aggregated.failed.len(), 1);
        assert_eq!(aggregated.results.len(), 3);
    }

    #[tokio::test]
    async fn test_timeout_becomes_sub_query_error() {
        let decomposer = QueryDecomposer::new(DecomposerConfig {
            executor_timeout_ms: 20,
            ..Default::default()
        });
        let result = decomposer.decompose(FRENCH_EXAMPLE);

        let outcomes = decomposer.execute_subqueries(&result.sub_queries, &HangingExecutor).await;

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes
            .iter()
            .all(|o| matches!(o.result, Err(SubQueryError::Timeout { timeout_ms: 20 }))));
    }
}
