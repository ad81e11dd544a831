//! Two-stage domain admission
//!
//! Stage 1 asks a fast classifier. A confident "yes" is accepted at once, a
//! "no" on a query without any domain keyword is rejected at once. Everything
//! else goes to stage 2, which asks the knowledge store whether it actually
//! holds relevant content. Newly indexed topics become admissible without
//! touching the keyword tables.
//!
//! When both capabilities fail the gate rejects.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use poultry_assistant_config::{DomainVocabulary, GateConfig};
use poultry_assistant_core::{
    Classifier, ClassifierVerdict, ContentSearch, Error, Language, Query, SearchHit, SearchRequest,
};

use crate::cache::DecisionCache;

/// How a gate decision was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateMethod {
    FastAccept,
    FastReject,
    SearchFound,
    SearchNotFound,
    SearchLowScore,
    FallbackOnError,
}

impl GateMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FastAccept => "fast_accept",
            Self::FastReject => "fast_reject",
            Self::SearchFound => "search_found",
            Self::SearchNotFound => "search_not_found",
            Self::SearchLowScore => "search_low_score",
            Self::FallbackOnError => "fallback_on_error",
        }
    }
}

/// A scored document retained as evidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDocument {
    pub title: String,
    pub score: f32,
}

/// Diagnostic record attached to every decision
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GateEvidence {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classifier_verdict: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classifier_confidence: Option<f32>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub classifier_diagnostic: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classifier_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub top_documents: Vec<ScoredDocument>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword_hit: Option<String>,
    pub cache_hit: bool,
    pub elapsed_ms: u64,
}

/// Out-of-domain decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OodDecision {
    is_in_domain: bool,
    confidence: f32,
    method: GateMethod,
    evidence: GateEvidence,
}

impl OodDecision {
    pub fn new(is_in_domain: bool, confidence: f32, method: GateMethod, evidence: GateEvidence) -> Self {
        Self {
            is_in_domain,
            confidence: if confidence.is_nan() { 0.0 } else { confidence.clamp(0.0, 1.0) },
            method,
            evidence,
        }
    }

    pub fn is_in_domain(&self) -> bool {
        self.is_in_domain
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn method(&self) -> GateMethod {
        self.method
    }

    pub fn evidence(&self) -> &GateEvidence {
        &self.evidence
    }

    fn into_cache_hit(mut self) -> Self {
        self.evidence.cache_hit = true;
        self
    }
}

/// Domain admission gate
pub struct DomainGate {
    classifier: Arc<dyn Classifier>,
    search: Arc<dyn ContentSearch>,
    config: GateConfig,
    vocabulary: DomainVocabulary,
    cache: Option<Arc<DecisionCache>>,
}

impl DomainGate {
    pub fn new(
        classifier: Arc<dyn Classifier>,
        search: Arc<dyn ContentSearch>,
        config: GateConfig,
        vocabulary: DomainVocabulary,
    ) -> Self {
        Self {
            classifier,
            search,
            config,
            vocabulary,
            cache: None,
        }
    }

    /// Share a decision cache with this gate
    pub fn with_cache(mut self, cache: Arc<DecisionCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Decide whether a query belongs to the poultry domain
    pub async fn admit(&self, query: &str, language: &Language) -> OodDecision {
        self.evaluate(query, language, None).await
    }

    /// Same as [`admit`](Self::admit), forwarding the query's prior intent to the classifier
    pub async fn admit_query(&self, query: &Query) -> OodDecision {
        self.evaluate(query.text(), query.language(), query.prior_intent())
            .await
    }

    async fn evaluate(
        &self,
        query: &str,
        language: &Language,
        prior_intent: Option<&serde_json::Value>,
    ) -> OodDecision {
        let start = Instant::now();
        let cache_key = DecisionCache::key(query, language);

        if let Some(cached) = self.cache.as_ref().and_then(|cache| cache.get(&cache_key)) {
            tracing::debug!(method = cached.method().as_str(), "Domain decision served from cache");
            record_decision(cached.method());
            return cached.into_cache_hit();
        }

        let mut evidence = GateEvidence {
            keyword_hit: self.vocabulary.matched_keyword(query).map(str::to_string),
            ..Default::default()
        };

        // Stage 1: classifier
        let verdict = self.classify(query, language, prior_intent, &mut evidence).await;
        let classifier_says = verdict.as_ref().and_then(|v| v.verdict.map(|b| (b, v.confidence)));

        match classifier_says {
            Some((true, confidence)) if confidence >= self.config.high_confidence_threshold => {
                let decision = OodDecision::new(true, confidence, GateMethod::FastAccept, evidence);
                return self.finish(decision, cache_key, start);
            },
            Some((false, _)) if evidence.keyword_hit.is_none() => {
                let decision = OodDecision::new(false, 0.0, GateMethod::FastReject, evidence);
                return self.finish(decision, cache_key, start);
            },
            _ => {},
        }

        // Stage 2: knowledge store
        let request = SearchRequest {
            query,
            language,
            top_k: self.config.top_k,
            vector_keyword_balance: self.config.vector_keyword_balance,
        };

        let decision = match self.search_with_timeout(&request).await {
            Ok(hits) => self.decide_from_hits(hits, evidence),
            Err(e) => {
                tracing::warn!(
                    search = self.search.name(),
                    error = %e,
                    classifier_failed = evidence.classifier_error.is_some(),
                    "Content search failed, falling back to classifier verdict"
                );
                evidence.search_error = Some(e.to_string());
                match classifier_says {
                    Some((true, confidence)) => {
                        OodDecision::new(true, confidence, GateMethod::FallbackOnError, evidence)
                    },
                    _ => OodDecision::new(false, 0.0, GateMethod::FallbackOnError, evidence),
                }
            },
        };

        self.finish(decision, cache_key, start)
    }

    async fn classify(
        &self,
        query: &str,
        language: &Language,
        prior_intent: Option<&serde_json::Value>,
        evidence: &mut GateEvidence,
    ) -> Option<ClassifierVerdict> {
        let timeout = self.config.classifier_timeout();
        let result = match tokio::time::timeout(
            timeout,
            self.classifier.classify(query, language, prior_intent),
        )
        .await
        {
            Ok(result) => result,
            Err(_elapsed) => Err(Error::timeout("classifier", timeout)),
        };

        match result {
            Ok(verdict) => {
                evidence.classifier_verdict = verdict.verdict;
                evidence.classifier_confidence = Some(verdict.confidence);
                evidence.classifier_diagnostic = verdict.diagnostic.clone();
                Some(verdict)
            },
            Err(e) => {
                tracing::warn!(
                    classifier = self.classifier.name(),
                    error = %e,
                    "Classifier failed, continuing with content search"
                );
                evidence.classifier_error = Some(e.to_string());
                None
            },
        }
    }

    async fn search_with_timeout(
        &self,
        request: &SearchRequest<'_>,
    ) -> poultry_assistant_core::Result<Vec<SearchHit>> {
        let timeout = self.config.search_timeout();
        match tokio::time::timeout(timeout, self.search.search(request)).await {
            Ok(result) => result,
            Err(_elapsed) => Err(Error::timeout("content_search", timeout)),
        }
    }

    fn decide_from_hits(&self, mut hits: Vec<SearchHit>, mut evidence: GateEvidence) -> OodDecision {
        let returned = hits.len();
        hits.retain(|hit| hit.score.is_finite());
        if hits.len() < returned {
            tracing::warn!(dropped = returned - hits.len(), "Ignoring search hits with non-finite scores");
        }

        if hits.is_empty() {
            return OodDecision::new(false, 0.0, GateMethod::SearchNotFound, evidence);
        }

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        let max_score = hits[0].score;

        evidence.top_documents = hits
            .iter()
            .take(self.config.top_k)
            .map(|hit| ScoredDocument {
                title: hit.title.clone(),
                score: hit.score,
            })
            .collect();

        if max_score >= self.config.score_threshold {
            OodDecision::new(true, max_score, GateMethod::SearchFound, evidence)
        } else {
            OodDecision::new(false, max_score, GateMethod::SearchLowScore, evidence)
        }
    }

    fn finish(&self, mut decision: OodDecision, cache_key: String, start: Instant) -> OodDecision {
        decision.evidence.elapsed_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            in_domain = decision.is_in_domain,
            confidence = decision.confidence,
            method = decision.method.as_str(),
            keyword_hit = decision.evidence.keyword_hit.as_deref(),
            elapsed_ms = decision.evidence.elapsed_ms,
            "Domain gate decision"
        );
        record_decision(decision.method);

        if decision.method != GateMethod::FallbackOnError {
            if let Some(cache) = &self.cache {
                cache.insert(cache_key, decision.clone());
            }
        }

        decision
    }
}

fn record_decision(method: GateMethod) {
    metrics::counter!("domain_gate_decisions_total", "method" => method.as_str()).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    enum ClassifierScript {
        Verdict(ClassifierVerdict),
        Fail,
        Hang,
    }

    struct StubClassifier {
        script: ClassifierScript,
        calls: AtomicUsize,
        last_intent: Mutex<Option<serde_json::Value>>,
    }

    impl StubClassifier {
        fn new(script: ClassifierScript) -> Arc<Self> {
            Arc::new(Self {
                script,
                calls: AtomicUsize::new(0),
                last_intent: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl Classifier for StubClassifier {
        async fn classify(
            &self,
            _query: &str,
            _language: &Language,
            prior_intent: Option<&serde_json::Value>,
        ) -> poultry_assistant_core::Result<ClassifierVerdict> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_intent.lock().unwrap() = prior_intent.cloned();
            match &self.script {
                ClassifierScript::Verdict(v) => Ok(v.clone()),
                ClassifierScript::Fail => Err(Error::Classifier("model unavailable".to_string())),
                ClassifierScript::Hang => {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(ClassifierVerdict::in_domain(1.0))
                },
            }
        }

        fn name(&self) -> &str {
            "stub"
        }
    }

    enum SearchScript {
        Hits(Vec<SearchHit>),
        Fail,
        Unreachable,
    }

    struct StubSearch {
        script: SearchScript,
        calls: AtomicUsize,
    }

    impl StubSearch {
        fn new(script: SearchScript) -> Arc<Self> {
            Arc::new(Self {
                script,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ContentSearch for StubSearch {
        async fn search(&self, _request: &SearchRequest<'_>) -> poultry_assistant_core::Result<Vec<SearchHit>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.script {
                SearchScript::Hits(hits) => Ok(hits.clone()),
                SearchScript::Fail => Err(Error::Search("index offline".to_string())),
                SearchScript::Unreachable => panic!("content search must not be called"),
            }
        }

        fn name(&self) -> &str {
            "stub"
        }
    }

    fn gate(classifier: Arc<StubClassifier>, search: Arc<StubSearch>) -> DomainGate {
        let config = GateConfig {
            classifier_timeout_ms: 50,
            search_timeout_ms: 50,
            ..Default::default()
        };
        DomainGate::new(classifier, search, config, DomainVocabulary::default())
    }

    #[tokio::test]
    async fn test_fast_accept_skips_search() {
        let classifier = StubClassifier::new(ClassifierScript::Verdict(ClassifierVerdict::in_domain(0.95)));
        let search = StubSearch::new(SearchScript::Unreachable);
        let gate = gate(classifier, search.clone());

        let decision = gate.admit("Poids Ross 308 à 35 jours", &Language::French).await;

        assert!(decision.is_in_domain());
        assert_eq!(decision.method(), GateMethod::FastAccept);
        assert!((decision.confidence() - 0.95).abs() < f32::EPSILON);
        assert_eq!(search.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fast_reject_without_keywords() {
        let classifier = StubClassifier::new(ClassifierScript::Verdict(ClassifierVerdict::out_of_domain(0.9)));
        let search = StubSearch::new(SearchScript::Unreachable);
        let gate = gate(classifier, search);

        let decision = gate
            .admit("Quelle est la capitale de la France ?", &Language::French)
            .await;

        assert!(!decision.is_in_domain());
        assert_eq!(decision.method(), GateMethod::FastReject);
        assert_eq!(decision.confidence(), 0.0);
    }

    #[tokio::test]
    async fn test_negative_verdict_with_keyword_goes_to_search() {
        let classifier = StubClassifier::new(ClassifierScript::Verdict(ClassifierVerdict::out_of_domain(0.9)));
        let search = StubSearch::new(SearchScript::Hits(vec![
            SearchHit::new(0.55, "Litter management", "..."),
            SearchHit::new(0.82, "Coccidiosis in broilers", "..."),
        ]));
        let gate = gate(classifier, search.clone());

        let decision = gate
            .admit("Mes poulets ont la diarrhée", &Language::French)
            .await;

        assert_eq!(search.calls.load(Ordering::SeqCst), 1);
        assert!(decision.is_in_domain());
        assert_eq!(decision.method(), GateMethod::SearchFound);
        assert!((decision.confidence() - 0.82).abs() < f32::EPSILON);
        assert_eq!(decision.evidence().top_documents[0].title, "Coccidiosis in broilers");
        assert_eq!(decision.evidence().keyword_hit.as_deref(), Some("poulet"));
    }

    #[tokio::test]
    async fn test_low_score_rejects() {
        let classifier = StubClassifier::new(ClassifierScript::Verdict(ClassifierVerdict::in_domain(0.6)));
        let search = StubSearch::new(SearchScript::Hits(vec![SearchHit::new(0.4, "Hatchery", "...")]));
        let gate = gate(classifier, search);

        let decision = gate.admit("incubation humidity", &Language::English).await;

        assert!(!decision.is_in_domain());
        assert_eq!(decision.method(), GateMethod::SearchLowScore);
        assert!((decision.confidence() - 0.4).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_no_results_rejects() {
        let classifier = StubClassifier::new(ClassifierScript::Verdict(ClassifierVerdict::unknown()));
        let search = StubSearch::new(SearchScript::Hits(Vec::new()));
        let gate = gate(classifier, search);

        let decision = gate.admit("quantum flux capacitor", &Language::English).await;

        assert!(!decision.is_in_domain());
        assert_eq!(decision.method(), GateMethod::SearchNotFound);
    }

    #[tokio::test]
    async fn test_non_finite_scores_are_ignored() {
        let classifier = StubClassifier::new(ClassifierScript::Verdict(ClassifierVerdict::unknown()));
        let search = StubSearch::new(SearchScript::Hits(vec![
            SearchHit::new(f32::NAN, "corrupt", ""),
            SearchHit::new(0.5, "incubation guide", "humidity 55%"),
        ]));
        let gate = gate(classifier, search);

        let decision = gate.admit("incubation humidity", &Language::English).await;

        assert_eq!(decision.method(), GateMethod::SearchLowScore);
        assert!((decision.confidence() - 0.5).abs() < f32::EPSILON);
        assert_eq!(decision.evidence().top_documents.len(), 1);
    }

    #[tokio::test]
    async fn test_only_non_finite_scores_is_not_found() {
        let classifier = StubClassifier::new(ClassifierScript::Verdict(ClassifierVerdict::unknown()));
        let search = StubSearch::new(SearchScript::Hits(vec![
            SearchHit::new(f32::NAN, "corrupt", ""),
            SearchHit::new(f32::INFINITY, "corrupt", ""),
        ]));
        let gate = gate(classifier, search);

        let decision = gate.admit("incubation humidity", &Language::English).await;

        assert!(!decision.is_in_domain());
        assert_eq!(decision.method(), GateMethod::SearchNotFound);
        assert_eq!(decision.confidence(), 0.0);
    }

    #[tokio::test]
    async fn test_total_failure_fails_closed() {
        let classifier = StubClassifier::new(ClassifierScript::Fail);
        let search = StubSearch::new(SearchScript::Fail);
        let gate = gate(classifier, search);

        let decision = gate.admit("Poids Ross 308", &Language::French).await;

        assert!(!decision.is_in_domain());
        assert_eq!(decision.method(), GateMethod::FallbackOnError);
        assert_eq!(decision.confidence(), 0.0);
        assert!(decision.evidence().classifier_error.is_some());
        assert!(decision.evidence().search_error.is_some());
    }

    #[tokio::test]
    async fn test_search_failure_keeps_classifier_yes() {
        let classifier = StubClassifier::new(ClassifierScript::Verdict(ClassifierVerdict::in_domain(0.7)));
        let search = StubSearch::new(SearchScript::Fail);
        let gate = gate(classifier, search);

        let decision = gate.admit("ventilation tunnel", &Language::French).await;

        assert!(decision.is_in_domain());
        assert_eq!(decision.method(), GateMethod::FallbackOnError);
        assert!((decision.confidence() - 0.7).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_classifier_timeout_falls_through_to_search() {
        let classifier = StubClassifier::new(ClassifierScript::Hang);
        let search = StubSearch::new(SearchScript::Hits(vec![SearchHit::new(0.9, "Ross 308 objectives", "...")]));
        let gate = gate(classifier, search);

        let decision = gate.admit("Ross 308 objectifs", &Language::French).await;

        assert!(decision.is_in_domain());
        assert_eq!(decision.method(), GateMethod::SearchFound);
        let error = decision.evidence().classifier_error.as_deref().unwrap_or_default();
        assert!(error.contains("timed out"));
    }

    #[tokio::test]
    async fn test_cache_hit_skips_capabilities() {
        let classifier = StubClassifier::new(ClassifierScript::Verdict(ClassifierVerdict::in_domain(0.95)));
        let search = StubSearch::new(SearchScript::Unreachable);
        let cache = Arc::new(DecisionCache::new(100, Duration::from_secs(60)));
        let gate = gate(classifier.clone(), search).with_cache(cache.clone());

        let first = gate.admit("Poids Ross 308", &Language::French).await;
        let second = gate.admit("  poids ROSS 308 ", &Language::French).await;

        assert!(!first.evidence().cache_hit);
        assert!(second.evidence().cache_hit);
        assert_eq!(second.method(), GateMethod::FastAccept);
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_fallback_decisions_are_not_cached() {
        let classifier = StubClassifier::new(ClassifierScript::Fail);
        let search = StubSearch::new(SearchScript::Fail);
        let cache = Arc::new(DecisionCache::new(100, Duration::from_secs(60)));
        let gate = gate(classifier.clone(), search).with_cache(cache.clone());

        gate.admit("Poids Ross 308", &Language::French).await;
        gate.admit("Poids Ross 308", &Language::French).await;

        assert!(cache.is_empty());
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_admit_query_forwards_prior_intent() {
        let classifier = StubClassifier::new(ClassifierScript::Verdict(ClassifierVerdict::in_domain(0.99)));
        let search = StubSearch::new(SearchScript::Unreachable);
        let gate = gate(classifier.clone(), search);

        let query = Query::new("FCR Cobb 500", "fr")
            .with_prior_intent(serde_json::json!({"intent": "performance_lookup"}));
        gate.admit_query(&query).await;

        let intent = classifier.last_intent.lock().unwrap().clone();
        assert_eq!(intent, Some(serde_json::json!({"intent": "performance_lookup"})));
    }
}
