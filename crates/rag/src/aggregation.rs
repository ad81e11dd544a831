//! Sub-query outcomes and their recombination

use serde::{Deserialize, Serialize};
use thiserror::Error;

use poultry_assistant_core::ExecutorResponse;

use crate::decomposer::{AggregationStrategy, SubQuery, SubQueryContext};

/// Why a single sub-query produced no answer
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubQueryError {
    #[error("Executor error: {message}")]
    Executor { message: String },

    #[error("Sub-query timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

/// Result of one executor call, tagged with the sub-query it answers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubQueryOutcome {
    pub sub_query: String,
    pub sub_query_index: usize,
    pub sub_query_context: SubQueryContext,
    pub result: Result<ExecutorResponse, SubQueryError>,
}

impl SubQueryOutcome {
    pub fn new(sub_query: &SubQuery, result: Result<ExecutorResponse, SubQueryError>) -> Self {
        Self {
            sub_query: sub_query.text.clone(),
            sub_query_index: sub_query.index,
            sub_query_context: sub_query.context.clone(),
            result,
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn answer(&self) -> Option<&str> {
        self.result.as_ref().ok().map(|r| r.answer.as_str())
    }
}

/// One factor's isolated answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorAnswer {
    pub factor: String,
    pub index: usize,
    pub answer: String,
}

/// A factor whose sub-query failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedFactor {
    pub factor: String,
    pub index: usize,
    pub sub_query: String,
    pub error: SubQueryError,
}

/// Side-by-side answers of two factors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairwiseComparison {
    pub factor_a: String,
    pub result_a: String,
    pub factor_b: String,
    pub result_b: String,
}

/// Strategy-specific view of the successful answers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AggregatedPayload {
    /// No sub-query succeeded
    AllFailed { errors: Vec<FailedFactor> },
    Combined { answers: Vec<FactorAnswer> },
    Compared { comparisons: Vec<PairwiseComparison> },
    /// Per-factor insights awaiting a downstream synthesis pass
    Synthesis {
        insights: Vec<FactorAnswer>,
        requires_synthesis: bool,
    },
}

/// Recombined answer of a decomposed query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedResult {
    pub strategy: AggregationStrategy,
    pub original_query: String,
    /// Every outcome, successes and failures, in sub-query order
    pub results: Vec<SubQueryOutcome>,
    pub payload: AggregatedPayload,
    pub failed: Vec<FailedFactor>,
}

impl AggregatedResult {
    pub fn is_all_failed(&self) -> bool {
        matches!(self.payload, AggregatedPayload::AllFailed { .. })
    }

    pub fn successful_count(&self) -> usize {
        self.results.iter().filter(|o| o.is_success()).count()
    }
}

/// Recombine sub-query outcomes according to `strategy`
///
/// Only successful outcomes feed the payload. Failures are listed in
/// `failed` whatever the strategy, and an all-failed batch yields an
/// explicit [`AggregatedPayload::AllFailed`] instead of an empty success.
pub fn aggregate_results(
    mut results: Vec<SubQueryOutcome>,
    strategy: AggregationStrategy,
    original_query: &str,
) -> AggregatedResult {
    results.sort_by_key(|o| o.sub_query_index);

    let mut answers = Vec::new();
    let mut failed = Vec::new();
    for outcome in &results {
        match &outcome.result {
            Ok(response) => answers.push(FactorAnswer {
                factor: outcome.sub_query_context.factor.clone(),
                index: outcome.sub_query_index,
                answer: response.answer.clone(),
            }),
            Err(error) => failed.push(FailedFactor {
                factor: outcome.sub_query_context.factor.clone(),
                index: outcome.sub_query_index,
                sub_query: outcome.sub_query.clone(),
                error: error.clone(),
            }),
        }
    }

    let payload = if answers.is_empty() {
        tracing::warn!(sub_queries = results.len(), "All sub-queries failed");
        AggregatedPayload::AllFailed {
            errors: failed.clone(),
        }
    } else {
        match strategy {
            AggregationStrategy::None | AggregationStrategy::Combine => {
                AggregatedPayload::Combined { answers }
            },
            AggregationStrategy::Compare => AggregatedPayload::Compared {
                comparisons: pairwise(&answers),
            },
            AggregationStrategy::Synthesize => AggregatedPayload::Synthesis {
                insights: answers,
                requires_synthesis: true,
            },
        }
    };

    tracing::debug!(
        strategy = strategy.as_str(),
        total = results.len(),
        failed = failed.len(),
        "Aggregated sub-query results"
    );

    AggregatedResult {
        strategy,
        original_query: original_query.to_string(),
        results,
        payload,
        failed,
    }
}

fn pairwise(answers: &[FactorAnswer]) -> Vec<PairwiseComparison> {
    let mut comparisons = Vec::new();
    for (i, a) in answers.iter().enumerate() {
        for b in &answers[i + 1..] {
            comparisons.push(PairwiseComparison {
                factor_a: a.factor.clone(),
                result_a: a.answer.clone(),
                factor_b: b.factor.clone(),
                result_b: b.answer.clone(),
            });
        }
    }
    comparisons
}
