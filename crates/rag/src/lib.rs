//! Domain admission and query decomposition
//!
//! Features:
//! - Two-stage domain gate (fast classifier, then knowledge store search)
//! - Shared TTL decision cache
//! - Multi-criteria query decomposition with bounded parallel execution
//! - Combine / compare / synthesize aggregation of sub-query answers

pub mod aggregation;
pub mod cache;
pub mod decomposer;
pub mod domain_gate;

pub use aggregation::{
    aggregate_results, AggregatedPayload, AggregatedResult, FactorAnswer, FailedFactor,
    PairwiseComparison, SubQueryError, SubQueryOutcome,
};
pub use cache::DecisionCache;
pub use decomposer::{
    AggregationStrategy, DecompositionResult, FactorSource, QueryDecomposer, SubQuery,
    SubQueryContext,
};
pub use domain_gate::{DomainGate, GateEvidence, GateMethod, OodDecision, ScoredDocument};
