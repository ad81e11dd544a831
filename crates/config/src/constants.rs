//! Centralized defaults for the admission pipeline
//!
//! Single source of truth for thresholds and timeouts; the serde default
//! functions in `settings` and the component constructors read from here.

/// Domain gate thresholds and search parameters
pub mod gate {
    /// Classifier confidence at or above which an in-domain verdict is final
    pub const HIGH_CONFIDENCE_THRESHOLD: f32 = 0.9;

    /// Best search score at or above which the query is admitted
    pub const SCORE_THRESHOLD: f32 = 0.7;

    /// Documents requested from content search
    pub const TOP_K: usize = 5;

    /// 0.0 = keyword only, 1.0 = vector only
    pub const VECTOR_KEYWORD_BALANCE: f32 = 0.5;

    /// Classifier round trip is ~100ms in practice
    pub const CLASSIFIER_TIMEOUT_MS: u64 = 1_500;

    /// Hybrid search round trip is ~200ms in practice
    pub const SEARCH_TIMEOUT_MS: u64 = 2_500;
}

/// Decision cache bounds
pub mod cache {
    pub const MAX_ENTRIES: usize = 10_000;
    pub const TTL_SECS: u64 = 3_600;
}

/// Entity validation
pub mod validator {
    /// Upper bound of a plausible age in days
    pub const MAX_AGE_DAYS: u32 = 100;
}

/// Query decomposition and sub-query execution
pub mod decomposer {
    /// Retrieval + generation for one sub-query
    pub const EXECUTOR_TIMEOUT_MS: u64 = 30_000;

    /// Concurrent executor calls per request
    pub const MAX_CONCURRENCY: usize = 4;

    /// Factors needed before a query is split
    pub const MIN_FACTORS: usize = 2;
}

/// Service endpoints (defaults for local development)
pub mod endpoints {
    /// Ollama LLM endpoint
    pub const OLLAMA_DEFAULT: &str = "http://localhost:11434";
}
