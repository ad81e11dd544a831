//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::{cache, decomposer, endpoints, gate, validator};
use crate::ConfigError;

/// Runtime environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    /// Relaxed validation, warnings only
    #[default]
    Development,
    /// Stricter validation
    Staging,
    /// All validations enforced
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    pub fn is_strict(&self) -> bool {
        matches!(self, Self::Production | Self::Staging)
    }
}

/// Application settings for the admission pipeline
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    /// Domain gate configuration
    #[serde(default)]
    pub gate: GateConfig,

    /// Entity validator configuration
    #[serde(default)]
    pub validator: ValidatorConfig,

    /// Decomposer / sub-query execution configuration
    #[serde(default)]
    pub decomposer: DecomposerConfig,

    /// LLM classifier backend
    #[serde(default)]
    pub llm: LlmSettings,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Optional YAML file overriding the built-in domain vocabulary
    #[serde(default)]
    pub vocabulary_path: Option<String>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_gate()?;
        self.validate_decomposer()?;
        self.validate_validator()?;
        self.validate_llm()?;
        Ok(())
    }

    fn validate_gate(&self) -> Result<(), ConfigError> {
        let gate = &self.gate;

        for (field, value) in [
            ("gate.high_confidence_threshold", gate.high_confidence_threshold),
            ("gate.score_threshold", gate.score_threshold),
            ("gate.vector_keyword_balance", gate.vector_keyword_balance),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    message: format!("Must be between 0.0 and 1.0, got {}", value),
                });
            }
        }

        if gate.top_k == 0 {
            return Err(ConfigError::InvalidValue {
                field: "gate.top_k".to_string(),
                message: "Must be at least 1".to_string(),
            });
        }

        if gate.classifier_timeout_ms == 0 || gate.search_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "gate.*_timeout_ms".to_string(),
                message: "Timeouts must be at least 1ms".to_string(),
            });
        }

        if gate.cache.enabled && gate.cache.max_entries == 0 {
            return Err(ConfigError::InvalidValue {
                field: "gate.cache.max_entries".to_string(),
                message: "Must be at least 1 when the cache is enabled".to_string(),
            });
        }

        if gate.score_threshold > gate.high_confidence_threshold {
            tracing::warn!(
                score_threshold = gate.score_threshold,
                high_confidence_threshold = gate.high_confidence_threshold,
                "Search admission threshold is stricter than the classifier fast path"
            );
        }

        Ok(())
    }

    fn validate_decomposer(&self) -> Result<(), ConfigError> {
        let decomposer = &self.decomposer;

        if decomposer.max_concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                field: "decomposer.max_concurrency".to_string(),
                message: "Must be at least 1".to_string(),
            });
        }

        if decomposer.executor_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "decomposer.executor_timeout_ms".to_string(),
                message: "Timeout must be at least 1ms".to_string(),
            });
        }

        if decomposer.min_factors < 2 {
            return Err(ConfigError::InvalidValue {
                field: "decomposer.min_factors".to_string(),
                message: format!("A split needs at least 2 factors, got {}", decomposer.min_factors),
            });
        }

        Ok(())
    }

    fn validate_validator(&self) -> Result<(), ConfigError> {
        if self.validator.max_age_days == 0 {
            return Err(ConfigError::InvalidValue {
                field: "validator.max_age_days".to_string(),
                message: "Must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    fn validate_llm(&self) -> Result<(), ConfigError> {
        if self.llm.endpoint.trim().is_empty() {
            if self.environment.is_strict() {
                return Err(ConfigError::MissingField("llm.endpoint".to_string()));
            }
            tracing::warn!("llm.endpoint not configured; the LLM classifier cannot be built");
        }
        Ok(())
    }
}

/// Domain gate configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Classifier confidence that short-circuits to admission
    #[serde(default = "default_high_confidence_threshold")]
    pub high_confidence_threshold: f32,

    /// Minimum best-document score for search-based admission
    #[serde(default = "default_score_threshold")]
    pub score_threshold: f32,

    /// Documents requested from content search
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Vector/keyword balance passed to content search
    #[serde(default = "default_vector_keyword_balance")]
    pub vector_keyword_balance: f32,

    #[serde(default = "default_classifier_timeout_ms")]
    pub classifier_timeout_ms: u64,

    #[serde(default = "default_search_timeout_ms")]
    pub search_timeout_ms: u64,

    /// Decision cache
    #[serde(default)]
    pub cache: CacheConfig,
}

fn default_high_confidence_threshold() -> f32 {
    gate::HIGH_CONFIDENCE_THRESHOLD
}
fn default_score_threshold() -> f32 {
    gate::SCORE_THRESHOLD
}
fn default_top_k() -> usize {
    gate::TOP_K
}
fn default_vector_keyword_balance() -> f32 {
    gate::VECTOR_KEYWORD_BALANCE
}
fn default_classifier_timeout_ms() -> u64 {
    gate::CLASSIFIER_TIMEOUT_MS
}
fn default_search_timeout_ms() -> u64 {
    gate::SEARCH_TIMEOUT_MS
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            high_confidence_threshold: default_high_confidence_threshold(),
            score_threshold: default_score_threshold(),
            top_k: default_top_k(),
            vector_keyword_balance: default_vector_keyword_balance(),
            classifier_timeout_ms: default_classifier_timeout_ms(),
            search_timeout_ms: default_search_timeout_ms(),
            cache: CacheConfig::default(),
        }
    }
}

impl GateConfig {
    pub fn classifier_timeout(&self) -> Duration {
        Duration::from_millis(self.classifier_timeout_ms)
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_millis(self.search_timeout_ms)
    }
}

/// Decision cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_cache_max_entries")]
    pub max_entries: usize,

    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_true() -> bool {
    true
}
fn default_cache_max_entries() -> usize {
    cache::MAX_ENTRIES
}
fn default_cache_ttl_secs() -> u64 {
    cache::TTL_SECS
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: default_cache_max_entries(),
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Entity validator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorConfig {
    /// Ages above this many days are treated as invalid
    #[serde(default = "default_max_age_days")]
    pub max_age_days: u32,
}

fn default_max_age_days() -> u32 {
    validator::MAX_AGE_DAYS
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            max_age_days: default_max_age_days(),
        }
    }
}

/// Decomposer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecomposerConfig {
    #[serde(default = "default_executor_timeout_ms")]
    pub executor_timeout_ms: u64,

    /// Sub-queries executed concurrently (1 = sequential)
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Factors required before a query is split
    #[serde(default = "default_min_factors")]
    pub min_factors: usize,
}

fn default_executor_timeout_ms() -> u64 {
    decomposer::EXECUTOR_TIMEOUT_MS
}
fn default_max_concurrency() -> usize {
    decomposer::MAX_CONCURRENCY
}
fn default_min_factors() -> usize {
    decomposer::MIN_FACTORS
}

impl Default for DecomposerConfig {
    fn default() -> Self {
        Self {
            executor_timeout_ms: default_executor_timeout_ms(),
            max_concurrency: default_max_concurrency(),
            min_factors: default_min_factors(),
        }
    }
}

impl DecomposerConfig {
    pub fn executor_timeout(&self) -> Duration {
        Duration::from_millis(self.executor_timeout_ms)
    }
}

/// LLM backend used by the domain classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    #[serde(default = "default_llm_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_llm_max_retries")]
    pub max_retries: u32,
}

fn default_llm_endpoint() -> String {
    endpoints::OLLAMA_DEFAULT.to_string()
}
fn default_llm_model() -> String {
    "qwen2.5:3b-instruct".to_string()
}
fn default_llm_timeout_ms() -> u64 {
    gate::CLASSIFIER_TIMEOUT_MS
}
fn default_llm_max_retries() -> u32 {
    1
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            endpoint: default_llm_endpoint(),
            model: default_llm_model(),
            timeout_ms: default_llm_timeout_ms(),
            max_retries: default_llm_max_retries(),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub log_json: bool,

    /// Emit `metrics` counters
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            metrics_enabled: true,
        }
    }
}

/// Load settings from files and environment
///
/// Sources, later ones overriding earlier ones:
/// 1. `config/default.{yaml,toml,json}`
/// 2. `config/{env}.{yaml,toml,json}`
/// 3. `POULTRY_ASSISTANT__*` environment variables (`__` separates sections)
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    load_settings_from("config", env)
}

/// Same as [`load_settings`] with an explicit configuration directory
pub fn load_settings_from(dir: &str, env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name(&format!("{}/default", dir)).required(false));

    if let Some(env_name) = env {
        builder =
            builder.add_source(File::with_name(&format!("{}/{}", dir, env_name)).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("POULTRY_ASSISTANT")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    Ok(settings)
}
