//! Configuration management for the poultry assistant
//!
//! Supports loading configuration from:
//! - YAML/TOML files (`config/default`, `config/{env}`)
//! - Environment variables (POULTRY_ASSISTANT__ prefix)
//! - A domain vocabulary YAML overriding the built-in keyword tables

pub mod constants;
pub mod settings;
pub mod vocabulary;

pub use settings::{
    load_settings, load_settings_from, CacheConfig, DecomposerConfig, GateConfig, LlmSettings,
    ObservabilityConfig, RuntimeEnvironment, Settings, ValidatorConfig,
};
pub use vocabulary::{load_vocabulary, BreedEntry, DomainVocabulary};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl From<ConfigError> for poultry_assistant_core::Error {
    fn from(err: ConfigError) -> Self {
        poultry_assistant_core::Error::Config(err.to_string())
    }
}
