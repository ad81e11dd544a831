//! Text processing for the poultry assistant
//!
//! This crate provides the entity side of query admission:
//! - **Slot detection**: breed, age, metric, sex and weight from free text
//! - **Entity validation**: repair impossible values, fill absent slots and
//!   grade completeness
//!
//! # Example
//!
//! ```ignore
//! use poultry_assistant_text_processing::EntityValidator;
//!
//! let validator = EntityValidator::default();
//! let result = validator.enhance(&entities, &query);
//! if result.needs_fallback() {
//!     println!("{}", result.message);
//! }
//! ```

pub mod entities;

pub use entities::detectors::{
    detect_age_days, detect_age_days_within, detect_breed, detect_metric_type, detect_sex,
    detect_weight_grams, is_general_question, BreedMatcher,
};
pub use entities::{EntityValidator, ValidationResult, ValidationStatus};
