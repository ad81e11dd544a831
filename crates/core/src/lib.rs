//! Core types and capability traits for the poultry assistant
//!
//! This crate provides the foundational types shared by every other crate:
//! - Error types
//! - Query language and the immutable [`Query`] value
//! - Typed entity slots ([`EntitySet`])
//! - Capability traits injected into the pipeline (classifier, content
//!   search, sub-query executor)

pub mod entities;
pub mod error;
pub mod language;
pub mod query;
pub mod traits;

pub use entities::{EntitySet, SlotName};
pub use error::{Error, Result};
pub use language::Language;
pub use query::Query;

pub use traits::{
    Classifier, ClassifierVerdict, ContentSearch, ExecutorResponse, SearchHit, SearchRequest,
    SubQueryExecutor,
};
