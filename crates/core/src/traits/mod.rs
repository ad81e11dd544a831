//! Capability traits injected into the pipeline
//!
//! ```text
//! Admission:
//!   - Classifier: fast yes/no in-domain verdict with confidence
//!   - ContentSearch: hybrid vector+keyword search over the knowledge store
//!
//! Execution:
//!   - SubQueryExecutor: retrieval + generation for one (sub-)query
//! ```
//!
//! All three are implemented outside the pipeline; tests use mocks.

mod classifier;
mod executor;
mod search;

pub use classifier::{Classifier, ClassifierVerdict};
pub use executor::{ExecutorResponse, SubQueryExecutor};
pub use search::{ContentSearch, SearchHit, SearchRequest};
