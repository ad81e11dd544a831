//! Knowledge store search capability

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Language, Result};

/// Hybrid vector + keyword search over the domain knowledge store
#[async_trait]
pub trait ContentSearch: Send + Sync {
    /// Return up to `request.top_k` scored documents, best first
    async fn search(&self, request: &SearchRequest<'_>) -> Result<Vec<SearchHit>>;

    /// Name for logging
    fn name(&self) -> &str;
}

/// Search parameters
#[derive(Debug, Clone)]
pub struct SearchRequest<'a> {
    pub query: &'a str,
    pub language: &'a Language,
    pub top_k: usize,
    /// 0.0 = keyword only, 1.0 = vector only
    pub vector_keyword_balance: f32,
}

/// A scored document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Relevance score (0.0 - 1.0)
    pub score: f32,
    pub title: String,
    pub content: String,
}

impl SearchHit {
    pub fn new(score: f32, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            score,
            title: title.into(),
            content: content.into(),
        }
    }
}
