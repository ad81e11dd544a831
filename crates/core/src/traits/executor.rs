//! Sub-query execution capability

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::Result;

/// Retrieval + generation for a single query text
///
/// The decomposer calls this once per sub-query; the coordinator calls it
/// directly for simple queries.
#[async_trait]
pub trait SubQueryExecutor: Send + Sync {
    async fn execute(&self, text: &str) -> Result<ExecutorResponse>;
}

/// Opaque executor answer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutorResponse {
    /// Generated answer (or retrieved content when no generation ran)
    pub answer: String,
    /// Anything else the executor reports (sources, scores, timings)
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl ExecutorResponse {
    pub fn new(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Read a JSON object carrying either an `answer` or a `content` field
    pub fn from_json(value: serde_json::Value) -> Option<Self> {
        let serde_json::Value::Object(mut map) = value else {
            return None;
        };

        let answer = map
            .remove("answer")
            .or_else(|| map.remove("content"))
            .and_then(|v| v.as_str().map(str::to_string))?;

        Some(Self {
            answer,
            metadata: map.into_iter().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_content_field() {
        let response = ExecutorResponse::from_json(serde_json::json!({
            "content": "FCR 1.45 at 35 days",
            "sources": ["ross308_objectives.pdf"]
        }))
        .unwrap();

        assert_eq!(response.answer, "FCR 1.45 at 35 days");
        assert!(response.metadata.contains_key("sources"));
    }

    #[test]
    fn test_from_json_without_answer() {
        assert!(ExecutorResponse::from_json(serde_json::json!({"score": 0.4})).is_none());
        assert!(ExecutorResponse::from_json(serde_json::json!("plain")).is_none());
    }
}
