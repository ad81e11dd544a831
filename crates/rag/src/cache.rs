//! Domain decision cache
//!
//! Shared across requests through an `Arc`. Reads and inserts go through a
//! `DashMap`, so concurrent requests at worst recompute a decision.

use std::time::{Duration, Instant};

use dashmap::DashMap;

use poultry_assistant_config::CacheConfig;
use poultry_assistant_core::Language;

use crate::domain_gate::OodDecision;

struct CacheEntry {
    decision: OodDecision,
    inserted_at: Instant,
}

/// Bounded TTL cache of gate decisions keyed by normalized query + language
pub struct DecisionCache {
    entries: DashMap<String, CacheEntry>,
    max_entries: usize,
    ttl: Duration,
}

impl DecisionCache {
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries,
            ttl,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.max_entries, config.ttl())
    }

    /// Cache key: lowercase text with collapsed whitespace, plus language code
    pub fn key(query: &str, language: &Language) -> String {
        let normalized = query
            .split_whitespace()
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join(" ");
        format!("{}|{}", language.code(), normalized)
    }

    /// Fresh decision for `key`; expired entries count as misses and are dropped
    pub fn get(&self, key: &str) -> Option<OodDecision> {
        let expired = match self.entries.get(key) {
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => {
                return Some(entry.decision.clone());
            },
            Some(_) => true,
            None => false,
        };

        if expired {
            self.entries
                .remove_if(key, |_, entry| entry.inserted_at.elapsed() >= self.ttl);
        }
        None
    }

    /// Store a decision; returns false when the cache is full of fresh entries
    pub fn insert(&self, key: String, decision: OodDecision) -> bool {
        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_entries {
            let purged = self.purge_expired();
            if self.entries.len() >= self.max_entries {
                tracing::debug!(purged, max_entries = self.max_entries, "Decision cache full, skipping insert");
                return false;
            }
        }

        self.entries.insert(
            key,
            CacheEntry {
                decision,
                inserted_at: Instant::now(),
            },
        );
        true
    }

    /// Drop every expired entry, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| entry.inserted_at.elapsed() < self.ttl);
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl Default for DecisionCache {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}
