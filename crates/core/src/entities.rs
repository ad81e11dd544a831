//! Structured entity slots extracted from free text
//!
//! Upstream extractors used to hand over loosely typed string maps. The
//! [`EntitySet`] keeps one typed field per known slot plus an `extra` map for
//! slots this crate does not know about yet.
//!
//! A slot can be in three states: holding a value, explicitly invalidated
//! (the key is still present but its value was cleared because it was
//! semantically impossible), or absent. Invalidated slots count towards the
//! key set so that validation never silently drops a key the caller supplied.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

/// Known entity slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotName {
    Breed,
    AgeDays,
    Sex,
    MetricType,
    Weight,
}

impl SlotName {
    pub const ALL: [SlotName; 5] = [
        SlotName::Breed,
        SlotName::AgeDays,
        SlotName::Sex,
        SlotName::MetricType,
        SlotName::Weight,
    ];

    /// Stable key used in maps and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Breed => "breed",
            Self::AgeDays => "age_days",
            Self::Sex => "sex",
            Self::MetricType => "metric_type",
            Self::Weight => "weight",
        }
    }

    /// Resolve a key, accepting the short aliases older extractors emit
    pub fn from_key(key: &str) -> Option<Self> {
        match key.trim().to_lowercase().as_str() {
            "breed" | "race" | "strain" => Some(Self::Breed),
            "age_days" | "age" => Some(Self::AgeDays),
            "sex" | "sexe" => Some(Self::Sex),
            "metric_type" | "metric" => Some(Self::MetricType),
            "weight" | "poids" => Some(Self::Weight),
            _ => None,
        }
    }
}

impl fmt::Display for SlotName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entity slots attached to a query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntitySet {
    /// Canonical breed/strain name (e.g. "Ross 308")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breed: Option<String>,
    /// Bird age in days
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_days: Option<u32>,
    /// Sex label as supplied or detected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sex: Option<String>,
    /// Canonical metric identifier (e.g. "feed_conversion_ratio")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric_type: Option<String>,
    /// Body weight in grams
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    /// Slots unknown to this crate, kept verbatim
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    invalidated: BTreeSet<SlotName>,
}

impl EntitySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a loosely typed string map
    ///
    /// Numeric slots that fail to parse are recorded as invalidated so the key
    /// survives and the slot is reported missing later on.
    pub fn from_map(map: &HashMap<String, String>) -> Self {
        let mut entities = Self::default();

        for (key, value) in map {
            let Some(slot) = SlotName::from_key(key) else {
                entities.extra.insert(key.clone(), value.clone());
                continue;
            };

            let trimmed = value.trim();
            match slot {
                SlotName::Breed => entities.breed = Some(trimmed.to_string()),
                SlotName::Sex => entities.sex = Some(trimmed.to_string()),
                SlotName::MetricType => entities.metric_type = Some(trimmed.to_string()),
                SlotName::AgeDays => match trimmed.parse::<f64>() {
                    Ok(days) if days.is_finite() && days >= 0.0 => {
                        entities.age_days = Some(days.round() as u32)
                    },
                    _ => entities.invalidate(SlotName::AgeDays),
                },
                SlotName::Weight => match trimmed.parse::<f64>() {
                    Ok(grams) if grams.is_finite() => entities.weight = Some(grams),
                    _ => entities.invalidate(SlotName::Weight),
                },
            }
        }

        entities
    }

    /// Whether the slot currently holds a value
    pub fn has(&self, slot: SlotName) -> bool {
        match slot {
            SlotName::Breed => self.breed.is_some(),
            SlotName::AgeDays => self.age_days.is_some(),
            SlotName::Sex => self.sex.is_some(),
            SlotName::MetricType => self.metric_type.is_some(),
            SlotName::Weight => self.weight.is_some(),
        }
    }

    /// Whether the slot was explicitly invalidated and not refilled since
    pub fn is_invalidated(&self, slot: SlotName) -> bool {
        self.invalidated.contains(&slot) && !self.has(slot)
    }

    /// Clear a slot's value while keeping its key
    pub fn invalidate(&mut self, slot: SlotName) {
        match slot {
            SlotName::Breed => self.breed = None,
            SlotName::AgeDays => self.age_days = None,
            SlotName::Sex => self.sex = None,
            SlotName::MetricType => self.metric_type = None,
            SlotName::Weight => self.weight = None,
        }
        self.invalidated.insert(slot);
    }

    pub fn set_breed(&mut self, breed: impl Into<String>) {
        self.breed = Some(breed.into());
        self.invalidated.remove(&SlotName::Breed);
    }

    pub fn set_age_days(&mut self, days: u32) {
        self.age_days = Some(days);
        self.invalidated.remove(&SlotName::AgeDays);
    }

    pub fn set_sex(&mut self, sex: impl Into<String>) {
        self.sex = Some(sex.into());
        self.invalidated.remove(&SlotName::Sex);
    }

    pub fn set_metric_type(&mut self, metric: impl Into<String>) {
        self.metric_type = Some(metric.into());
        self.invalidated.remove(&SlotName::MetricType);
    }

    pub fn set_weight(&mut self, grams: f64) {
        self.weight = Some(grams);
        self.invalidated.remove(&SlotName::Weight);
    }

    /// Set of keys present: valued slots, invalidated slots and extras
    pub fn keys(&self) -> BTreeSet<String> {
        let mut keys: BTreeSet<String> = SlotName::ALL
            .iter()
            .filter(|slot| self.has(**slot) || self.invalidated.contains(*slot))
            .map(|slot| slot.as_str().to_string())
            .collect();
        keys.extend(self.extra.keys().cloned());
        keys
    }

    /// Copy a key (value or invalidation marker) from another set
    ///
    /// Returns false when `key` is not present in `source`.
    pub fn restore_key(&mut self, source: &EntitySet, key: &str) -> bool {
        if let Some(value) = source.extra.get(key) {
            self.extra.insert(key.to_string(), value.clone());
            return true;
        }

        let Some(slot) = SlotName::from_key(key) else {
            return false;
        };

        match slot {
            SlotName::Breed => self.breed = source.breed.clone(),
            SlotName::AgeDays => self.age_days = source.age_days,
            SlotName::Sex => self.sex = source.sex.clone(),
            SlotName::MetricType => self.metric_type = source.metric_type.clone(),
            SlotName::Weight => self.weight = source.weight,
        }
        if source.invalidated.contains(&slot) {
            self.invalidated.insert(slot);
        }
        self.has(slot) || self.invalidated.contains(&slot)
    }

    /// Display value of a slot, if any
    pub fn value_string(&self, slot: SlotName) -> Option<String> {
        match slot {
            SlotName::Breed => self.breed.clone(),
            SlotName::AgeDays => self.age_days.map(|d| d.to_string()),
            SlotName::Sex => self.sex.clone(),
            SlotName::MetricType => self.metric_type.clone(),
            SlotName::Weight => self.weight.map(|w| w.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.keys().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalidated_slot_keeps_key() {
        let mut entities = EntitySet::default();
        entities.set_metric_type("male");
        entities.invalidate(SlotName::MetricType);

        assert!(!entities.has(SlotName::MetricType));
        assert!(entities.is_invalidated(SlotName::MetricType));
        assert!(entities.keys().contains("metric_type"));

        entities.set_metric_type("body_weight");
        assert!(!entities.is_invalidated(SlotName::MetricType));
    }

    #[test]
    fn test_from_map() {
        let mut map = HashMap::new();
        map.insert("breed".to_string(), "Cobb 500".to_string());
        map.insert("age".to_string(), "abc".to_string());
        map.insert("farm_id".to_string(), "F-12".to_string());

        let entities = EntitySet::from_map(&map);
        assert_eq!(entities.breed.as_deref(), Some("Cobb 500"));
        assert!(entities.is_invalidated(SlotName::AgeDays));
        assert_eq!(entities.extra.get("farm_id").map(String::as_str), Some("F-12"));

        let keys = entities.keys();
        assert!(keys.contains("breed"));
        assert!(keys.contains("age_days"));
        assert!(keys.contains("farm_id"));
    }

    #[test]
    fn test_restore_key() {
        let mut original = EntitySet::default();
        original.set_age_days(21);
        original.extra.insert("house".to_string(), "B2".to_string());

        let mut working = EntitySet::default();
        assert!(working.restore_key(&original, "age_days"));
        assert!(working.restore_key(&original, "house"));
        assert!(!working.restore_key(&original, "breed"));
        assert_eq!(working.age_days, Some(21));
        assert_eq!(working.keys(), original.keys());
    }

    #[test]
    fn test_slot_aliases() {
        assert_eq!(SlotName::from_key("race"), Some(SlotName::Breed));
        assert_eq!(SlotName::from_key("AGE"), Some(SlotName::AgeDays));
        assert_eq!(SlotName::from_key("flock"), None);
    }
}
