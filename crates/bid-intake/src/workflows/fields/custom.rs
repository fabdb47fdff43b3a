use super::normalizer::normalize;
use crate::workflows::taxonomy::IntentTarget;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A human-confirmed override for one normalized key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomMapping {
    pub target: IntentTarget,
    pub created_at: DateTime<Utc>,
}

/// Mutable table of custom mappings keyed by normalized key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomMappingTable {
    entries: BTreeMap<String, CustomMapping>,
}

impl CustomMappingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_reader<R: std::io::Read>(reader: R) -> Result<Self, serde_json::Error> {
        let mut table: Self = serde_json::from_reader(reader)?;
        // Hand-edited files may carry unnormalized keys.
        table.entries = std::mem::take(&mut table.entries)
            .into_iter()
            .map(|(key, mapping)| (normalize(&key), mapping))
            .filter(|(key, _)| !key.is_empty())
            .collect();
        Ok(table)
    }

    /// Records an override, returning the normalized key it is stored under.
    /// Keys that normalize to nothing are rejected.
    pub fn insert(
        &mut self,
        raw_key: &str,
        target: IntentTarget,
        created_at: DateTime<Utc>,
    ) -> Option<String> {
        let key = normalize(raw_key);
        if key.is_empty() {
            return None;
        }

        self.entries
            .insert(key.clone(), CustomMapping { target, created_at });
        Some(key)
    }

    pub fn remove(&mut self, raw_key: &str) -> Option<CustomMapping> {
        self.entries.remove(&normalize(raw_key))
    }

    pub fn get(&self, normalized_key: &str) -> Option<&CustomMapping> {
        self.entries.get(normalized_key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &CustomMapping)> {
        self.entries.iter()
    }

    /// Freezes the current table for one resolution pass.
    pub fn snapshot(&self) -> CustomMappingSnapshot {
        CustomMappingSnapshot {
            entries: Arc::new(self.entries.clone()),
        }
    }
}

/// Immutable view of the custom mappings taken once at batch start.
#[derive(Debug, Clone, Default)]
pub struct CustomMappingSnapshot {
    entries: Arc<BTreeMap<String, CustomMapping>>,
}

impl CustomMappingSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn lookup(&self, normalized_key: &str) -> Option<&CustomMapping> {
        self.entries.get(normalized_key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Persistence boundary for custom mappings.
pub trait CustomMappingStore: Send + Sync {
    fn snapshot(&self) -> Result<CustomMappingSnapshot, MappingStoreError>;
    fn confirm(
        &self,
        raw_key: &str,
        target: IntentTarget,
        created_at: DateTime<Utc>,
    ) -> Result<String, MappingStoreError>;
    fn list(&self) -> Result<CustomMappingTable, MappingStoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum MappingStoreError {
    #[error("key '{0}' normalizes to an empty string")]
    EmptyKey(String),
    #[error("mapping store unavailable: {0}")]
    Unavailable(String),
}
