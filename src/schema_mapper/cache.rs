use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::mapping_result::MappingResult;
use crate::fusion_errors::FusionError;

/// Valid mappings of previous batches, keyed by source catalog name.
///
/// The cache is an explicit value owned by the caller and passed to
/// [`SchemaMapper::suggest_cached`](super::SchemaMapper::suggest_cached); nothing is global.
/// Entries are superseded, never edited.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingCache {
    entries: BTreeMap<String, MappingResult>,
}

impl MappingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, source: &str) -> Option<&MappingResult> {
        self.entries.get(source)
    }

    /// Store a mapping for `source`. Invalid mappings are refused and `false` is returned.
    pub fn insert(&mut self, source: &str, result: MappingResult) -> bool {
        if !result.is_valid() {
            return false;
        }
        self.entries.insert(source.to_string(), result);
        true
    }

    pub fn remove(&mut self, source: &str) -> Option<MappingResult> {
        self.entries.remove(source)
    }

    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// The cached mapping for `source`, re-targeted at `raw_columns`.
    ///
    /// Returns `None` when nothing is cached or when a mapped column of the cached entry is
    /// missing from `raw_columns`. Columns absent from the cached entry come back unmapped.
    pub fn lookup<S: AsRef<str>>(&self, source: &str, raw_columns: &[S]) -> Option<MappingResult> {
        let cached = self.entries.get(source)?;
        let present = |col: &str| raw_columns.iter().any(|c| c.as_ref() == col);
        if !cached.mapped.iter().all(|s| present(&s.raw_column)) {
            return None;
        }

        let mut columns: Vec<String> = Vec::with_capacity(raw_columns.len());
        for col in raw_columns {
            if !columns.iter().any(|c| c == col.as_ref()) {
                columns.push(col.as_ref().to_string());
            }
        }
        if columns == cached.columns {
            return Some(cached.clone());
        }

        let suggestions = cached
            .suggestions
            .iter()
            .filter(|s| present(&s.raw_column))
            .cloned()
            .collect();
        Some(MappingResult::assemble(
            columns,
            suggestions,
            cached.mapped.clone(),
            cached.warnings.clone(),
        ))
    }

    pub fn to_json(&self) -> Result<String, FusionError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self, FusionError> {
        Ok(serde_json::from_str(text)?)
    }
}
