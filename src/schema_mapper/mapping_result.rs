use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use super::StandardField;
use crate::fusion_errors::FusionError;

/// One candidate `raw column → standard field` with its score and justification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMappingSuggestion {
    pub raw_column: String,
    pub standard_field: StandardField,
    /// In [0, 1].
    pub confidence: f64,
    pub rationale: String,
}

/// Outcome of one schema-mapping run for one source.
///
/// `mapped` is one-to-one in both directions. A result is only usable to build canonical
/// records when [`MappingResult::is_valid`] holds, i.e. both coordinate fields are mapped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingResult {
    /// Raw columns in input order.
    pub columns: Vec<String>,
    /// Every candidate considered, sorted by decreasing confidence.
    pub suggestions: Vec<FieldMappingSuggestion>,
    /// The retained suggestions, in input column order.
    pub mapped: Vec<FieldMappingSuggestion>,
    /// Raw columns left without a standard field, in input order.
    pub unmapped_columns: Vec<String>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl MappingResult {
    /// Assemble a result from the retained suggestions: derive the unmapped columns and
    /// run the mandatory-field validation.
    pub(crate) fn assemble(
        columns: Vec<String>,
        suggestions: Vec<FieldMappingSuggestion>,
        mut mapped: Vec<FieldMappingSuggestion>,
        warnings: Vec<String>,
    ) -> Self {
        let position = |col: &str| columns.iter().position(|c| c == col).unwrap_or(usize::MAX);
        mapped.sort_by_key(|s| position(&s.raw_column));

        let unmapped_columns = columns
            .iter()
            .filter(|c| !mapped.iter().any(|s| &s.raw_column == *c))
            .cloned()
            .collect();

        let errors = StandardField::MANDATORY
            .iter()
            .filter(|f| !mapped.iter().any(|s| s.standard_field == **f))
            .map(|f| format!("mandatory field '{f}' is not mapped"))
            .collect();

        MappingResult {
            columns,
            suggestions,
            mapped,
            unmapped_columns,
            warnings,
            errors,
        }
    }

    /// `true` when both coordinate fields are mapped.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Fail with [`FusionError::InvalidMapping`] unless the result is valid.
    pub fn ensure_valid(&self) -> Result<(), FusionError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(FusionError::InvalidMapping(self.errors.clone()))
        }
    }

    /// Raw column mapped onto `field`.
    pub fn column_for(&self, field: StandardField) -> Option<&str> {
        self.mapped
            .iter()
            .find(|s| s.standard_field == field)
            .map(|s| s.raw_column.as_str())
    }

    /// Retained suggestion for a raw column.
    pub fn mapping_of(&self, raw_column: &str) -> Option<&FieldMappingSuggestion> {
        self.mapped.iter().find(|s| s.raw_column == raw_column)
    }

    /// `raw column → standard field`, ordered by column name.
    pub fn mapped_fields(&self) -> BTreeMap<String, StandardField> {
        self.mapped
            .iter()
            .map(|s| (s.raw_column.clone(), s.standard_field))
            .collect()
    }

    pub fn to_snapshot(&self) -> MappingSnapshot {
        MappingSnapshot {
            mapped_fields: self.mapped_fields(),
            unmapped_columns: self.unmapped_columns.clone(),
            warnings: self.warnings.clone(),
        }
    }

    /// The persisted form, see [`MappingSnapshot`].
    pub fn to_json(&self) -> Result<String, FusionError> {
        Ok(serde_json::to_string(&self.to_snapshot())?)
    }
}

/// Persisted shape of a mapping, replayed for repeat ingestions from the same source:
///
/// ```json
/// {"mapped_fields": {"DEJ2000": "dec", "RAJ2000": "ra"}, "unmapped_columns": ["Gmag"], "warnings": []}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingSnapshot {
    pub mapped_fields: BTreeMap<String, StandardField>,
    pub unmapped_columns: Vec<String>,
    pub warnings: Vec<String>,
}

impl MappingSnapshot {
    pub fn from_json(text: &str) -> Result<Self, FusionError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Rebuild a [`MappingResult`] from a snapshot. Replayed mappings carry confidence 1.0.
    ///
    /// The column order is the snapshot order: mapped columns by name, then unmapped ones.
    pub fn into_result(self) -> Result<MappingResult, FusionError> {
        let mut seen = HashSet::new();
        for field in self.mapped_fields.values() {
            if !seen.insert(*field) {
                return Err(FusionError::InvalidMapping(vec![format!(
                    "field '{field}' is mapped by more than one column"
                )]));
            }
        }

        let columns: Vec<String> = self
            .mapped_fields
            .keys()
            .cloned()
            .chain(self.unmapped_columns.iter().cloned())
            .collect();
        let mapped: Vec<FieldMappingSuggestion> = self
            .mapped_fields
            .into_iter()
            .map(|(raw_column, standard_field)| FieldMappingSuggestion {
                raw_column,
                standard_field,
                confidence: 1.0,
                rationale: "replayed from a persisted mapping".into(),
            })
            .collect();

        Ok(MappingResult::assemble(
            columns,
            mapped.clone(),
            mapped,
            self.warnings,
        ))
    }
}
