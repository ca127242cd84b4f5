//! # Schema mapper
//!
//! Infers which raw catalog columns carry the standard astrometric fields.
//!
//! ## Algorithm
//!
//! 1. **Header pass**: every raw column name is normalized (case, punctuation) and compared
//!    with the curated alias dictionary of [`aliases`]. An exact alias match scores
//!    [`MapperParams::exact_confidence`]; a partial match scores in
//!    `[partial_floor, partial_ceiling)`, proportionally to how much of the name the alias covers.
//! 2. **Sample pass** (optional): numeric sample values are checked against range/shape
//!    heuristics (see [`samples::ColumnShape`]). Agreement raises a header candidate by
//!    [`MapperParams::sample_boost`]; a column without any header evidence gets a candidate at
//!    [`MapperParams::sample_confidence`] for each unclaimed field its values fit.
//! 3. **Resolution**: candidates are taken greedily by decreasing confidence, then input column
//!    order, then field order, keeping the mapping one-to-one. Equal best scores for one field
//!    produce an "ambiguous mapping" warning naming both columns; the first-seen column is kept.
//! 4. **Validation**: `ra` and `dec` are mandatory. A result lacking either is invalid
//!    ([`MappingResult::is_valid`]) and refused by [`canonicalize`](crate::records::canonicalize).
//!
//! The mapper is deterministic: no clock, no randomness, no hash-order dependence.
//!
//! ## Example
//!
//! ```rust
//! use astrofuse::schema_mapper::{SchemaMapper, MapperParams, StandardField};
//!
//! let mapper = SchemaMapper::new(MapperParams::default()).unwrap();
//! let result = mapper.suggest(&["RAJ2000", "DEJ2000", "Gmag"], None);
//!
//! assert!(result.is_valid());
//! assert_eq!(result.column_for(StandardField::Ra), Some("RAJ2000"));
//! assert!(result.mapping_of("DEJ2000").unwrap().confidence >= 0.90);
//! ```
//!
//! ## See also
//!
//! * [`cache::MappingCache`] – reuse of a previous mapping for the same source.
//! * [`SchemaMapper::apply_overrides`] – manual corrections.
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::fusion_errors::FusionError;
use crate::records::RawRecord;

pub mod aliases;
pub mod cache;
pub mod mapping_result;
pub mod params;
pub mod samples;

pub use aliases::{AliasMatch, AliasTable};
pub use cache::MappingCache;
pub use mapping_result::{FieldMappingSuggestion, MappingResult, MappingSnapshot};
pub use params::{MapperParams, MapperParamsBuilder};

use samples::ColumnShape;

/// Fields of a [`CanonicalRecord`](crate::records::CanonicalRecord) a raw column can feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StandardField {
    Ra,
    Dec,
    Parallax,
    ProperMotionRa,
    ProperMotionDec,
    Magnitude,
    SourceIdentifier,
}

impl StandardField {
    pub const ALL: [StandardField; 7] = [
        StandardField::Ra,
        StandardField::Dec,
        StandardField::Parallax,
        StandardField::ProperMotionRa,
        StandardField::ProperMotionDec,
        StandardField::Magnitude,
        StandardField::SourceIdentifier,
    ];

    /// Fields without which no canonical record can be built.
    pub const MANDATORY: [StandardField; 2] = [StandardField::Ra, StandardField::Dec];

    pub fn as_str(&self) -> &'static str {
        match self {
            StandardField::Ra => "ra",
            StandardField::Dec => "dec",
            StandardField::Parallax => "parallax",
            StandardField::ProperMotionRa => "proper_motion_ra",
            StandardField::ProperMotionDec => "proper_motion_dec",
            StandardField::Magnitude => "magnitude",
            StandardField::SourceIdentifier => "source_identifier",
        }
    }
}

impl fmt::Display for StandardField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StandardField {
    type Err = FusionError;

    /// Only the exact snake_case names are accepted; anything else is a configuration error.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StandardField::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == s.trim())
            .ok_or_else(|| FusionError::UnknownStandardField(s.to_string()))
    }
}

/// A candidate tied to the position of its column in the input.
type Candidate = (usize, FieldMappingSuggestion);

/// Confidence-scored column → standard field inference.
#[derive(Debug, Clone)]
pub struct SchemaMapper {
    params: MapperParams,
    aliases: AliasTable,
}

impl SchemaMapper {
    /// Mapper with the built-in alias dictionary.
    pub fn new(params: MapperParams) -> Result<Self, FusionError> {
        Ok(Self::with_aliases(params, AliasTable::builtin()?))
    }

    pub fn with_aliases(params: MapperParams, aliases: AliasTable) -> Self {
        SchemaMapper { params, aliases }
    }

    pub fn params(&self) -> &MapperParams {
        &self.params
    }

    /// Propose a mapping for a set of raw columns.
    ///
    /// Arguments
    /// -----------------
    /// * `raw_columns`: column names in input order. Later duplicates of a name are ignored.
    /// * `sample_rows`: optional sample rows enabling the sample pass; at most
    ///   [`MapperParams::max_sample_rows`] of them are inspected.
    ///
    /// Return
    /// ----------
    /// * A [`MappingResult`]; check [`MappingResult::is_valid`] before using it.
    pub fn suggest<S: AsRef<str>>(
        &self,
        raw_columns: &[S],
        sample_rows: Option<&[RawRecord]>,
    ) -> MappingResult {
        let mut warnings = Vec::new();
        let mut columns: Vec<String> = Vec::with_capacity(raw_columns.len());
        for col in raw_columns {
            let col = col.as_ref();
            if columns.iter().any(|c| c == col) {
                warnings.push(format!("duplicate raw column '{col}' ignored"));
                continue;
            }
            columns.push(col.to_string());
        }

        let mut candidates = self.header_pass(&columns);

        if let Some(rows) = sample_rows.filter(|rows| !rows.is_empty()) {
            let rows = &rows[..rows.len().min(self.params.max_sample_rows)];
            self.sample_pass(&columns, rows, &mut candidates, &mut warnings);
        }

        let mapped = self.resolve(&columns, &candidates, &mut warnings);

        candidates.sort_by(|a, b| {
            b.1.confidence
                .total_cmp(&a.1.confidence)
                .then(a.0.cmp(&b.0))
                .then(a.1.standard_field.cmp(&b.1.standard_field))
        });
        let suggestions = candidates.into_iter().map(|(_, s)| s).collect();

        let result = MappingResult::assemble(columns, suggestions, mapped, warnings);
        debug!(
            "schema mapping: {} mapped, {} unmapped, {} warnings, valid={}",
            result.mapped.len(),
            result.unmapped_columns.len(),
            result.warnings.len(),
            result.is_valid()
        );
        result
    }

    fn header_pass(&self, columns: &[String]) -> Vec<Candidate> {
        let p = &self.params;
        let mut candidates = Vec::new();
        for (idx, col) in columns.iter().enumerate() {
            for (field, kind, alias) in self.aliases.lookup(col) {
                let (confidence, rationale) = match kind {
                    AliasMatch::Exact => (
                        p.exact_confidence,
                        format!("column name matches the {field} alias '{alias}'"),
                    ),
                    AliasMatch::Partial(ratio) => (
                        p.partial_floor + (p.partial_ceiling - p.partial_floor) * ratio,
                        format!("column name contains the {field} alias '{alias}'"),
                    ),
                };
                candidates.push((
                    idx,
                    FieldMappingSuggestion {
                        raw_column: col.clone(),
                        standard_field: field,
                        confidence,
                        rationale,
                    },
                ));
            }
        }
        candidates
    }

    fn sample_pass(
        &self,
        columns: &[String],
        rows: &[RawRecord],
        candidates: &mut Vec<Candidate>,
        warnings: &mut Vec<String>,
    ) {
        let p = &self.params;
        // fields with solid header evidence are not offered to sample-only columns
        let claimed: HashSet<StandardField> = candidates
            .iter()
            .filter(|(_, s)| s.confidence >= p.partial_floor)
            .map(|(_, s)| s.standard_field)
            .collect();

        let mut introduced = Vec::new();
        for (idx, col) in columns.iter().enumerate() {
            if aliases::is_error_column(col) {
                continue;
            }
            let Some(shape) = ColumnShape::from_samples(col, rows) else {
                continue;
            };
            let fits = shape.compatible_fields();
            let mut has_header = false;

            for (_, s) in candidates.iter_mut().filter(|(i, _)| *i == idx) {
                has_header = true;
                if fits.contains(&s.standard_field) {
                    let boosted = (s.confidence + p.sample_boost).min(p.max_confidence);
                    s.confidence = if s.confidence < p.exact_floor {
                        boosted.min(p.partial_ceiling)
                    } else {
                        boosted
                    };
                    s.rationale
                        .push_str(&format!("; samples agree ({})", shape.describe()));
                } else if is_shape_checked(s.standard_field) {
                    warnings.push(format!(
                        "column '{col}' is named like {} but its samples do not fit ({})",
                        s.standard_field,
                        shape.describe()
                    ));
                }
            }

            if has_header {
                continue;
            }
            for field in fits.into_iter().filter(|f| !claimed.contains(f)) {
                introduced.push((
                    idx,
                    FieldMappingSuggestion {
                        raw_column: col.clone(),
                        standard_field: field,
                        confidence: p.sample_confidence,
                        rationale: format!(
                            "no alias match; samples fit {field} ({})",
                            shape.describe()
                        ),
                    },
                ));
            }
        }
        candidates.extend(introduced);
    }

    /// Greedy one-to-one resolution. Returns the retained suggestions and appends
    /// ambiguity warnings.
    fn resolve(
        &self,
        columns: &[String],
        candidates: &[Candidate],
        warnings: &mut Vec<String>,
    ) -> Vec<FieldMappingSuggestion> {
        let p = &self.params;
        let mut order: Vec<&Candidate> = candidates
            .iter()
            .filter(|(_, s)| s.confidence >= p.min_accept)
            .collect();
        order.sort_by(|a, b| {
            b.1.confidence
                .total_cmp(&a.1.confidence)
                .then(a.0.cmp(&b.0))
                .then(a.1.standard_field.cmp(&b.1.standard_field))
        });

        let mut used_columns = HashSet::new();
        let mut used_fields = HashSet::new();
        let mut mapped = Vec::new();

        for (idx, s) in &order {
            if used_columns.contains(idx) || used_fields.contains(&s.standard_field) {
                continue;
            }

            let rival = order.iter().find(|(j, other)| {
                *j != *idx
                    && other.standard_field == s.standard_field
                    && !used_columns.contains(j)
                    && (other.confidence - s.confidence).abs() <= p.tie_epsilon
            });
            if let Some((j, _)) = rival {
                let msg = format!(
                    "ambiguous mapping for '{}': columns '{}' and '{}' both scored {:.3}; kept '{}' (first seen)",
                    s.standard_field, columns[*idx], columns[*j], s.confidence, columns[*idx]
                );
                warn!("{msg}");
                warnings.push(msg);
            }

            let other_field = order.iter().find(|(j, other)| {
                *j == *idx
                    && other.standard_field != s.standard_field
                    && !used_fields.contains(&other.standard_field)
                    && (other.confidence - s.confidence).abs() <= p.tie_epsilon
            });
            if let Some((_, other)) = other_field {
                let msg = format!(
                    "ambiguous mapping for column '{}': {} and {} both scored {:.3}; kept {}",
                    columns[*idx], s.standard_field, other.standard_field, s.confidence, s.standard_field
                );
                warn!("{msg}");
                warnings.push(msg);
            }

            used_columns.insert(*idx);
            used_fields.insert(s.standard_field);
            mapped.push(s.clone());
        }
        mapped
    }

    /// Apply manual `(raw_column, standard_field)` corrections on top of a result.
    ///
    /// An override replaces any previous mapping of its column and of its field, and carries
    /// confidence 1.0. All overrides are checked before any is applied.
    ///
    /// Errors
    /// ----------
    /// * [`FusionError::UnknownStandardField`] if a target is not a standard field name.
    /// * [`FusionError::UnknownRawColumn`] if a column is not part of the result.
    pub fn apply_overrides(
        &self,
        result: &MappingResult,
        overrides: &[(&str, &str)],
    ) -> Result<MappingResult, FusionError> {
        let parsed = overrides
            .iter()
            .map(|(col, target)| {
                let field: StandardField = target.parse()?;
                if !result.columns.iter().any(|c| c.as_str() == *col) {
                    return Err(FusionError::UnknownRawColumn(col.to_string()));
                }
                Ok((col.to_string(), field))
            })
            .collect::<Result<Vec<_>, FusionError>>()?;

        let mut mapped = result.mapped.clone();
        let mut suggestions = Vec::with_capacity(result.suggestions.len() + parsed.len());
        for (col, field) in parsed {
            mapped.retain(|s| s.raw_column != col && s.standard_field != field);
            let manual = FieldMappingSuggestion {
                raw_column: col,
                standard_field: field,
                confidence: 1.0,
                rationale: "manual override".into(),
            };
            suggestions.push(manual.clone());
            mapped.push(manual);
        }
        suggestions.extend(result.suggestions.iter().cloned());

        Ok(MappingResult::assemble(
            result.columns.clone(),
            suggestions,
            mapped,
            result.warnings.clone(),
        ))
    }

    /// [`SchemaMapper::suggest`] through a per-source cache.
    ///
    /// A cached mapping is reused when every column it maps is still present in `raw_columns`.
    /// Otherwise the mapping is recomputed and, if valid, supersedes the cached one.
    pub fn suggest_cached<S: AsRef<str>>(
        &self,
        source: &str,
        raw_columns: &[S],
        sample_rows: Option<&[RawRecord]>,
        cache: &mut MappingCache,
    ) -> MappingResult {
        if let Some(hit) = cache.lookup(source, raw_columns) {
            debug!("schema mapping for '{source}' reused from cache");
            return hit;
        }
        let result = self.suggest(raw_columns, sample_rows);
        if result.is_valid() {
            cache.insert(source, result.clone());
        }
        result
    }
}

fn is_shape_checked(field: StandardField) -> bool {
    matches!(
        field,
        StandardField::Ra | StandardField::Dec | StandardField::Parallax | StandardField::Magnitude
    )
}

#[cfg(test)]
mod schema_mapper_test {
    use super::*;
    use crate::records::{RawValue, RecordMetadata};

    fn mapper() -> SchemaMapper {
        SchemaMapper::new(MapperParams::default()).unwrap()
    }

    fn sample_rows(columns: &[&str], rows: &[&[f64]]) -> Vec<RawRecord> {
        rows.iter()
            .map(|row| {
                let values = columns
                    .iter()
                    .zip(row.iter())
                    .map(|(c, v)| (c.to_string(), RawValue::Number(*v)))
                    .collect();
                RawRecord::new(RecordMetadata::new("test"), values)
            })
            .collect()
    }

    #[test]
    fn test_standard_field_parse() {
        assert_eq!("ra".parse::<StandardField>().unwrap(), StandardField::Ra);
        assert_eq!(
            "proper_motion_dec".parse::<StandardField>().unwrap(),
            StandardField::ProperMotionDec
        );
        assert_eq!(
            "right_ascension".parse::<StandardField>(),
            Err(FusionError::UnknownStandardField("right_ascension".into()))
        );
    }

    #[test]
    fn test_header_exact_matches() {
        let result = mapper().suggest(&["RAJ2000", "DEJ2000", "Gmag"], None);
        assert!(result.is_valid());
        let ra = result.mapping_of("RAJ2000").unwrap();
        assert_eq!(ra.standard_field, StandardField::Ra);
        assert!(ra.confidence >= 0.90);
        let dec = result.mapping_of("DEJ2000").unwrap();
        assert_eq!(dec.standard_field, StandardField::Dec);
        assert!(dec.confidence >= 0.90);
        assert_eq!(
            result.column_for(StandardField::Magnitude),
            Some("Gmag")
        );
        assert!(result.unmapped_columns.is_empty());
    }

    #[test]
    fn test_partial_match_band() {
        let result = mapper().suggest(&["gaia_source_id", "ra", "dec"], None);
        let id = result.mapping_of("gaia_source_id").unwrap();
        assert_eq!(id.standard_field, StandardField::SourceIdentifier);
        assert!(id.confidence >= 0.75 && id.confidence < 0.89);
    }

    #[test]
    fn test_missing_coordinate_is_invalid() {
        let result = mapper().suggest(&["RAJ2000", "Gmag"], None);
        assert!(!result.is_valid());
        assert!(result.ensure_valid().is_err());
    }

    #[test]
    fn test_error_columns_stay_unmapped() {
        let result = mapper().suggest(&["RAJ2000", "e_RAJ2000", "DEJ2000", "e_DEJ2000"], None);
        assert_eq!(
            result.unmapped_columns,
            vec!["e_RAJ2000".to_string(), "e_DEJ2000".to_string()]
        );
    }

    #[test]
    fn test_tie_keeps_first_seen_and_warns() {
        let result = mapper().suggest(&["RA_ICRS", "RAJ2000", "DE_ICRS"], None);
        assert_eq!(result.column_for(StandardField::Ra), Some("RA_ICRS"));
        assert!(result
            .warnings
            .iter()
            .any(|w| w.contains("ambiguous") && w.contains("RAJ2000")));
        assert_eq!(result.unmapped_columns, vec!["RAJ2000".to_string()]);
    }

    #[test]
    fn test_sample_pass_introduces_and_boosts() {
        let columns = ["RAJ2000", "col2", "col3"];
        let rows = sample_rows(
            &columns,
            &[&[150.1, -12.5, 9.8], &[210.7, 33.1, 11.2], &[99.0, 5.0, 12.9]],
        );
        let result = mapper().suggest(&columns, Some(&rows));

        let ra = result.mapping_of("RAJ2000").unwrap();
        assert!((ra.confidence - 0.99).abs() < 1e-12);

        // col2 has negative values: only the declination shape fits
        let dec = result.mapping_of("col2").unwrap();
        assert_eq!(dec.standard_field, StandardField::Dec);
        assert!((dec.confidence - 0.60).abs() < 1e-12);
        assert!(result.is_valid());

        // col3 fits parallax and magnitude equally; the field order decides
        let col3 = result.mapping_of("col3").unwrap();
        assert_eq!(col3.standard_field, StandardField::Parallax);
    }

    #[test]
    fn test_column_tied_across_fields_warns() {
        let columns = ["RAJ2000", "DEJ2000", "col3"];
        let rows = sample_rows(&columns, &[&[150.1, -12.5, 9.8], &[210.7, 33.1, 11.2]]);
        let result = mapper().suggest(&columns, Some(&rows));

        assert_eq!(result.column_for(StandardField::Parallax), Some("col3"));
        assert!(result.warnings.iter().any(|w| w.contains("ambiguous")
            && w.contains("'col3'")
            && w.contains("parallax")
            && w.contains("magnitude")));
        // header-only columns with one best field stay quiet
        assert!(!result.warnings.iter().any(|w| w.contains("RAJ2000")));
    }

    #[test]
    fn test_sample_disagreement_is_reported() {
        let columns = ["RA", "DEC"];
        let rows = sample_rows(&columns, &[&[400.0, 10.0], &[500.0, 20.0]]);
        let result = mapper().suggest(&columns, Some(&rows));
        assert_eq!(result.column_for(StandardField::Ra), Some("RA"));
        assert!(result.warnings.iter().any(|w| w.contains("do not fit")));
    }

    #[test]
    fn test_determinism() {
        let cols = ["objID", "RA_ICRS", "RAJ2000", "DE_ICRS", "Plx", "pmRA", "pmDE", "Vmag"];
        let a = mapper().suggest(&cols, None);
        let b = mapper().suggest(&cols, None);
        assert_eq!(a, b);
        assert_eq!(a.to_json().unwrap(), b.to_json().unwrap());
    }

    #[test]
    fn test_overrides() {
        let m = mapper();
        let result = m.suggest(&["RAJ2000", "DEJ2000", "Vmag", "Bmag"], None);
        assert_eq!(result.column_for(StandardField::Magnitude), Some("Vmag"));

        let fixed = m
            .apply_overrides(&result, &[("Bmag", "magnitude")])
            .unwrap();
        assert_eq!(fixed.column_for(StandardField::Magnitude), Some("Bmag"));
        assert_eq!(fixed.mapping_of("Bmag").unwrap().confidence, 1.0);
        assert!(fixed.unmapped_columns.contains(&"Vmag".to_string()));

        assert_eq!(
            m.apply_overrides(&result, &[("Bmag", "mag")]).unwrap_err(),
            FusionError::UnknownStandardField("mag".into())
        );
        assert_eq!(
            m.apply_overrides(&result, &[("Kmag", "magnitude")])
                .unwrap_err(),
            FusionError::UnknownRawColumn("Kmag".into())
        );
    }

    #[test]
    fn test_duplicate_columns() {
        let result = mapper().suggest(&["RAJ2000", "DEJ2000", "RAJ2000"], None);
        assert_eq!(result.columns.len(), 2);
        assert!(result.warnings.iter().any(|w| w.contains("duplicate")));
    }
}
