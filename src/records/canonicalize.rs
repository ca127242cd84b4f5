use std::collections::HashMap;

use log::{debug, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::{CanonicalRecord, QualityFlag, RawRecord, RawValue};
use crate::conversion::{parse_dec_cell, parse_ra_cell};
use crate::fusion_errors::FusionError;
use crate::normalizer::CoordinateNormalizer;
use crate::photometry::{magnitude_to_canonical, parallax_to_distance_pc, PhotometricSystem};
use crate::ref_system::Frame;
use crate::schema_mapper::{MappingResult, StandardField};

/// A raw row that could not be turned into a canonical record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedRecord {
    /// Position of the row in the input batch.
    pub row: usize,
    pub object_id: String,
    pub reason: String,
}

/// Outcome of [`canonicalize`]: accepted and rejected rows, both in input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanonicalBatch {
    pub accepted: Vec<CanonicalRecord>,
    pub rejected: Vec<RejectedRecord>,
    /// Per-row data-quality notes (`row N: ...`) and batch-level notes.
    pub warnings: Vec<String>,
}

impl CanonicalBatch {
    pub fn len(&self) -> usize {
        self.accepted.len() + self.rejected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

enum RowOutcome {
    Accepted(CanonicalRecord, Vec<String>),
    Rejected(RejectedRecord),
}

/// Resolved columns of a mapping, looked up once per batch.
struct FieldColumns<'a> {
    ra: &'a str,
    dec: &'a str,
    parallax: Option<&'a str>,
    pm_ra: Option<&'a str>,
    pm_dec: Option<&'a str>,
    magnitude: Option<&'a str>,
    identifier: Option<&'a str>,
}

impl<'a> FieldColumns<'a> {
    fn from_mapping(mapping: &'a MappingResult) -> Result<Self, FusionError> {
        mapping.ensure_valid()?;
        let missing = |field: StandardField| {
            FusionError::InvalidMapping(vec![format!("mandatory field '{field}' is not mapped")])
        };
        Ok(FieldColumns {
            ra: mapping
                .column_for(StandardField::Ra)
                .ok_or_else(|| missing(StandardField::Ra))?,
            dec: mapping
                .column_for(StandardField::Dec)
                .ok_or_else(|| missing(StandardField::Dec))?,
            parallax: mapping.column_for(StandardField::Parallax),
            pm_ra: mapping.column_for(StandardField::ProperMotionRa),
            pm_dec: mapping.column_for(StandardField::ProperMotionDec),
            magnitude: mapping.column_for(StandardField::Magnitude),
            identifier: mapping.column_for(StandardField::SourceIdentifier),
        })
    }
}

fn value<'r>(record: &'r RawRecord, column: Option<&str>) -> Option<&'r RawValue> {
    column.and_then(|c| record.get(c))
}

fn numeric(record: &RawRecord, column: Option<&str>) -> Option<f64> {
    value(record, column).and_then(RawValue::as_f64)
}

fn angle(record: &RawRecord, column: &str, parse: fn(&str) -> Option<f64>) -> Option<f64> {
    match record.get(column)? {
        RawValue::Number(v) => Some(*v),
        RawValue::Text(t) => parse(t),
        RawValue::Null => None,
    }
}

/// Photometric system of the magnitude column: declared, else inferred from the column name.
fn magnitude_system(record: &RawRecord, column: &str) -> Option<PhotometricSystem> {
    record
        .metadata()
        .photometric_system
        .or_else(|| column.parse().ok())
}

fn canonicalize_row(
    row: usize,
    record: &RawRecord,
    cols: &FieldColumns<'_>,
    normalizer: &CoordinateNormalizer,
) -> Result<RowOutcome, FusionError> {
    let meta = record.metadata();
    let object_id = value(record, cols.identifier)
        .and_then(|v| v.as_text().map(|t| t.trim().to_string()))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| match &meta.batch_id {
            Some(batch_id) => format!("{}:{batch_id}:row{row}", meta.source_catalog_name),
            None => format!("{}:row{row}", meta.source_catalog_name),
        });

    let reject = |reason: String| {
        Ok(RowOutcome::Rejected(RejectedRecord {
            row,
            object_id: object_id.clone(),
            reason,
        }))
    };

    let Some(ra) = angle(record, cols.ra, parse_ra_cell) else {
        return reject(format!("missing or unreadable right ascension in '{}'", cols.ra));
    };
    let Some(dec) = angle(record, cols.dec, parse_dec_cell) else {
        return reject(format!("missing or unreadable declination in '{}'", cols.dec));
    };

    let pm_ra = numeric(record, cols.pm_ra);
    let pm_dec = numeric(record, cols.pm_dec);
    let (ra, dec) = match normalizer.normalize(
        ra,
        dec,
        meta.declared_frame,
        meta.declared_epoch,
        pm_ra,
        pm_dec,
    ) {
        Ok(pos) => pos,
        Err(e) if e.is_configuration_error() => return Err(e),
        Err(e) => return reject(e.to_string()),
    };

    let mut notes = Vec::new();
    let mut flags = Vec::new();
    if meta.declared_frame == Frame::Unspecified {
        flags.push(QualityFlag::AssumedFrame);
    }

    let parallax_mas = match numeric(record, cols.parallax) {
        Some(p) if !p.is_finite() => {
            notes.push(format!("row {row}: non-finite parallax {p} dropped"));
            None
        }
        Some(p) if p <= 0.0 => {
            notes.push(format!("row {row}: non-positive parallax {p} kept, no distance"));
            flags.push(QualityFlag::NonPositiveParallax);
            Some(p)
        }
        other => other,
    };
    let distance_pc = parallax_mas.and_then(parallax_to_distance_pc);

    let magnitude = match (cols.magnitude, numeric(record, cols.magnitude)) {
        (Some(column), Some(m)) => {
            let system = magnitude_system(record, column).unwrap_or_else(|| {
                flags.push(QualityFlag::AssumedPhotometricSystem);
                PhotometricSystem::CANONICAL
            });
            let color = meta
                .color_index_column
                .as_deref()
                .and_then(|c| numeric(record, Some(c)));
            let converted = magnitude_to_canonical(m, system, color);
            if converted.is_none() {
                notes.push(format!("row {row}: non-finite magnitude {m} dropped"));
            }
            converted
        }
        _ => None,
    };

    let canonical = CanonicalRecord {
        object_id,
        right_ascension_deg: ra,
        declination_deg: dec,
        magnitude,
        parallax_mas,
        distance_pc,
        source_catalog_name: meta.source_catalog_name.clone(),
        fusion_group_id: None,
        flags,
    };
    Ok(RowOutcome::Accepted(canonical, notes))
}

/// Build canonical records from a batch of raw rows.
///
/// Each row has its mapped fields extracted, its position normalized to the canonical frame
/// and epoch, its magnitude converted to the canonical photometric system and its distance
/// derived from the parallax. Rows run on the `rayon` pool; the output keeps input order.
///
/// Data-quality problems never abort the batch:
///
/// * unreadable or out-of-range coordinates reject the row with a reason,
/// * a non-finite parallax becomes null, a non-positive one is kept and flagged
///   [`QualityFlag::NonPositiveParallax`] with a null distance,
/// * a missing identifier falls back to `"<source>:<batch id>:row<N>"` (`"<source>:row<N>"`
///   for rows built without a batch id),
/// * a row repeating the object id of an earlier accepted row is rejected.
///
/// Errors
/// ----------
/// * [`FusionError::InvalidMapping`] if the mapping lacks a coordinate field.
/// * Configuration errors raised by the normalizer (e.g. an unspecified frame under
///   [`UnspecifiedFramePolicy::Reject`](crate::normalizer::UnspecifiedFramePolicy::Reject)).
pub fn canonicalize(
    records: &[RawRecord],
    mapping: &MappingResult,
    normalizer: &CoordinateNormalizer,
) -> Result<CanonicalBatch, FusionError> {
    let cols = FieldColumns::from_mapping(mapping)?;

    let outcomes = records
        .par_iter()
        .enumerate()
        .map(|(row, record)| canonicalize_row(row, record, &cols, normalizer))
        .collect::<Result<Vec<_>, FusionError>>()?;

    let mut batch = CanonicalBatch::default();
    let mut first_seen: HashMap<String, usize> = HashMap::new();
    for (row, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            RowOutcome::Accepted(record, notes) => {
                if let Some(first) = first_seen.get(&record.object_id) {
                    debug!("row {row}: object id '{}' already used by row {first}", record.object_id);
                    batch.rejected.push(RejectedRecord {
                        row,
                        reason: format!(
                            "duplicate object id '{}' (first seen in row {first})",
                            record.object_id
                        ),
                        object_id: record.object_id,
                    });
                    continue;
                }
                first_seen.insert(record.object_id.clone(), row);
                batch.accepted.push(record);
                batch.warnings.extend(notes);
            }
            RowOutcome::Rejected(rejected) => batch.rejected.push(rejected),
        }
    }

    let unspecified = batch
        .accepted
        .iter()
        .filter(|r| r.has_flag(QualityFlag::AssumedFrame))
        .count();
    if unspecified > 0 {
        let msg = format!("{unspecified} records had no declared frame; canonical frame assumed");
        warn!("{msg}");
        batch.warnings.push(msg);
    }
    if cols.magnitude.is_some()
        && batch
            .accepted
            .iter()
            .any(|r| r.has_flag(QualityFlag::AssumedPhotometricSystem))
    {
        let msg = format!(
            "photometric system of '{}' unknown; magnitudes taken as {}",
            cols.magnitude.unwrap_or_default(),
            PhotometricSystem::CANONICAL
        );
        warn!("{msg}");
        batch.warnings.push(msg);
    }
    if !batch.rejected.is_empty() {
        warn!(
            "{} of {} records rejected during canonicalization",
            batch.rejected.len(),
            records.len()
        );
    }
    debug!("canonicalization warnings: {}", batch.warnings.len());
    info!(
        "canonicalized {} records: {} accepted, {} rejected",
        records.len(),
        batch.accepted.len(),
        batch.rejected.len()
    );

    Ok(batch)
}
