//! # Catalog records
//!
//! Data model flowing through the harmonization pipeline:
//!
//! * [`RawRecord`]: one row as produced by an external format adapter, an ordered list of
//!   `(raw column, raw value)` pairs plus the batch [`RecordMetadata`] (declared frame, epoch,
//!   source catalog).
//! * [`RawBatch`]: the rows of one ingestion batch with their column names.
//! * [`CanonicalRecord`]: the normalized unit of storage, positions in the canonical frame and
//!   epoch, magnitudes in the canonical photometric system.
//! * [`RecordKey`]: `(source catalog, object id)`, unique across all sources.
//!
//! Turning raw rows into canonical ones is done by [`canonicalize`].
use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{Degree, MilliArcSec, Parsec};
use crate::conversion::parse_number;
use crate::photometry::PhotometricSystem;
use crate::ref_system::Frame;
use crate::time::EpochTag;

pub mod canonicalize;

pub use canonicalize::{canonicalize, CanonicalBatch, RejectedRecord};

/// A raw cell value, as decoded by the format adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
    Null,
}

impl RawValue {
    /// Numeric view of the cell: numbers as-is, text parsed, missing markers as `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RawValue::Number(v) => Some(*v),
            RawValue::Text(t) => parse_number(t),
            RawValue::Null => None,
        }
    }

    /// Textual view of the cell; numbers are formatted with their shortest representation.
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            RawValue::Number(v) => Some(Cow::Owned(v.to_string())),
            RawValue::Text(t) => Some(Cow::Borrowed(t.as_str())),
            RawValue::Null => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, RawValue::Null)
    }
}

impl From<f64> for RawValue {
    fn from(v: f64) -> Self {
        RawValue::Number(v)
    }
}

impl From<i64> for RawValue {
    fn from(v: i64) -> Self {
        RawValue::Number(v as f64)
    }
}

impl From<&str> for RawValue {
    fn from(v: &str) -> Self {
        RawValue::Text(v.to_string())
    }
}

impl From<String> for RawValue {
    fn from(v: String) -> Self {
        RawValue::Text(v)
    }
}

impl<T: Into<RawValue>> From<Option<T>> for RawValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(RawValue::Null, Into::into)
    }
}

/// What the adapter knows about a batch besides the cell values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMetadata {
    pub source_catalog_name: String,
    pub declared_frame: Frame,
    /// `None` means the canonical epoch.
    pub declared_epoch: Option<EpochTag>,
    /// Photometric system of the magnitude column; inferred from its name when absent.
    pub photometric_system: Option<PhotometricSystem>,
    /// Raw column holding the color index used by the color term of the magnitude transform.
    pub color_index_column: Option<String>,
    /// Distinguishes batches of one source; part of the fallback id of rows without one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<String>,
}

impl RecordMetadata {
    /// Metadata for a canonical-frame catalog at the canonical epoch.
    pub fn new(source_catalog_name: impl Into<String>) -> Self {
        RecordMetadata {
            source_catalog_name: source_catalog_name.into(),
            declared_frame: Frame::EquatorialStandard,
            declared_epoch: None,
            photometric_system: None,
            color_index_column: None,
            batch_id: None,
        }
    }

    pub fn with_frame(mut self, frame: Frame) -> Self {
        self.declared_frame = frame;
        self
    }

    pub fn with_epoch(mut self, epoch: impl Into<EpochTag>) -> Self {
        self.declared_epoch = Some(epoch.into());
        self
    }

    pub fn with_photometric_system(mut self, system: PhotometricSystem) -> Self {
        self.photometric_system = Some(system);
        self
    }

    pub fn with_color_index_column(mut self, column: impl Into<String>) -> Self {
        self.color_index_column = Some(column.into());
        self
    }

    pub fn with_batch_id(mut self, batch_id: impl Into<String>) -> Self {
        self.batch_id = Some(batch_id.into());
        self
    }
}

/// One raw row. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    values: Vec<(String, RawValue)>,
    metadata: RecordMetadata,
}

impl RawRecord {
    pub fn new(metadata: RecordMetadata, values: Vec<(String, RawValue)>) -> Self {
        RawRecord { values, metadata }
    }

    /// Value of a raw column; the first occurrence wins if the adapter emitted duplicates.
    pub fn get(&self, column: &str) -> Option<&RawValue> {
        self.values
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> &[(String, RawValue)] {
        &self.values
    }

    pub fn metadata(&self) -> &RecordMetadata {
        &self.metadata
    }
}

/// The rows of one ingestion batch, all sharing the same metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBatch {
    pub metadata: RecordMetadata,
    pub columns: Vec<String>,
    pub records: Vec<RawRecord>,
}

impl RawBatch {
    /// An empty batch. Metadata without a batch id gets a fresh random one.
    pub fn new<S: Into<String>>(
        mut metadata: RecordMetadata,
        columns: impl IntoIterator<Item = S>,
    ) -> Self {
        if metadata.batch_id.is_none() {
            metadata.batch_id = Some(Uuid::new_v4().simple().to_string());
        }
        RawBatch {
            metadata,
            columns: columns.into_iter().map(Into::into).collect(),
            records: Vec::new(),
        }
    }

    /// Append a row whose cells follow the order of [`RawBatch::columns`].
    ///
    /// Missing trailing cells are stored as [`RawValue::Null`]; extra cells are dropped.
    pub fn push_row<V: Into<RawValue>>(&mut self, cells: impl IntoIterator<Item = V>) {
        let mut cells = cells.into_iter();
        let values = self
            .columns
            .iter()
            .map(|col| (col.clone(), cells.next().map_or(RawValue::Null, Into::into)))
            .collect();
        self.records
            .push(RawRecord::new(self.metadata.clone(), values));
    }

    pub fn source(&self) -> &str {
        &self.metadata.source_catalog_name
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Per-record quality flags. A flagged record is kept, the flag says which value to distrust.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityFlag {
    /// Parallax is zero or negative; `distance_pc` is left empty.
    NonPositiveParallax,
    /// The catalog did not declare a frame and the canonical one was assumed.
    AssumedFrame,
    /// The photometric system of the magnitude was unknown and the canonical one was assumed.
    AssumedPhotometricSystem,
}

/// Identity of a record across all sources.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordKey {
    pub source: String,
    pub object_id: String,
}

impl RecordKey {
    pub fn new(source: impl Into<String>, object_id: impl Into<String>) -> Self {
        RecordKey {
            source: source.into(),
            object_id: object_id.into(),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.source, self.object_id)
    }
}

/// A normalized catalog record.
///
/// Right ascension and declination are always present and expressed in the canonical frame at
/// the canonical epoch; every other quantity is independently nullable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    /// Unique within `source_catalog_name`.
    pub object_id: String,
    pub right_ascension_deg: Degree,
    pub declination_deg: Degree,
    /// Canonical-system magnitude.
    pub magnitude: Option<f64>,
    pub parallax_mas: Option<MilliArcSec>,
    pub distance_pc: Option<Parsec>,
    pub source_catalog_name: String,
    /// Assigned by a cross-match run.
    pub fusion_group_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<QualityFlag>,
}

impl CanonicalRecord {
    /// A bare positional record.
    pub fn new(
        source_catalog_name: impl Into<String>,
        object_id: impl Into<String>,
        right_ascension_deg: Degree,
        declination_deg: Degree,
    ) -> Self {
        CanonicalRecord {
            object_id: object_id.into(),
            right_ascension_deg,
            declination_deg,
            magnitude: None,
            parallax_mas: None,
            distance_pc: None,
            source_catalog_name: source_catalog_name.into(),
            fusion_group_id: None,
            flags: Vec::new(),
        }
    }

    pub fn key(&self) -> RecordKey {
        RecordKey::new(self.source_catalog_name.clone(), self.object_id.clone())
    }

    pub fn has_flag(&self, flag: QualityFlag) -> bool {
        self.flags.contains(&flag)
    }
}

#[cfg(test)]
mod records_test {
    use super::*;

    #[test]
    fn test_raw_value_views() {
        assert_eq!(RawValue::from(12.5).as_f64(), Some(12.5));
        assert_eq!(RawValue::from(" 3.25 ").as_f64(), Some(3.25));
        assert_eq!(RawValue::from("--").as_f64(), None);
        assert_eq!(RawValue::Null.as_f64(), None);
        assert_eq!(RawValue::from(4295806720i64).as_text().unwrap(), "4295806720");
        assert_eq!(RawValue::from("HIP 1").as_text().unwrap(), "HIP 1");
        assert_eq!(RawValue::from(None::<f64>), RawValue::Null);
    }

    #[test]
    fn test_raw_value_json_shape() {
        let row: Vec<RawValue> = serde_json::from_str(r#"[1.5, "22 52 23.37", null]"#).unwrap();
        assert_eq!(
            row,
            vec![
                RawValue::Number(1.5),
                RawValue::Text("22 52 23.37".into()),
                RawValue::Null
            ]
        );
    }

    #[test]
    fn test_push_row_pads_missing_cells() {
        let mut batch = RawBatch::new(RecordMetadata::new("hip"), ["HIP", "RAdeg", "DEdeg"]);
        batch.push_row([RawValue::from(1i64), RawValue::from(0.00091185)]);
        assert_eq!(batch.len(), 1);
        let rec = &batch.records[0];
        assert_eq!(rec.get("RAdeg"), Some(&RawValue::Number(0.00091185)));
        assert_eq!(rec.get("DEdeg"), Some(&RawValue::Null));
        assert_eq!(rec.get("Vmag"), None);
        assert_eq!(rec.metadata().source_catalog_name, "hip");
    }

    #[test]
    fn test_batches_get_distinct_ids() {
        let a = RawBatch::new(RecordMetadata::new("survey"), ["ra", "dec"]);
        let b = RawBatch::new(RecordMetadata::new("survey"), ["ra", "dec"]);
        assert!(a.metadata.batch_id.is_some());
        assert_ne!(a.metadata.batch_id, b.metadata.batch_id);

        let mut pinned = RawBatch::new(RecordMetadata::new("survey").with_batch_id("dr3"), ["ra"]);
        pinned.push_row([1.0]);
        assert_eq!(pinned.records[0].metadata().batch_id.as_deref(), Some("dr3"));
    }

    #[test]
    fn test_record_key_order() {
        let mut keys = vec![
            RecordKey::new("sdss", "2"),
            RecordKey::new("gaia", "9"),
            RecordKey::new("gaia", "10"),
        ];
        keys.sort();
        assert_eq!(keys[0], RecordKey::new("gaia", "10"));
        assert_eq!(keys[2].to_string(), "sdss/2");
    }
}
