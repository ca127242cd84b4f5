//! # Harmonizer: ingestion façade
//!
//! [`Harmonizer`] wires the four components together for an ingestion pipeline:
//!
//! 1. **Schema mapping** through a [`SchemaMapper`] and a per-source [`MappingCache`], so repeat
//!    batches of one catalog reuse the mapping computed (or corrected) the first time.
//! 2. **Canonicalization** of every row with the [`CoordinateNormalizer`] and the photometric
//!    conversions of [`photometry`](crate::photometry), via [`canonicalize`].
//! 3. **Cross-matching** of the accumulated canonical records, delegated to
//!    [`cross_match_with`].
//!
//! The harmonizer owns no global state: the cache lives in the value and can be extracted,
//! persisted as JSON and handed to a new instance.
//!
//! ## Typical usage
//!
//! ```rust
//! use astrofuse::harmonizer::Harmonizer;
//! use astrofuse::cross_match::CrossMatchParams;
//! use astrofuse::normalizer::NormalizerParams;
//! use astrofuse::records::{RawBatch, RecordMetadata};
//! use astrofuse::schema_mapper::MapperParams;
//!
//! let mut harmonizer =
//!     Harmonizer::new(MapperParams::default(), NormalizerParams::default()).unwrap();
//!
//! let mut batch = RawBatch::new(RecordMetadata::new("gaia"), ["source_id", "ra", "dec"]);
//! batch.push_row(["1".to_string(), "10.0".to_string(), "20.0".to_string()]);
//! let report = harmonizer.ingest(&batch).unwrap();
//! assert_eq!(report.batch.accepted.len(), 1);
//!
//! let params = CrossMatchParams::builder(2.0).build().unwrap();
//! let groups = harmonizer.cross_match(&report.batch.accepted, &params).unwrap();
//! assert_eq!(groups.fusion_groups.len(), 1);
//! ```
//!
//! ## See also
//! ------------
//! * [`SchemaMapper::suggest_cached`] – header/sample inference with cache reuse.
//! * [`canonicalize`] – row-level extraction and normalization.
//! * [`cross_match_with`] – spatial grouping.
use log::info;

use crate::cross_match::{cross_match_with, CrossMatchParams, CrossMatchResult};
use crate::fusion_errors::FusionError;
use crate::normalizer::{CoordinateNormalizer, NormalizerParams};
use crate::records::{canonicalize, CanonicalBatch, CanonicalRecord, RawBatch};
use crate::schema_mapper::{MapperParams, MappingCache, MappingResult, SchemaMapper};

/// Outcome of [`Harmonizer::ingest`]: the mapping that was used and the canonicalized rows.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestReport {
    pub mapping: MappingResult,
    pub batch: CanonicalBatch,
}

#[derive(Debug, Clone)]
pub struct Harmonizer {
    mapper: SchemaMapper,
    normalizer: CoordinateNormalizer,
    cache: MappingCache,
}

impl Harmonizer {
    /// Build a harmonizer with an empty mapping cache.
    ///
    /// Errors
    /// ----------
    /// * [`FusionError::InvalidMapperParams`] if the thresholds are inconsistent.
    /// * [`FusionError::InvalidEpoch`] if the canonical epoch is out of range.
    pub fn new(
        mapper_params: MapperParams,
        normalizer_params: NormalizerParams,
    ) -> Result<Self, FusionError> {
        Ok(Harmonizer {
            mapper: SchemaMapper::new(mapper_params)?,
            normalizer: CoordinateNormalizer::new(normalizer_params)?,
            cache: MappingCache::new(),
        })
    }

    /// Replace the mapping cache, typically with one restored by [`MappingCache::from_json`].
    pub fn with_cache(mut self, cache: MappingCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn mapper(&self) -> &SchemaMapper {
        &self.mapper
    }

    pub fn normalizer(&self) -> &CoordinateNormalizer {
        &self.normalizer
    }

    pub fn cache(&self) -> &MappingCache {
        &self.cache
    }

    pub fn into_cache(self) -> MappingCache {
        self.cache
    }

    /// Map and canonicalize one batch.
    ///
    /// The first [`MapperParams::max_sample_rows`] rows feed the sample pass. A valid mapping
    /// is cached under the batch source name.
    ///
    /// Errors
    /// ----------
    /// * [`FusionError::InvalidMapping`] if `ra` or `dec` could not be mapped.
    /// * Any configuration error raised by [`canonicalize`] (e.g. a rejected unspecified frame).
    pub fn ingest(&mut self, batch: &RawBatch) -> Result<IngestReport, FusionError> {
        let samples = &batch.records[..batch.len().min(self.mapper.params().max_sample_rows)];
        let mapping =
            self.mapper
                .suggest_cached(batch.source(), &batch.columns, Some(samples), &mut self.cache);
        self.run(batch, mapping)
    }

    /// Like [`Harmonizer::ingest`], with manual `(raw_column, standard_field)` corrections
    /// applied on top of the inferred mapping. The corrected mapping replaces the cached one.
    ///
    /// Errors
    /// ----------
    /// * [`FusionError::UnknownStandardField`] / [`FusionError::UnknownRawColumn`] for a bad
    ///   override, before anything is canonicalized.
    /// * Everything [`Harmonizer::ingest`] can return.
    pub fn ingest_with_overrides(
        &mut self,
        batch: &RawBatch,
        overrides: &[(&str, &str)],
    ) -> Result<IngestReport, FusionError> {
        let samples = &batch.records[..batch.len().min(self.mapper.params().max_sample_rows)];
        let inferred = self.mapper.suggest(&batch.columns, Some(samples));
        let mapping = self.mapper.apply_overrides(&inferred, overrides)?;
        self.cache.insert(batch.source(), mapping.clone());
        self.run(batch, mapping)
    }

    fn run(&self, batch: &RawBatch, mapping: MappingResult) -> Result<IngestReport, FusionError> {
        let canonical = canonicalize(&batch.records, &mapping, &self.normalizer)?;
        info!(
            "ingested '{}': {} rows, {} accepted, {} rejected",
            batch.source(),
            batch.len(),
            canonical.accepted.len(),
            canonical.rejected.len()
        );
        Ok(IngestReport {
            mapping,
            batch: canonical,
        })
    }

    /// Group canonical records of any number of batches. See [`cross_match_with`].
    pub fn cross_match(
        &self,
        records: &[CanonicalRecord],
        params: &CrossMatchParams,
    ) -> Result<CrossMatchResult, FusionError> {
        cross_match_with(records, params)
    }
}
