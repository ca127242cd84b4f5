use std::cmp::Ordering::{Equal, Less};
use std::fmt;

use crate::fusion_errors::FusionError;

/// Confidence thresholds of the [`SchemaMapper`](crate::schema_mapper::SchemaMapper).
///
/// The defaults reproduce the usual survey-ingestion thresholds: exact alias matches
/// score 0.95 (never below 0.90), partial matches land in [0.75, 0.89), sample-only evidence
/// enters at 0.60 and candidates under 0.50 are discarded.
///
/// These values are not derived from an accuracy study; treat them as tuning knobs.
#[derive(Debug, Clone, PartialEq)]
pub struct MapperParams {
    /// Confidence assigned to an exact alias match.
    pub exact_confidence: f64,
    /// Lower bound for exact-match confidence after sample evidence.
    pub exact_floor: f64,
    /// Lower bound of the partial-match band.
    pub partial_floor: f64,
    /// Exclusive upper bound of the partial-match band.
    pub partial_ceiling: f64,
    /// Confidence of a candidate introduced by the sample pass alone.
    pub sample_confidence: f64,
    /// Increment applied to a header candidate whose samples agree.
    pub sample_boost: f64,
    /// Cap for automatically inferred candidates (manual overrides score 1.0).
    pub max_confidence: f64,
    /// Candidates below this confidence are never mapped.
    pub min_accept: f64,
    /// Two confidences closer than this are a tie.
    pub tie_epsilon: f64,
    /// Number of leading rows of a batch inspected by the sample pass.
    pub max_sample_rows: usize,
}

impl MapperParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a [`MapperParamsBuilder`] initialized with the defaults.
    pub fn builder() -> MapperParamsBuilder {
        MapperParamsBuilder::new()
    }
}

impl Default for MapperParams {
    fn default() -> Self {
        MapperParams {
            exact_confidence: 0.95,
            exact_floor: 0.90,
            partial_floor: 0.75,
            partial_ceiling: 0.89,
            sample_confidence: 0.60,
            sample_boost: 0.05,
            max_confidence: 0.99,
            min_accept: 0.50,
            tie_epsilon: 1e-9,
            max_sample_rows: 100,
        }
    }
}

impl fmt::Display for MapperParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MapperParams(exact={:.2}, partial=[{:.2}, {:.2}), sample={:.2}+{:.2}, accept>={:.2}, samples={})",
            self.exact_confidence,
            self.partial_floor,
            self.partial_ceiling,
            self.sample_confidence,
            self.sample_boost,
            self.min_accept,
            self.max_sample_rows
        )
    }
}

/// Builder for [`MapperParams`], with validation.
#[derive(Debug, Clone, Default)]
pub struct MapperParamsBuilder {
    params: MapperParams,
}

impl MapperParamsBuilder {
    pub fn new() -> Self {
        Self {
            params: MapperParams::default(),
        }
    }

    pub fn exact_confidence(mut self, v: f64) -> Self {
        self.params.exact_confidence = v;
        self
    }
    pub fn exact_floor(mut self, v: f64) -> Self {
        self.params.exact_floor = v;
        self
    }
    pub fn partial_floor(mut self, v: f64) -> Self {
        self.params.partial_floor = v;
        self
    }
    pub fn partial_ceiling(mut self, v: f64) -> Self {
        self.params.partial_ceiling = v;
        self
    }
    pub fn sample_confidence(mut self, v: f64) -> Self {
        self.params.sample_confidence = v;
        self
    }
    pub fn sample_boost(mut self, v: f64) -> Self {
        self.params.sample_boost = v;
        self
    }
    pub fn max_confidence(mut self, v: f64) -> Self {
        self.params.max_confidence = v;
        self
    }
    pub fn min_accept(mut self, v: f64) -> Self {
        self.params.min_accept = v;
        self
    }
    pub fn tie_epsilon(mut self, v: f64) -> Self {
        self.params.tie_epsilon = v;
        self
    }
    pub fn max_sample_rows(mut self, v: usize) -> Self {
        self.params.max_sample_rows = v;
        self
    }

    /// Return true iff a < b and comparable (i.e., not NaN).
    #[inline]
    fn lt(a: f64, b: f64) -> bool {
        a.partial_cmp(&b) == Some(Less)
    }

    /// Return true iff a <= b and comparable (i.e., not NaN).
    #[inline]
    fn le(a: f64, b: f64) -> bool {
        matches!(a.partial_cmp(&b), Some(Less) | Some(Equal))
    }

    /// Finalize the builder.
    ///
    /// Validation rules
    /// -----------------
    /// * `0 < min_accept ≤ sample_confidence < partial_floor ≤ partial_ceiling < exact_floor
    ///   ≤ exact_confidence ≤ max_confidence ≤ 1`, so the three evidence bands never overlap.
    /// * `sample_boost ≥ 0`, `tie_epsilon ≥ 0`.
    ///
    /// Returns
    /// -----------------
    /// * `Err(FusionError::InvalidMapperParams)` naming the first violated rule.
    pub fn build(self) -> Result<MapperParams, FusionError> {
        let p = &self.params;

        let chain = [
            (0.0, p.min_accept, true),
            (p.min_accept, p.sample_confidence, false),
            (p.sample_confidence, p.partial_floor, true),
            (p.partial_floor, p.partial_ceiling, false),
            (p.partial_ceiling, p.exact_floor, true),
            (p.exact_floor, p.exact_confidence, false),
            (p.exact_confidence, p.max_confidence, false),
            (p.max_confidence, 1.0, false),
        ];
        for (a, b, strict) in chain {
            let ok = if strict { Self::lt(a, b) } else { Self::le(a, b) };
            if !ok {
                return Err(FusionError::InvalidMapperParams(
                    "require 0 < min_accept <= sample_confidence < partial_floor <= partial_ceiling \
                     < exact_floor <= exact_confidence <= max_confidence <= 1"
                        .into(),
                ));
            }
        }
        if !Self::le(0.0, p.sample_boost) {
            return Err(FusionError::InvalidMapperParams(
                "sample_boost must be >= 0".into(),
            ));
        }
        if !Self::le(0.0, p.tie_epsilon) {
            return Err(FusionError::InvalidMapperParams(
                "tie_epsilon must be >= 0".into(),
            ));
        }

        Ok(self.params)
    }
}
