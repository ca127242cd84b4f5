use thiserror::Error;

use crate::constants::Degree;

#[derive(Error, Debug)]
pub enum FusionError {
    #[error("Unsupported coordinate frame: {0}")]
    UnsupportedFrame(String),

    #[error("Invalid coordinate after transform: ra={ra}, dec={dec}")]
    InvalidCoordinate { ra: Degree, dec: Degree },

    #[error("Invalid cross-match tolerance (must be finite and > 0 arcsec): {0}")]
    InvalidTolerance(f64),

    #[error("Invalid zero-point (must be finite and > 0): {0}")]
    InvalidZeroPoint(f64),

    #[error("Unknown standard field: {0}")]
    UnknownStandardField(String),

    #[error("Raw column not present in the input: {0}")]
    UnknownRawColumn(String),

    #[error("Unknown photometric system: {0}")]
    UnknownPhotometricSystem(String),

    #[error("Invalid epoch: {0}")]
    InvalidEpoch(String),

    #[error("Invalid schema mapper parameters: {0}")]
    InvalidMapperParams(String),

    #[error("Invalid alias table: {0}")]
    InvalidAliasTable(String),

    #[error("Mapping result is not usable: {0:?}")]
    InvalidMapping(Vec<String>),

    #[error("Duplicate record key: {catalog}/{object_id}")]
    DuplicateRecordKey { catalog: String, object_id: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl PartialEq for FusionError {
    fn eq(&self, other: &Self) -> bool {
        use FusionError::*;
        match (self, other) {
            (UnsupportedFrame(a), UnsupportedFrame(b)) => a == b,
            (
                InvalidCoordinate { ra: ra1, dec: dec1 },
                InvalidCoordinate { ra: ra2, dec: dec2 },
            ) => ra1.to_bits() == ra2.to_bits() && dec1.to_bits() == dec2.to_bits(),
            (InvalidTolerance(a), InvalidTolerance(b)) => a.to_bits() == b.to_bits(),
            (InvalidZeroPoint(a), InvalidZeroPoint(b)) => a.to_bits() == b.to_bits(),
            (UnknownStandardField(a), UnknownStandardField(b)) => a == b,
            (UnknownRawColumn(a), UnknownRawColumn(b)) => a == b,
            (UnknownPhotometricSystem(a), UnknownPhotometricSystem(b)) => a == b,
            (InvalidEpoch(a), InvalidEpoch(b)) => a == b,
            (InvalidMapperParams(a), InvalidMapperParams(b)) => a == b,
            (InvalidAliasTable(a), InvalidAliasTable(b)) => a == b,
            (InvalidMapping(a), InvalidMapping(b)) => a == b,
            (
                DuplicateRecordKey {
                    catalog: s1,
                    object_id: o1,
                },
                DuplicateRecordKey {
                    catalog: s2,
                    object_id: o2,
                },
            ) => s1 == s2 && o1 == o2,

            // wrapped errors are not comparable: equal if same variant
            (Serialization(_), Serialization(_)) => true,
            (Csv(_), Csv(_)) => true,

            _ => false,
        }
    }
}

impl FusionError {
    /// `true` for errors caused by the caller's configuration rather than by a data value.
    ///
    /// Configuration errors are always fatal to the call that raised them; data-quality
    /// errors are caught at batch level and turned into rejected records.
    pub fn is_configuration_error(&self) -> bool {
        !matches!(self, FusionError::InvalidCoordinate { .. })
    }
}

#[cfg(test)]
mod fusion_errors_test {
    use super::*;

    #[test]
    fn test_error_classes() {
        assert!(!FusionError::InvalidCoordinate { ra: 400.0, dec: 0.0 }.is_configuration_error());
        for err in [
            FusionError::InvalidTolerance(-1.0),
            FusionError::InvalidEpoch("J-inf".into()),
            FusionError::InvalidMapperParams("min_accept".into()),
            FusionError::DuplicateRecordKey {
                catalog: "gaia".into(),
                object_id: "1".into(),
            },
        ] {
            assert!(err.is_configuration_error(), "{err}");
        }
    }

    #[test]
    fn test_errors_compare_by_payload() {
        assert_eq!(FusionError::InvalidTolerance(0.0), FusionError::InvalidTolerance(0.0));
        assert_ne!(FusionError::InvalidTolerance(0.0), FusionError::InvalidZeroPoint(0.0));
        assert_ne!(
            FusionError::InvalidMapperParams("a".into()),
            FusionError::InvalidAliasTable("a".into())
        );
    }
}
