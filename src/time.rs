//! # Epoch handling
//!
//! Catalogs declare the epoch of their positions either as a bare Julian year (`2015.5`),
//! as a tagged Julian epoch (`"J2016.0"`) or as a Besselian epoch (`"B1950"`, typical of
//! FK4-era catalogs). This module turns all of them into a [`hifitime::Epoch`] in the TT
//! scale and measures baselines in Julian years, which is the unit proper motions are
//! expressed in (mas/yr).
use hifitime::{Epoch, TimeScale, Unit};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::constants::{
    JulianYear, BESSELIAN_YEAR_DAYS, B1900_MJD, J2000_YEAR, JULIAN_YEAR_DAYS, MAX_EPOCH_YEAR,
    MIN_EPOCH_YEAR, MJD, T2000,
};
use crate::fusion_errors::FusionError;

/// Julian epoch year → MJD (TT)
pub fn julian_year_to_mjd(year: JulianYear) -> MJD {
    T2000 + (year - J2000_YEAR) * JULIAN_YEAR_DAYS
}

/// MJD (TT) → Julian epoch year
pub fn mjd_to_julian_year(mjd: MJD) -> JulianYear {
    J2000_YEAR + (mjd - T2000) / JULIAN_YEAR_DAYS
}

/// Besselian epoch year → MJD (TT)
pub fn besselian_year_to_mjd(year: f64) -> MJD {
    B1900_MJD + (year - 1900.0) * BESSELIAN_YEAR_DAYS
}

/// A declared catalog epoch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EpochTag {
    /// Julian epoch year (`J2000.0`, `J2015.5`, or a bare number)
    Julian(f64),
    /// Besselian epoch year (`B1950.0`)
    Besselian(f64),
}

impl EpochTag {
    /// The canonical J2000.0 epoch.
    pub const J2000: EpochTag = EpochTag::Julian(J2000_YEAR);

    /// MJD in the TT scale.
    pub fn mjd(&self) -> MJD {
        match *self {
            EpochTag::Julian(y) => julian_year_to_mjd(y),
            EpochTag::Besselian(y) => besselian_year_to_mjd(y),
        }
    }

    /// The same instant expressed as a Julian year.
    pub fn julian_year(&self) -> JulianYear {
        match *self {
            EpochTag::Julian(y) => y,
            EpochTag::Besselian(_) => mjd_to_julian_year(self.mjd()),
        }
    }

    fn year(&self) -> f64 {
        match *self {
            EpochTag::Julian(y) | EpochTag::Besselian(y) => y,
        }
    }

    /// Check that the epoch year is finite and within [`MIN_EPOCH_YEAR`, `MAX_EPOCH_YEAR`].
    pub fn validate(&self) -> Result<(), FusionError> {
        let year = self.year();
        if year.is_finite() && (MIN_EPOCH_YEAR..=MAX_EPOCH_YEAR).contains(&year) {
            Ok(())
        } else {
            Err(FusionError::InvalidEpoch(format!(
                "{self:?} outside [{MIN_EPOCH_YEAR}, {MAX_EPOCH_YEAR}]"
            )))
        }
    }

    /// The epoch as a [`hifitime::Epoch`] in the TT scale.
    ///
    /// Errors
    /// ------
    /// * [`FusionError::InvalidEpoch`] if the year fails [`EpochTag::validate`].
    pub fn to_epoch(&self) -> Result<Epoch, FusionError> {
        self.validate()?;
        Ok(self.tt_epoch())
    }

    /// Unchecked conversion, for tags known to be in range.
    pub(crate) fn tt_epoch(&self) -> Epoch {
        Epoch::from_mjd_in_time_scale(self.mjd(), TimeScale::TT)
    }
}

impl From<JulianYear> for EpochTag {
    fn from(year: JulianYear) -> Self {
        EpochTag::Julian(year)
    }
}

impl FromStr for EpochTag {
    type Err = FusionError;

    /// Parse `"J2000"`, `"j2015.5"`, `"B1950.0"` or a bare Julian year `"2016.0"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        let invalid = || FusionError::InvalidEpoch(s.to_string());

        let (ctor, digits): (fn(f64) -> EpochTag, &str) = match t.chars().next() {
            Some('J') | Some('j') => (EpochTag::Julian, &t[1..]),
            Some('B') | Some('b') => (EpochTag::Besselian, &t[1..]),
            Some(_) => (EpochTag::Julian, t),
            None => return Err(invalid()),
        };

        let year: f64 = digits.trim().parse().map_err(|_| invalid())?;
        let tag = ctor(year);
        tag.validate().map_err(|_| invalid())?;
        Ok(tag)
    }
}

/// Elapsed time between two epochs, in Julian years (`to - from`).
///
/// Positive when `to` is later than `from`.
pub fn julian_years_between(from: &Epoch, to: &Epoch) -> f64 {
    (*to - *from).to_unit(Unit::Day) / JULIAN_YEAR_DAYS
}

#[cfg(test)]
mod time_test {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_parse_epoch_tags() {
        assert_eq!("J2000".parse::<EpochTag>().unwrap(), EpochTag::Julian(2000.0));
        assert_eq!(
            " j2015.5 ".parse::<EpochTag>().unwrap(),
            EpochTag::Julian(2015.5)
        );
        assert_eq!("2016.0".parse::<EpochTag>().unwrap(), EpochTag::Julian(2016.0));
        assert_eq!(
            "B1950".parse::<EpochTag>().unwrap(),
            EpochTag::Besselian(1950.0)
        );
        assert_eq!(
            "X1950".parse::<EpochTag>(),
            Err(FusionError::InvalidEpoch("X1950".into()))
        );
        assert_eq!("".parse::<EpochTag>(), Err(FusionError::InvalidEpoch("".into())));
    }

    #[test]
    fn test_j2000_mjd() {
        assert_eq!(EpochTag::J2000.mjd(), T2000);
        assert_eq!(julian_year_to_mjd(2016.0), T2000 + 16.0 * 365.25);
    }

    #[test]
    fn test_b1950_in_julian_years() {
        // B1950.0 = JD 2433282.4235 = J1949.99979
        let b1950 = EpochTag::Besselian(1950.0);
        assert_abs_diff_eq!(b1950.mjd(), 33281.9235, epsilon = 1e-3);
        assert_abs_diff_eq!(b1950.julian_year(), 1949.99979, epsilon = 1e-5);
    }

    #[test]
    fn test_julian_years_between() {
        let from = EpochTag::Julian(2015.5).to_epoch().unwrap();
        let to = EpochTag::J2000.to_epoch().unwrap();
        assert_abs_diff_eq!(julian_years_between(&from, &to), -15.5, epsilon = 1e-9);
        assert_abs_diff_eq!(julian_years_between(&to, &from), 15.5, epsilon = 1e-9);
    }

    #[test]
    fn test_out_of_range_epochs() {
        for tag in [
            EpochTag::Julian(f64::NAN),
            EpochTag::Julian(1e300),
            EpochTag::Besselian(-1e300),
            EpochTag::Julian(f64::INFINITY),
            EpochTag::Julian(999.0),
        ] {
            assert!(matches!(tag.to_epoch(), Err(FusionError::InvalidEpoch(_))), "{tag:?}");
        }
        assert!(EpochTag::Besselian(1875.0).to_epoch().is_ok());
        assert_eq!(
            "J1e300".parse::<EpochTag>(),
            Err(FusionError::InvalidEpoch("J1e300".into()))
        );
        assert_eq!(
            "NaN".parse::<EpochTag>(),
            Err(FusionError::InvalidEpoch("NaN".into()))
        );
    }
}
