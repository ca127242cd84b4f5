//! # Unit & photometric harmonizer
//!
//! Pure conversion functions bringing magnitudes, fluxes and parallaxes onto the canonical
//! units of a [`CanonicalRecord`](crate::records::CanonicalRecord):
//!
//! * magnitudes → Johnson V ([`magnitude_to_canonical`]),
//! * flux ↔ magnitude for an arbitrary zero-point ([`flux_to_magnitude`], [`magnitude_to_flux`]),
//! * parallax (mas) → distance (pc) ([`parallax_to_distance_pc`]).
//!
//! ## Error policy
//!
//! A physically undefined *value* (non-finite input, zero or negative flux, non-positive
//! parallax) is a data-quality issue and yields `None`. A non-positive or non-finite
//! *zero-point* is a configuration error and yields [`FusionError::InvalidZeroPoint`].
//!
//! ## Example
//!
//! ```rust
//! use astrofuse::photometry::{flux_to_magnitude, magnitude_to_flux, parallax_to_distance_pc};
//!
//! let m = flux_to_magnitude(250.0, 1000.0).unwrap().unwrap();
//! let f = magnitude_to_flux(m, 1000.0).unwrap();
//! assert!((f - 250.0).abs() / 250.0 < 1e-4);
//!
//! assert_eq!(parallax_to_distance_pc(4.0), Some(250.0));
//! assert_eq!(parallax_to_distance_pc(-1.2), None);
//! ```
pub mod systems;

pub use systems::{ColorTransform, PhotometricSystem};

use crate::constants::{MilliArcSec, Parsec, AB_ZERO_POINT_JY, MAS_PARSEC};
use crate::fusion_errors::FusionError;

fn check_zero_point(zero_point: f64) -> Result<(), FusionError> {
    if zero_point.is_finite() && zero_point > 0.0 {
        Ok(())
    } else {
        Err(FusionError::InvalidZeroPoint(zero_point))
    }
}

/// Convert a magnitude measured in `source_system` to the canonical Johnson V band.
///
/// Arguments
/// ---------
/// * `value`: the magnitude in the source system.
/// * `source_system`: photometric system of `value`.
/// * `color_index`: optional color in the index the system expects
///   (see [`ColorTransform::color_index`]); enables the linear color term.
///   A non-finite color is ignored.
///
/// Return
/// ------
/// * `Some(V)`, or `None` when `value` is not finite.
pub fn magnitude_to_canonical(
    value: f64,
    source_system: PhotometricSystem,
    color_index: Option<f64>,
) -> Option<f64> {
    if !value.is_finite() {
        return None;
    }
    let t = source_system.transform();
    let mut v = t.scale * value + t.offset;
    if let Some(color) = color_index.filter(|c| c.is_finite()) {
        v += t.color_coeff * (color - t.reference_color);
    }
    Some(v)
}

/// Convert a flux to a magnitude: `m = −2.5 · log10(flux / zero_point)`.
///
/// Return
/// ------
/// * `Ok(Some(m))` for a positive finite flux.
/// * `Ok(None)` when the flux is zero, negative or non-finite.
/// * `Err(InvalidZeroPoint)` when `zero_point` is not a positive finite number.
pub fn flux_to_magnitude(flux: f64, zero_point: f64) -> Result<Option<f64>, FusionError> {
    check_zero_point(zero_point)?;
    if !flux.is_finite() || flux <= 0.0 {
        return Ok(None);
    }
    Ok(Some(-2.5 * (flux / zero_point).log10()))
}

/// Convert a magnitude to a flux: `flux = zero_point · 10^(−0.4 · m)`.
///
/// The flux is in the unit of `zero_point`. A non-finite magnitude propagates into the
/// returned value.
pub fn magnitude_to_flux(magnitude: f64, zero_point: f64) -> Result<f64, FusionError> {
    check_zero_point(zero_point)?;
    Ok(zero_point * 10f64.powf(-0.4 * magnitude))
}

/// Distance in parsecs from a parallax in milliarcseconds: `d = 1000 / ϖ`.
///
/// Returns `None` for non-positive or non-finite parallaxes, where the inversion is undefined.
pub fn parallax_to_distance_pc(parallax_mas: MilliArcSec) -> Option<Parsec> {
    if parallax_mas.is_finite() && parallax_mas > 0.0 {
        Some(MAS_PARSEC / parallax_mas)
    } else {
        None
    }
}

/// AB magnitude of a flux density given in Jansky.
pub fn jansky_to_ab_magnitude(flux_jy: f64) -> Option<f64> {
    // the AB zero point is a valid constant
    flux_to_magnitude(flux_jy, AB_ZERO_POINT_JY).unwrap_or(None)
}

/// Distance modulus `μ = 5 · log10(d) − 5`.
pub fn distance_modulus(distance_pc: Parsec) -> Option<f64> {
    if distance_pc.is_finite() && distance_pc > 0.0 {
        Some(5.0 * distance_pc.log10() - 5.0)
    } else {
        None
    }
}

/// Absolute magnitude from an apparent magnitude and a distance in parsecs.
pub fn absolute_magnitude(apparent: f64, distance_pc: Parsec) -> Option<f64> {
    if !apparent.is_finite() {
        return None;
    }
    distance_modulus(distance_pc).map(|mu| apparent - mu)
}

#[cfg(test)]
mod photometry_test {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn test_flux_magnitude_round_trip() {
        for &zp in &[1.0, 3631.0, 2.5e-9, 1e6] {
            for &flux in &[1e-12, 0.37, 1.0, 42.0, 9.99e8] {
                let m = flux_to_magnitude(flux, zp).unwrap().unwrap();
                let back = magnitude_to_flux(m, zp).unwrap();
                assert_relative_eq!(back, flux, max_relative = 1e-4);
            }
        }
    }

    #[test]
    fn test_zero_point_is_configuration_error() {
        assert_eq!(
            flux_to_magnitude(1.0, 0.0),
            Err(FusionError::InvalidZeroPoint(0.0))
        );
        assert_eq!(
            flux_to_magnitude(1.0, -3.0),
            Err(FusionError::InvalidZeroPoint(-3.0))
        );
        assert!(magnitude_to_flux(10.0, f64::NAN).is_err());
        // the zero-point is checked before the data
        assert!(flux_to_magnitude(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_undefined_flux_is_none() {
        assert_eq!(flux_to_magnitude(0.0, 1.0), Ok(None));
        assert_eq!(flux_to_magnitude(-5.0, 1.0), Ok(None));
        assert_eq!(flux_to_magnitude(f64::INFINITY, 1.0), Ok(None));
        assert_eq!(flux_to_magnitude(f64::NAN, 1.0), Ok(None));
    }

    #[test]
    fn test_known_magnitudes() {
        assert_abs_diff_eq!(flux_to_magnitude(1.0, 1.0).unwrap().unwrap(), 0.0);
        assert_abs_diff_eq!(
            flux_to_magnitude(1.0, 100.0).unwrap().unwrap(),
            5.0,
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(magnitude_to_flux(5.0, 100.0).unwrap(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(jansky_to_ab_magnitude(3631.0).unwrap(), 0.0);
        assert_eq!(jansky_to_ab_magnitude(0.0), None);
    }

    #[test]
    fn test_parallax_to_distance() {
        for &p in &[0.001, 0.5, 1.0, 3.0, 768.0665] {
            assert_eq!(parallax_to_distance_pc(p), Some(1000.0 / p));
        }
        assert_eq!(parallax_to_distance_pc(0.0), None);
        assert_eq!(parallax_to_distance_pc(-0.3), None);
        assert_eq!(parallax_to_distance_pc(f64::NAN), None);
        assert_eq!(parallax_to_distance_pc(f64::INFINITY), None);
    }

    #[test]
    fn test_magnitude_to_canonical() {
        use PhotometricSystem::*;

        assert_eq!(magnitude_to_canonical(12.3, JohnsonV, None), Some(12.3));
        assert_eq!(magnitude_to_canonical(12.3, JohnsonV, Some(1.4)), Some(12.3));

        // at the reference color the color term vanishes
        assert_abs_diff_eq!(
            magnitude_to_canonical(10.0, GaiaG, Some(0.82)).unwrap(),
            magnitude_to_canonical(10.0, GaiaG, None).unwrap(),
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(
            magnitude_to_canonical(10.0, GaiaG, None).unwrap(),
            10.1397,
            epsilon = 1e-12
        );

        // V = B − (B−V)
        assert_abs_diff_eq!(
            magnitude_to_canonical(10.0, JohnsonB, Some(1.0)).unwrap(),
            9.0,
            epsilon = 1e-12
        );
        // Jester et al.: V = g − 0.59 (g−r) − 0.01
        assert_abs_diff_eq!(
            magnitude_to_canonical(15.0, SdssG, Some(0.3)).unwrap(),
            15.0 - 0.59 * 0.3 - 0.01,
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(
            magnitude_to_canonical(15.0, SdssR, Some(0.3)).unwrap(),
            15.0 + 0.41 * 0.3 - 0.01,
            epsilon = 1e-12
        );
        // non-finite color is ignored, non-finite magnitude is not
        assert_eq!(
            magnitude_to_canonical(10.0, TychoVt, Some(f64::NAN)),
            magnitude_to_canonical(10.0, TychoVt, None)
        );
        assert_eq!(magnitude_to_canonical(f64::NAN, TychoVt, None), None);
    }

    #[test]
    fn test_distance_modulus() {
        assert_abs_diff_eq!(distance_modulus(10.0).unwrap(), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(distance_modulus(100.0).unwrap(), 5.0, epsilon = 1e-12);
        assert_eq!(distance_modulus(0.0), None);
        assert_abs_diff_eq!(absolute_magnitude(10.0, 100.0).unwrap(), 5.0, epsilon = 1e-12);
    }
}
