//! # Celestial reference frames
//!
//! Frame tags declared by catalogs, the fixed rotations that bring each of them onto the
//! canonical frame (ICRS / mean equator and equinox J2000), and the spherical geometry
//! helpers shared by the normalizer and the cross-match engine.
//!
//! Rotations are expressed as [`nalgebra::Matrix3`] acting on unit vectors:
//! `x_icrs = M · x_frame`. Every matrix here is orthonormal, so the inverse transform is
//! the transpose.
use std::{fmt, str::FromStr};

use nalgebra::{Matrix3, Rotation3, Vector3};
use serde::{Deserialize, Serialize};

use crate::constants::{Degree, Radian, ArcSec, FULL_CIRCLE_DEG, RADEG, RADSEC, T2000};
use crate::fusion_errors::FusionError;
use crate::time::EpochTag;

/// Coordinate frame declared by a source catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Frame {
    /// ICRS / FK5 J2000 mean equator and equinox. This is the canonical frame.
    EquatorialStandard,
    /// FK4 B1950 mean equator and equinox.
    ///
    /// Converted by IAU 1976 precession from B1950.0 to J2000.0 only. The FK4 E-terms of
    /// aberration and the FK4 to FK5 equinox correction are not applied, so positions can
    /// differ from a full FK4 to FK5 reduction by up to about 0.5 arcsec. Rows in this frame
    /// carry no extra quality flag for it.
    EquatorialLegacy,
    /// IAU galactic coordinates (l, b).
    Galactic,
    /// Mean ecliptic and equinox J2000 (λ, β).
    Ecliptic,
    /// The catalog did not say.
    Unspecified,
}

impl Frame {
    pub fn is_canonical(&self) -> bool {
        matches!(self, Frame::EquatorialStandard)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Frame::EquatorialStandard => "equatorial-standard",
            Frame::EquatorialLegacy => "equatorial-legacy",
            Frame::Galactic => "galactic",
            Frame::Ecliptic => "ecliptic",
            Frame::Unspecified => "unspecified",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Frame {
    type Err = FusionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().to_ascii_lowercase().replace(['_', ' '], "-");
        match tag.as_str() {
            "equatorial-standard" | "icrs" | "fk5" | "j2000" | "equatorial" | "eq" => {
                Ok(Frame::EquatorialStandard)
            }
            "equatorial-legacy" | "fk4" | "b1950" => Ok(Frame::EquatorialLegacy),
            "galactic" | "gal" => Ok(Frame::Galactic),
            "ecliptic" | "ecl" => Ok(Frame::Ecliptic),
            "unspecified" | "unknown" | "" => Ok(Frame::Unspecified),
            _ => Err(FusionError::UnsupportedFrame(s.to_string())),
        }
    }
}

/// Construct a right-handed 3×3 rotation matrix around one of the principal axes (X, Y, or Z).
///
/// The rotation is **active** (the vector is rotated in a fixed frame) and follows the
/// direct sense: counter-clockwise when looking down the axis toward the origin.
///
/// # Arguments
///
/// * `alpha` - Rotation angle in **radians**.
/// * `k` - Index of the axis of rotation: `0` → X, `1` → Y, `2` → Z.
///
/// # Panics
///
/// Panics if `k > 2`, as only axes 0–2 are valid.
pub fn rotmt(alpha: Radian, k: usize) -> Matrix3<f64> {
    let axis = match k {
        0 => Vector3::x_axis(),
        1 => Vector3::y_axis(),
        2 => Vector3::z_axis(),
        _ => panic!("**** ROTMT: invalid axis index {k} (must be 0,1,2) ****"),
    };

    Rotation3::from_axis_angle(&axis, alpha).into()
}

/// Mean obliquity of the ecliptic at a given epoch (IAU 1976 model), in radians.
///
/// ```text
/// ε(t) = ε₀ + ε₁·T + ε₂·T² + ε₃·T³,   T = (tjm - T2000) / 36525
/// ```
pub fn obleq(tjm: f64) -> Radian {
    let ob0 = ((23.0 * 3600.0 + 26.0 * 60.0) + 21.448) * RADSEC;
    let ob1 = -46.815 * RADSEC;
    let ob2 = -0.0006 * RADSEC;
    let ob3 = 0.00181 * RADSEC;

    let t = (tjm - T2000) / 36525.0;

    ((ob3 * t + ob2) * t + ob1) * t + ob0
}

/// IAU 1976 precession matrix from the J2000 mean equator and equinox to the mean
/// equator and equinox of `tjm` (MJD TT):
///
/// ```text
/// P = R3(-z) · R2(θ) · R3(-ζ)      (coordinate rotations)
/// ζ(T) = (0.6406161 + 0.0000839·T + 0.0000050·T²) · T  [deg]
/// θ(T) = (0.5567530 - 0.0001185·T - 0.0000116·T²) · T  [deg]
/// z(T) = (0.6406161 + 0.0003041·T + 0.0000051·T²) · T  [deg]
/// ```
///
/// Valid within a few centuries of J2000, which covers every B1950 catalog.
pub fn prec(tjm: f64) -> Matrix3<f64> {
    let zed = 0.6406161 * RADEG;
    let zd = 0.6406161 * RADEG;
    let thd = 0.5567530 * RADEG;

    let zedd = 0.0000839 * RADEG;
    let zdd = 0.0003041 * RADEG;
    let thdd = -0.0001185 * RADEG;

    let zeddd = 0.0000050 * RADEG;
    let zddd = 0.0000051 * RADEG;
    let thddd = -0.0000116 * RADEG;

    let t = (tjm - T2000) / 36525.0;

    let zeta = ((zeddd * t + zedd) * t + zed) * t;
    let z = ((zddd * t + zdd) * t + zd) * t;
    let theta = ((thddd * t + thdd) * t + thd) * t;

    // coordinate rotations are active rotations by the opposite angle
    rotmt(z, 2) * rotmt(-theta, 1) * rotmt(zeta, 2)
}

/// ICRS → galactic rotation (Hipparcos catalogue, ESA 1997, vol. 1 §1.5.3).
#[rustfmt::skip]
fn icrs_to_galactic() -> Matrix3<f64> {
    Matrix3::new(
        -0.054_875_560_416_215_4, -0.873_437_090_234_885_0, -0.483_835_015_548_713_2,
         0.494_109_427_875_583_7, -0.444_829_629_960_011_2,  0.746_982_244_497_218_9,
        -0.867_666_149_019_004_7, -0.198_076_373_431_201_5,  0.455_983_776_175_066_9,
    )
}

/// Rotation bringing a unit vector expressed in `frame` onto the canonical frame.
///
/// `Unspecified` is treated as already canonical; callers decide whether that is
/// acceptable before asking for the matrix.
pub fn frame_to_icrs(frame: Frame) -> Matrix3<f64> {
    match frame {
        Frame::EquatorialStandard | Frame::Unspecified => Matrix3::identity(),
        // precession only: no E-terms, no equinox correction
        Frame::EquatorialLegacy => prec(EpochTag::Besselian(1950.0).mjd()).transpose(),
        Frame::Galactic => icrs_to_galactic().transpose(),
        Frame::Ecliptic => rotmt(obleq(T2000), 0),
    }
}

/// Unit vector pointing at (ra, dec), both in degrees.
pub fn radec_to_cartesian(ra: Degree, dec: Degree) -> Vector3<f64> {
    let (sin_ra, cos_ra) = (ra * RADEG).sin_cos();
    let (sin_dec, cos_dec) = (dec * RADEG).sin_cos();
    Vector3::new(cos_dec * cos_ra, cos_dec * sin_ra, sin_dec)
}

/// Convert a 3D Cartesian vector to (ra, dec) in degrees.
///
/// * `ra` lies in [0, 360), `dec` in [−90, +90].
/// * A zero vector maps to (0, 0); a vector along the pole has ra = 0.
pub fn cartesian_to_radec(cartesian_position: &Vector3<f64>) -> (Degree, Degree) {
    let pos_norm = cartesian_position.norm();
    if pos_norm == 0. {
        return (0.0, 0.0);
    }

    let z = (cartesian_position.z / pos_norm).clamp(-1.0, 1.0);
    let delta = z.asin();

    let rho = cartesian_position.x.hypot(cartesian_position.y);
    if rho == 0.0 {
        return (0.0, delta / RADEG);
    }

    let alpha = cartesian_position.y.atan2(cartesian_position.x);
    (wrap_ra(alpha / RADEG), delta / RADEG)
}

/// Wrap a right ascension into [0, 360).
pub fn wrap_ra(ra: Degree) -> Degree {
    let wrapped = ra.rem_euclid(FULL_CIRCLE_DEG);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= FULL_CIRCLE_DEG {
        0.0
    } else {
        wrapped
    }
}

/// Collapse declinations within `eps` of a pole onto the pole.
///
/// Returns `None` when the value is non-finite or lies beyond a pole by more than `eps`.
pub fn clamp_dec(dec: Degree, eps: Degree) -> Option<Degree> {
    if !dec.is_finite() {
        return None;
    }
    if dec.abs() > 90.0 + eps {
        return None;
    }
    if dec.abs() > 90.0 - eps {
        return Some(90.0_f64.copysign(dec));
    }
    Some(dec)
}

/// Great-circle separation between two positions, in arcseconds (haversine formula).
///
/// Numerically stable for the sub-arcsecond separations cross-matching cares about,
/// where the spherical law of cosines loses all its digits.
pub fn angular_separation_arcsec(ra1: Degree, dec1: Degree, ra2: Degree, dec2: Degree) -> ArcSec {
    let (ra1, dec1, ra2, dec2) = (ra1 * RADEG, dec1 * RADEG, ra2 * RADEG, dec2 * RADEG);
    let sin_ddec = ((dec2 - dec1) / 2.0).sin();
    let sin_dra = ((ra2 - ra1) / 2.0).sin();
    let h = sin_ddec * sin_ddec + dec1.cos() * dec2.cos() * sin_dra * sin_dra;
    2.0 * h.sqrt().min(1.0).asin() / RADSEC
}

/// Chord length between two unit vectors separated by `angle` (radians).
pub fn chord_from_angle(angle: Radian) -> f64 {
    2.0 * (angle / 2.0).sin()
}

#[cfg(test)]
mod ref_system_test {
    use super::*;
    use approx::assert_abs_diff_eq;

    const ARCSEC_DEG: f64 = 1.0 / 3600.0;

    fn transform(frame: Frame, ra: Degree, dec: Degree) -> (Degree, Degree) {
        cartesian_to_radec(&(frame_to_icrs(frame) * radec_to_cartesian(ra, dec)))
    }

    #[test]
    fn test_obliquity() {
        let obl = obleq(T2000);
        assert_eq!(obl, 0.40909280422232897)
    }

    #[test]
    fn test_parse_frame() {
        assert_eq!("ICRS".parse::<Frame>().unwrap(), Frame::EquatorialStandard);
        assert_eq!(
            "equatorial_standard".parse::<Frame>().unwrap(),
            Frame::EquatorialStandard
        );
        assert_eq!("FK4".parse::<Frame>().unwrap(), Frame::EquatorialLegacy);
        assert_eq!("Galactic".parse::<Frame>().unwrap(), Frame::Galactic);
        assert_eq!("ecl".parse::<Frame>().unwrap(), Frame::Ecliptic);
        assert_eq!("".parse::<Frame>().unwrap(), Frame::Unspecified);
        assert_eq!(
            "supergalactic".parse::<Frame>(),
            Err(FusionError::UnsupportedFrame("supergalactic".into()))
        );
        assert_eq!(
            Frame::Galactic.to_string().parse::<Frame>().unwrap(),
            Frame::Galactic
        );
    }

    #[test]
    fn test_galactic_center_and_pole() {
        let (ra, dec) = transform(Frame::Galactic, 0.0, 0.0);
        assert_abs_diff_eq!(ra, 266.40499480, epsilon = 1e-6);
        assert_abs_diff_eq!(dec, -28.93617396, epsilon = 1e-6);

        let (ra, dec) = transform(Frame::Galactic, 0.0, 90.0);
        assert_abs_diff_eq!(ra, 192.85948, epsilon = 1e-6);
        assert_abs_diff_eq!(dec, 27.12825, epsilon = 1e-6);

        let (ra, dec) = transform(Frame::Galactic, 120.0, -30.0);
        assert_abs_diff_eq!(ra, 9.83857746, epsilon = 1e-6);
        assert_abs_diff_eq!(dec, 32.80295100, epsilon = 1e-6);
    }

    #[test]
    fn test_b1950_precession() {
        let (ra, dec) = transform(Frame::EquatorialLegacy, 0.0, 0.0);
        assert_abs_diff_eq!(ra, 0.64052683, epsilon = 1e-6);
        assert_abs_diff_eq!(dec, 0.27840149, epsilon = 1e-6);

        let (ra, dec) = transform(Frame::EquatorialLegacy, 10.0, 20.0);
        assert_abs_diff_eq!(ra, 10.65882774, epsilon = 1e-6);
        assert_abs_diff_eq!(dec, 20.27389380, epsilon = 1e-6);
    }

    #[test]
    fn test_legacy_frame_is_pure_precession() {
        let rot = frame_to_icrs(Frame::EquatorialLegacy);
        assert_eq!(rot, prec(EpochTag::Besselian(1950.0).mjd()).transpose());
        // a rotation: no E-terms of aberration folded in
        assert_abs_diff_eq!((rot * rot.transpose() - Matrix3::identity()).norm(), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(rot.determinant(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_ecliptic() {
        let (ra, dec) = transform(Frame::Ecliptic, 90.0, 0.0);
        assert_abs_diff_eq!(ra, 90.0, epsilon = 1e-9);
        assert_abs_diff_eq!(dec, 23.43929111, epsilon = 1e-6);
    }

    #[test]
    fn test_matrices_are_orthonormal() {
        for frame in [
            Frame::EquatorialStandard,
            Frame::EquatorialLegacy,
            Frame::Galactic,
            Frame::Ecliptic,
        ] {
            let m = frame_to_icrs(frame);
            let prod = m * m.transpose();
            assert_abs_diff_eq!(prod, Matrix3::identity(), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_cartesian_round_trip() {
        for &(ra, dec) in &[(0.0, 0.0), (359.9999, -45.0), (123.456, 78.9), (42.0, -89.99)] {
            let (ra2, dec2) = cartesian_to_radec(&radec_to_cartesian(ra, dec));
            assert_abs_diff_eq!(ra2, ra, epsilon = 1e-9);
            assert_abs_diff_eq!(dec2, dec, epsilon = 1e-9);
        }
        assert_eq!(cartesian_to_radec(&Vector3::zeros()), (0.0, 0.0));
        assert_eq!(cartesian_to_radec(&Vector3::new(0.0, 0.0, 2.0)), (0.0, 90.0));
    }

    #[test]
    fn test_wrap_and_clamp() {
        assert_eq!(wrap_ra(360.0), 0.0);
        assert_eq!(wrap_ra(-10.0), 350.0);
        assert_eq!(wrap_ra(725.0), 5.0);
        assert!(wrap_ra(-1e-20) < 360.0);

        assert_eq!(clamp_dec(45.0, 1e-9), Some(45.0));
        assert_eq!(clamp_dec(90.0 + 1e-12, 1e-9), Some(90.0));
        assert_eq!(clamp_dec(-90.0 + 1e-12, 1e-9), Some(-90.0));
        assert_eq!(clamp_dec(90.5, 1e-9), None);
        assert_eq!(clamp_dec(f64::NAN, 1e-9), None);
    }

    #[test]
    fn test_angular_separation() {
        assert_abs_diff_eq!(angular_separation_arcsec(0.0, 0.0, 0.0, 0.0), 0.0);
        assert_abs_diff_eq!(
            angular_separation_arcsec(0.0, 0.0, 90.0, 0.0),
            90.0 * 3600.0,
            epsilon = 1e-6
        );
        assert_abs_diff_eq!(
            angular_separation_arcsec(0.0, 0.0, 180.0, 0.0),
            180.0 * 3600.0,
            epsilon = 1e-6
        );
        // across the RA wrap
        assert_abs_diff_eq!(
            angular_separation_arcsec(359.9999, 0.0, 0.0001, 0.0),
            0.72,
            epsilon = 1e-6
        );
        assert_abs_diff_eq!(
            angular_separation_arcsec(10.0, 20.0, 10.0001, 20.0001),
            0.494003651,
            epsilon = 1e-6
        );
        // one arcsecond in declination
        assert_abs_diff_eq!(
            angular_separation_arcsec(50.0, -10.0, 50.0, -10.0 + ARCSEC_DEG),
            1.0,
            epsilon = 1e-9
        );
    }
}
