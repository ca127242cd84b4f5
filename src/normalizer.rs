//! # Coordinate & epoch normalizer
//!
//! Brings a raw `(ra, dec)` pair declared in any supported [`Frame`] and epoch onto the
//! canonical frame (ICRS / J2000 mean) and the canonical epoch (J2000.0 by default).
//!
//! The pipeline for one position is:
//!
//! 1. validate the input (`ra ∈ [0, 360)`, `dec ∈ [−90, 90]` up to the pole tolerance),
//! 2. rotate position **and** proper-motion tangent vector with the fixed frame matrix
//!    (skipped entirely for the canonical frame, so canonical input is returned bit-for-bit),
//! 3. propagate linearly by `Δt × μ` where `Δt` is the baseline in Julian years between
//!    the declared epoch and the canonical epoch,
//! 4. wrap right ascension into [0, 360) and collapse declinations within ε of a pole.
//!
//! Proper motions follow the Gaia convention: `pm_ra` is μα* = μα·cos δ, in mas/yr.
//!
//! ## Example
//!
//! ```rust
//! use astrofuse::normalizer::CoordinateNormalizer;
//! use astrofuse::ref_system::Frame;
//!
//! let normalizer = CoordinateNormalizer::default();
//! let (ra, dec) = normalizer
//!     .normalize(0.0, 0.0, Frame::Galactic, None, None, None)
//!     .unwrap();
//! assert!((ra - 266.405).abs() < 1e-3 && (dec + 28.936).abs() < 1e-3);
//! ```
use hifitime::Epoch;
use log::debug;
use nalgebra::{Matrix3, Vector3};

use crate::constants::{Degree, MasPerYear, MAS_PER_DEG, RADEG};
use crate::fusion_errors::FusionError;
use crate::ref_system::{
    cartesian_to_radec, clamp_dec, frame_to_icrs, radec_to_cartesian, wrap_ra, Frame,
};
use crate::time::{julian_years_between, EpochTag};

/// What to do with positions whose frame the catalog left unspecified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnspecifiedFramePolicy {
    /// Treat them as canonical.
    #[default]
    AssumeCanonical,
    /// Fail with [`FusionError::UnsupportedFrame`].
    Reject,
}

/// Configuration of the [`CoordinateNormalizer`].
///
/// Defaults: canonical epoch J2000.0, pole tolerance 1e-9°, unspecified frames assumed canonical.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizerParams {
    pub canonical_epoch: EpochTag,
    /// Declinations within this many degrees of a pole collapse onto the pole.
    pub pole_epsilon: Degree,
    pub unspecified_frame: UnspecifiedFramePolicy,
}

impl Default for NormalizerParams {
    fn default() -> Self {
        NormalizerParams {
            canonical_epoch: EpochTag::J2000,
            pole_epsilon: 1e-9,
            unspecified_frame: UnspecifiedFramePolicy::AssumeCanonical,
        }
    }
}

/// Stateless (after construction) coordinate normalizer.
///
/// Rotation matrices and the canonical epoch are computed once in [`CoordinateNormalizer::new`]
/// and shared read-only, so one instance can serve any number of worker threads.
#[derive(Debug, Clone)]
pub struct CoordinateNormalizer {
    params: NormalizerParams,
    canonical_epoch: Epoch,
    rot_legacy: Matrix3<f64>,
    rot_galactic: Matrix3<f64>,
    rot_ecliptic: Matrix3<f64>,
}

impl Default for CoordinateNormalizer {
    fn default() -> Self {
        Self::with_canonical_epoch(NormalizerParams::default(), EpochTag::J2000.tt_epoch())
    }
}

impl CoordinateNormalizer {
    /// Build a normalizer.
    ///
    /// Errors
    /// ------
    /// * [`FusionError::InvalidEpoch`] if the canonical epoch is not finite or out of range.
    pub fn new(params: NormalizerParams) -> Result<Self, FusionError> {
        let canonical_epoch = params.canonical_epoch.to_epoch()?;
        Ok(Self::with_canonical_epoch(params, canonical_epoch))
    }

    fn with_canonical_epoch(params: NormalizerParams, canonical_epoch: Epoch) -> Self {
        CoordinateNormalizer {
            canonical_epoch,
            params,
            rot_legacy: frame_to_icrs(Frame::EquatorialLegacy),
            rot_galactic: frame_to_icrs(Frame::Galactic),
            rot_ecliptic: frame_to_icrs(Frame::Ecliptic),
        }
    }

    pub fn params(&self) -> &NormalizerParams {
        &self.params
    }

    /// Rotation from `frame` to the canonical frame, or `None` when no rotation is needed.
    fn rotation(&self, frame: Frame) -> Result<Option<&Matrix3<f64>>, FusionError> {
        match frame {
            Frame::EquatorialStandard => Ok(None),
            Frame::Unspecified => match self.params.unspecified_frame {
                UnspecifiedFramePolicy::AssumeCanonical => {
                    debug!("unspecified coordinate frame, assuming {}", Frame::EquatorialStandard);
                    Ok(None)
                }
                UnspecifiedFramePolicy::Reject => {
                    Err(FusionError::UnsupportedFrame(frame.to_string()))
                }
            },
            Frame::EquatorialLegacy => Ok(Some(&self.rot_legacy)),
            Frame::Galactic => Ok(Some(&self.rot_galactic)),
            Frame::Ecliptic => Ok(Some(&self.rot_ecliptic)),
        }
    }

    /// Check and clamp a position; `ra` must already be in [0, 360).
    fn checked(&self, ra: Degree, dec: Degree) -> Result<(Degree, Degree), FusionError> {
        let invalid = FusionError::InvalidCoordinate { ra, dec };
        if !ra.is_finite() || !(0.0..360.0).contains(&ra) {
            return Err(invalid);
        }
        let dec = clamp_dec(dec, self.params.pole_epsilon).ok_or(invalid)?;
        Ok((ra, dec))
    }

    /// Normalize one position to the canonical frame and epoch.
    ///
    /// Arguments
    /// -----------------
    /// * `ra`, `dec`: position in `frame`, in degrees.
    /// * `frame`: declared frame of the position.
    /// * `epoch`: epoch of the position; `None` means the canonical epoch.
    /// * `pm_ra`, `pm_dec`: proper motion (μα*, μδ) in mas/yr, expressed in `frame`.
    ///   A missing component counts as zero; non-finite components disable propagation.
    ///
    /// Return
    /// ----------
    /// * `(ra, dec)` in the canonical frame at the canonical epoch, `ra ∈ [0, 360)`,
    ///   `dec ∈ [−90, 90]`.
    ///
    /// Errors
    /// ----------
    /// * [`FusionError::InvalidCoordinate`] if the input or the propagated position is out of range.
    /// * [`FusionError::UnsupportedFrame`] for `Unspecified` under [`UnspecifiedFramePolicy::Reject`].
    /// * [`FusionError::InvalidEpoch`] if `epoch` is not finite or outside the supported years.
    pub fn normalize(
        &self,
        ra: Degree,
        dec: Degree,
        frame: Frame,
        epoch: Option<EpochTag>,
        pm_ra: Option<MasPerYear>,
        pm_dec: Option<MasPerYear>,
    ) -> Result<(Degree, Degree), FusionError> {
        let (ra, dec) = self.checked(ra, dec)?;
        let epoch = epoch.map(|e| e.to_epoch()).transpose()?;

        let pm = match (pm_ra, pm_dec) {
            (None, None) => None,
            (a, d) => {
                let (a, d) = (a.unwrap_or(0.0), d.unwrap_or(0.0));
                (a.is_finite() && d.is_finite()).then_some((a, d))
            }
        };

        let (ra, dec, pm) = match self.rotation(frame)? {
            None => (ra, dec, pm),
            Some(rot) => {
                let position = radec_to_cartesian(ra, dec);
                let (ra_c, dec_c) = cartesian_to_radec(&(rot * position));
                let pm_c = pm.map(|(a, d)| {
                    let tangent = rot * tangent_vector(ra, dec, a, d);
                    tangent_components(ra_c, dec_c, &tangent)
                });
                (ra_c, dec_c, pm_c)
            }
        };

        let (ra, dec) = match (epoch, pm) {
            (Some(epoch), Some((a, d))) => {
                let dt = julian_years_between(&epoch, &self.canonical_epoch);
                propagate_linear(ra, dec, a, d, dt)
            }
            _ => (ra, dec),
        };

        let ra_out = wrap_ra(ra);
        let dec_out = clamp_dec(dec, self.params.pole_epsilon)
            .ok_or(FusionError::InvalidCoordinate { ra: ra_out, dec })?;
        Ok((ra_out, dec_out))
    }

    /// Express a canonical position in another frame (inverse rotation, no epoch change).
    pub fn to_frame(
        &self,
        ra: Degree,
        dec: Degree,
        frame: Frame,
    ) -> Result<(Degree, Degree), FusionError> {
        let (ra, dec) = self.checked(ra, dec)?;
        match self.rotation(frame)? {
            None => Ok((ra, dec)),
            Some(rot) => {
                let (ra_f, dec_f) =
                    cartesian_to_radec(&(rot.transpose() * radec_to_cartesian(ra, dec)));
                self.checked(wrap_ra(ra_f), dec_f)
            }
        }
    }
}

/// Tangent-plane motion at (ra, dec) as a cartesian vector (arbitrary units, here mas/yr).
fn tangent_vector(ra: Degree, dec: Degree, pm_ra: f64, pm_dec: f64) -> Vector3<f64> {
    let (sin_ra, cos_ra) = (ra * RADEG).sin_cos();
    let (sin_dec, cos_dec) = (dec * RADEG).sin_cos();
    let e_ra = Vector3::new(-sin_ra, cos_ra, 0.0);
    let e_dec = Vector3::new(-sin_dec * cos_ra, -sin_dec * sin_ra, cos_dec);
    e_ra * pm_ra + e_dec * pm_dec
}

/// Project a tangent vector back onto the local (east, north) basis at (ra, dec).
fn tangent_components(ra: Degree, dec: Degree, tangent: &Vector3<f64>) -> (f64, f64) {
    let (sin_ra, cos_ra) = (ra * RADEG).sin_cos();
    let (sin_dec, cos_dec) = (dec * RADEG).sin_cos();
    let e_ra = Vector3::new(-sin_ra, cos_ra, 0.0);
    let e_dec = Vector3::new(-sin_dec * cos_ra, -sin_dec * sin_ra, cos_dec);
    (tangent.dot(&e_ra), tangent.dot(&e_dec))
}

/// Linear proper-motion propagation over `dt` Julian years.
///
/// `pm_ra` is μα* (already multiplied by cos δ). At the poles the RA shift is undefined
/// and skipped.
fn propagate_linear(
    ra: Degree,
    dec: Degree,
    pm_ra: MasPerYear,
    pm_dec: MasPerYear,
    dt: f64,
) -> (Degree, Degree) {
    let dec_new = dec + pm_dec * dt / MAS_PER_DEG;
    let cos_dec = (dec * RADEG).cos();
    let ra_new = if cos_dec.abs() > 1e-12 {
        ra + pm_ra * dt / MAS_PER_DEG / cos_dec
    } else {
        ra
    };
    (ra_new, dec_new)
}

/// Normalize with the default parameters (canonical epoch J2000.0).
///
/// See [`CoordinateNormalizer::normalize`].
pub fn normalize(
    ra: Degree,
    dec: Degree,
    frame: Frame,
    epoch: Option<EpochTag>,
    pm_ra: Option<MasPerYear>,
    pm_dec: Option<MasPerYear>,
) -> Result<(Degree, Degree), FusionError> {
    CoordinateNormalizer::default().normalize(ra, dec, frame, epoch, pm_ra, pm_dec)
}
