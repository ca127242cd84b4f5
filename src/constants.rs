//! # Constants and type definitions for astrofuse
//!
//! This module centralizes the **conversion factors**, **reference epochs**, and **common type
//! aliases** used throughout the crate.
//!
//! ## Overview
//!
//! - Angle conversions (degrees ↔ radians, arcseconds, milliarcseconds)
//! - Reference epochs (J2000.0, B1950.0) in MJD TT and Julian years
//! - Photometric reference values (AB zero point)
//! - Core type aliases used across the schema mapper, normalizer, photometry and cross-match

// -------------------------------------------------------------------------------------------------
// Angle conversions
// -------------------------------------------------------------------------------------------------

/// 2π, useful for trigonometric conversions
pub const DPI: f64 = 2. * std::f64::consts::PI;

/// Degrees → radians
pub const RADEG: f64 = std::f64::consts::PI / 180.0;

/// Arcseconds → radians
pub const RADSEC: f64 = std::f64::consts::PI / 648000.0;

/// Number of arcseconds in one degree
pub const ARCSEC_PER_DEG: f64 = 3600.0;

/// Number of milliarcseconds in one degree
pub const MAS_PER_DEG: f64 = 3_600_000.0;

/// Full circle in degrees
pub const FULL_CIRCLE_DEG: f64 = 360.0;

// -------------------------------------------------------------------------------------------------
// Reference epochs
// -------------------------------------------------------------------------------------------------

/// MJD epoch of J2000.0 (2000-01-01 12:00:00 TT)
pub const T2000: f64 = 51544.5;

/// J2000.0 as a Julian epoch year
pub const J2000_YEAR: f64 = 2000.0;

/// Earliest and latest epoch years accepted for a declared or canonical epoch
pub const MIN_EPOCH_YEAR: f64 = 1000.0;
pub const MAX_EPOCH_YEAR: f64 = 3000.0;

/// Length of the Julian year in days
pub const JULIAN_YEAR_DAYS: f64 = 365.25;

/// Length of the Besselian (tropical) year in days, as used by the B-epoch definition
pub const BESSELIAN_YEAR_DAYS: f64 = 365.242198781;

/// MJD of B1900.0, origin of the Besselian epoch scale
pub const B1900_MJD: f64 = 15019.81352;

/// Conversion factor between Julian Date and Modified Julian Date
pub const JDTOMJD: f64 = 2400000.5;

// -------------------------------------------------------------------------------------------------
// Photometry
// -------------------------------------------------------------------------------------------------

/// Flux density of an AB magnitude 0 source, in Jansky
pub const AB_ZERO_POINT_JY: f64 = 3631.0;

/// Parallax (mas) to distance (pc) numerator: d = 1000 / ϖ
pub const MAS_PARSEC: f64 = 1000.0;

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Angle in degrees
pub type Degree = f64;
/// Angle in arcseconds
pub type ArcSec = f64;
/// Angle in milliarcseconds
pub type MilliArcSec = f64;
/// Angle in radians
pub type Radian = f64;
/// Distance in parsecs
pub type Parsec = f64;
/// Epoch expressed as a (fractional) Julian year, e.g. 2015.5
pub type JulianYear = f64;
/// Modified Julian Date (days)
pub type MJD = f64;
/// Proper motion in milliarcseconds per year
pub type MasPerYear = f64;
