use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::fusion_errors::FusionError;

/// Photometric systems the harmonizer knows how to bring onto the canonical Johnson V band.
///
/// Each system converts with an affine transform evaluated at a typical stellar color,
/// plus an optional linear color term when the catalog provides the matching color index:
///
/// ```text
/// V = scale · m + offset + color_coeff · (color − reference_color)
/// ```
///
/// | System | Color index | Source of the relation |
/// |---|---|---|
/// | Johnson V | B−V | identity |
/// | Johnson B | B−V | V = B − (B−V) |
/// | Gaia G | BP−RP | Evans et al. 2018 polynomial, linearized at BP−RP = 0.82 |
/// | Tycho VT | BT−VT | V = VT − 0.090 (BT−VT), ESA 1997 |
/// | SDSS g | g−r | V = g − 0.59 (g−r) − 0.01, Jester et al. 2005 |
/// | SDSS r | g−r | V = r + 0.41 (g−r) − 0.01, Jester et al. 2005 |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhotometricSystem {
    JohnsonV,
    JohnsonB,
    GaiaG,
    TychoVt,
    SdssG,
    SdssR,
}

/// Coefficients of the conversion of one system onto Johnson V.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorTransform {
    pub scale: f64,
    pub offset: f64,
    pub color_coeff: f64,
    pub reference_color: f64,
    /// Name of the color index the correction term expects.
    pub color_index: &'static str,
}

impl PhotometricSystem {
    /// The system every magnitude is harmonized onto.
    pub const CANONICAL: PhotometricSystem = PhotometricSystem::JohnsonV;

    pub fn transform(&self) -> ColorTransform {
        match self {
            PhotometricSystem::JohnsonV => ColorTransform {
                scale: 1.0,
                offset: 0.0,
                color_coeff: 0.0,
                reference_color: 0.0,
                color_index: "B-V",
            },
            PhotometricSystem::JohnsonB => ColorTransform {
                scale: 1.0,
                offset: -0.65,
                color_coeff: -1.0,
                reference_color: 0.65,
                color_index: "B-V",
            },
            PhotometricSystem::GaiaG => ColorTransform {
                scale: 1.0,
                offset: 0.1397,
                color_coeff: 0.2909,
                reference_color: 0.82,
                color_index: "BP-RP",
            },
            PhotometricSystem::TychoVt => ColorTransform {
                scale: 1.0,
                offset: -0.063,
                color_coeff: -0.090,
                reference_color: 0.70,
                color_index: "BT-VT",
            },
            PhotometricSystem::SdssG => ColorTransform {
                scale: 1.0,
                offset: -0.2755,
                color_coeff: -0.59,
                reference_color: 0.45,
                color_index: "g-r",
            },
            PhotometricSystem::SdssR => ColorTransform {
                scale: 1.0,
                offset: 0.1745,
                color_coeff: 0.41,
                reference_color: 0.45,
                color_index: "g-r",
            },
        }
    }
}

impl fmt::Display for PhotometricSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PhotometricSystem::JohnsonV => "johnson_v",
            PhotometricSystem::JohnsonB => "johnson_b",
            PhotometricSystem::GaiaG => "gaia_g",
            PhotometricSystem::TychoVt => "tycho_vt",
            PhotometricSystem::SdssG => "sdss_g",
            PhotometricSystem::SdssR => "sdss_r",
        };
        write!(f, "{s}")
    }
}

impl FromStr for PhotometricSystem {
    type Err = FusionError;

    /// Bare band letters and their `mag` column forms are case-sensitive:
    /// `G`/`Gmag` is Gaia, `g`/`gmag` and `r`/`rmag` are SDSS.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        match t {
            "G" | "Gmag" => return Ok(PhotometricSystem::GaiaG),
            "g" | "gmag" => return Ok(PhotometricSystem::SdssG),
            "r" | "rmag" => return Ok(PhotometricSystem::SdssR),
            _ => {}
        }
        match t.to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "v" | "johnson_v" | "vmag" => Ok(PhotometricSystem::JohnsonV),
            "b" | "johnson_b" | "bmag" => Ok(PhotometricSystem::JohnsonB),
            "gaia_g" | "phot_g_mean_mag" => Ok(PhotometricSystem::GaiaG),
            "vt" | "tycho_vt" | "vtmag" => Ok(PhotometricSystem::TychoVt),
            "sdss_g" | "gpmag" => Ok(PhotometricSystem::SdssG),
            "sdss_r" | "rpmag" => Ok(PhotometricSystem::SdssR),
            _ => Err(FusionError::UnknownPhotometricSystem(s.to_string())),
        }
    }
}
