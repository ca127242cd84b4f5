//! Candidate generation for the cross-match: a uniform grid over the unit sphere embedded
//! in 3-D.
//!
//! Positions are turned into unit vectors and binned into cubic cells whose side is the
//! chord subtended by the match tolerance. Two positions within the tolerance are at most one
//! chord apart, hence in the same or in adjacent cells (26 neighbours). Unlike RA/Dec cells the
//! grid has no wrap-around seam at RA = 0 and no cell distortion at the poles.
use std::collections::HashMap;

use nalgebra::Vector3;

use crate::constants::{ArcSec, Degree, RADSEC};
use crate::ref_system::{chord_from_angle, radec_to_cartesian};

pub type CellKey = (i64, i64, i64);

/// Smallest cell side, keeps cell indices far from `i64` overflow for tiny tolerances.
const MIN_CELL_SIZE: f64 = 1e-12;

/// Cells are padded so that rounding in the unit vectors never pushes a true match two
/// cells apart.
const CELL_PADDING: f64 = 1.0 + 1e-9;

#[derive(Debug, Clone)]
pub struct SpatialIndex {
    cell_size: f64,
    cells: HashMap<CellKey, Vec<usize>>,
}

impl SpatialIndex {
    /// Bin `positions` (degrees) for a match tolerance in arcseconds.
    pub fn build(positions: &[(Degree, Degree)], tolerance: ArcSec) -> Self {
        let angle = (tolerance * RADSEC).min(std::f64::consts::PI);
        let cell_size = (chord_from_angle(angle) * CELL_PADDING).max(MIN_CELL_SIZE);

        let mut cells: HashMap<CellKey, Vec<usize>> = HashMap::new();
        for (idx, &(ra, dec)) in positions.iter().enumerate() {
            let key = cell_of(&radec_to_cartesian(ra, dec), cell_size);
            cells.entry(key).or_default().push(idx);
        }
        SpatialIndex { cell_size, cells }
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Occupied cells in ascending key order.
    pub fn sorted_cells(&self) -> Vec<CellKey> {
        let mut keys: Vec<CellKey> = self.cells.keys().copied().collect();
        keys.sort_unstable();
        keys
    }

    /// Candidate pairs owned by cell `key`: pairs inside the cell, plus pairs with each
    /// neighbouring cell whose key is greater. Every unordered candidate pair of the index is
    /// owned by exactly one cell, so cells can be scanned independently.
    pub fn candidate_pairs(&self, key: CellKey) -> Vec<(usize, usize)> {
        let Some(members) = self.cells.get(&key) else {
            return Vec::new();
        };

        let mut pairs = Vec::new();
        for (i, &a) in members.iter().enumerate() {
            for &b in &members[i + 1..] {
                pairs.push((a, b));
            }
        }

        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let neighbour = (key.0 + dx, key.1 + dy, key.2 + dz);
                    if neighbour <= key {
                        continue;
                    }
                    if let Some(others) = self.cells.get(&neighbour) {
                        for &a in members {
                            for &b in others {
                                pairs.push((a, b));
                            }
                        }
                    }
                }
            }
        }
        pairs
    }
}

fn cell_of(v: &Vector3<f64>, cell_size: f64) -> CellKey {
    (
        (v.x / cell_size).floor() as i64,
        (v.y / cell_size).floor() as i64,
        (v.z / cell_size).floor() as i64,
    )
}
