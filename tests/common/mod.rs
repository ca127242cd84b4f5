#![allow(dead_code)]

use std::collections::BTreeSet;

use astrofuse::cross_match::CrossMatchResult;
use astrofuse::records::{CanonicalRecord, RecordKey};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Fusion groups as sets of member keys, independent of the UUIDs.
pub fn membership(result: &CrossMatchResult) -> BTreeSet<Vec<RecordKey>> {
    result
        .fusion_groups
        .iter()
        .map(|g| g.members.clone())
        .collect()
}

/// `n` synthetic objects, each observed by every source in `sources` with a jitter below
/// `jitter_arcsec` on both axes.
pub fn synthetic_sky(
    seed: u64,
    n: usize,
    sources: &[&str],
    jitter_arcsec: f64,
) -> Vec<CanonicalRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    let jitter = jitter_arcsec / 3600.0;
    let mut records = Vec::with_capacity(n * sources.len());
    for obj in 0..n {
        let ra: f64 = rng.random_range(0.0..360.0);
        let dec: f64 = rng.random_range(-60.0..60.0);
        for source in sources {
            let dra = rng.random_range(-jitter..=jitter);
            let ddec = rng.random_range(-jitter..=jitter);
            records.push(CanonicalRecord::new(
                *source,
                format!("{source}-{obj}"),
                (ra + dra).rem_euclid(360.0),
                dec + ddec,
            ));
        }
    }
    records
}
