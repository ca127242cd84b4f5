//! # Cross-match engine
//!
//! Groups canonical records that describe the same physical object into fusion groups.
//!
//! ## Algorithm
//!
//! 1. **Candidate generation**: records are binned by [`SpatialIndex`] into 3-D cells sized by
//!    the tolerance, so every true match lies in the same or an adjacent cell. Cells are scanned
//!    independently, in parallel on the `rayon` pool when [`CrossMatchParams::parallel`] is set.
//! 2. **Precise filter**: each candidate pair is kept iff its haversine great-circle separation
//!    is `≤ tolerance`.
//! 3. **Transitive closure**: accepted pairs are merged sequentially in a [`UnionFind`]; every
//!    connected component becomes one [`FusionGroup`] with a fresh UUID.
//!
//! Groups are recomputed from scratch on every run. Membership depends only on the record
//! set and the tolerance, never on the input order; UUIDs are random per run unless pinned
//! with [`GroupIdPolicy::Pinned`].
//!
//! Two records of the *same* source within tolerance are reported as
//! [`DuplicateCandidate`]s. Under the default [`SameSourcePolicy::Flag`] they are not merged
//! directly (they may still end up together through other records).
//!
//! ## Example
//!
//! ```rust
//! use astrofuse::cross_match::cross_match;
//! use astrofuse::records::{CanonicalRecord, RecordKey};
//!
//! let records = vec![
//!     CanonicalRecord::new("gaia", "1", 10.0, 20.0),
//!     CanonicalRecord::new("2mass", "J0040", 10.0001, 20.0001),
//!     CanonicalRecord::new("gaia", "2", 50.0, -10.0),
//! ];
//! let result = cross_match(&records, 2.0).unwrap();
//!
//! let a = result.groups[&RecordKey::new("gaia", "1")];
//! let b = result.groups[&RecordKey::new("2mass", "J0040")];
//! let c = result.groups[&RecordKey::new("gaia", "2")];
//! assert_eq!(a, b);
//! assert_ne!(a, c);
//! ```
use std::collections::{HashMap, HashSet};

use itertools::Itertools;
use log::{debug, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::ArcSec;
use crate::fusion_errors::FusionError;
use crate::records::{CanonicalRecord, RecordKey};
use crate::ref_system::angular_separation_arcsec;

pub mod spatial_index;
pub mod union_find;

pub use spatial_index::SpatialIndex;
pub use union_find::UnionFind;

/// Whether unmatched records get a group of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SingletonPolicy {
    /// Every record gets a fusion group id; unmatched ones get a one-member group.
    #[default]
    OwnGroup,
    /// Unmatched records are left out of the result and keep a null group id.
    Unassigned,
}

/// How group UUIDs are generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GroupIdPolicy {
    /// Random UUID v4, stable for the life of the run only.
    #[default]
    Random,
    /// UUID v5 of the sorted member keys under `namespace`: identical membership gives
    /// identical ids across runs.
    Pinned { namespace: Uuid },
}

/// Treatment of two records of the same source within tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SameSourcePolicy {
    /// Report the pair, do not merge it directly.
    #[default]
    Flag,
    /// Report the pair and merge it like any other match.
    FlagAndFuse,
}

/// Configuration of a cross-match run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossMatchParams {
    /// Maximum great-circle separation of a match, arcseconds.
    pub tolerance_arcsec: ArcSec,
    pub singleton_policy: SingletonPolicy,
    pub group_ids: GroupIdPolicy,
    pub same_source: SameSourcePolicy,
    /// Scan spatial cells on the rayon pool.
    pub parallel: bool,
}

impl CrossMatchParams {
    /// Default policies with the given tolerance. The tolerance is checked by the engine.
    pub fn with_tolerance(tolerance_arcsec: ArcSec) -> Self {
        CrossMatchParams {
            tolerance_arcsec,
            singleton_policy: SingletonPolicy::default(),
            group_ids: GroupIdPolicy::default(),
            same_source: SameSourcePolicy::default(),
            parallel: true,
        }
    }

    pub fn builder(tolerance_arcsec: ArcSec) -> CrossMatchParamsBuilder {
        CrossMatchParamsBuilder {
            params: Self::with_tolerance(tolerance_arcsec),
        }
    }

    fn validate(&self) -> Result<(), FusionError> {
        if self.tolerance_arcsec.is_finite() && self.tolerance_arcsec > 0.0 {
            Ok(())
        } else {
            Err(FusionError::InvalidTolerance(self.tolerance_arcsec))
        }
    }
}

/// Builder for [`CrossMatchParams`], with validation.
#[derive(Debug, Clone)]
pub struct CrossMatchParamsBuilder {
    params: CrossMatchParams,
}

impl CrossMatchParamsBuilder {
    pub fn singleton_policy(mut self, v: SingletonPolicy) -> Self {
        self.params.singleton_policy = v;
        self
    }
    pub fn group_ids(mut self, v: GroupIdPolicy) -> Self {
        self.params.group_ids = v;
        self
    }
    pub fn same_source(mut self, v: SameSourcePolicy) -> Self {
        self.params.same_source = v;
        self
    }
    pub fn parallel(mut self, v: bool) -> Self {
        self.params.parallel = v;
        self
    }

    /// Errors
    /// ----------
    /// * [`FusionError::InvalidTolerance`] unless the tolerance is finite and `> 0`.
    pub fn build(self) -> Result<CrossMatchParams, FusionError> {
        self.params.validate()?;
        Ok(self.params)
    }
}

/// One equivalence class of the match relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FusionGroup {
    pub id: Uuid,
    /// Sorted by (source, object id).
    pub members: Vec<RecordKey>,
}

impl FusionGroup {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Number of distinct sources contributing to the group.
    pub fn source_count(&self) -> usize {
        self.members.iter().map(|k| &k.source).unique().count()
    }
}

/// Two records of one source within tolerance of each other, likely an ingestion duplicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateCandidate {
    pub source: String,
    pub first: String,
    pub second: String,
    pub separation_arcsec: ArcSec,
    /// Whether both records ended in the same group anyway.
    pub fused: bool,
}

/// Outcome of a cross-match run.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossMatchResult {
    /// Record → fusion group id. Without singletons under [`SingletonPolicy::Unassigned`].
    pub groups: HashMap<RecordKey, Uuid>,
    /// Groups ordered by their first member.
    pub fusion_groups: Vec<FusionGroup>,
    /// Same-source pairs within tolerance, ordered by (source, first, second).
    pub duplicates: Vec<DuplicateCandidate>,
    pub candidate_pairs: usize,
    pub matched_pairs: usize,
}

impl CrossMatchResult {
    pub fn group_of(&self, key: &RecordKey) -> Option<Uuid> {
        self.groups.get(key).copied()
    }

    /// Write the group ids back onto `records`. Records without a group get `None`.
    ///
    /// Returns the number of records that received a group id.
    pub fn apply_to(&self, records: &mut [CanonicalRecord]) -> usize {
        let mut assigned = 0;
        for record in records.iter_mut() {
            record.fusion_group_id = self.group_of(&record.key());
            if record.fusion_group_id.is_some() {
                assigned += 1;
            }
        }
        assigned
    }

    /// Groups with more than one member.
    pub fn multi_member_groups(&self) -> impl Iterator<Item = &FusionGroup> {
        self.fusion_groups.iter().filter(|g| g.len() > 1)
    }
}

/// A pair accepted by the precise filter, `a < b` in key order.
#[derive(Debug, Clone, Copy)]
struct MatchedPair {
    a: usize,
    b: usize,
    separation: ArcSec,
}

/// Cross-match with default policies. See [`cross_match_with`].
pub fn cross_match(
    records: &[CanonicalRecord],
    tolerance_arcsec: ArcSec,
) -> Result<CrossMatchResult, FusionError> {
    cross_match_with(records, &CrossMatchParams::with_tolerance(tolerance_arcsec))
}

/// Group `records` into fusion groups.
///
/// Arguments
/// -----------------
/// * `records`: canonical records, possibly from many sources and batches.
/// * `params`: tolerance and policies.
///
/// Return
/// ----------
/// * A [`CrossMatchResult`] holding the record → group mapping, the groups and the
///   same-source duplicate report.
///
/// Errors
/// ----------
/// * [`FusionError::InvalidTolerance`] if the tolerance is not finite and `> 0`.
/// * [`FusionError::DuplicateRecordKey`] if two records share (source, object id).
pub fn cross_match_with(
    records: &[CanonicalRecord],
    params: &CrossMatchParams,
) -> Result<CrossMatchResult, FusionError> {
    params.validate()?;
    let tolerance = params.tolerance_arcsec;

    let keys: Vec<RecordKey> = records.iter().map(CanonicalRecord::key).collect();
    let mut seen = HashSet::with_capacity(keys.len());
    for key in &keys {
        if !seen.insert(key) {
            return Err(FusionError::DuplicateRecordKey {
                catalog: key.source.clone(),
                object_id: key.object_id.clone(),
            });
        }
    }

    // Stage 1: spatial buckets
    let positions: Vec<_> = records
        .iter()
        .map(|r| (r.right_ascension_deg, r.declination_deg))
        .collect();
    let index = SpatialIndex::build(&positions, tolerance);
    let cells = index.sorted_cells();

    // Stage 2: precise filter, cell by cell
    let scan_cell = |cell: spatial_index::CellKey| {
        let candidates = index.candidate_pairs(cell);
        let matched: Vec<MatchedPair> = candidates
            .iter()
            .filter_map(|&(i, j)| {
                let (a, b) = if keys[i] < keys[j] { (i, j) } else { (j, i) };
                let (ra, rb) = (&records[a], &records[b]);
                let separation = angular_separation_arcsec(
                    ra.right_ascension_deg,
                    ra.declination_deg,
                    rb.right_ascension_deg,
                    rb.declination_deg,
                );
                (separation <= tolerance).then_some(MatchedPair { a, b, separation })
            })
            .collect();
        (candidates.len(), matched)
    };
    let per_cell: Vec<(usize, Vec<MatchedPair>)> = if params.parallel {
        cells.par_iter().map(|&c| scan_cell(c)).collect()
    } else {
        cells.iter().map(|&c| scan_cell(c)).collect()
    };

    let candidate_pairs: usize = per_cell.iter().map(|(n, _)| n).sum();
    let mut pairs: Vec<MatchedPair> = per_cell.into_iter().flat_map(|(_, m)| m).collect();
    pairs.sort_by(|p, q| (&keys[p.a], &keys[p.b]).cmp(&(&keys[q.a], &keys[q.b])));
    debug!(
        "cross-match: {} records in {} cells, {} candidate pairs, {} within {tolerance}\"",
        records.len(),
        index.cell_count(),
        candidate_pairs,
        pairs.len()
    );

    // Stage 3: transitive closure
    let mut uf = UnionFind::new(records.len());
    for pair in &pairs {
        let same_source = keys[pair.a].source == keys[pair.b].source;
        if same_source && params.same_source == SameSourcePolicy::Flag {
            continue;
        }
        uf.union(pair.a, pair.b);
    }

    let duplicates: Vec<DuplicateCandidate> = pairs
        .iter()
        .filter(|p| keys[p.a].source == keys[p.b].source)
        .map(|p| DuplicateCandidate {
            source: keys[p.a].source.clone(),
            first: keys[p.a].object_id.clone(),
            second: keys[p.b].object_id.clone(),
            separation_arcsec: p.separation,
            fused: uf.find(p.a) == uf.find(p.b),
        })
        .collect();
    if !duplicates.is_empty() {
        warn!(
            "cross-match: {} same-source pairs within {tolerance}\" flagged as likely duplicates",
            duplicates.len()
        );
    }

    let mut fusion_groups: Vec<FusionGroup> = uf
        .components()
        .into_iter()
        .filter(|members| {
            members.len() > 1 || params.singleton_policy == SingletonPolicy::OwnGroup
        })
        .map(|members| {
            let mut members: Vec<RecordKey> =
                members.into_iter().map(|i| keys[i].clone()).collect();
            members.sort();
            FusionGroup {
                id: group_id(&params.group_ids, &members),
                members,
            }
        })
        .collect();
    fusion_groups.sort_by(|g, h| g.members[0].cmp(&h.members[0]));

    let groups: HashMap<RecordKey, Uuid> = fusion_groups
        .iter()
        .flat_map(|g| g.members.iter().map(move |k| (k.clone(), g.id)))
        .collect();

    info!(
        "cross-match: {} records -> {} groups ({} multi-member), {} matched pairs",
        records.len(),
        fusion_groups.len(),
        fusion_groups.iter().filter(|g| g.len() > 1).count(),
        pairs.len()
    );

    Ok(CrossMatchResult {
        groups,
        fusion_groups,
        duplicates,
        candidate_pairs,
        matched_pairs: pairs.len(),
    })
}

fn group_id(policy: &GroupIdPolicy, members: &[RecordKey]) -> Uuid {
    match policy {
        GroupIdPolicy::Random => Uuid::new_v4(),
        GroupIdPolicy::Pinned { namespace } => {
            let name = members
                .iter()
                .map(|k| format!("{}\u{1f}{}", k.source, k.object_id))
                .join("\u{1e}");
            Uuid::new_v5(namespace, name.as_bytes())
        }
    }
}

#[cfg(test)]
mod cross_match_test {
    use super::*;

    fn rec(source: &str, id: &str, ra: f64, dec: f64) -> CanonicalRecord {
        CanonicalRecord::new(source, id, ra, dec)
    }

    #[test]
    fn test_invalid_tolerance() {
        let records = vec![rec("a", "1", 0.0, 0.0)];
        for tol in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = cross_match(&records, tol).unwrap_err();
            assert!(matches!(err, FusionError::InvalidTolerance(_)));
        }
        assert!(CrossMatchParams::builder(0.0).build().is_err());
        assert!(CrossMatchParams::builder(1.0).build().is_ok());
    }

    #[test]
    fn test_duplicate_keys_rejected() {
        let records = vec![rec("a", "1", 0.0, 0.0), rec("a", "1", 5.0, 0.0)];
        assert_eq!(
            cross_match(&records, 1.0).unwrap_err(),
            FusionError::DuplicateRecordKey {
                catalog: "a".into(),
                object_id: "1".into()
            }
        );
    }

    #[test]
    fn test_empty_input() {
        let result = cross_match(&[], 1.0).unwrap();
        assert!(result.groups.is_empty());
        assert!(result.fusion_groups.is_empty());
    }

    #[test]
    fn test_singleton_policies() {
        let records = vec![
            rec("a", "1", 10.0, 20.0),
            rec("b", "1", 10.0001, 20.0001),
            rec("a", "2", 50.0, -10.0),
        ];
        let own = cross_match(&records, 2.0).unwrap();
        assert_eq!(own.groups.len(), 3);
        assert_eq!(own.fusion_groups.len(), 2);

        let params = CrossMatchParams::builder(2.0)
            .singleton_policy(SingletonPolicy::Unassigned)
            .build()
            .unwrap();
        let unassigned = cross_match_with(&records, &params).unwrap();
        assert_eq!(unassigned.groups.len(), 2);
        assert_eq!(unassigned.group_of(&RecordKey::new("a", "2")), None);
    }

    #[test]
    fn test_same_source_pairs_are_flagged() {
        let records = vec![
            rec("a", "1", 10.0, 20.0),
            rec("a", "2", 10.0, 20.0002),
            rec("b", "9", 120.0, 5.0),
        ];
        let flagged = cross_match(&records, 2.0).unwrap();
        assert_eq!(flagged.duplicates.len(), 1);
        let dup = &flagged.duplicates[0];
        assert_eq!((dup.first.as_str(), dup.second.as_str()), ("1", "2"));
        assert!(!dup.fused);
        assert_ne!(
            flagged.groups[&RecordKey::new("a", "1")],
            flagged.groups[&RecordKey::new("a", "2")]
        );

        let params = CrossMatchParams::builder(2.0)
            .same_source(SameSourcePolicy::FlagAndFuse)
            .build()
            .unwrap();
        let fused = cross_match_with(&records, &params).unwrap();
        assert!(fused.duplicates[0].fused);
        assert_eq!(
            fused.groups[&RecordKey::new("a", "1")],
            fused.groups[&RecordKey::new("a", "2")]
        );
    }

    #[test]
    fn test_same_source_joined_through_other_source() {
        // a/1 and a/2 are both matched by b/1, so transitive closure joins them
        let records = vec![
            rec("a", "1", 10.0, 20.0),
            rec("b", "1", 10.0, 20.0003),
            rec("a", "2", 10.0, 20.0006),
        ];
        let result = cross_match(&records, 2.5).unwrap();
        assert_eq!(result.fusion_groups.len(), 1);
        assert_eq!(result.duplicates.len(), 1);
        assert!(result.duplicates[0].fused);
    }

    #[test]
    fn test_pinned_ids_are_stable() {
        let records = vec![rec("a", "1", 10.0, 20.0), rec("b", "1", 10.0001, 20.0001)];
        let params = CrossMatchParams::builder(2.0)
            .group_ids(GroupIdPolicy::Pinned {
                namespace: Uuid::NAMESPACE_OID,
            })
            .build()
            .unwrap();
        let first = cross_match_with(&records, &params).unwrap();
        let second = cross_match_with(&records, &params).unwrap();
        assert_eq!(first.groups, second.groups);
        assert_eq!(first.fusion_groups[0].id.get_version_num(), 5);
    }

    #[test]
    fn test_parallel_and_sequential_agree() {
        let records: Vec<_> = (0..200)
            .map(|i| {
                let i = i as f64;
                rec(
                    if i as usize % 2 == 0 { "even" } else { "odd" },
                    &format!("{i}"),
                    (i * 0.0002) % 360.0,
                    0.0,
                )
            })
            .collect();
        let pinned = GroupIdPolicy::Pinned {
            namespace: Uuid::NAMESPACE_URL,
        };
        let par = CrossMatchParams::builder(1.0)
            .group_ids(pinned)
            .build()
            .unwrap();
        let seq = CrossMatchParams::builder(1.0)
            .group_ids(pinned)
            .parallel(false)
            .build()
            .unwrap();
        assert_eq!(
            cross_match_with(&records, &par).unwrap(),
            cross_match_with(&records, &seq).unwrap()
        );
    }

    #[test]
    fn test_apply_to() {
        let mut records = vec![
            rec("a", "1", 10.0, 20.0),
            rec("b", "1", 10.0001, 20.0001),
            rec("a", "2", 50.0, -10.0),
        ];
        let params = CrossMatchParams::builder(2.0)
            .singleton_policy(SingletonPolicy::Unassigned)
            .build()
            .unwrap();
        let result = cross_match_with(&records, &params).unwrap();
        assert_eq!(result.apply_to(&mut records), 2);
        assert_eq!(records[0].fusion_group_id, records[1].fusion_group_id);
        assert_eq!(records[2].fusion_group_id, None);
    }
}
