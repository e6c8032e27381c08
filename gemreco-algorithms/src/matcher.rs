//! u/v plane hit pairing by amplitude matching.
//!
//! Key characteristics:
//! - Every u/v combination whose intersection lies in the active area is
//!   scored by charge asymmetry (and out-of-area distance when an edge
//!   tolerance is configured)
//! - Candidates are ranked best first, ties broken by `(u_index, v_index)`
//! - Greedy one-to-one acceptance; candidates below `min_score` are dropped
//! - Complexity: O(n_u * n_v * log(n_u * n_v))

use crate::space_point::SpacePointBuilder;
use gemreco_core::error::{MatchingError, Result};
use gemreco_core::geometry::{ReadoutPlane, TrackerGeometry};
use gemreco_core::hit::{Measurement, PlaneHit};
use gemreco_core::matching::{MatchingConfig, MatchingStatistics};

/// An accepted u/v combination.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HitPair {
    /// Index into the u hit slice.
    pub u_index: usize,
    /// Index into the v hit slice.
    pub v_index: usize,
    /// Match score (higher is better, at most 1).
    pub score: f64,
    /// Local intersection point.
    pub local_x: f64,
    pub local_y: f64,
}

/// Result of matching one tracker.
#[derive(Clone, Debug, Default)]
pub struct MatchOutcome {
    /// Accepted pairs in acceptance (best-first) order.
    pub pairs: Vec<HitPair>,
    /// Indices of u hits left without a partner, ascending.
    pub unmatched_u: Vec<usize>,
    /// Indices of v hits left without a partner, ascending.
    pub unmatched_v: Vec<usize>,
    pub statistics: MatchingStatistics,
}

/// Pairs u-plane and v-plane clusters of a single tracker.
#[derive(Clone, Debug, Default)]
pub struct HitPairMatcher {
    config: MatchingConfig,
    builder: SpacePointBuilder,
}

impl HitPairMatcher {
    /// Create with custom configuration.
    ///
    /// The configuration is taken as is; use [`HitPairMatcher::try_new`] for
    /// settings read from files or the command line.
    pub fn new(config: MatchingConfig) -> Self {
        let builder = SpacePointBuilder::from_config(&config);
        Self { config, builder }
    }

    /// Create with a configuration that is validated first.
    ///
    /// # Errors
    /// Returns [`gemreco_core::Error::InvalidConfig`] if a setting is out of
    /// range.
    pub fn try_new(config: MatchingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config))
    }

    /// Current configuration.
    pub fn config(&self) -> &MatchingConfig {
        &self.config
    }

    /// Space point builder sharing this matcher's tolerances.
    pub fn builder(&self) -> &SpacePointBuilder {
        &self.builder
    }

    /// Matches the u and v hits of `tracker`.
    ///
    /// Both slices must be sorted by position and every hit must lie on the
    /// corresponding plane of `tracker` and carry a charge amplitude.
    ///
    /// # Errors
    /// Returns a [`MatchingError`] when a precondition is violated or the
    /// number of combinations exceeds the configured limit.
    pub fn match_hits(
        &self,
        tracker: &TrackerGeometry,
        u_hits: &[PlaneHit<'_>],
        v_hits: &[PlaneHit<'_>],
    ) -> std::result::Result<MatchOutcome, MatchingError> {
        let sine = tracker.stereo_sine().abs();
        if sine < self.config.min_stereo_sine {
            return Err(MatchingError::ParallelPlanes {
                chamber_id: tracker.chamber_id,
                tracker_id: tracker.tracker_id,
                sine,
            });
        }
        let u_charges = check_plane_hits(u_hits, &tracker.u)?;
        let v_charges = check_plane_hits(v_hits, &tracker.v)?;

        let combinations = u_hits.len().saturating_mul(v_hits.len());
        if let Some(limit) = self.config.max_combinations {
            if combinations > limit {
                return Err(MatchingError::TooManyCandidates {
                    combinations,
                    limit,
                });
            }
        }

        let mut statistics = MatchingStatistics {
            u_hits: u_hits.len(),
            v_hits: v_hits.len(),
            combinations,
            ..Default::default()
        };

        let mut candidates = Vec::with_capacity(combinations);
        for (u_index, u_hit) in u_hits.iter().enumerate() {
            for (v_index, v_hit) in v_hits.iter().enumerate() {
                let Ok(local) = self.builder.solve_local(
                    tracker,
                    u_hit.position(),
                    u_hit.resolution(),
                    v_hit.position(),
                    v_hit.resolution(),
                ) else {
                    statistics.unsolved += 1;
                    continue;
                };

                let excess = SpacePointBuilder::area_excess_sigmas(tracker, &local);
                if excess > self.config.edge_tolerance_sigmas {
                    statistics.outside_area += 1;
                    continue;
                }

                let asymmetry = self
                    .config
                    .charge_asymmetry(u_charges[u_index], v_charges[v_index]);
                let score = 1.0 - asymmetry - self.config.position_weight * excess * excess;
                if score < self.config.min_score {
                    statistics.below_threshold += 1;
                    continue;
                }

                candidates.push(HitPair {
                    u_index,
                    v_index,
                    score,
                    local_x: local.x,
                    local_y: local.y,
                });
            }
        }

        // Best score first; equal scores resolve to the lowest (u, v) indices.
        candidates.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then(a.u_index.cmp(&b.u_index))
                .then(a.v_index.cmp(&b.v_index))
        });

        let mut u_used = vec![false; u_hits.len()];
        let mut v_used = vec![false; v_hits.len()];
        let mut pairs = Vec::with_capacity(u_hits.len().min(v_hits.len()));
        for candidate in candidates {
            if u_used[candidate.u_index] || v_used[candidate.v_index] {
                statistics.conflicts += 1;
                continue;
            }
            u_used[candidate.u_index] = true;
            v_used[candidate.v_index] = true;
            pairs.push(candidate);
        }
        statistics.accepted = pairs.len();

        Ok(MatchOutcome {
            pairs,
            unmatched_u: unused_indices(&u_used),
            unmatched_v: unused_indices(&v_used),
            statistics,
        })
    }
}

/// Checks plane membership, ordering and amplitude of one side's hits and
/// returns their charges.
fn check_plane_hits(
    hits: &[PlaneHit<'_>],
    plane: &ReadoutPlane,
) -> std::result::Result<Vec<f64>, MatchingError> {
    let mut charges = Vec::with_capacity(hits.len());
    let mut previous = f64::NEG_INFINITY;
    for (index, hit) in hits.iter().enumerate() {
        let source = hit.plane();
        if !std::ptr::eq(source, plane) && source != plane {
            return Err(MatchingError::WrongPlane {
                index,
                expected: plane.name.clone(),
                found: source.name.clone(),
            });
        }
        let position = hit.position();
        if position < previous {
            return Err(MatchingError::UnsortedHits {
                plane: plane.name.clone(),
                index,
                position,
                previous,
            });
        }
        previous = position;
        let charge = hit.amplitude().ok_or_else(|| MatchingError::MissingAmplitude {
            plane: plane.name.clone(),
            index,
        })?;
        charges.push(charge);
    }
    Ok(charges)
}

fn unused_indices(used: &[bool]) -> Vec<usize> {
    used.iter()
        .enumerate()
        .filter(|(_, &taken)| !taken)
        .map(|(idx, _)| idx)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gemreco_core::error::Error;
    use gemreco_core::geometry::{ActiveArea, Axis, Projection};
    use gemreco_core::hit::{OneDHit, PlaneClusterHit};
    use std::f64::consts::FRAC_PI_2;

    fn tracker() -> TrackerGeometry {
        TrackerGeometry {
            chamber_id: 1,
            tracker_id: 0,
            z: 0.0,
            rotation: 0.0,
            origin: [0.0, 0.0],
            projection: Projection::Planar,
            active_area: ActiveArea::new(0.0, 0.1, 0.0, 0.1),
            u: ReadoutPlane::new("u", Axis::U, 1, 0, 0.0),
            v: ReadoutPlane::new("v", Axis::V, 1, 0, FRAC_PI_2),
        }
    }

    fn hits<'p>(plane: &'p ReadoutPlane, data: &[(f64, f64)]) -> Vec<PlaneHit<'p>> {
        data.iter()
            .map(|&(pos, adc)| {
                let one_d = OneDHit::new(pos, 1e-4, plane).unwrap();
                PlaneClusterHit::new(one_d, adc, 3, 0).unwrap().into()
            })
            .collect()
    }

    #[test]
    fn test_match_basic() {
        let tracker = tracker();
        let u = hits(&tracker.u, &[(0.010, 100.0), (0.050, 20.0)]);
        let v = hits(&tracker.v, &[(0.012, 98.0), (0.048, 22.0)]);

        let outcome = HitPairMatcher::default()
            .match_hits(&tracker, &u, &v)
            .unwrap();

        let pairs: Vec<_> = outcome.pairs.iter().map(|p| (p.u_index, p.v_index)).collect();
        assert_eq!(pairs, vec![(0, 0), (1, 1)]);
        assert!(outcome.unmatched_u.is_empty());
        assert!(outcome.unmatched_v.is_empty());
        assert_eq!(outcome.statistics.combinations, 4);
        assert_eq!(outcome.statistics.below_threshold, 2);
        assert_eq!(outcome.statistics.accepted, 2);
    }

    #[test]
    fn test_unsorted_input_rejected() {
        let tracker = tracker();
        let u = hits(&tracker.u, &[(0.050, 100.0), (0.010, 20.0)]);
        let v = hits(&tracker.v, &[(0.012, 98.0)]);

        let err = HitPairMatcher::default()
            .match_hits(&tracker, &u, &v)
            .unwrap_err();
        assert!(matches!(err, MatchingError::UnsortedHits { index: 1, .. }));
    }

    #[test]
    fn test_wrong_plane_rejected() {
        let tracker = tracker();
        let u = hits(&tracker.u, &[(0.010, 100.0)]);
        let v = hits(&tracker.u, &[(0.012, 98.0)]);

        let err = HitPairMatcher::default()
            .match_hits(&tracker, &u, &v)
            .unwrap_err();
        assert!(matches!(err, MatchingError::WrongPlane { index: 0, .. }));
    }

    #[test]
    fn test_missing_amplitude_rejected() {
        let tracker = tracker();
        let u = hits(&tracker.u, &[(0.010, 100.0)]);
        let v: Vec<PlaneHit> = vec![OneDHit::new(0.012, 1e-4, &tracker.v).unwrap().into()];

        let err = HitPairMatcher::default()
            .match_hits(&tracker, &u, &v)
            .unwrap_err();
        assert!(matches!(err, MatchingError::MissingAmplitude { .. }));
    }

    #[test]
    fn test_combination_cap() {
        let tracker = tracker();
        let u = hits(&tracker.u, &[(0.01, 10.0), (0.02, 10.0), (0.03, 10.0)]);
        let v = hits(&tracker.v, &[(0.01, 10.0), (0.02, 10.0)]);

        let matcher = HitPairMatcher::new(MatchingConfig::new().with_max_combinations(Some(5)));
        let err = matcher.match_hits(&tracker, &u, &v).unwrap_err();
        assert_eq!(
            err,
            MatchingError::TooManyCandidates {
                combinations: 6,
                limit: 5
            }
        );
    }

    #[test]
    fn test_parallel_tracker_rejected() {
        let mut tracker = tracker();
        tracker.v.strip_angle = 0.0;
        let u = hits(&tracker.u, &[(0.01, 10.0)]);
        let v = hits(&tracker.v, &[(0.01, 10.0)]);

        let err = HitPairMatcher::default()
            .match_hits(&tracker, &u, &v)
            .unwrap_err();
        assert!(matches!(err, MatchingError::ParallelPlanes { .. }));
    }

    #[test]
    fn test_outside_area_not_paired() {
        let tracker = tracker();
        let u = hits(&tracker.u, &[(0.150, 100.0)]);
        let v = hits(&tracker.v, &[(0.050, 100.0)]);

        let outcome = HitPairMatcher::default()
            .match_hits(&tracker, &u, &v)
            .unwrap();
        assert!(outcome.pairs.is_empty());
        assert_eq!(outcome.statistics.outside_area, 1);
        assert_eq!(outcome.unmatched_u, vec![0]);
        assert_eq!(outcome.unmatched_v, vec![0]);
    }

    #[test]
    fn test_overflowing_intersection_counted_as_unsolved() {
        let mut tracker = tracker();
        tracker.v.strip_angle = 0.01;
        tracker.active_area = ActiveArea::new(-f64::MAX, f64::MAX, -f64::MAX, f64::MAX);
        let u = hits(&tracker.u, &[(1.0e308, 100.0)]);
        let v = hits(&tracker.v, &[(-1.0e308, 100.0)]);

        let outcome = HitPairMatcher::default()
            .match_hits(&tracker, &u, &v)
            .unwrap();
        assert!(outcome.pairs.is_empty());
        assert_eq!(outcome.statistics.unsolved, 1);
        assert_eq!(outcome.statistics.outside_area, 0);
    }

    #[test]
    fn test_try_new_rejects_bad_config() {
        assert!(HitPairMatcher::try_new(MatchingConfig::default()).is_ok());
        for config in [
            MatchingConfig::new().with_charge_ratio_scale(-1.0),
            MatchingConfig::new().with_charge_ratio_scale(f64::NAN),
            MatchingConfig::new().with_min_score(f64::NAN),
        ] {
            assert!(matches!(
                HitPairMatcher::try_new(config),
                Err(Error::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn test_edge_tolerance_penalizes_score() {
        let tracker = tracker();
        // 1.5 sigma beyond the x edge
        let u = hits(&tracker.u, &[(0.10015, 100.0)]);
        let v = hits(&tracker.v, &[(0.050, 100.0)]);

        let strict = HitPairMatcher::default();
        assert!(strict.match_hits(&tracker, &u, &v).unwrap().pairs.is_empty());

        let lenient = HitPairMatcher::new(MatchingConfig::new().with_edge_tolerance_sigmas(2.0));
        let outcome = lenient.match_hits(&tracker, &u, &v).unwrap();
        assert_eq!(outcome.pairs.len(), 1);
        assert!((outcome.pairs[0].score - (1.0 - 0.1 * 2.25)).abs() < 1e-6);
    }
}
