//! High-level helpers that combine matching and space point building.

use crate::matcher::HitPairMatcher;
use gemreco_core::error::{Error, Result};
use gemreco_core::gem_hit::GemHit;
use gemreco_core::geometry::TrackerGeometry;
use gemreco_core::hit::PlaneHit;
use gemreco_core::matching::MatchingStatistics;
use log::{debug, warn};
use rayon::prelude::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The u and v hits of one tracker in one event.
#[derive(Clone, Copy, Debug)]
pub struct TrackerInput<'h, 'p> {
    pub tracker: &'p TrackerGeometry,
    pub u_hits: &'h [PlaneHit<'p>],
    pub v_hits: &'h [PlaneHit<'p>],
}

impl<'h, 'p> TrackerInput<'h, 'p> {
    /// Bundles a tracker with its sorted u and v hits.
    pub fn new(
        tracker: &'p TrackerGeometry,
        u_hits: &'h [PlaneHit<'p>],
        v_hits: &'h [PlaneHit<'p>],
    ) -> Self {
        Self {
            tracker,
            u_hits,
            v_hits,
        }
    }
}

/// GEM hits and diagnostics of one tracker.
#[derive(Clone, Debug)]
pub struct TrackerReconstruction<'h, 'p> {
    pub chamber_id: i32,
    pub tracker_id: i32,
    pub hits: Vec<GemHit<'h, 'p>>,
    /// u hits that did not end up in a GEM hit, ascending.
    pub unmatched_u: Vec<usize>,
    /// v hits that did not end up in a GEM hit, ascending.
    pub unmatched_v: Vec<usize>,
    pub statistics: MatchingStatistics,
}

impl TrackerReconstruction<'_, '_> {
    /// Number of GEM hits whose both sides come from MC track `primary`.
    pub fn signal_count(&self, primary: i32) -> usize {
        self.hits.iter().filter(|hit| hit.is_signal(primary)).count()
    }
}

/// Outcome of one tracker inside an event.
#[derive(Debug)]
pub struct TrackerResult<'h, 'p> {
    pub chamber_id: i32,
    pub tracker_id: i32,
    pub result: Result<TrackerReconstruction<'h, 'p>>,
}

/// Event-level counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EventStatistics {
    pub trackers: usize,
    pub failed_trackers: usize,
    pub gem_hits: usize,
    pub matching: MatchingStatistics,
}

impl EventStatistics {
    /// Adds another event's counters to this one.
    pub fn merge(&mut self, other: &Self) {
        self.trackers += other.trackers;
        self.failed_trackers += other.failed_trackers;
        self.gem_hits += other.gem_hits;
        self.matching.merge(&other.matching);
    }
}

/// Reconstruction of every tracker in one event.
#[derive(Debug, Default)]
pub struct EventReconstruction<'h, 'p> {
    pub trackers: Vec<TrackerResult<'h, 'p>>,
}

impl<'h, 'p> EventReconstruction<'h, 'p> {
    /// All GEM hits of successfully reconstructed trackers.
    pub fn gem_hits(&self) -> impl Iterator<Item = &GemHit<'h, 'p>> {
        self.trackers
            .iter()
            .filter_map(|t| t.result.as_ref().ok())
            .flat_map(|t| t.hits.iter())
    }

    /// Trackers that failed, with their error.
    pub fn failures(&self) -> impl Iterator<Item = (i32, i32, &Error)> {
        self.trackers.iter().filter_map(|t| {
            t.result
                .as_ref()
                .err()
                .map(|err| (t.chamber_id, t.tracker_id, err))
        })
    }

    /// Number of GEM hits whose both sides come from MC track `primary`.
    pub fn signal_count(&self, primary: i32) -> usize {
        self.gem_hits().filter(|hit| hit.is_signal(primary)).count()
    }

    /// Aggregated counters.
    pub fn statistics(&self) -> EventStatistics {
        let mut stats = EventStatistics {
            trackers: self.trackers.len(),
            ..Default::default()
        };
        for tracker in &self.trackers {
            match &tracker.result {
                Ok(reco) => {
                    stats.gem_hits += reco.hits.len();
                    stats.matching.merge(&reco.statistics);
                }
                Err(_) => stats.failed_trackers += 1,
            }
        }
        stats
    }
}

/// Match one tracker's hits and build its GEM hits.
///
/// A pair whose space point cannot be built is dropped (its hits are
/// reported unmatched) without failing the tracker.
///
/// # Errors
/// Returns an error if the tracker geometry is invalid or a matching
/// precondition is violated.
pub fn reconstruct_tracker<'h, 'p>(
    matcher: &HitPairMatcher,
    input: &TrackerInput<'h, 'p>,
) -> Result<TrackerReconstruction<'h, 'p>> {
    let TrackerInput {
        tracker,
        u_hits,
        v_hits,
    } = *input;
    tracker.validate()?;
    let outcome = matcher.match_hits(tracker, u_hits, v_hits)?;

    let mut statistics = outcome.statistics;
    let mut unmatched_u = outcome.unmatched_u;
    let mut unmatched_v = outcome.unmatched_v;
    let mut hits = Vec::with_capacity(outcome.pairs.len());

    for pair in &outcome.pairs {
        let u_hit = &u_hits[pair.u_index];
        let v_hit = &v_hits[pair.v_index];
        match matcher.builder().build(tracker, u_hit, v_hit) {
            Ok(point) => hits.push(GemHit::new(tracker, point, u_hit, v_hit)?),
            Err(err) => {
                warn!(
                    "chamber {} tracker {}: dropping pair (u={}, v={}): {}",
                    tracker.chamber_id, tracker.tracker_id, pair.u_index, pair.v_index, err
                );
                statistics.geometry_rejected += 1;
                unmatched_u.push(pair.u_index);
                unmatched_v.push(pair.v_index);
            }
        }
    }
    unmatched_u.sort_unstable();
    unmatched_v.sort_unstable();

    debug!(
        "chamber {} tracker {}: {} u / {} v hits -> {} GEM hits ({} below threshold, {} conflicts, {} outside area, {} unsolved)",
        tracker.chamber_id,
        tracker.tracker_id,
        statistics.u_hits,
        statistics.v_hits,
        hits.len(),
        statistics.below_threshold,
        statistics.conflicts,
        statistics.outside_area,
        statistics.unsolved
    );

    Ok(TrackerReconstruction {
        chamber_id: tracker.chamber_id,
        tracker_id: tracker.tracker_id,
        hits,
        unmatched_u,
        unmatched_v,
        statistics,
    })
}

/// Reconstruct every tracker of an event in parallel.
///
/// Trackers are independent: a failure is recorded for that tracker only and
/// the rest of the event is still processed. Results keep the input order.
pub fn reconstruct_event<'h, 'p>(
    matcher: &HitPairMatcher,
    inputs: &[TrackerInput<'h, 'p>],
) -> EventReconstruction<'h, 'p> {
    let trackers = inputs
        .par_iter()
        .map(|input| {
            let result = reconstruct_tracker(matcher, input);
            if let Err(err) = &result {
                warn!(
                    "chamber {} tracker {}: reconstruction failed: {}",
                    input.tracker.chamber_id, input.tracker.tracker_id, err
                );
            }
            TrackerResult {
                chamber_id: input.tracker.chamber_id,
                tracker_id: input.tracker.tracker_id,
                result,
            }
        })
        .collect();
    EventReconstruction { trackers }
}
