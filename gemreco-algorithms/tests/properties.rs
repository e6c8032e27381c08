use gemreco_algorithms::{reconstruct_event, HitPairMatcher, MatchingConfig, TrackerInput};
use gemreco_core::geometry::{ActiveArea, Axis, Projection, ReadoutPlane, TrackerGeometry};
use gemreco_core::hit::{Measurement, OneDHit, PlaneClusterHit, PlaneHit};
use std::collections::HashSet;

/// Small deterministic generator for reproducible pseudo-random hits.
struct Lcg(u64);

impl Lcg {
    fn next_f64(&mut self) -> f64 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        #[allow(clippy::cast_precision_loss)]
        let value = (self.0 >> 11) as f64 / (1u64 << 53) as f64;
        value
    }
}

fn stereo_tracker(chamber_id: i32) -> TrackerGeometry {
    let angle = 7.5_f64.to_radians();
    TrackerGeometry {
        chamber_id,
        tracker_id: 0,
        z: 1.0 + f64::from(chamber_id),
        rotation: f64::from(chamber_id) * 0.5,
        origin: [0.0, 0.0],
        projection: Projection::Planar,
        active_area: ActiveArea::new(-0.3, 0.3, -0.3, 0.3),
        u: ReadoutPlane::new("u", Axis::U, chamber_id, 0, angle),
        v: ReadoutPlane::new("v", Axis::V, chamber_id, 0, -angle),
    }
}

fn random_hits<'p>(plane: &'p ReadoutPlane, rng: &mut Lcg, n: usize) -> Vec<PlaneHit<'p>> {
    let mut hits: Vec<PlaneHit> = (0..n)
        .map(|_| {
            let pos = rng.next_f64() * 0.6 - 0.3;
            // Coarse charges so that exact score ties occur.
            let adc = (rng.next_f64() * 5.0).floor() * 20.0 + 20.0;
            let one_d = OneDHit::new(pos, 1e-4, plane).unwrap();
            PlaneClusterHit::new(one_d, adc, 2, 0).unwrap().into()
        })
        .collect();
    hits.sort_by(|a, b| a.position().total_cmp(&b.position()));
    hits
}

#[test]
fn test_one_to_one_and_deterministic() {
    let mut rng = Lcg(0x5eed);
    let matcher = HitPairMatcher::new(MatchingConfig::new().with_min_score(0.5));

    for trial in 0..50 {
        let tracker = stereo_tracker(trial);
        let u = random_hits(&tracker.u, &mut rng, 1 + (trial as usize % 12));
        let v = random_hits(&tracker.v, &mut rng, 1 + (trial as usize * 7 % 11));

        let first = matcher.match_hits(&tracker, &u, &v).unwrap();
        let second = matcher.match_hits(&tracker, &u, &v).unwrap();
        assert_eq!(first.pairs, second.pairs, "trial {trial} not deterministic");

        let mut seen_u = HashSet::new();
        let mut seen_v = HashSet::new();
        for pair in &first.pairs {
            assert!(seen_u.insert(pair.u_index), "u hit reused in trial {trial}");
            assert!(seen_v.insert(pair.v_index), "v hit reused in trial {trial}");
            assert!(pair.score >= 0.5);
        }
        assert_eq!(first.unmatched_u.len() + first.pairs.len(), u.len());
        assert_eq!(first.unmatched_v.len() + first.pairs.len(), v.len());
        for idx in &first.unmatched_u {
            assert!(!seen_u.contains(idx));
        }
    }
}

#[test]
fn test_parallel_event_matches_sequential() {
    let mut rng = Lcg(42);
    let trackers: Vec<TrackerGeometry> = (0..8).map(stereo_tracker).collect();
    let hits: Vec<(Vec<PlaneHit>, Vec<PlaneHit>)> = trackers
        .iter()
        .map(|t| (random_hits(&t.u, &mut rng, 10), random_hits(&t.v, &mut rng, 10)))
        .collect();
    let inputs: Vec<TrackerInput> = trackers
        .iter()
        .zip(&hits)
        .map(|(t, (u, v))| TrackerInput::new(t, u, v))
        .collect();

    let matcher = HitPairMatcher::default();
    let event = reconstruct_event(&matcher, &inputs);
    assert_eq!(event.trackers.len(), trackers.len());

    for (result, input) in event.trackers.iter().zip(&inputs) {
        assert_eq!(result.chamber_id, input.tracker.chamber_id);
        let reco = result.result.as_ref().unwrap();
        let sequential = matcher
            .match_hits(input.tracker, input.u_hits, input.v_hits)
            .unwrap();
        assert_eq!(reco.hits.len(), sequential.pairs.len());
        for (hit, pair) in reco.hits.iter().zip(&sequential.pairs) {
            assert!(std::ptr::eq(hit.u_hit(), &input.u_hits[pair.u_index]));
            assert!(std::ptr::eq(hit.v_hit(), &input.v_hits[pair.v_index]));
        }
    }
    assert_eq!(event.statistics().failed_trackers, 0);
}
