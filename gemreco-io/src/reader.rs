//! JSON run file reader.

use crate::{Error, Result};
use gemreco_algorithms::TrackerInput;
use gemreco_core::geometry::{DetectorGeometry, ReadoutPlane, TrackerGeometry};
use gemreco_core::hit::{OneDHit, PlaneClusterHit, PlaneHit, TruthInfo};
use gemreco_core::MatchingConfig;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// One clustered hit as produced by the upstream strip clustering.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClusterRecord {
    pub position: f64,
    pub resolution: f64,
    pub adc_sum: f64,
    pub size: u32,
    #[serde(default)]
    pub type_code: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub truth: Option<TruthInfo>,
}

impl ClusterRecord {
    /// Builds a plane hit borrowing `plane`.
    ///
    /// # Errors
    /// Returns an error if the record violates a hit invariant.
    pub fn to_hit<'p>(&self, plane: &'p ReadoutPlane) -> Result<PlaneHit<'p>> {
        let mut one_d = OneDHit::new(self.position, self.resolution, plane)?;
        if let Some(truth) = self.truth {
            one_d = one_d.with_truth(truth);
        }
        let cluster = PlaneClusterHit::new(one_d, self.adc_sum, self.size, self.type_code)?;
        Ok(cluster.into())
    }
}

/// Clustered hits of one tracker in one event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackerHitsRecord {
    pub chamber_id: i32,
    pub tracker_id: i32,
    #[serde(default)]
    pub u: Vec<ClusterRecord>,
    #[serde(default)]
    pub v: Vec<ClusterRecord>,
}

/// All tracker hits of one event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: u64,
    #[serde(default)]
    pub trackers: Vec<TrackerHitsRecord>,
}

impl EventRecord {
    /// Total number of u and v clusters.
    pub fn hit_counts(&self) -> (usize, usize) {
        self.trackers
            .iter()
            .fold((0, 0), |(u, v), t| (u + t.u.len(), v + t.v.len()))
    }
}

/// Contents of a run file: geometry, matching parameters and events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunFile {
    pub geometry: DetectorGeometry,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub events: Vec<EventRecord>,
}

impl RunFile {
    /// Loads and validates a run file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, is not valid JSON, or
    /// describes an invalid geometry or matching configuration.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let run: RunFile = serde_json::from_reader(BufReader::new(file))?;
        run.validate()?;
        Ok(run)
    }

    /// Parses and validates a run file from a JSON string.
    ///
    /// # Errors
    /// Returns an error for malformed JSON, an invalid geometry or an
    /// invalid matching configuration.
    pub fn from_json(json: &str) -> Result<Self> {
        let run: RunFile = serde_json::from_str(json)?;
        run.validate()?;
        Ok(run)
    }

    fn validate(&self) -> Result<()> {
        self.geometry.validate()?;
        self.matching.validate()?;
        Ok(())
    }
}

struct TrackerHits<'p> {
    tracker: &'p TrackerGeometry,
    u: Vec<PlaneHit<'p>>,
    v: Vec<PlaneHit<'p>>,
}

/// A tracker record of an event that could not be turned into plane hits.
#[derive(Debug)]
pub struct TrackerReadFailure {
    pub chamber_id: i32,
    pub tracker_id: i32,
    pub error: Error,
}

/// Plane hits of one event, borrowing the run geometry.
///
/// Each tracker record is converted on its own: a record with an unknown
/// tracker or an invalid cluster is kept as a failure and the other
/// trackers of the event stay usable.
pub struct EventHits<'p> {
    pub event_id: u64,
    trackers: Vec<TrackerHits<'p>>,
    failures: Vec<TrackerReadFailure>,
}

impl<'p> EventHits<'p> {
    /// Converts an event record into plane hits on `geometry`.
    pub fn build(record: &EventRecord, geometry: &'p DetectorGeometry) -> Self {
        let mut trackers = Vec::with_capacity(record.trackers.len());
        let mut failures = Vec::new();
        for hits in &record.trackers {
            match tracker_hits(hits, geometry) {
                Ok(tracker) => trackers.push(tracker),
                Err(error) => {
                    warn!(
                        "event {} chamber {} tracker {}: skipping tracker: {}",
                        record.id, hits.chamber_id, hits.tracker_id, error
                    );
                    failures.push(TrackerReadFailure {
                        chamber_id: hits.chamber_id,
                        tracker_id: hits.tracker_id,
                        error,
                    });
                }
            }
        }
        Self {
            event_id: record.id,
            trackers,
            failures,
        }
    }

    /// Matcher inputs, one per tracker read without error.
    pub fn inputs(&self) -> Vec<TrackerInput<'_, 'p>> {
        self.trackers
            .iter()
            .map(|t| TrackerInput::new(t.tracker, &t.u, &t.v))
            .collect()
    }

    /// Tracker records that could not be read.
    pub fn failures(&self) -> &[TrackerReadFailure] {
        &self.failures
    }
}

/// Converts one tracker record.
///
/// # Errors
/// Returns [`Error::UnknownTracker`] for a tracker the geometry does not
/// describe, or a core error for an invalid hit.
fn tracker_hits<'p>(
    hits: &TrackerHitsRecord,
    geometry: &'p DetectorGeometry,
) -> Result<TrackerHits<'p>> {
    let tracker = geometry
        .tracker(hits.chamber_id, hits.tracker_id)
        .ok_or(Error::UnknownTracker {
            chamber_id: hits.chamber_id,
            tracker_id: hits.tracker_id,
        })?;
    Ok(TrackerHits {
        tracker,
        u: plane_hits(&hits.u, &tracker.u)?,
        v: plane_hits(&hits.v, &tracker.v)?,
    })
}

fn plane_hits<'p>(records: &[ClusterRecord], plane: &'p ReadoutPlane) -> Result<Vec<PlaneHit<'p>>> {
    records.iter().map(|record| record.to_hit(plane)).collect()
}
