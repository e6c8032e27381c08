//! Hit types for 1D clustered readout plane data.

use std::cmp::Ordering;

use crate::error::{Error, Result};
use crate::geometry::{Axis, ReadoutPlane};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Tolerance used by [`Measurement::compare`] (m).
///
/// One micron is well below any strip pitch, so hits closer than this are
/// indistinguishable for sorting purposes. Prefer
/// [`Measurement::compare_within`] with an explicit tolerance.
pub const DEFAULT_POSITION_TOLERANCE: f64 = 1.0e-6;

/// Monte-Carlo track id of the primary (signal) particle.
pub const PRIMARY_TRACK_ID: i32 = 1;

/// Monte-Carlo truth attached to a simulated hit.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TruthInfo {
    /// Id of the MC track that produced the hit (0 for pure background).
    pub mc_track: i32,
    /// True position along the plane coordinate (m).
    pub mc_position: f64,
    /// True hit time.
    pub mc_time: f64,
    /// Number of strips in the cluster that carry background signal.
    pub background_strips: u32,
}

impl TruthInfo {
    /// Creates a truth record.
    pub fn new(mc_track: i32, mc_position: f64, mc_time: f64, background_strips: u32) -> Self {
        Self {
            mc_track,
            mc_position,
            mc_time,
            background_strips,
        }
    }
}

/// Common interface for everything measured on a single readout plane.
pub trait Measurement {
    /// Position along the plane coordinate axis (m).
    fn position(&self) -> f64;

    /// Resolution (sigma) of the position (m).
    fn resolution(&self) -> f64;

    /// Plane the hit was measured on.
    fn plane(&self) -> &ReadoutPlane;

    /// Monte-Carlo truth, if the hit comes from simulation.
    fn truth(&self) -> Option<&TruthInfo>;

    /// Summed charge, if the hit is amplitude-bearing.
    fn amplitude(&self) -> Option<f64>;

    /// Orders two hits by position, treating hits closer than
    /// `max_distance` as equal.
    #[inline]
    fn compare_within(&self, other: &dyn Measurement, max_distance: f64) -> Ordering {
        let delta = self.position() - other.position();
        if delta.abs() <= max_distance {
            Ordering::Equal
        } else if delta < 0.0 {
            Ordering::Less
        } else {
            Ordering::Greater
        }
    }

    /// [`Measurement::compare_within`] with [`DEFAULT_POSITION_TOLERANCE`].
    #[inline]
    fn compare(&self, other: &dyn Measurement) -> Ordering {
        self.compare_within(other, DEFAULT_POSITION_TOLERANCE)
    }

    /// Readout axis of the source plane.
    #[inline]
    fn axis(&self) -> Axis {
        self.plane().axis
    }
}

/// Generic 1D hit on a readout plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OneDHit<'p> {
    position: f64,
    resolution: f64,
    plane: &'p ReadoutPlane,
    truth: Option<TruthInfo>,
}

impl<'p> OneDHit<'p> {
    /// Creates a hit on `plane`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidHit`] for a non-finite position or a negative
    /// or non-finite resolution.
    pub fn new(position: f64, resolution: f64, plane: &'p ReadoutPlane) -> Result<Self> {
        if !position.is_finite() {
            return Err(Error::InvalidHit(format!(
                "non-finite position {position} on plane '{}'",
                plane.name
            )));
        }
        if !(resolution.is_finite() && resolution >= 0.0) {
            return Err(Error::InvalidHit(format!(
                "bad resolution {resolution} on plane '{}'",
                plane.name
            )));
        }
        Ok(Self {
            position,
            resolution,
            plane,
            truth: None,
        })
    }

    /// Attaches Monte-Carlo truth.
    #[must_use]
    pub fn with_truth(mut self, truth: TruthInfo) -> Self {
        self.truth = Some(truth);
        self
    }
}

impl Measurement for OneDHit<'_> {
    #[inline]
    fn position(&self) -> f64 {
        self.position
    }

    #[inline]
    fn resolution(&self) -> f64 {
        self.resolution
    }

    #[inline]
    fn plane(&self) -> &ReadoutPlane {
        self.plane
    }

    #[inline]
    fn truth(&self) -> Option<&TruthInfo> {
        self.truth.as_ref()
    }

    #[inline]
    fn amplitude(&self) -> Option<f64> {
        None
    }
}

/// 1D clustered hit on an ADC-based readout plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneClusterHit<'p> {
    hit: OneDHit<'p>,
    adc_sum: f64,
    size: u32,
    type_code: i32,
}

impl<'p> PlaneClusterHit<'p> {
    /// Cluster type code of a clean single-peak cluster.
    pub const WELL_FORMED: i32 = 0;

    /// Creates a cluster hit.
    ///
    /// # Errors
    /// Returns [`Error::InvalidHit`] if `size` is zero or `adc_sum` is
    /// negative or not finite.
    pub fn new(hit: OneDHit<'p>, adc_sum: f64, size: u32, type_code: i32) -> Result<Self> {
        if size == 0 {
            return Err(Error::InvalidHit(format!(
                "empty cluster at {} on plane '{}'",
                hit.position, hit.plane.name
            )));
        }
        if !(adc_sum.is_finite() && adc_sum >= 0.0) {
            return Err(Error::InvalidHit(format!(
                "bad ADC sum {adc_sum} at {} on plane '{}'",
                hit.position, hit.plane.name
            )));
        }
        Ok(Self {
            hit,
            adc_sum,
            size,
            type_code,
        })
    }

    /// Sum of ADC values of the active strips.
    #[inline]
    pub fn adc_sum(&self) -> f64 {
        self.adc_sum
    }

    /// Number of active strips.
    #[inline]
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Result code of the cluster analysis.
    #[inline]
    pub fn type_code(&self) -> i32 {
        self.type_code
    }

    /// True for a clean single-peak cluster.
    #[inline]
    pub fn is_well_formed(&self) -> bool {
        self.type_code == Self::WELL_FORMED
    }

    /// The underlying 1D hit.
    #[inline]
    pub fn one_d(&self) -> &OneDHit<'p> {
        &self.hit
    }
}

impl Measurement for PlaneClusterHit<'_> {
    #[inline]
    fn position(&self) -> f64 {
        self.hit.position
    }

    #[inline]
    fn resolution(&self) -> f64 {
        self.hit.resolution
    }

    #[inline]
    fn plane(&self) -> &ReadoutPlane {
        self.hit.plane
    }

    #[inline]
    fn truth(&self) -> Option<&TruthInfo> {
        self.hit.truth.as_ref()
    }

    #[inline]
    fn amplitude(&self) -> Option<f64> {
        Some(self.adc_sum)
    }
}

/// Any hit a readout plane can produce.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaneHit<'p> {
    /// Position-only hit.
    Basic(OneDHit<'p>),
    /// Clustered hit with charge information.
    Cluster(PlaneClusterHit<'p>),
}

impl<'p> PlaneHit<'p> {
    /// The underlying 1D hit.
    #[inline]
    pub fn one_d(&self) -> &OneDHit<'p> {
        match self {
            PlaneHit::Basic(hit) => hit,
            PlaneHit::Cluster(hit) => hit.one_d(),
        }
    }

    /// Cluster details, if this is a clustered hit.
    #[inline]
    pub fn as_cluster(&self) -> Option<&PlaneClusterHit<'p>> {
        match self {
            PlaneHit::Basic(_) => None,
            PlaneHit::Cluster(hit) => Some(hit),
        }
    }
}

impl Measurement for PlaneHit<'_> {
    #[inline]
    fn position(&self) -> f64 {
        self.one_d().position
    }

    #[inline]
    fn resolution(&self) -> f64 {
        self.one_d().resolution
    }

    #[inline]
    fn plane(&self) -> &ReadoutPlane {
        self.one_d().plane
    }

    #[inline]
    fn truth(&self) -> Option<&TruthInfo> {
        self.one_d().truth.as_ref()
    }

    #[inline]
    fn amplitude(&self) -> Option<f64> {
        self.as_cluster().map(PlaneClusterHit::adc_sum)
    }
}

impl<'p> From<OneDHit<'p>> for PlaneHit<'p> {
    fn from(hit: OneDHit<'p>) -> Self {
        PlaneHit::Basic(hit)
    }
}

impl<'p> From<PlaneClusterHit<'p>> for PlaneHit<'p> {
    fn from(hit: PlaneClusterHit<'p>) -> Self {
        PlaneHit::Cluster(hit)
    }
}
