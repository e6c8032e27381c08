//! Two-dimensional GEM hits built from a u/v plane hit pair.

use crate::error::{Error, Result};
use crate::geometry::{Axis, TrackerGeometry};
use crate::hit::{Measurement, PlaneHit};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Smallest stereo-angle sine [`GemHit::new`] accepts.
///
/// Only exactly parallel planes fall below it. The matcher applies its own,
/// stricter `min_stereo_sine` before any pair reaches this check.
pub const MIN_PAIRING_SINE: f64 = f64::EPSILON;

/// Solved detector-frame coordinates of a u/v pair.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SpacePoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub r: f64,
    pub phi: f64,
    /// Intersection in the tracker local frame.
    pub local_x: f64,
    pub local_y: f64,
    /// Propagated local uncertainties (sigma, m).
    pub sigma_x: f64,
    pub sigma_y: f64,
}

/// A pair of hits, one from the u and one from the v readout plane.
///
/// The hit borrows both plane hits (`'h`) and, through them, the readout
/// geometry (`'p`); neither may be dropped while the GEM hit is alive.
#[derive(Debug, Clone, Copy)]
pub struct GemHit<'h, 'p> {
    chamber_id: i32,
    tracker_id: i32,
    point: SpacePoint,
    u_hit: &'h PlaneHit<'p>,
    v_hit: &'h PlaneHit<'p>,
}

impl<'h, 'p> GemHit<'h, 'p> {
    /// Assembles a GEM hit.
    ///
    /// # Errors
    /// Returns [`Error::InvalidPairing`] unless `u_hit` is on the tracker's u
    /// plane, `v_hit` on its v plane, and the two planes are not parallel
    /// (see [`MIN_PAIRING_SINE`]).
    pub fn new(
        tracker: &TrackerGeometry,
        point: SpacePoint,
        u_hit: &'h PlaneHit<'p>,
        v_hit: &'h PlaneHit<'p>,
    ) -> Result<Self> {
        let (u_plane, v_plane) = (u_hit.plane(), v_hit.plane());
        if u_plane.axis != Axis::U || v_plane.axis != Axis::V {
            return Err(Error::InvalidPairing(format!(
                "expected u/v planes, got '{}' ({}) and '{}' ({})",
                u_plane.name, u_plane.axis, v_plane.name, v_plane.axis
            )));
        }
        for plane in [u_plane, v_plane] {
            if plane.chamber_id != tracker.chamber_id || plane.tracker_id != tracker.tracker_id {
                return Err(Error::InvalidPairing(format!(
                    "plane '{}' (chamber {} tracker {}) is not part of chamber {} tracker {}",
                    plane.name,
                    plane.chamber_id,
                    plane.tracker_id,
                    tracker.chamber_id,
                    tracker.tracker_id
                )));
            }
        }
        if u_plane.stereo_sine(v_plane).abs() < MIN_PAIRING_SINE {
            return Err(Error::InvalidPairing(format!(
                "planes '{}' and '{}' are parallel",
                u_plane.name, v_plane.name
            )));
        }
        Ok(Self {
            chamber_id: tracker.chamber_id,
            tracker_id: tracker.tracker_id,
            point,
            u_hit,
            v_hit,
        })
    }

    #[inline]
    pub fn chamber_id(&self) -> i32 {
        self.chamber_id
    }

    #[inline]
    pub fn tracker_id(&self) -> i32 {
        self.tracker_id
    }

    #[inline]
    pub fn x(&self) -> f64 {
        self.point.x
    }

    #[inline]
    pub fn y(&self) -> f64 {
        self.point.y
    }

    #[inline]
    pub fn z(&self) -> f64 {
        self.point.z
    }

    #[inline]
    pub fn r(&self) -> f64 {
        self.point.r
    }

    #[inline]
    pub fn phi(&self) -> f64 {
        self.point.phi
    }

    /// Full solved geometry.
    #[inline]
    pub fn point(&self) -> &SpacePoint {
        &self.point
    }

    #[inline]
    pub fn u_hit(&self) -> &'h PlaneHit<'p> {
        self.u_hit
    }

    #[inline]
    pub fn v_hit(&self) -> &'h PlaneHit<'p> {
        self.v_hit
    }

    /// Charge on the u side, `None` if that hit is not amplitude-bearing.
    #[inline]
    pub fn charge_u(&self) -> Option<f64> {
        self.u_hit.amplitude()
    }

    /// Charge on the v side, `None` if that hit is not amplitude-bearing.
    #[inline]
    pub fn charge_v(&self) -> Option<f64> {
        self.v_hit.amplitude()
    }

    /// True if both sides carry truth from the MC track `primary`.
    ///
    /// Always false for real data.
    pub fn is_signal(&self, primary: i32) -> bool {
        match (self.u_hit.truth(), self.v_hit.truth()) {
            (Some(u), Some(v)) => u.mc_track == primary && v.mc_track == primary,
            _ => false,
        }
    }
}
