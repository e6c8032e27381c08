//! Readout plane and tracker geometry.
//!
//! Geometry is owned by the caller (usually loaded once per run) and
//! borrowed by every hit measured on it. Hits and GEM hits therefore cannot
//! outlive the geometry they reference.

use crate::error::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Readout plane orientation within a tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Axis {
    /// First stereo plane.
    U,
    /// Second stereo plane.
    V,
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Axis::U => f.write_str("u"),
            Axis::V => f.write_str("v"),
        }
    }
}

/// One strip readout plane of a tracker.
///
/// A hit position `p` on this plane measures the local coordinate
/// `p - offset = x * cos(strip_angle) + y * sin(strip_angle)`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReadoutPlane {
    /// Human readable plane name (e.g. `"gem3x1u"`).
    pub name: String,
    /// Which side of the tracker this plane reads out.
    pub axis: Axis,
    /// Chamber containing the tracker.
    pub chamber_id: i32,
    /// Tracker within the chamber.
    pub tracker_id: i32,
    /// Direction of the measured coordinate in the tracker frame (radians).
    pub strip_angle: f64,
    /// Position reported for the local origin (m).
    #[cfg_attr(feature = "serde", serde(default))]
    pub offset: f64,
}

impl ReadoutPlane {
    /// Creates a readout plane with zero offset.
    pub fn new(
        name: impl Into<String>,
        axis: Axis,
        chamber_id: i32,
        tracker_id: i32,
        strip_angle: f64,
    ) -> Self {
        Self {
            name: name.into(),
            axis,
            chamber_id,
            tracker_id,
            strip_angle,
            offset: 0.0,
        }
    }

    /// Sets the coordinate offset.
    #[must_use]
    pub fn with_offset(mut self, offset: f64) -> Self {
        self.offset = offset;
        self
    }

    /// Returns true if both planes sit in the same chamber and tracker.
    #[inline]
    pub fn same_tracker(&self, other: &Self) -> bool {
        self.chamber_id == other.chamber_id && self.tracker_id == other.tracker_id
    }

    /// Sine of the stereo angle between this plane and `other`.
    #[inline]
    pub fn stereo_sine(&self, other: &Self) -> f64 {
        (other.strip_angle - self.strip_angle).sin()
    }
}

/// Rectangular active area in the tracker local frame (m).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ActiveArea {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl ActiveArea {
    /// Creates an active area from its bounds.
    pub fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Self {
        Self {
            x_min,
            x_max,
            y_min,
            y_max,
        }
    }

    /// Returns true if the local point lies inside (bounds inclusive).
    #[inline]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        (self.x_min..=self.x_max).contains(&x) && (self.y_min..=self.y_max).contains(&y)
    }

    /// Distance by which a point lies outside the area along each axis.
    ///
    /// Returns `(0.0, 0.0)` for points inside.
    #[inline]
    pub fn excess(&self, x: f64, y: f64) -> (f64, f64) {
        let dx = (self.x_min - x).max(x - self.x_max).max(0.0);
        let dy = (self.y_min - y).max(y - self.y_max).max(0.0);
        (dx, dy)
    }
}

/// How the solved local coordinates map into the detector frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "lowercase"))]
pub enum Projection {
    /// Flat tracker perpendicular to the beam: local (x, y) is rotated and
    /// translated into the detector frame at fixed z.
    #[default]
    Planar,
    /// Barrel tracker: local x is arc length around the beam axis at
    /// `radius`, local y runs along z.
    Cylindrical { radius: f64 },
}

/// Geometry of one tracker: a u/v plane pair with its placement.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrackerGeometry {
    pub chamber_id: i32,
    pub tracker_id: i32,
    /// Detector-frame z of the tracker (m).
    pub z: f64,
    /// Azimuthal rotation of the local frame (radians).
    #[cfg_attr(feature = "serde", serde(default))]
    pub rotation: f64,
    /// Detector-frame position of the local origin (m).
    #[cfg_attr(feature = "serde", serde(default))]
    pub origin: [f64; 2],
    #[cfg_attr(feature = "serde", serde(default))]
    pub projection: Projection,
    pub active_area: ActiveArea,
    pub u: ReadoutPlane,
    pub v: ReadoutPlane,
}

impl TrackerGeometry {
    /// Checks the plane pair against the tracker identity.
    ///
    /// # Errors
    /// Returns [`Error::InvalidGeometry`] if a placement value is not
    /// finite, the planes carry the wrong axis or belong to another tracker,
    /// or the active area is empty.
    pub fn validate(&self) -> Result<()> {
        let placement = [
            ("z", self.z),
            ("rotation", self.rotation),
            ("origin x", self.origin[0]),
            ("origin y", self.origin[1]),
            ("u strip angle", self.u.strip_angle),
            ("u offset", self.u.offset),
            ("v strip angle", self.v.strip_angle),
            ("v offset", self.v.offset),
        ];
        if let Some((name, value)) = placement.iter().find(|(_, value)| !value.is_finite()) {
            return Err(Error::InvalidGeometry(format!(
                "chamber {} tracker {}: {name} = {value} is not finite",
                self.chamber_id, self.tracker_id
            )));
        }
        if self.u.axis != Axis::U || self.v.axis != Axis::V {
            return Err(Error::InvalidGeometry(format!(
                "chamber {} tracker {}: planes '{}'/'{}' must be u/v, got {}/{}",
                self.chamber_id, self.tracker_id, self.u.name, self.v.name, self.u.axis, self.v.axis
            )));
        }
        for plane in [&self.u, &self.v] {
            if plane.chamber_id != self.chamber_id || plane.tracker_id != self.tracker_id {
                return Err(Error::InvalidGeometry(format!(
                    "plane '{}' belongs to chamber {} tracker {}, not {} {}",
                    plane.name, plane.chamber_id, plane.tracker_id, self.chamber_id, self.tracker_id
                )));
            }
        }
        let area = &self.active_area;
        if !(area.x_min < area.x_max && area.y_min < area.y_max) {
            return Err(Error::InvalidGeometry(format!(
                "chamber {} tracker {}: empty active area",
                self.chamber_id, self.tracker_id
            )));
        }
        if let Projection::Cylindrical { radius } = self.projection {
            if radius <= 0.0 || !radius.is_finite() {
                return Err(Error::InvalidGeometry(format!(
                    "chamber {} tracker {}: cylinder radius {radius}",
                    self.chamber_id, self.tracker_id
                )));
            }
        }
        Ok(())
    }

    /// Sine of the u/v stereo angle.
    #[inline]
    pub fn stereo_sine(&self) -> f64 {
        self.u.stereo_sine(&self.v)
    }
}

/// Full readout geometry: every tracker of every chamber.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DetectorGeometry {
    pub trackers: Vec<TrackerGeometry>,
}

impl DetectorGeometry {
    /// Creates a geometry from its trackers.
    pub fn new(trackers: Vec<TrackerGeometry>) -> Self {
        Self { trackers }
    }

    /// Looks up a tracker by its identifiers.
    pub fn tracker(&self, chamber_id: i32, tracker_id: i32) -> Option<&TrackerGeometry> {
        self.trackers
            .iter()
            .find(|t| t.chamber_id == chamber_id && t.tracker_id == tracker_id)
    }

    /// Validates every tracker and rejects duplicate identifiers.
    ///
    /// # Errors
    /// Returns the first [`Error::InvalidGeometry`] found.
    pub fn validate(&self) -> Result<()> {
        for (i, tracker) in self.trackers.iter().enumerate() {
            tracker.validate()?;
            let duplicate = self.trackers[..i]
                .iter()
                .any(|t| t.chamber_id == tracker.chamber_id && t.tracker_id == tracker.tracker_id);
            if duplicate {
                return Err(Error::InvalidGeometry(format!(
                    "duplicate chamber {} tracker {}",
                    tracker.chamber_id, tracker.tracker_id
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn tracker() -> TrackerGeometry {
        TrackerGeometry {
            chamber_id: 3,
            tracker_id: 1,
            z: 1.5,
            rotation: 0.0,
            origin: [0.0, 0.0],
            projection: Projection::Planar,
            active_area: ActiveArea::new(0.0, 0.1, 0.0, 0.1),
            u: ReadoutPlane::new("gem3x1u", Axis::U, 3, 1, 0.0),
            v: ReadoutPlane::new("gem3x1v", Axis::V, 3, 1, FRAC_PI_2),
        }
    }

    #[test]
    fn test_active_area_excess() {
        let area = ActiveArea::new(0.0, 1.0, -1.0, 1.0);
        assert!(area.contains(0.5, 0.0));
        assert!(area.contains(1.0, 1.0));
        assert_eq!(area.excess(0.5, 0.0), (0.0, 0.0));

        let (dx, dy) = area.excess(1.25, -1.5);
        assert!((dx - 0.25).abs() < 1e-12);
        assert!((dy - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_tracker_validation() {
        let good = tracker();
        assert!(good.validate().is_ok());
        assert!((good.stereo_sine() - 1.0).abs() < 1e-12);

        let mut swapped = tracker();
        std::mem::swap(&mut swapped.u, &mut swapped.v);
        assert!(matches!(swapped.validate(), Err(Error::InvalidGeometry(_))));

        let mut foreign = tracker();
        foreign.v.tracker_id = 2;
        assert!(foreign.validate().is_err());

        let mut barrel = tracker();
        barrel.projection = Projection::Cylindrical { radius: 0.0 };
        assert!(barrel.validate().is_err());
    }

    #[test]
    fn test_non_finite_placement_rejected() {
        let mut rotated = tracker();
        rotated.rotation = f64::NAN;
        assert!(matches!(rotated.validate(), Err(Error::InvalidGeometry(_))));

        let mut shifted = tracker();
        shifted.origin[1] = f64::INFINITY;
        assert!(shifted.validate().is_err());

        let mut lifted = tracker();
        lifted.z = f64::NEG_INFINITY;
        assert!(lifted.validate().is_err());

        let mut offset = tracker();
        offset.u = offset.u.clone().with_offset(f64::NAN);
        assert!(offset.validate().is_err());

        let mut tilted = tracker();
        tilted.v.strip_angle = f64::INFINITY;
        assert!(tilted.validate().is_err());
    }

    #[test]
    fn test_detector_lookup_and_duplicates() {
        let mut geometry = DetectorGeometry::new(vec![tracker()]);
        assert!(geometry.tracker(3, 1).is_some());
        assert!(geometry.tracker(3, 2).is_none());
        assert!(geometry.validate().is_ok());

        geometry.trackers.push(tracker());
        assert!(geometry.validate().is_err());
    }
}
