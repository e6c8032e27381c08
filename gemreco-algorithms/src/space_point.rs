//! Space point reconstruction from a u/v hit pair.
//!
//! A hit at position `p` on a plane with strip angle `a` and offset `o`
//! constrains the tracker-local point to `x cos(a) + y sin(a) = p - o`.
//! Two non-parallel planes give a 2x2 linear system with determinant
//! `sin(a_v - a_u)`, which is solved here and then projected into the
//! detector frame.
#![allow(clippy::similar_names)]

use gemreco_core::error::GeometryError;
use gemreco_core::geometry::{Projection, TrackerGeometry};
use gemreco_core::hit::Measurement;
use gemreco_core::{MatchingConfig, SpacePoint};

/// Solution of the u/v system in the tracker local frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LocalIntersection {
    pub x: f64,
    pub y: f64,
    pub sigma_x: f64,
    pub sigma_y: f64,
}

/// Solves u/v intersections and converts them to detector coordinates.
///
/// The builder holds no geometry; every call receives the tracker it
/// works on.
#[derive(Clone, Copy, Debug)]
pub struct SpacePointBuilder {
    min_stereo_sine: f64,
    edge_tolerance_sigmas: f64,
}

impl Default for SpacePointBuilder {
    fn default() -> Self {
        Self::from_config(&MatchingConfig::default())
    }
}

impl SpacePointBuilder {
    /// Creates a builder with explicit tolerances.
    pub fn new(min_stereo_sine: f64, edge_tolerance_sigmas: f64) -> Self {
        Self {
            min_stereo_sine,
            edge_tolerance_sigmas,
        }
    }

    /// Creates a builder sharing the matcher's tolerances.
    pub fn from_config(config: &MatchingConfig) -> Self {
        Self::new(config.min_stereo_sine, config.edge_tolerance_sigmas)
    }

    /// Solves the local intersection of a u and a v measurement.
    ///
    /// # Errors
    /// [`GeometryError::ParallelPlanes`] if the strip directions are closer
    /// to parallel than the configured limit.
    pub fn solve_local(
        &self,
        tracker: &TrackerGeometry,
        u_pos: f64,
        u_res: f64,
        v_pos: f64,
        v_res: f64,
    ) -> Result<LocalIntersection, GeometryError> {
        let det = tracker.stereo_sine();
        if det.abs() < self.min_stereo_sine {
            return Err(GeometryError::ParallelPlanes { sine: det.abs() });
        }

        let (sin_u, cos_u) = tracker.u.strip_angle.sin_cos();
        let (sin_v, cos_v) = tracker.v.strip_angle.sin_cos();
        let u = u_pos - tracker.u.offset;
        let v = v_pos - tracker.v.offset;

        let x = (u * sin_v - v * sin_u) / det;
        let y = (v * cos_u - u * cos_v) / det;
        let sigma_x = (sin_v * u_res).hypot(sin_u * v_res) / det.abs();
        let sigma_y = (cos_v * u_res).hypot(cos_u * v_res) / det.abs();

        if !(x.is_finite() && y.is_finite()) {
            return Err(GeometryError::NonFinite);
        }
        Ok(LocalIntersection {
            x,
            y,
            sigma_x,
            sigma_y,
        })
    }

    /// Distance of a local point outside the active area, in sigma.
    ///
    /// Zero for points inside; infinite when the point is outside along an
    /// axis with zero uncertainty.
    pub fn area_excess_sigmas(tracker: &TrackerGeometry, local: &LocalIntersection) -> f64 {
        let (dx, dy) = tracker.active_area.excess(local.x, local.y);
        let pull = |excess: f64, sigma: f64| {
            if excess == 0.0 {
                0.0
            } else if sigma > 0.0 {
                excess / sigma
            } else {
                f64::INFINITY
            }
        };
        pull(dx, local.sigma_x).hypot(pull(dy, local.sigma_y))
    }

    /// Maps a local point into detector coordinates `(x, y, z)`.
    pub fn to_detector(tracker: &TrackerGeometry, local_x: f64, local_y: f64) -> (f64, f64, f64) {
        match tracker.projection {
            Projection::Planar => {
                let (sin_r, cos_r) = tracker.rotation.sin_cos();
                (
                    tracker.origin[0] + local_x * cos_r - local_y * sin_r,
                    tracker.origin[1] + local_x * sin_r + local_y * cos_r,
                    tracker.z,
                )
            }
            Projection::Cylindrical { radius } => {
                let phi = tracker.rotation + local_x / radius;
                let (sin_p, cos_p) = phi.sin_cos();
                (
                    tracker.origin[0] + radius * cos_p,
                    tracker.origin[1] + radius * sin_p,
                    tracker.z + local_y,
                )
            }
        }
    }

    /// Builds the space point of an accepted u/v pair.
    ///
    /// # Errors
    /// Returns a [`GeometryError`] if the planes are parallel, the
    /// intersection is outside the active area beyond the edge tolerance, or
    /// the result is not finite.
    pub fn build<U, V>(
        &self,
        tracker: &TrackerGeometry,
        u_hit: &U,
        v_hit: &V,
    ) -> Result<SpacePoint, GeometryError>
    where
        U: Measurement + ?Sized,
        V: Measurement + ?Sized,
    {
        let local = self.solve_local(
            tracker,
            u_hit.position(),
            u_hit.resolution(),
            v_hit.position(),
            v_hit.resolution(),
        )?;

        if Self::area_excess_sigmas(tracker, &local) > self.edge_tolerance_sigmas {
            return Err(GeometryError::OutsideActiveArea {
                x: local.x,
                y: local.y,
            });
        }

        let (x, y, z) = Self::to_detector(tracker, local.x, local.y);
        let r = x.hypot(y);
        let phi = y.atan2(x);
        if ![x, y, z, r, phi].iter().all(|value| value.is_finite()) {
            return Err(GeometryError::NonFinite);
        }

        Ok(SpacePoint {
            x,
            y,
            z,
            r,
            phi,
            local_x: local.x,
            local_y: local.y,
            sigma_x: local.sigma_x,
            sigma_y: local.sigma_y,
        })
    }
}
