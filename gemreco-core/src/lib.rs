//! gemreco-core: Core types for GEM tracker hit reconstruction.
//!
//! This crate provides the readout geometry, the 1D plane hit model, the
//! 2D GEM hit record and the matching configuration shared by the
//! reconstruction algorithms.
//!

pub mod error;
pub mod gem_hit;
pub mod geometry;
pub mod hit;
pub mod matching;

pub use error::{Error, GeometryError, MatchingError, Result};
pub use gem_hit::{GemHit, SpacePoint, MIN_PAIRING_SINE};
pub use geometry::{ActiveArea, Axis, DetectorGeometry, Projection, ReadoutPlane, TrackerGeometry};
pub use hit::{
    Measurement, OneDHit, PlaneClusterHit, PlaneHit, TruthInfo, DEFAULT_POSITION_TOLERANCE,
    PRIMARY_TRACK_ID,
};
pub use matching::{MatchingConfig, MatchingStatistics};
