//! gemreco-algorithms: u/v hit matching and space point reconstruction.
//!
//! This crate provides:
//! - **HitPairMatcher** - greedy amplitude matching of u/v plane clusters
//! - **SpacePointBuilder** - plane intersection solve and detector-frame projection
//! - **Processing** - per-tracker and per-event (parallel) reconstruction
//!
#![warn(missing_docs)]

mod matcher;
mod processing;
pub mod space_point;

pub use matcher::{HitPair, HitPairMatcher, MatchOutcome};
pub use processing::{
    reconstruct_event, reconstruct_tracker, EventReconstruction, EventStatistics, TrackerInput,
    TrackerReconstruction, TrackerResult,
};
pub use space_point::{LocalIntersection, SpacePointBuilder};

// Re-export core matching types
pub use gemreco_core::matching::{MatchingConfig, MatchingStatistics};
