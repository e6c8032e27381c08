//! Error types for gemreco-core.

use thiserror::Error;

/// Result type alias for gemreco operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for gemreco operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A plane hit was constructed with out-of-range values.
    #[error("invalid hit: {0}")]
    InvalidHit(String),

    /// Two plane hits cannot form a GEM hit.
    #[error("invalid u/v pairing: {0}")]
    InvalidPairing(String),

    /// Tracker geometry description is inconsistent.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Matching configuration holds out-of-range values.
    #[error("invalid matching configuration: {0}")]
    InvalidConfig(String),

    /// Space point could not be solved for a pair.
    #[error("geometry error: {0}")]
    Geometry(#[from] GeometryError),

    /// Matching precondition was violated.
    #[error("matching error: {0}")]
    Matching(#[from] MatchingError),
}

/// Precondition violations detected by the u/v hit matcher.
///
/// These indicate malformed input from the caller and are never corrected
/// silently.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatchingError {
    /// Hits on a plane are not sorted by position.
    #[error("{plane} hits not sorted: position[{index}] = {position} < previous {previous}")]
    UnsortedHits {
        plane: String,
        index: usize,
        position: f64,
        previous: f64,
    },

    /// A hit references a plane other than the one it was passed for.
    #[error("hit {index} belongs to plane '{found}', expected '{expected}'")]
    WrongPlane {
        index: usize,
        expected: String,
        found: String,
    },

    /// A hit carries no charge amplitude.
    #[error("hit {index} on plane '{plane}' carries no charge amplitude")]
    MissingAmplitude { plane: String, index: usize },

    /// The u and v strips of the tracker are (nearly) parallel.
    #[error("u/v planes of chamber {chamber_id} tracker {tracker_id} are parallel (|sin| = {sine:.2e})")]
    ParallelPlanes {
        chamber_id: i32,
        tracker_id: i32,
        sine: f64,
    },

    /// Combination count exceeds the configured cap.
    #[error("too many candidates: {combinations} u/v combinations exceed limit {limit}")]
    TooManyCandidates { combinations: usize, limit: usize },
}

/// Data errors raised while solving a single u/v intersection.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// Strip directions do not intersect.
    #[error("strip directions are parallel (|sin| = {sine:.2e})")]
    ParallelPlanes { sine: f64 },

    /// Intersection lies outside the tracker active area.
    #[error("intersection ({x:.4}, {y:.4}) outside active area")]
    OutsideActiveArea { x: f64, y: f64 },

    /// Solved coordinates are not finite.
    #[error("non-finite space point")]
    NonFinite,
}
