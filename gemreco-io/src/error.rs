//! I/O error types.

use thiserror::Error;

/// Result type for I/O operations.
pub type Result<T> = std::result::Result<T, Error>;

/// I/O error types.
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON input or failed serialization.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Hits reference a tracker missing from the geometry.
    #[error("unknown tracker: chamber {chamber_id} tracker {tracker_id}")]
    UnknownTracker { chamber_id: i32, tracker_id: i32 },

    /// Core library error.
    #[error("core error: {0}")]
    CoreError(#[from] gemreco_core::Error),
}
