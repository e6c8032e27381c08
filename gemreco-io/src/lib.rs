//! gemreco-io: Event input and GEM hit output for gemreco.
//!
//! Run files are JSON documents holding the readout geometry, an optional
//! matching configuration, and per-event clustered hits. Reconstructed GEM
//! hits are written as CSV, run statistics as JSON.
//!

mod error;
mod reader;
mod writer;

pub use error::{Error, Result};
pub use reader::{
    ClusterRecord, EventHits, EventRecord, RunFile, TrackerHitsRecord, TrackerReadFailure,
};
pub use writer::{GemHitWriter, RunSummary};
