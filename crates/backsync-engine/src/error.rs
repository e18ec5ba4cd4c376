//! Error taxonomy for the section synchronization engine.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors from the section synchronization engine.
///
/// Structural variants are fatal to a single sync attempt and surface
/// before any write happens, so the document on disk is never left in a
/// partially-synced state. Unparsable records and malformed entries are
/// *not* errors; they are counted and carried in
/// [`ReconcileCounts`](crate::ReconcileCounts) /
/// [`ParsedRegion`](crate::ParsedRegion).
#[derive(Debug, Error)]
pub enum EngineError {
    /// Expected section heading absent and auto-creation disallowed.
    #[error("section heading {heading:?} not found")]
    HeadingNotFound { heading: String },

    /// One of a sentinel marker pair is absent.
    #[error("sync marker {marker:?} not found")]
    MarkerNotFound { marker: String },

    /// Both markers present but the end marker precedes the begin marker.
    #[error("sync markers out of order: {end:?} appears before {begin:?}")]
    MarkerOrder { begin: String, end: String },

    #[error("read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
