//! Markdown section synchronization engine.
//!
//! Keeps machine-managed regions of markdown backlog documents in sync with
//! batches of tracker records while leaving everything outside the region
//! untouched. The pipeline:
//!
//! 1. [`region`] locates (or creates) the managed byte range via a heading
//!    or a sentinel marker pair.
//! 2. [`entries`] splits the region into a preserved free-form prefix plus a
//!    map of external ID → raw entry text.
//! 3. [`reconcile`] computes the new entry map from an incoming record
//!    batch (full replace: absence means deletion) with per-run counts.
//! 4. [`order`] imposes a deterministic total order and renumbers ordinal
//!    placeholders after sorting.
//! 5. [`splice`] rebuilds the region body with a single blank-line
//!    separator convention and splices it back into the document.
//!
//! All steps are pure; the only side effect is the atomic write in
//! [`document`]. Line shapes are recognized with explicit prefix/byte
//! checks rather than regexes so a malformed document can never trigger a
//! greedy match that swallows unrelated content.

pub mod bucket;
pub mod document;
pub mod entries;
pub mod error;
pub mod order;
pub mod reconcile;
pub mod region;
pub mod splice;

pub use bucket::bucket_records;
pub use document::{write_atomic, Document};
pub use entries::{parse_entries, EntryPattern, LinkKind, ParsedRegion};
pub use error::EngineError;
pub use order::{order_entries, renumber, EntryRank, ORDINAL_TOKEN};
pub use reconcile::{normalized_eq, reconcile, ReconcileCounts};
pub use region::{ensure_heading, ensure_markers, locate, Anchor, Placement, Region};
pub use splice::{build_region_body, splice_region, EMPTY_PLACEHOLDER};
