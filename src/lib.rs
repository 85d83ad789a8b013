//! Soundloom - media-data garbage collection and audio repacking for
//! structured audio publications.
//!
//! The engine reclaims storage occupied by audio no longer referenced by the
//! live document or its edit history and, where audio byte ranges are only
//! partially used, compacts the physically-used bytes into new, size-bounded
//! WAVE files while preserving byte-exact payloads and container headers.
//!
//! # Architecture
//!
//! One [`Cleaner::run`] walks four phases over a [`Project`]:
//!
//! 1. Release every media object absent from the caller-supplied [`UsedSet`]
//!    (the union of document-tree and undo/redo-history reachability).
//! 2. Build a hole map per audio resource: the sub-ranges covered by no
//!    retained clip.
//! 3. Repack media touching partially-used resources: stream only their
//!    used bytes into consolidated output resources bounded by a byte
//!    budget, then swap clip lists atomically.
//! 4. Reclaim: move backing files referenced by nothing retained into a
//!    quarantine directory and deregister them.
//!
//! Reachability itself is computed by the document layer and consumed here
//! as an opaque input; the engine never walks the document tree.

pub mod cleaner;

// Re-export the public surface at the crate root.
pub use cleaner::{Cleaner, CleanerOutcome, CleanerReport, CleanerSink, HoleMap, Span};
pub use soundloom_core::{
    CleanerConfig, CleanerEvent, CleanerPhase, Error, MediaId, ResourceId, Result,
};
pub use soundloom_media::{
    AudioMedia, AuxiliaryAsset, Clip, FileMedia, Media, PcmFormat, Project, UsedSet,
};
