//! soundloom-core: shared IDs, errors, events, and configuration.
//!
//! This crate is the foundational dependency for the other soundloom crates,
//! providing type-safe identifiers behind a monotonic allocator, the unified
//! error type with its recoverable/fatal split, the cleaner event payloads,
//! and the cleaner configuration.

pub mod config;
pub mod error;
pub mod events;
pub mod ids;

// Re-export the most commonly used items at the crate root.
pub use config::CleanerConfig;
pub use error::{Error, Result};
pub use events::{CleanerEvent, CleanerPhase};
pub use ids::{IdAllocator, MediaId, ResourceId};
