//! Unified error type for the soundloom crates.
//!
//! Failure categories follow the cleaner's propagation policy: recoverable
//! conditions ([`Error::StreamConflict`]) are logged and the offending item is
//! skipped, while structural failures (missing backing files, I/O errors)
//! surface to the caller. The split is explicit via
//! [`Error::is_recoverable`], not a naming convention.

use std::path::PathBuf;

use crate::ids::ResourceId;

/// Unified error type covering all failure modes in soundloom.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A resource's backing file is absent when it was expected on disk.
    /// Fatal: aborts the run.
    #[error("Missing media data: {}", .path.display())]
    MissingData {
        /// The path that was expected to exist.
        path: PathBuf,
    },

    /// A second writer, or a writer while readers are open, was requested on
    /// a resource. Recoverable: the offending resource is skipped and the
    /// outer loop continues.
    #[error("Stream conflict on resource {resource}: {detail}")]
    StreamConflict {
        /// The resource whose stream discipline was violated.
        resource: ResourceId,
        /// What was attempted.
        detail: &'static str,
    },

    /// An I/O operation failed. Fatal during streaming/finalization, since a
    /// malformed container header could otherwise be left behind.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// A RIFF/WAVE container could not be parsed or written.
    #[error("Invalid WAVE data: {0}")]
    InvalidWave(String),

    /// The requested entity is not registered.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "media", "resource").
        entity: &'static str,
        /// The identifier that was looked up.
        id: String,
    },

    /// Configuration failed validation before the run started.
    #[error("Validation error: {0}")]
    Validation(String),
}

impl Error {
    /// Whether the per-item loop may log this error and continue.
    ///
    /// Everything else is structural and must surface to the caller.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::StreamConflict { .. })
    }

    /// Convenience constructor for [`Error::MissingData`].
    pub fn missing_data(path: impl Into<PathBuf>) -> Self {
        Error::MissingData { path: path.into() }
    }

    /// Convenience constructor for [`Error::StreamConflict`].
    pub fn stream_conflict(resource: ResourceId, detail: &'static str) -> Self {
        Error::StreamConflict { resource, detail }
    }

    /// Convenience constructor for [`Error::InvalidWave`].
    pub fn invalid_wave(msg: impl Into<String>) -> Self {
        Error::InvalidWave(msg.into())
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        Error::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
