//! Cleaner configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

/// Parameters for one compaction run.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CleanerConfig {
    /// Directory unreferenced backing files are moved into instead of being
    /// unlinked. Created on demand.
    pub quarantine_dir: PathBuf,

    /// Maximum payload bytes per consolidated output resource.
    /// 0 means unlimited: every repacked media gets a dedicated resource and
    /// no consolidation happens.
    #[serde(default)]
    pub max_bytes_per_file: u64,

    /// When `true`, skip repacking entirely and only reclaim resources that
    /// nothing retained references. Cheaper mode for large documents.
    #[serde(default)]
    pub preserve_resources: bool,

    /// Minimum duration for a gap to count as a hole. Sub-tolerance
    /// remainders produced by clip splits are discarded.
    #[serde(default = "default_hole_tolerance_ms")]
    pub hole_tolerance_ms: u64,

    /// Chunk size for stream copies, bounding peak memory.
    #[serde(default = "default_copy_chunk_bytes")]
    pub copy_chunk_bytes: usize,

    /// When `true`, files physically present in the data directory but backed
    /// by no registered resource are also quarantined.
    #[serde(default)]
    pub sweep_orphan_files: bool,
}

fn default_hole_tolerance_ms() -> u64 {
    5
}

fn default_copy_chunk_bytes() -> usize {
    300 * 1024
}

impl CleanerConfig {
    /// Create a config with defaults and the given quarantine directory.
    pub fn new(quarantine_dir: impl Into<PathBuf>) -> Self {
        Self {
            quarantine_dir: quarantine_dir.into(),
            max_bytes_per_file: 0,
            preserve_resources: false,
            hole_tolerance_ms: default_hole_tolerance_ms(),
            copy_chunk_bytes: default_copy_chunk_bytes(),
            sweep_orphan_files: false,
        }
    }

    /// The hole tolerance as a [`Duration`].
    #[must_use]
    pub fn hole_tolerance(&self) -> Duration {
        Duration::from_millis(self.hole_tolerance_ms)
    }

    /// Check the config before a run starts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when the quarantine directory is unset
    /// or the copy chunk size is zero.
    pub fn validate(&self) -> Result<()> {
        if self.quarantine_dir.as_os_str().is_empty() {
            return Err(Error::Validation("quarantine_dir is empty".into()));
        }
        if self.copy_chunk_bytes == 0 {
            return Err(Error::Validation("copy_chunk_bytes must be > 0".into()));
        }
        Ok(())
    }
}

impl Default for CleanerConfig {
    /// Field defaults matching the serde defaults; the quarantine directory
    /// stays unset and must be provided before [`validate`](Self::validate)
    /// passes.
    fn default() -> Self {
        Self::new(PathBuf::new())
    }
}
