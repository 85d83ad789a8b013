//! PCM format description and the time/byte conversion it implies.
//!
//! All duration-to-byte mapping in the repo goes through [`PcmFormat`], so
//! payload offsets and lengths are always aligned to whole sample blocks.

use serde::{Deserialize, Serialize};
use std::time::Duration;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Uncompressed PCM format parameters, as stored in a WAVE `fmt ` chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PcmFormat {
    /// Channel count.
    pub channels: u16,
    /// Samples per second per channel.
    pub sample_rate: u32,
    /// Bits per sample (8 or 16 in practice).
    pub bits_per_sample: u16,
}

impl PcmFormat {
    /// Create a format, e.g. `PcmFormat::new(1, 44_100, 16)`.
    #[must_use]
    pub const fn new(channels: u16, sample_rate: u32, bits_per_sample: u16) -> Self {
        Self {
            channels,
            sample_rate,
            bits_per_sample,
        }
    }

    /// Bytes per sample block (one sample across all channels).
    #[must_use]
    pub fn block_align(&self) -> u16 {
        self.channels * (self.bits_per_sample / 8)
    }

    /// Payload bytes per second.
    #[must_use]
    pub fn byte_rate(&self) -> u32 {
        self.sample_rate * u32::from(self.block_align())
    }

    /// Convert a duration to a payload byte count, aligned down to a whole
    /// sample block.
    ///
    /// Rounds to the nearest byte before aligning, so that
    /// `duration_to_bytes(bytes_to_duration(n)) == n` for block-aligned `n`.
    #[must_use]
    pub fn duration_to_bytes(&self, duration: Duration) -> u64 {
        let rate = u128::from(self.byte_rate());
        let bytes = (duration.as_nanos() * rate + NANOS_PER_SEC / 2) / NANOS_PER_SEC;
        let bytes = bytes as u64;
        let align = u64::from(self.block_align().max(1));
        bytes - bytes % align
    }

    /// Convert a payload byte count to a duration, rounding to the nearest
    /// nanosecond.
    #[must_use]
    pub fn bytes_to_duration(&self, bytes: u64) -> Duration {
        let rate = u128::from(self.byte_rate());
        if rate == 0 {
            return Duration::ZERO;
        }
        let nanos = (u128::from(bytes) * NANOS_PER_SEC + rate / 2) / rate;
        Duration::from_nanos(nanos as u64)
    }
}

impl Default for PcmFormat {
    fn default() -> Self {
        Self::new(1, 44_100, 16)
    }
}
