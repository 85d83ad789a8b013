//! Media objects: clips, audio media, file-backed media, auxiliary assets.
//!
//! Clips are timed windows into a resource's decoded payload. Many clips from
//! many independent media may reference the same resource; byte-level sharing
//! is deliberate, so a media object never exclusively owns its resources.

use std::ops::Range;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use soundloom_core::{Error, MediaId, ResourceId, Result};

use crate::pcm::PcmFormat;

/// Tolerance for clip boundary validation against a resource's duration.
pub const CLIP_TOLERANCE: Duration = Duration::from_millis(5);

// ---------------------------------------------------------------------------
// Clip
// ---------------------------------------------------------------------------

/// A timed window `[begin, end)` into a resource's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clip {
    /// The resource the window reads from.
    pub resource: ResourceId,
    /// Start of the window.
    pub begin: Duration,
    /// End of the window (exclusive).
    pub end: Duration,
}

impl Clip {
    /// Create a clip.
    #[must_use]
    pub const fn new(resource: ResourceId, begin: Duration, end: Duration) -> Self {
        Self {
            resource,
            begin,
            end,
        }
    }

    /// The window's duration.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.end.saturating_sub(self.begin)
    }

    /// The payload-relative byte range this clip covers under `format`.
    #[must_use]
    pub fn byte_range(&self, format: &PcmFormat) -> Range<u64> {
        format.duration_to_bytes(self.begin)..format.duration_to_bytes(self.end)
    }

    /// Byte length of [`byte_range`](Self::byte_range).
    #[must_use]
    pub fn byte_len(&self, format: &PcmFormat) -> u64 {
        let range = self.byte_range(format);
        range.end - range.start
    }

    /// Check `0 <= begin <= end <= total` within [`CLIP_TOLERANCE`].
    pub fn validate_against(&self, total: Duration) -> Result<()> {
        if self.begin > self.end {
            return Err(Error::Validation(format!(
                "clip begins at {:?} after it ends at {:?}",
                self.begin, self.end
            )));
        }
        if self.end > total + CLIP_TOLERANCE {
            return Err(Error::Validation(format!(
                "clip ends at {:?}, past resource duration {:?}",
                self.end, total
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Media
// ---------------------------------------------------------------------------

/// An ordered sequence of clips forming one logical audio stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioMedia {
    id: MediaId,
    clips: Vec<Clip>,
}

impl AudioMedia {
    pub(crate) fn new(id: MediaId, clips: Vec<Clip>) -> Self {
        Self { id, clips }
    }

    /// The media's identity.
    #[must_use]
    pub fn id(&self) -> MediaId {
        self.id
    }

    /// The clip sequence, in playback order.
    #[must_use]
    pub fn clips(&self) -> &[Clip] {
        &self.clips
    }

    /// Whether the media carries no audio at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Total logical duration (sum of clip windows).
    #[must_use]
    pub fn total_duration(&self) -> Duration {
        self.clips.iter().map(Clip::duration).sum()
    }

    /// Append a clip.
    pub fn push_clip(&mut self, clip: Clip) {
        self.clips.push(clip);
    }

    /// Swap in a new clip list, releasing all prior byte-range references in
    /// one step. Returns the old list.
    pub fn replace_clips(&mut self, clips: Vec<Clip>) -> Vec<Clip> {
        std::mem::replace(&mut self.clips, clips)
    }
}

/// Non-audio file-backed media (an image, an embedded document) referencing
/// exactly one resource. Single-owner by convention; never hole-analyzed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileMedia {
    id: MediaId,
    /// The single backing resource.
    pub resource: ResourceId,
}

impl FileMedia {
    pub(crate) fn new(id: MediaId, resource: ResourceId) -> Self {
        Self { id, resource }
    }

    /// The media's identity.
    #[must_use]
    pub fn id(&self) -> MediaId {
        self.id
    }
}

/// Any media object a registry can own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Media {
    /// An audio stream built from clips.
    Audio(AudioMedia),
    /// A non-audio file-backed object.
    File(FileMedia),
}

impl Media {
    /// The media's identity.
    #[must_use]
    pub fn id(&self) -> MediaId {
        match self {
            Media::Audio(m) => m.id(),
            Media::File(m) => m.id(),
        }
    }

    /// Every resource this media references, in clip order.
    pub fn resource_ids(&self) -> Vec<ResourceId> {
        match self {
            Media::Audio(m) => m.clips().iter().map(|c| c.resource).collect(),
            Media::File(m) => vec![m.resource],
        }
    }

    /// Borrow as audio, if it is.
    #[must_use]
    pub fn as_audio(&self) -> Option<&AudioMedia> {
        match self {
            Media::Audio(m) => Some(m),
            Media::File(_) => None,
        }
    }

    /// Mutably borrow as audio, if it is.
    pub fn as_audio_mut(&mut self) -> Option<&mut AudioMedia> {
        match self {
            Media::Audio(m) => Some(m),
            Media::File(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Auxiliary assets
// ---------------------------------------------------------------------------

/// A file-backed asset outside the media model (e.g. an embedded stylesheet)
/// that pins its resource against reclamation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuxiliaryAsset {
    /// The pinned resource.
    pub resource: ResourceId,
    /// Human-readable label for diagnostics.
    pub label: String,
}

impl AuxiliaryAsset {
    /// Create an asset pinning `resource`.
    pub fn new(resource: ResourceId, label: impl Into<String>) -> Self {
        Self {
            resource,
            label: label.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn clip_duration_and_bytes() {
        let fmt = PcmFormat::new(1, 44_100, 16);
        let clip = Clip::new(ResourceId::from_raw(1), secs(1), secs(4));
        assert_eq!(clip.duration(), secs(3));
        assert_eq!(clip.byte_range(&fmt), 88_200..352_800);
        assert_eq!(clip.byte_len(&fmt), 3 * 88_200);
    }

    #[test]
    fn clip_validation() {
        let clip = Clip::new(ResourceId::from_raw(1), secs(1), secs(4));
        assert!(clip.validate_against(secs(10)).is_ok());
        // Within tolerance of the total duration.
        assert!(clip.validate_against(secs(4) - Duration::from_millis(3)).is_ok());
        // Past tolerance.
        assert!(clip.validate_against(secs(3)).is_err());
        // Inverted window.
        let bad = Clip::new(ResourceId::from_raw(1), secs(4), secs(1));
        assert!(bad.validate_against(secs(10)).is_err());
    }

    #[test]
    fn audio_media_totals() {
        let r = ResourceId::from_raw(1);
        let media = AudioMedia::new(
            MediaId::from_raw(1),
            vec![Clip::new(r, secs(1), secs(4)), Clip::new(r, secs(6), secs(9))],
        );
        assert_eq!(media.total_duration(), secs(6));
        assert!(!media.is_empty());
    }

    #[test]
    fn replace_clips_returns_old_list() {
        let r = ResourceId::from_raw(1);
        let mut media =
            AudioMedia::new(MediaId::from_raw(1), vec![Clip::new(r, secs(0), secs(2))]);
        let new_clip = Clip::new(ResourceId::from_raw(2), secs(0), secs(2));
        let old = media.replace_clips(vec![new_clip]);
        assert_eq!(old.len(), 1);
        assert_eq!(old[0].resource, r);
        assert_eq!(media.clips(), &[new_clip]);
    }

    #[test]
    fn media_resource_ids() {
        let audio = Media::Audio(AudioMedia::new(
            MediaId::from_raw(1),
            vec![
                Clip::new(ResourceId::from_raw(1), secs(0), secs(1)),
                Clip::new(ResourceId::from_raw(2), secs(0), secs(1)),
            ],
        ));
        assert_eq!(
            audio.resource_ids(),
            vec![ResourceId::from_raw(1), ResourceId::from_raw(2)]
        );

        let file = Media::File(FileMedia::new(MediaId::from_raw(2), ResourceId::from_raw(3)));
        assert_eq!(file.resource_ids(), vec![ResourceId::from_raw(3)]);
        assert!(file.as_audio().is_none());
    }

    #[test]
    fn clip_serde_roundtrip() {
        let clip = Clip::new(ResourceId::from_raw(9), secs(2), secs(5));
        let json = serde_json::to_string(&clip).unwrap();
        let back: Clip = serde_json::from_str(&json).unwrap();
        assert_eq!(back, clip);
    }
}
