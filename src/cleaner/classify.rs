//! Release of unreachable media and classification of audio resources.
//!
//! Classification is read-only over the registries: it groups retained clips
//! by resource, computes each resource's hole map, and derives the set of
//! repack candidates. A media is a candidate iff at least one of its clips
//! lies on a has-holes resource; media whose storage is already fully used
//! are left untouched, which is what makes a second run a no-op.

use std::collections::BTreeMap;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use soundloom_core::events::CleanerEvent;
use soundloom_core::{MediaId, ResourceId, Result};
use soundloom_media::{Media, Project, UsedSet};

use super::holes::HoleMap;
use super::progress::ProgressTracker;

/// Progress window for the hole-computation phase.
const PCT_BASE: i32 = 10;
const PCT_SPAN: i32 = 20;

/// Output of the classification pass.
#[derive(Debug)]
pub(crate) struct Classification {
    /// Hole map per resource referenced by at least one retained clip.
    pub audio_resources: BTreeMap<ResourceId, HoleMap>,
    /// Retained audio media needing repacking, in stable ID order.
    pub repack_candidates: Vec<MediaId>,
}

impl Classification {
    /// The classification of a preserve-resources run: nothing analyzed,
    /// nothing repacked.
    pub(crate) fn empty() -> Self {
        Self {
            audio_resources: BTreeMap::new(),
            repack_candidates: Vec::new(),
        }
    }

    /// Whether `id` was found partially used.
    #[cfg(test)]
    pub(crate) fn has_holes(&self, id: ResourceId) -> bool {
        self.audio_resources
            .get(&id)
            .is_some_and(|map| !map.is_fully_used())
    }
}

/// Drop every media object absent from the reachability set.
///
/// This detaches the media's resource references; backing files are only
/// touched later, by the reclaimer.
pub(crate) fn release_unused(
    project: &mut Project,
    used: &UsedSet,
    cancel: &CancellationToken,
    progress: &mut ProgressTracker<'_>,
) -> u64 {
    let mut released = 0;
    for id in project.media.ids() {
        if cancel.is_cancelled() {
            break;
        }
        if used.contains(id) {
            continue;
        }
        project.media.remove(id);
        tracing::info!(media = %id, "released unreachable media");
        progress.emit(CleanerEvent::MediaReleased { media: id });
        released += 1;
    }
    released
}

/// Compute hole maps for every audio-referenced resource and derive the
/// repack candidates.
pub(crate) fn classify(
    project: &Project,
    tolerance: Duration,
    cancel: &CancellationToken,
    progress: &mut ProgressTracker<'_>,
) -> Result<Classification> {
    // Group retained clips by the resource they cover.
    let mut clips_by_resource: BTreeMap<ResourceId, Vec<(Duration, Duration)>> = BTreeMap::new();
    for media in project.media.iter() {
        if let Media::Audio(audio) = media {
            for clip in audio.clips() {
                clips_by_resource
                    .entry(clip.resource)
                    .or_default()
                    .push((clip.begin, clip.end));
            }
        }
    }

    let total = clips_by_resource.len().max(1);
    let mut audio_resources = BTreeMap::new();
    for (index, (resource_id, clips)) in clips_by_resource.into_iter().enumerate() {
        if cancel.is_cancelled() {
            break;
        }
        progress.report(
            PCT_BASE + (index as i32 * PCT_SPAN) / total as i32,
            "Analyzing audio usage",
        );

        let resource = project.resources.require(resource_id)?;
        let duration = resource.total_duration()?;
        let mut map = HoleMap::new(duration);
        for (begin, end) in clips {
            // Clips may overhang the payload by up to the clip tolerance;
            // clamp so coverage never extends past the resource.
            map.subtract(begin.min(duration), end.min(duration), tolerance);
        }
        tracing::debug!(
            resource = %resource_id,
            holes = map.holes().len(),
            unused = ?map.unused(),
            "classified audio resource"
        );
        audio_resources.insert(resource_id, map);
    }

    let repack_candidates = project
        .media
        .iter()
        .filter_map(Media::as_audio)
        .filter(|audio| {
            audio.clips().iter().any(|clip| {
                audio_resources
                    .get(&clip.resource)
                    .is_some_and(|map| !map.is_fully_used())
            })
        })
        .map(|audio| audio.id())
        .collect();

    Ok(Classification {
        audio_resources,
        repack_candidates,
    })
}
