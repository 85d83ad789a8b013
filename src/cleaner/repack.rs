//! The repacker: streams only the in-use bytes of retained audio media into
//! new, consolidated output resources bounded by a byte budget.
//!
//! One streaming pass in stable media-ID order. A media whose own length
//! meets or exceeds the budget gets a dedicated output; smaller media are
//! packed into a shared output until the budget would overflow, at which
//! point the output is finalized (header patched to the exact payload
//! length) and a fresh one is opened. The total audio payload is
//! byte-identical before and after.

use std::io::{Read, Write};
use std::ops::Range;

use tokio_util::sync::CancellationToken;

use soundloom_core::events::CleanerEvent;
use soundloom_core::{CleanerConfig, Error, MediaId, ResourceId, Result};
use soundloom_media::{Clip, PcmFormat, Project, ResourceReader, ResourceWriter};

use super::progress::ProgressTracker;
use super::report::CleanerReport;

/// Progress window for the repacking phase.
const PCT_BASE: i32 = 30;
const PCT_SPAN: i32 = 55;

/// An output resource with its open writer.
struct OpenOutput {
    id: ResourceId,
    writer: ResourceWriter,
}

/// Repack every candidate media, mutating clip lists and the resource
/// registry in place.
pub(crate) fn repack(
    project: &mut Project,
    candidates: &[MediaId],
    config: &CleanerConfig,
    cancel: &CancellationToken,
    progress: &mut ProgressTracker<'_>,
    report: &mut CleanerReport,
) -> Result<()> {
    let mut open: Option<OpenOutput> = None;
    let total = candidates.len().max(1);

    for (index, &media_id) in candidates.iter().enumerate() {
        if cancel.is_cancelled() {
            // Media packed earlier in this pass already reference the open
            // output; its header must be exact before we stop.
            finalize_open(&mut open)?;
            return Ok(());
        }
        progress.report(
            PCT_BASE + (index as i32 * PCT_SPAN) / total as i32,
            "Repacking audio",
        );

        let Some(plan) = plan_media(project, media_id)? else {
            continue;
        };

        // Open every source reader up front: a recoverable stream conflict
        // then defers the whole media before any byte lands in an output.
        let readers = match open_sources(project, &plan) {
            Ok(readers) => readers,
            Err(err) if err.is_recoverable() => {
                tracing::warn!(media = %media_id, error = %err, "source busy, repack deferred");
                if let Error::StreamConflict { resource, .. } = &err {
                    progress.emit(CleanerEvent::ResourceSkipped {
                        resource: *resource,
                        reason: err.to_string(),
                    });
                }
                continue;
            }
            Err(err) => {
                abort_open(&mut open);
                return Err(err);
            }
        };

        let dedicated =
            config.max_bytes_per_file == 0 || plan.byte_len >= config.max_bytes_per_file;
        let rotate = match &open {
            _ if dedicated => true,
            Some(out) => {
                out.writer.bytes_written() + plan.byte_len > config.max_bytes_per_file
                    || out.writer.format() != plan.format
            }
            None => false,
        };
        if rotate {
            finalize_open(&mut open)?;
        }

        if open.is_none() {
            let id = project.resources.create_audio_resource();
            let writer = project.resources.require(id)?.create_writer(plan.format)?;
            report.resources_created += 1;
            tracing::debug!(resource = %id, "opened output resource");
            open = Some(OpenOutput { id, writer });
        }

        let out = open.as_mut().expect("output opened above");
        let out_id = out.id;
        let offset = out.writer.bytes_written();
        let copied = copy_sources(readers, &mut out.writer, config, plan.byte_len);
        if let Err(err) = copied {
            abort_open(&mut open);
            return Err(err);
        }

        // Release all prior byte-range references and attach exactly one
        // clip covering the bytes just written.
        let begin = plan.format.bytes_to_duration(offset);
        let end = plan.format.bytes_to_duration(offset + plan.byte_len);
        project
            .media
            .audio_mut(media_id)?
            .replace_clips(vec![Clip::new(out_id, begin, end)]);

        report.media_repacked += 1;
        report.bytes_written += plan.byte_len;
        tracing::info!(
            media = %media_id,
            resource = %out_id,
            bytes = plan.byte_len,
            "repacked media"
        );
        progress.emit(CleanerEvent::MediaRepacked {
            media: media_id,
            resource: out_id,
            bytes: plan.byte_len,
        });

        if dedicated {
            finalize_open(&mut open)?;
        }
    }

    finalize_open(&mut open)
}

/// The byte-level reading plan for one media.
struct MediaPlan {
    /// Payload-relative source ranges, in clip order.
    sources: Vec<(ResourceId, Range<u64>)>,
    /// The media's PCM format (shared by all its clips).
    format: PcmFormat,
    /// Total used bytes.
    byte_len: u64,
}

/// Resolve a media's clips to byte ranges. Returns `None` for media with
/// nothing to move (empty, or clips spanning mixed PCM formats).
fn plan_media(project: &Project, media_id: MediaId) -> Result<Option<MediaPlan>> {
    let Some(audio) = project.media.get(media_id).and_then(|m| m.as_audio()) else {
        return Ok(None);
    };

    let mut sources = Vec::with_capacity(audio.clips().len());
    let mut format: Option<PcmFormat> = None;
    for clip in audio.clips() {
        let resource = project.resources.require(clip.resource)?;
        let info = resource.wav_info()?;
        match format {
            None => format = Some(info.format),
            Some(f) if f != info.format => {
                // A single WAVE container cannot hold two formats; leave
                // this media for a future pass once its sources agree.
                tracing::warn!(media = %media_id, "clips span mixed PCM formats, repack skipped");
                return Ok(None);
            }
            Some(_) => {}
        }
        sources.push((clip.resource, clip.byte_range(&info.format)));
    }

    let Some(format) = format else {
        return Ok(None);
    };
    let byte_len: u64 = sources.iter().map(|(_, r)| r.end - r.start).sum();
    if byte_len == 0 {
        return Ok(None);
    }
    Ok(Some(MediaPlan {
        sources,
        format,
        byte_len,
    }))
}

/// Open a reader for every source range.
fn open_sources(project: &Project, plan: &MediaPlan) -> Result<Vec<ResourceReader>> {
    plan.sources
        .iter()
        .map(|(id, range)| project.resources.require(*id)?.open_reader(range.clone()))
        .collect()
}

/// Stream every source into the writer in bounded chunks.
fn copy_sources(
    readers: Vec<ResourceReader>,
    writer: &mut ResourceWriter,
    config: &CleanerConfig,
    expected: u64,
) -> Result<()> {
    let mut buf = vec![0u8; config.copy_chunk_bytes];
    let mut copied: u64 = 0;
    for mut reader in readers {
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            writer.write_all(&buf[..n])?;
            copied += n as u64;
        }
    }
    if copied != expected {
        // The backing file was shorter than its header declared.
        return Err(Error::invalid_wave(format!(
            "source payload ended after {copied} of {expected} bytes"
        )));
    }
    Ok(())
}

/// Patch the open output's header to the exact payload length and close it.
fn finalize_open(open: &mut Option<OpenOutput>) -> Result<()> {
    if let Some(out) = open.take() {
        let info = out.writer.finalize()?;
        tracing::debug!(resource = %out.id, bytes = info.data_len, "finalized output resource");
    }
    Ok(())
}

/// Close the in-flight output after a fatal error.
///
/// Media packed earlier in the pass may already reference this output, so
/// the header is still patched for the bytes that did land; a secondary
/// failure here is logged and the original error propagates.
fn abort_open(open: &mut Option<OpenOutput>) {
    if let Some(out) = open.take() {
        if let Err(err) = out.writer.finalize() {
            tracing::error!(resource = %out.id, error = %err, "failed to close in-flight output");
        }
    }
}
