//! The reclaimer: quarantines resources no longer referenced by anything
//! retained.
//!
//! Deletion is soft: the backing file moves into the caller-supplied
//! quarantine directory before the resource is deregistered. Per-resource
//! failures (a stream still open elsewhere, a file the OS will not release)
//! defer that one resource to a future pass; the sweep never aborts over
//! them.

use tokio_util::sync::CancellationToken;
use walkdir::WalkDir;

use soundloom_core::events::CleanerEvent;
use soundloom_core::{CleanerConfig, Result};
use soundloom_media::{quarantine_file, Project};

use super::progress::ProgressTracker;
use super::report::CleanerReport;

/// Progress window for the reclaiming phase.
const PCT_BASE: i32 = 85;
const PCT_SPAN: i32 = 14;

/// Quarantine every resource referenced by no retained media or asset, then
/// optionally sweep orphan files out of the data directory.
pub(crate) fn reclaim(
    project: &mut Project,
    config: &CleanerConfig,
    cancel: &CancellationToken,
    progress: &mut ProgressTracker<'_>,
    report: &mut CleanerReport,
) -> Result<()> {
    let referenced = project.referenced_resources();
    let ids = project.resources.ids();
    let total = ids.len().max(1);

    for (index, id) in ids.into_iter().enumerate() {
        if cancel.is_cancelled() {
            return Ok(());
        }
        progress.report(
            PCT_BASE + (index as i32 * PCT_SPAN) / total as i32,
            "Reclaiming storage",
        );
        if referenced.contains(&id) {
            continue;
        }

        let resource = project.resources.require(id)?;
        if !resource.exists() {
            // Nothing left to move; drop the dangling registration.
            tracing::warn!(resource = %id, "backing file already gone, deregistering");
            project.resources.deregister(id);
            continue;
        }

        let file_name = resource.file_name().to_owned();
        match resource.quarantine_into(&config.quarantine_dir) {
            Ok(bytes) => {
                project.resources.deregister(id);
                report.resources_quarantined += 1;
                report.bytes_reclaimed += bytes;
                tracing::info!(resource = %id, file = %file_name, bytes, "quarantined resource");
                progress.emit(CleanerEvent::ResourceQuarantined {
                    resource: id,
                    file_name,
                    bytes,
                });
            }
            Err(err) => {
                // Recoverable or not, a single resource never stops the
                // sweep; it stays registered and is retried on a later run.
                tracing::warn!(resource = %id, error = %err, "reclamation deferred");
                report.resources_deferred += 1;
                progress.emit(CleanerEvent::ResourceSkipped {
                    resource: id,
                    reason: err.to_string(),
                });
            }
        }
    }

    if config.sweep_orphan_files {
        sweep_orphans(project, config, cancel, progress, report);
    }
    Ok(())
}

/// Quarantine files physically present in the data directory but backed by
/// no registered resource.
fn sweep_orphans(
    project: &Project,
    config: &CleanerConfig,
    cancel: &CancellationToken,
    progress: &mut ProgressTracker<'_>,
    report: &mut CleanerReport,
) {
    let known = project.resources.file_names();
    let walker = WalkDir::new(project.resources.data_dir())
        .min_depth(1)
        .max_depth(1);

    for entry in walker {
        if cancel.is_cancelled() {
            return;
        }
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(error = %err, "orphan sweep could not read entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy().into_owned();
        if known.contains(&file_name) {
            continue;
        }

        match quarantine_file(entry.path(), &config.quarantine_dir) {
            Ok(bytes) => {
                report.orphans_quarantined += 1;
                report.bytes_reclaimed += bytes;
                tracing::info!(file = %file_name, bytes, "quarantined orphan file");
                progress.emit(CleanerEvent::OrphanQuarantined { file_name });
            }
            Err(err) => {
                tracing::warn!(file = %file_name, error = %err, "orphan quarantine deferred");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleaner::progress::CleanerSink;
    use soundloom_core::ResourceId;
    use soundloom_media::{wav, Clip, PcmFormat};
    use std::io::Write;
    use std::time::Duration;
    use tempfile::TempDir;

    fn seed_resource(project: &mut Project, duration: Duration) -> ResourceId {
        let format = PcmFormat::default();
        let id = project.resources.create_audio_resource();
        let resource = project.resources.require(id).unwrap();
        let data_len = format.duration_to_bytes(duration);
        let mut file = std::fs::File::create(resource.path()).unwrap();
        wav::write_wav_header(&mut file, &format, data_len).unwrap();
        file.write_all(&vec![0u8; data_len as usize]).unwrap();
        id
    }

    fn run_reclaim(project: &mut Project, config: &CleanerConfig) -> CleanerReport {
        let sink = CleanerSink::noop();
        let mut progress = ProgressTracker::new(&sink);
        let mut report = CleanerReport::begin();
        reclaim(
            project,
            config,
            &CancellationToken::new(),
            &mut progress,
            &mut report,
        )
        .unwrap();
        report
    }

    #[test]
    fn unreferenced_resource_is_quarantined() {
        let dir = TempDir::new().unwrap();
        let mut project = Project::new(dir.path().join("data")).unwrap();
        let referenced = seed_resource(&mut project, Duration::from_secs(1));
        let unreferenced = seed_resource(&mut project, Duration::from_secs(1));
        project.media.insert_audio(vec![Clip::new(
            referenced,
            Duration::ZERO,
            Duration::from_secs(1),
        )]);

        let config = CleanerConfig::new(dir.path().join("quarantine"));
        let report = run_reclaim(&mut project, &config);

        assert_eq!(report.resources_quarantined, 1);
        assert!(report.bytes_reclaimed > 0);
        assert!(project.resources.get(referenced).is_some());
        assert!(project.resources.get(unreferenced).is_none());
        assert!(dir.path().join("quarantine").join("aud000002.wav").exists());
    }

    #[test]
    fn asset_pinned_resource_is_kept() {
        let dir = TempDir::new().unwrap();
        let mut project = Project::new(dir.path().join("data")).unwrap();
        let pinned = seed_resource(&mut project, Duration::from_secs(1));
        project
            .assets
            .push(soundloom_media::AuxiliaryAsset::new(pinned, "style.css"));

        let config = CleanerConfig::new(dir.path().join("quarantine"));
        let report = run_reclaim(&mut project, &config);

        assert_eq!(report.resources_quarantined, 0);
        assert!(project.resources.get(pinned).is_some());
    }

    #[test]
    fn open_stream_defers_reclamation() {
        let dir = TempDir::new().unwrap();
        let mut project = Project::new(dir.path().join("data")).unwrap();
        let id = seed_resource(&mut project, Duration::from_secs(1));

        let reader = project.resources.require(id).unwrap().open_reader(0..10).unwrap();
        let config = CleanerConfig::new(dir.path().join("quarantine"));
        let report = run_reclaim(&mut project, &config);

        assert_eq!(report.resources_quarantined, 0);
        assert_eq!(report.resources_deferred, 1);
        assert!(project.resources.get(id).is_some());
        drop(reader);

        // The stray stream is closed; the next pass reclaims.
        let report = run_reclaim(&mut project, &config);
        assert_eq!(report.resources_quarantined, 1);
        assert!(project.resources.get(id).is_none());
    }

    #[test]
    fn vanished_backing_file_is_deregistered() {
        let dir = TempDir::new().unwrap();
        let mut project = Project::new(dir.path().join("data")).unwrap();
        let id = seed_resource(&mut project, Duration::from_secs(1));
        std::fs::remove_file(project.resources.require(id).unwrap().path()).unwrap();

        let config = CleanerConfig::new(dir.path().join("quarantine"));
        let report = run_reclaim(&mut project, &config);

        assert_eq!(report.resources_quarantined, 0);
        assert!(project.resources.get(id).is_none());
    }

    #[test]
    fn orphan_files_swept_when_enabled() {
        let dir = TempDir::new().unwrap();
        let mut project = Project::new(dir.path().join("data")).unwrap();
        let kept = seed_resource(&mut project, Duration::from_secs(1));
        project.media.insert_audio(vec![Clip::new(
            kept,
            Duration::ZERO,
            Duration::from_secs(1),
        )]);
        std::fs::write(dir.path().join("data").join("stray.wav"), b"stray").unwrap();

        let mut config = CleanerConfig::new(dir.path().join("quarantine"));
        config.sweep_orphan_files = true;
        let report = run_reclaim(&mut project, &config);

        assert_eq!(report.orphans_quarantined, 1);
        assert!(!dir.path().join("data").join("stray.wav").exists());
        assert!(dir.path().join("quarantine").join("stray.wav").exists());
        // The registered, referenced file is untouched.
        assert!(project.resources.require(kept).unwrap().exists());
    }

    #[test]
    fn orphan_sweep_disabled_by_default() {
        let dir = TempDir::new().unwrap();
        let mut project = Project::new(dir.path().join("data")).unwrap();
        std::fs::write(dir.path().join("data").join("stray.wav"), b"stray").unwrap();

        let config = CleanerConfig::new(dir.path().join("quarantine"));
        let report = run_reclaim(&mut project, &config);

        assert_eq!(report.orphans_quarantined, 0);
        assert!(dir.path().join("data").join("stray.wav").exists());
    }
}
