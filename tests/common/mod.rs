//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which owns a temp directory, a [`Project`] rooted
//! in it, and helpers to seed WAV resources with deterministic payloads and
//! to read a media's payload back through its clips.

use std::io::{Read, Write};
use std::path::PathBuf;
use std::time::Duration;

use tempfile::TempDir;

use soundloom::{CleanerConfig, Clip, MediaId, PcmFormat, Project, ResourceId};
use soundloom_media::wav;

/// Install a tracing subscriber once per test binary; `RUST_LOG` controls
/// verbosity.
fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

/// Test harness wrapping a project in a temp directory.
pub struct TestHarness {
    pub tmp: TempDir,
    pub project: Project,
    pub format: PcmFormat,
}

impl TestHarness {
    /// Create a harness with the default mono 44.1 kHz / 16-bit format.
    pub fn new() -> Self {
        Self::with_format(PcmFormat::default())
    }

    /// Create a harness seeding resources in the given format.
    pub fn with_format(format: PcmFormat) -> Self {
        init_tracing();
        let tmp = TempDir::new().expect("failed to create temp dir");
        let project = Project::new(tmp.path().join("data")).expect("failed to create project");
        Self {
            tmp,
            project,
            format,
        }
    }

    /// A config pointing the quarantine directory into the temp dir.
    pub fn config(&self) -> CleanerConfig {
        CleanerConfig::new(self.quarantine_dir())
    }

    pub fn data_dir(&self) -> PathBuf {
        self.tmp.path().join("data")
    }

    pub fn quarantine_dir(&self) -> PathBuf {
        self.tmp.path().join("quarantine")
    }

    /// Register a resource and write its backing WAV with a payload pattern
    /// derived from the resource ID, so distinct resources carry distinct
    /// bytes.
    pub fn seed_resource(&mut self, duration: Duration) -> ResourceId {
        let id = self.project.resources.create_audio_resource();
        let resource = self.project.resources.require(id).unwrap();
        let data_len = self.format.duration_to_bytes(duration);
        let seed = id.raw() as u8;
        let payload: Vec<u8> = (0..data_len)
            .map(|i| seed.wrapping_mul(31).wrapping_add((i % 241) as u8))
            .collect();

        let mut file = std::fs::File::create(resource.path()).unwrap();
        wav::write_wav_header(&mut file, &self.format, data_len).unwrap();
        file.write_all(&payload).unwrap();
        id
    }

    /// Register an audio media over the given `(resource, begin_s, end_s)`
    /// windows.
    pub fn add_audio(&mut self, clips: &[(ResourceId, f64, f64)]) -> MediaId {
        let clips = clips
            .iter()
            .map(|&(resource, begin, end)| {
                Clip::new(
                    resource,
                    Duration::from_secs_f64(begin),
                    Duration::from_secs_f64(end),
                )
            })
            .collect();
        self.project.media.insert_audio(clips)
    }

    /// Read a media's payload by concatenating its clips' byte ranges.
    pub fn media_bytes(&self, media: MediaId) -> Vec<u8> {
        let audio = self
            .project
            .media
            .get(media)
            .expect("media not registered")
            .as_audio()
            .expect("not an audio media");
        let mut out = Vec::new();
        for clip in audio.clips() {
            let resource = self.project.resources.require(clip.resource).unwrap();
            let info = resource.wav_info().unwrap();
            let mut reader = resource.open_reader(clip.byte_range(&info.format)).unwrap();
            reader.read_to_end(&mut out).unwrap();
        }
        out
    }

    /// File names currently present in the quarantine directory.
    pub fn quarantined_files(&self) -> Vec<String> {
        let dir = self.quarantine_dir();
        if !dir.exists() {
            return Vec::new();
        }
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    /// File names currently present in the data directory.
    pub fn data_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.data_dir())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}
