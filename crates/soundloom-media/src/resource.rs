//! Resources: byte-range handles over physical backing files.
//!
//! A [`Resource`] supports any number of concurrent readers or exactly one
//! writer, never both. Discipline is enforced by an internal gate whose
//! guards release on `Drop`; a violation surfaces as the recoverable
//! [`Error::StreamConflict`] rather than a panic, so an outer loop can skip
//! the offending resource and continue.

use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use soundloom_core::{Error, ResourceId, Result};

use crate::pcm::PcmFormat;
use crate::wav::{self, WavInfo, WAV_HEADER_LEN};

// ---------------------------------------------------------------------------
// Stream gate
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct GateState {
    readers: usize,
    writer: bool,
}

/// Reader/writer accounting for one resource.
#[derive(Debug, Default)]
struct StreamGate {
    state: Mutex<GateState>,
}

impl StreamGate {
    fn acquire_read(&self) -> std::result::Result<(), &'static str> {
        let mut state = self.state.lock();
        if state.writer {
            return Err("reader requested while a writer is open");
        }
        state.readers += 1;
        Ok(())
    }

    fn acquire_write(&self) -> std::result::Result<(), &'static str> {
        let mut state = self.state.lock();
        if state.writer {
            return Err("writer requested while a writer is open");
        }
        if state.readers > 0 {
            return Err("writer requested while readers are open");
        }
        state.writer = true;
        Ok(())
    }
}

/// RAII guard for one open reader.
#[derive(Debug)]
struct ReadGuard {
    gate: Arc<StreamGate>,
}

impl Drop for ReadGuard {
    fn drop(&mut self) {
        self.gate.state.lock().readers -= 1;
    }
}

/// RAII guard for the single writer.
#[derive(Debug)]
struct WriteGuard {
    gate: Arc<StreamGate>,
}

impl Drop for WriteGuard {
    fn drop(&mut self) {
        self.gate.state.lock().writer = false;
    }
}

// ---------------------------------------------------------------------------
// Resource
// ---------------------------------------------------------------------------

/// An identity plus a byte-range handle over one physical backing file.
///
/// Container metadata (PCM format, payload length) is parsed lazily from the
/// WAVE header and cached; finalizing a writer refreshes the cache without a
/// re-parse.
#[derive(Debug)]
pub struct Resource {
    id: ResourceId,
    file_name: String,
    path: PathBuf,
    gate: Arc<StreamGate>,
    info: Arc<Mutex<Option<WavInfo>>>,
}

impl Resource {
    /// Create a handle. Registries are the only intended caller.
    pub(crate) fn new(id: ResourceId, file_name: String, path: PathBuf) -> Self {
        Self {
            id,
            file_name,
            path,
            gate: Arc::new(StreamGate::default()),
            info: Arc::new(Mutex::new(None)),
        }
    }

    /// The resource's identity.
    #[must_use]
    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// File name relative to the data directory.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Absolute path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the backing file is present on disk.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Container metadata, parsed on first access and cached.
    pub fn wav_info(&self) -> Result<WavInfo> {
        if let Some(info) = *self.info.lock() {
            return Ok(info);
        }
        let _guard = self.read_guard()?;
        let mut file = self.open_backing()?;
        let info = wav::read_wav_info(&mut file)?;
        *self.info.lock() = Some(info);
        Ok(info)
    }

    /// Total payload duration from the container header.
    pub fn total_duration(&self) -> Result<Duration> {
        Ok(self.wav_info()?.duration())
    }

    /// Open a reader over a payload-relative byte range.
    pub fn open_reader(&self, range: Range<u64>) -> Result<ResourceReader> {
        let info = self.wav_info()?;
        if range.start > range.end || range.end > info.data_len {
            return Err(Error::Validation(format!(
                "byte range {}..{} outside payload of {} bytes (resource {})",
                range.start, range.end, info.data_len, self.id
            )));
        }
        let guard = self.read_guard()?;
        let mut file = self.open_backing()?;
        file.seek(SeekFrom::Start(info.data_offset + range.start))?;
        Ok(ResourceReader {
            file,
            remaining: range.end - range.start,
            _guard: guard,
        })
    }

    /// Open the single writer, creating the backing file with a provisional
    /// header. The header is patched with the exact payload length on
    /// [`ResourceWriter::finalize`].
    pub fn create_writer(&self, format: PcmFormat) -> Result<ResourceWriter> {
        let guard = self.write_guard()?;
        let mut file = File::create(&self.path)?;
        wav::write_wav_header(&mut file, &format, 0)?;
        Ok(ResourceWriter {
            file,
            format,
            bytes_written: 0,
            info: Arc::clone(&self.info),
            _guard: guard,
        })
    }

    /// Move the backing file into `quarantine_dir` instead of unlinking it.
    ///
    /// Refuses while any stream is open (recoverable conflict). Returns the
    /// number of bytes moved.
    pub fn quarantine_into(&self, quarantine_dir: &Path) -> Result<u64> {
        let _guard = self.write_guard()?;
        quarantine_file(&self.path, quarantine_dir)
    }

    fn open_backing(&self) -> Result<File> {
        File::open(&self.path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                Error::missing_data(self.path.clone())
            } else {
                e.into()
            }
        })
    }

    fn read_guard(&self) -> Result<ReadGuard> {
        self.gate
            .acquire_read()
            .map_err(|detail| Error::stream_conflict(self.id, detail))?;
        Ok(ReadGuard {
            gate: Arc::clone(&self.gate),
        })
    }

    fn write_guard(&self) -> Result<WriteGuard> {
        self.gate
            .acquire_write()
            .map_err(|detail| Error::stream_conflict(self.id, detail))?;
        Ok(WriteGuard {
            gate: Arc::clone(&self.gate),
        })
    }
}

/// Move a file into `quarantine_dir`, disambiguating name collisions with a
/// numeric prefix. Returns the number of bytes moved.
///
/// Shared by [`Resource::quarantine_into`] and the orphan-file sweep, which
/// quarantines files backed by no registered resource.
pub fn quarantine_file(from: &Path, quarantine_dir: &Path) -> Result<u64> {
    let meta = fs::metadata(from).map_err(|_| Error::missing_data(from.to_path_buf()))?;
    fs::create_dir_all(quarantine_dir)?;

    let file_name = from
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| Error::Validation(format!("not a file path: {}", from.display())))?;
    let mut dest = quarantine_dir.join(&file_name);
    let mut suffix = 0u32;
    while dest.exists() {
        suffix += 1;
        dest = quarantine_dir.join(format!("{suffix}-{file_name}"));
    }
    move_file(from, &dest)?;
    tracing::debug!(from = %from.display(), to = %dest.display(), "moved file to quarantine");
    Ok(meta.len())
}

/// Rename, falling back to copy-and-remove when the quarantine directory is
/// on another filesystem.
fn move_file(from: &Path, to: &Path) -> Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(_) => {
            fs::copy(from, to)?;
            fs::remove_file(from)?;
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Streams
// ---------------------------------------------------------------------------

/// Bounded reader over one payload byte range.
#[derive(Debug)]
pub struct ResourceReader {
    file: File,
    remaining: u64,
    _guard: ReadGuard,
}

impl ResourceReader {
    /// Bytes left in the range.
    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.remaining
    }
}

impl Read for ResourceReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 {
            return Ok(0);
        }
        let want = buf.len().min(self.remaining.min(usize::MAX as u64) as usize);
        let n = self.file.read(&mut buf[..want])?;
        self.remaining -= n as u64;
        Ok(n)
    }
}

/// The single writer for one resource.
///
/// Dropping without [`finalize`](Self::finalize) closes the file and releases
/// the gate, leaving the provisional (zero-length) header in place; the
/// half-written file is unreferenced and picked up by a later reclamation
/// pass.
#[derive(Debug)]
pub struct ResourceWriter {
    file: File,
    format: PcmFormat,
    bytes_written: u64,
    info: Arc<Mutex<Option<WavInfo>>>,
    _guard: WriteGuard,
}

impl ResourceWriter {
    /// Payload bytes written so far.
    #[must_use]
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// The PCM format this output was opened with.
    #[must_use]
    pub fn format(&self) -> PcmFormat {
        self.format
    }

    /// Patch the container header with the exact payload length and close.
    pub fn finalize(mut self) -> Result<WavInfo> {
        self.file.flush()?;
        wav::patch_wav_lengths(&mut self.file, self.bytes_written)?;
        let info = WavInfo {
            format: self.format,
            data_offset: WAV_HEADER_LEN,
            data_len: self.bytes_written,
        };
        *self.info.lock() = Some(info);
        Ok(info)
    }
}

impl Write for ResourceWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.file.write(buf)?;
        self.bytes_written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}
