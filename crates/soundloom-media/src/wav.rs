//! RIFF/WAVE container parsing and header writing.
//!
//! Reading walks the chunk list and tolerates unknown chunks (`LIST`, `cue `,
//! bext metadata and friends), requiring only `fmt ` and `data`. Writing
//! always emits the canonical 44-byte PCM header; a provisional header is
//! written when an output stream opens and patched with the exact payload
//! length on finalization.

use std::io::{self, Read, Seek, SeekFrom, Write};
use std::time::Duration;

use soundloom_core::{Error, Result};

use crate::pcm::PcmFormat;

/// Length of the canonical PCM header this crate writes.
pub const WAV_HEADER_LEN: u64 = 44;

/// WAVE codec tag for uncompressed PCM.
const FORMAT_PCM: u16 = 1;

/// Parsed container metadata for one WAVE file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavInfo {
    /// PCM format from the `fmt ` chunk.
    pub format: PcmFormat,
    /// Byte offset of the first payload byte (start of `data` content).
    pub data_offset: u64,
    /// Payload length in bytes, as declared by the `data` chunk header.
    pub data_len: u64,
}

impl WavInfo {
    /// Total payload duration.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.format.bytes_to_duration(self.data_len)
    }
}

/// Parse the container header of a WAVE file.
///
/// The reader may be positioned anywhere; parsing starts from the beginning.
/// Chunk sizes are trusted as declared.
pub fn read_wav_info<R: Read + Seek>(reader: &mut R) -> Result<WavInfo> {
    reader.seek(SeekFrom::Start(0))?;

    let mut riff = [0u8; 12];
    reader
        .read_exact(&mut riff)
        .map_err(|_| Error::invalid_wave("file shorter than RIFF header"))?;
    if &riff[0..4] != b"RIFF" {
        return Err(Error::invalid_wave("missing RIFF signature"));
    }
    if &riff[8..12] != b"WAVE" {
        return Err(Error::invalid_wave("missing WAVE form type"));
    }

    let mut format: Option<PcmFormat> = None;
    let mut data: Option<(u64, u64)> = None;

    while format.is_none() || data.is_none() {
        let mut header = [0u8; 8];
        match reader.read_exact(&mut header) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e.into()),
        }
        let chunk_id = [header[0], header[1], header[2], header[3]];
        let chunk_len = u64::from(u32::from_le_bytes([
            header[4], header[5], header[6], header[7],
        ]));

        match &chunk_id {
            b"fmt " => {
                if chunk_len < 16 {
                    return Err(Error::invalid_wave("fmt chunk too short"));
                }
                let mut fmt = [0u8; 16];
                reader.read_exact(&mut fmt)?;
                let audio_format = u16::from_le_bytes([fmt[0], fmt[1]]);
                if audio_format != FORMAT_PCM {
                    return Err(Error::invalid_wave(format!(
                        "unsupported codec tag {audio_format}, expected PCM"
                    )));
                }
                format = Some(PcmFormat {
                    channels: u16::from_le_bytes([fmt[2], fmt[3]]),
                    sample_rate: u32::from_le_bytes([fmt[4], fmt[5], fmt[6], fmt[7]]),
                    bits_per_sample: u16::from_le_bytes([fmt[14], fmt[15]]),
                });
                // Skip any fmt extension bytes.
                skip_padded(reader, chunk_len - 16, chunk_len)?;
            }
            b"data" => {
                let offset = reader.stream_position()?;
                data = Some((offset, chunk_len));
                skip_padded(reader, chunk_len, chunk_len)?;
            }
            _ => {
                skip_padded(reader, chunk_len, chunk_len)?;
            }
        }
    }

    let format = format.ok_or_else(|| Error::invalid_wave("no fmt chunk"))?;
    let (data_offset, data_len) = data.ok_or_else(|| Error::invalid_wave("no data chunk"))?;

    if format.block_align() == 0 || format.byte_rate() == 0 {
        return Err(Error::invalid_wave("degenerate fmt parameters"));
    }

    Ok(WavInfo {
        format,
        data_offset,
        data_len,
    })
}

/// Skip `remaining` content bytes plus the RIFF pad byte for odd-sized chunks.
fn skip_padded<R: Read + Seek>(reader: &mut R, remaining: u64, chunk_len: u64) -> Result<()> {
    let pad = chunk_len % 2;
    reader.seek(SeekFrom::Current((remaining + pad) as i64))?;
    Ok(())
}

/// Write the canonical 44-byte PCM header declaring `data_len` payload bytes.
pub fn write_wav_header<W: Write>(writer: &mut W, format: &PcmFormat, data_len: u64) -> Result<()> {
    if data_len > u64::from(u32::MAX) - 36 {
        return Err(Error::invalid_wave(format!(
            "payload of {data_len} bytes exceeds RIFF limits"
        )));
    }
    let riff_size = 36 + data_len as u32;

    writer.write_all(b"RIFF")?;
    writer.write_all(&riff_size.to_le_bytes())?;
    writer.write_all(b"WAVE")?;

    writer.write_all(b"fmt ")?;
    writer.write_all(&16u32.to_le_bytes())?;
    writer.write_all(&FORMAT_PCM.to_le_bytes())?;
    writer.write_all(&format.channels.to_le_bytes())?;
    writer.write_all(&format.sample_rate.to_le_bytes())?;
    writer.write_all(&format.byte_rate().to_le_bytes())?;
    writer.write_all(&format.block_align().to_le_bytes())?;
    writer.write_all(&format.bits_per_sample.to_le_bytes())?;

    writer.write_all(b"data")?;
    writer.write_all(&(data_len as u32).to_le_bytes())?;
    Ok(())
}

/// Patch the RIFF and `data` length fields of a canonical header in place.
///
/// Only valid for files whose header was produced by [`write_wav_header`].
pub fn patch_wav_lengths<W: Write + Seek>(writer: &mut W, data_len: u64) -> Result<()> {
    if data_len > u64::from(u32::MAX) - 36 {
        return Err(Error::invalid_wave(format!(
            "payload of {data_len} bytes exceeds RIFF limits"
        )));
    }
    writer.seek(SeekFrom::Start(4))?;
    writer.write_all(&(36 + data_len as u32).to_le_bytes())?;
    writer.seek(SeekFrom::Start(40))?;
    writer.write_all(&(data_len as u32).to_le_bytes())?;
    Ok(())
}
