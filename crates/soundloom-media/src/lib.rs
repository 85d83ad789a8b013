//! soundloom-media: the audio media data model.
//!
//! This crate provides the storage substrate the cleaner operates on:
//! RIFF/WAVE container parsing and header writing, resources with
//! reader/writer stream discipline, clips and media objects, and the
//! registries that own them.
//!
//! # Modules
//!
//! - [`pcm`] - PCM format parameters and the duration/byte conversion
//! - [`wav`] - RIFF/WAVE container reading and canonical header writing
//! - [`resource`] - byte-range handles over backing files, with stream gates
//! - [`media`] - clips, audio media, file media, auxiliary assets
//! - [`registry`] - the owning registries and the [`Project`] bundle

pub mod media;
pub mod pcm;
pub mod registry;
pub mod resource;
pub mod wav;

// Re-export commonly used items at the crate root.
pub use media::{AudioMedia, AuxiliaryAsset, Clip, FileMedia, Media, CLIP_TOLERANCE};
pub use pcm::PcmFormat;
pub use registry::{MediaRegistry, Project, ResourceRegistry, UsedSet};
pub use resource::{quarantine_file, Resource, ResourceReader, ResourceWriter};
pub use wav::{read_wav_info, write_wav_header, WavInfo, WAV_HEADER_LEN};
