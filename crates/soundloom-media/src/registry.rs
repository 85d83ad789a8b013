//! Registries owning media objects and resources, and the project bundle the
//! cleaner operates on.
//!
//! Iteration order is stable (ID order) everywhere: the repacker's output
//! layout and the reclaimer's sweep both depend on it.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use soundloom_core::{Error, IdAllocator, MediaId, ResourceId, Result};

use crate::media::{AudioMedia, AuxiliaryAsset, Clip, FileMedia, Media};
use crate::resource::Resource;

// ---------------------------------------------------------------------------
// ResourceRegistry
// ---------------------------------------------------------------------------

/// Owns every resource and the data directory they live in.
#[derive(Debug)]
pub struct ResourceRegistry {
    data_dir: PathBuf,
    resources: BTreeMap<ResourceId, Resource>,
    ids: IdAllocator<ResourceId>,
}

impl ResourceRegistry {
    /// Create a registry rooted at `data_dir`, creating the directory if
    /// needed.
    pub fn new(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)?;
        Ok(Self {
            data_dir,
            resources: BTreeMap::new(),
            ids: IdAllocator::new(),
        })
    }

    /// The directory backing files live in.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Register an existing file (imports, re-opened documents).
    pub fn register_file(&mut self, file_name: impl Into<String>) -> ResourceId {
        let file_name = file_name.into();
        let id = self.ids.allocate();
        let path = self.data_dir.join(&file_name);
        self.resources.insert(id, Resource::new(id, file_name, path));
        id
    }

    /// Allocate a brand-new audio resource. The file name is derived from the
    /// allocated ID, so it can never collide with anything this registry has
    /// handed out.
    pub fn create_audio_resource(&mut self) -> ResourceId {
        let id = self.ids.allocate();
        let file_name = format!("aud{:06}.wav", id.raw());
        let path = self.data_dir.join(&file_name);
        tracing::debug!(resource = %id, file = %file_name, "allocated audio resource");
        self.resources.insert(id, Resource::new(id, file_name, path));
        id
    }

    /// Look up a resource.
    #[must_use]
    pub fn get(&self, id: ResourceId) -> Option<&Resource> {
        self.resources.get(&id)
    }

    /// Look up a resource, failing with [`Error::NotFound`].
    pub fn require(&self, id: ResourceId) -> Result<&Resource> {
        self.get(id).ok_or_else(|| Error::not_found("resource", id))
    }

    /// Remove a resource from the registry, returning its handle.
    pub fn deregister(&mut self, id: ResourceId) -> Option<Resource> {
        self.resources.remove(&id)
    }

    /// All registered IDs in ascending order.
    #[must_use]
    pub fn ids(&self) -> Vec<ResourceId> {
        self.resources.keys().copied().collect()
    }

    /// Registered file names, for the orphan sweep.
    #[must_use]
    pub fn file_names(&self) -> HashSet<String> {
        self.resources
            .values()
            .map(|r| r.file_name().to_owned())
            .collect()
    }

    /// Iterate resources in ID order.
    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    /// Number of registered resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

// ---------------------------------------------------------------------------
// MediaRegistry
// ---------------------------------------------------------------------------

/// Owns every media object.
#[derive(Debug, Default)]
pub struct MediaRegistry {
    media: BTreeMap<MediaId, Media>,
    ids: IdAllocator<MediaId>,
}

impl MediaRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new audio media with the given clips.
    pub fn insert_audio(&mut self, clips: Vec<Clip>) -> MediaId {
        let id = self.ids.allocate();
        self.media.insert(id, Media::Audio(AudioMedia::new(id, clips)));
        id
    }

    /// Register a new file-backed media over one resource.
    pub fn insert_file(&mut self, resource: ResourceId) -> MediaId {
        let id = self.ids.allocate();
        self.media.insert(id, Media::File(FileMedia::new(id, resource)));
        id
    }

    /// Look up a media object.
    #[must_use]
    pub fn get(&self, id: MediaId) -> Option<&Media> {
        self.media.get(&id)
    }

    /// Borrow an audio media mutably, failing with [`Error::NotFound`] if the
    /// ID is absent or names a non-audio media.
    pub fn audio_mut(&mut self, id: MediaId) -> Result<&mut AudioMedia> {
        self.media
            .get_mut(&id)
            .and_then(Media::as_audio_mut)
            .ok_or_else(|| Error::not_found("audio media", id))
    }

    /// Remove a media object, detaching its resource references.
    pub fn remove(&mut self, id: MediaId) -> Option<Media> {
        self.media.remove(&id)
    }

    /// All registered IDs in ascending order.
    #[must_use]
    pub fn ids(&self) -> Vec<MediaId> {
        self.media.keys().copied().collect()
    }

    /// Iterate media in ID order.
    pub fn iter(&self) -> impl Iterator<Item = &Media> {
        self.media.values()
    }

    /// Number of registered media objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.media.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.media.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Project
// ---------------------------------------------------------------------------

/// The mutable state one compaction run operates on: both registries plus the
/// auxiliary assets that pin resources from outside the media model.
#[derive(Debug)]
pub struct Project {
    /// All media objects.
    pub media: MediaRegistry,
    /// All resources and the data directory.
    pub resources: ResourceRegistry,
    /// Assets pinning resources from outside the media model.
    pub assets: Vec<AuxiliaryAsset>,
}

impl Project {
    /// Create an empty project rooted at `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            media: MediaRegistry::new(),
            resources: ResourceRegistry::new(data_dir)?,
            assets: Vec::new(),
        })
    }

    /// Every resource referenced by any media object or auxiliary asset.
    #[must_use]
    pub fn referenced_resources(&self) -> BTreeSet<ResourceId> {
        let mut set: BTreeSet<ResourceId> = self
            .media
            .iter()
            .flat_map(Media::resource_ids)
            .collect();
        set.extend(self.assets.iter().map(|a| a.resource));
        set
    }
}

// ---------------------------------------------------------------------------
// UsedSet
// ---------------------------------------------------------------------------

/// Externally supplied reachability result: the set of media referenced by
/// the live document tree or by commands in undo/redo/transaction history.
///
/// Read-only for the duration of one compaction pass; the cleaner never
/// recomputes reachability itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsedSet {
    set: HashSet<MediaId>,
}

impl UsedSet {
    /// Build from the two reachability sources: the document tree walk and
    /// the pending-history scan.
    pub fn from_parts(
        tree: impl IntoIterator<Item = MediaId>,
        history: impl IntoIterator<Item = MediaId>,
    ) -> Self {
        let mut set: HashSet<MediaId> = tree.into_iter().collect();
        set.extend(history);
        Self { set }
    }

    /// Whether `id` is retained.
    #[must_use]
    pub fn contains(&self, id: MediaId) -> bool {
        self.set.contains(&id)
    }

    /// Number of retained media.
    #[must_use]
    pub fn len(&self) -> usize {
        self.set.len()
    }

    /// Whether nothing is retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}
