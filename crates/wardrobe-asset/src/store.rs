//! Content-addressed blob storage

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use wardrobe_core::{identify, ContentId, Result, WardrobeError};

/// The deduplicated blob set of one build.
///
/// Cheap to clone; clones share the same map. Safe to fill from concurrent
/// tasks: the first insert of an id wins and later inserts are no-ops.
#[derive(Debug, Clone, Default)]
pub struct BlobSet {
    blobs: Arc<DashMap<ContentId, Arc<[u8]>>>,
}

impl BlobSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert bytes under their own identifier. Returns the id and whether
    /// the blob was new.
    pub fn insert(&self, bytes: &[u8]) -> (ContentId, bool) {
        let id = identify(bytes);
        let inserted = self.insert_with_id(id, bytes);
        (id, inserted)
    }

    /// Insert bytes whose identifier is already known
    pub fn insert_with_id(&self, id: ContentId, bytes: &[u8]) -> bool {
        match self.blobs.entry(id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(Arc::from(bytes));
                true
            }
        }
    }

    /// A new set holding only `ids`, sharing the underlying bytes
    pub fn subset(&self, ids: &[ContentId]) -> BlobSet {
        let subset = BlobSet::new();
        for id in ids {
            if let Some(bytes) = self.get(id) {
                subset.blobs.insert(*id, bytes);
            }
        }
        subset
    }

    pub fn get(&self, id: &ContentId) -> Option<Arc<[u8]>> {
        self.blobs.get(id).map(|blob| Arc::clone(blob.value()))
    }

    pub fn contains(&self, id: &ContentId) -> bool {
        self.blobs.contains_key(id)
    }

    /// All ids, sorted
    pub fn ids(&self) -> Vec<ContentId> {
        let mut ids: Vec<ContentId> = self.blobs.iter().map(|e| *e.key()).collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    /// Write every blob into `store`. Returns how many files were new.
    pub fn write_to(&self, store: &ContentStore) -> Result<usize> {
        let mut written = 0;
        for id in self.ids() {
            if let Some(bytes) = self.get(&id) {
                if store.store_with_id(&id, &bytes)? {
                    written += 1;
                }
            }
        }
        Ok(written)
    }
}

/// Flat content-addressed file storage
///
/// Stores files at `<root>/<cid>` with no extension.
pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    /// Create a new content store at the given root directory
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store bytes and return their content id
    pub fn store(&self, bytes: &[u8]) -> Result<ContentId> {
        let id = identify(bytes);
        self.store_with_id(&id, bytes)?;
        Ok(id)
    }

    /// Store bytes under a known id. Returns false when the file already existed.
    pub fn store_with_id(&self, id: &ContentId, bytes: &[u8]) -> Result<bool> {
        let dest = self.path_for(id);
        if dest.exists() {
            return Ok(false); // Already stored (dedup)
        }
        fs::create_dir_all(&self.root)?;

        // Write then rename so a reader never sees a torn blob
        let tmp = self.root.join(format!(".{}.partial", id));
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &dest)?;
        Ok(true)
    }

    /// Get the storage path for an id, if stored
    pub fn get(&self, id: &ContentId) -> Option<PathBuf> {
        let path = self.path_for(id);
        path.is_file().then_some(path)
    }

    /// Check if an id exists in the store
    pub fn contains(&self, id: &ContentId) -> bool {
        self.get(id).is_some()
    }

    /// Read a stored blob
    pub fn read(&self, id: &ContentId) -> Result<Vec<u8>> {
        let path = self
            .get(id)
            .ok_or_else(|| WardrobeError::MissingResource(format!("blob {} not in store", id)))?;
        Ok(fs::read(path)?)
    }

    /// List all stored ids, sorted
    pub fn list(&self) -> Result<Vec<ContentId>> {
        let mut ids = Vec::new();

        if !self.root.exists() {
            return Ok(ids);
        }

        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Ok(id) = ContentId::parse(&entry.file_name().to_string_lossy()) {
                ids.push(id);
            }
        }

        ids.sort();
        Ok(ids)
    }

    fn path_for(&self, id: &ContentId) -> PathBuf {
        self.root.join(id.to_string())
    }
}
