//! Source tree scanning
//!
//! The asset root is laid out as `<collection>/<category>/<asset>/`. Entries
//! whose names start with `.` are skipped at every level, as are plain files
//! at the collection and category levels.

use crate::types::{Asset, AssetManifest};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use wardrobe_core::{Result, WardrobeError};

/// Name of the declarative manifest inside each asset folder
pub const MANIFEST_FILE: &str = "asset.json";

/// Name of the required preview thumbnail inside each asset folder
pub const THUMBNAIL_FILE: &str = "thumbnail.png";

/// A directory the scanner could not read
#[derive(Debug, Clone)]
pub struct ScanFailure {
    pub path: PathBuf,
    pub error: String,
}

/// Asset folders found under a root, grouped by collection
#[derive(Debug, Default)]
pub struct ScanResult {
    pub collections: BTreeMap<String, Vec<PathBuf>>,
    pub failures: Vec<ScanFailure>,
}

impl ScanResult {
    /// Every asset folder, collection by collection
    pub fn asset_folders(&self) -> Vec<PathBuf> {
        self.collections.values().flatten().cloned().collect()
    }

    /// Keep only the named collections
    pub fn retain_collections(&mut self, names: &[String]) {
        self.collections.retain(|name, _| names.contains(name));
    }

    pub fn len(&self) -> usize {
        self.collections.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Walk the asset root.
///
/// Failing to read the root itself is an error; a collection or category
/// directory that cannot be read is recorded and the walk continues.
pub fn scan<P: AsRef<Path>>(root: P) -> Result<ScanResult> {
    let root = root.as_ref();
    let mut result = ScanResult::default();

    for collection_dir in visible_dirs(root)? {
        let collection = dir_name(&collection_dir);
        let mut folders = Vec::new();

        let categories = match visible_dirs(&collection_dir) {
            Ok(dirs) => dirs,
            Err(e) => {
                warn!(collection = %collection, error = %e, "cannot read collection");
                result.failures.push(ScanFailure {
                    path: collection_dir,
                    error: e.to_string(),
                });
                continue;
            }
        };

        for category_dir in categories {
            match visible_dirs(&category_dir) {
                Ok(assets) => folders.extend(assets),
                Err(e) => {
                    warn!(collection = %collection, category = %dir_name(&category_dir), error = %e, "cannot read category");
                    result.failures.push(ScanFailure {
                        path: category_dir,
                        error: e.to_string(),
                    });
                }
            }
        }

        debug!(collection = %collection, assets = folders.len(), "scanned collection");
        result.collections.insert(collection, folders);
    }

    Ok(result)
}

/// Read and check an asset folder's `asset.json`
pub fn load_manifest<P: AsRef<Path>>(folder: P) -> Result<AssetManifest> {
    let path = folder.as_ref().join(MANIFEST_FILE);
    let origin = path.display().to_string();
    if !path.is_file() {
        return Err(WardrobeError::InvalidManifest {
            path: origin,
            reason: format!("{} not found", MANIFEST_FILE),
        });
    }
    let text = fs::read_to_string(&path)?;
    AssetManifest::from_json(&text, &origin)
}

/// `.glb` files directly inside a folder, sorted by name
pub fn list_glb_files<P: AsRef<Path>>(folder: P) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(folder.as_ref())? {
        let path = entry?.path();
        let is_glb = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("glb"));
        if is_glb && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Load an asset folder into an [`Asset`].
///
/// Collection and category come from the two enclosing directory names.
/// The directory category wins over a differing `category` in the manifest.
/// Every representation's model must exist in the folder.
pub fn load_asset<P: AsRef<Path>>(folder: P) -> Result<Asset> {
    let folder = folder.as_ref();
    let origin = folder.display().to_string();

    let category_dir = folder.parent().ok_or_else(|| WardrobeError::InvalidManifest {
        path: origin.clone(),
        reason: "asset folder has no category directory".to_string(),
    })?;
    let collection_dir = category_dir.parent().ok_or_else(|| WardrobeError::InvalidManifest {
        path: origin.clone(),
        reason: "asset folder has no collection directory".to_string(),
    })?;
    let category = dir_name(category_dir);
    let collection = dir_name(collection_dir);
    if category.is_empty() || collection.is_empty() {
        return Err(WardrobeError::InvalidManifest {
            path: origin,
            reason: "cannot derive collection and category from path".to_string(),
        });
    }

    let mut manifest = load_manifest(folder)?;
    if let Some(declared) = manifest.category.as_deref() {
        if declared != category {
            warn!(
                asset = %manifest.name,
                declared = %declared,
                directory = %category,
                "manifest category differs from directory; using directory"
            );
        }
    }
    manifest.category = Some(category.clone());

    for representation in &manifest.representations {
        if !folder.join(&representation.model).is_file() {
            return Err(WardrobeError::InvalidManifest {
                path: origin,
                reason: format!("model '{}' not found in asset folder", representation.model),
            });
        }
    }

    let models = list_glb_files(folder)?;
    Ok(Asset {
        manifest,
        collection,
        category,
        folder: folder.to_path_buf(),
        models,
    })
}

/// Split a `dcl://<collection>/<name>` id into its parts
pub fn parse_legacy_id(id: &str) -> Option<(&str, &str)> {
    let rest = id.strip_prefix("dcl://")?;
    let (collection, name) = rest.split_once('/')?;
    if collection.is_empty() || name.is_empty() || name.contains('/') {
        return None;
    }
    Some((collection, name))
}

/// Find the asset folders named by `dcl://<collection>/<name>` ids.
///
/// Ids that match no folder, or are malformed, are skipped with a warning.
pub fn find_assets<P: AsRef<Path>>(root: P, ids: &[String]) -> Result<Vec<PathBuf>> {
    let wanted: Vec<(&str, &str)> = ids
        .iter()
        .filter_map(|id| {
            let parsed = parse_legacy_id(id);
            if parsed.is_none() {
                warn!(id = %id, "ignoring malformed asset id");
            }
            parsed
        })
        .collect();

    let scanned = scan(root)?;
    let mut found = Vec::new();
    for (collection, folders) in &scanned.collections {
        if !wanted.iter().any(|(c, _)| *c == collection.as_str()) {
            continue;
        }
        for folder in folders {
            let name = match load_manifest(folder) {
                Ok(manifest) => manifest.name,
                Err(e) => {
                    warn!(folder = %folder.display(), error = %e, "skipping unreadable asset");
                    continue;
                }
            };
            if wanted
                .iter()
                .any(|(c, n)| *c == collection.as_str() && *n == name.as_str())
            {
                found.push(folder.clone());
            }
        }
    }
    Ok(found)
}

fn visible_dirs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        if entry.file_type()?.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
