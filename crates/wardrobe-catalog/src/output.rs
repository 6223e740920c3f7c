//! The catalog on disk: `catalog.json` plus `contents/<cid>` blobs

use crate::report::{AssetErrorReport, AssetFailure};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use wardrobe_asset::{BlobSet, ContentStore};
use wardrobe_core::{ContentId, Result, WardrobeError};
use wardrobe_schema::WearableEntity;

pub const CATALOG_FILE: &str = "catalog.json";
pub const CONTENTS_DIR: &str = "contents";
pub const VALIDATION_ERRORS_FILE: &str = "validation-errors.json";

/// Entities of a build with the bytes of every file they reference
#[derive(Debug, Clone, Default)]
pub struct CatalogManifest {
    /// Sorted by id
    pub entities: Vec<WearableEntity>,
    pub blobs: BlobSet,
}

/// What writing a catalog produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSummary {
    pub catalog: PathBuf,
    pub blobs_total: usize,
    /// Blobs that were not already on disk
    pub blobs_written: usize,
}

impl CatalogManifest {
    pub fn new(mut entities: Vec<WearableEntity>, blobs: BlobSet) -> Self {
        entities.sort_by(|a, b| a.id.cmp(&b.id));
        Self { entities, blobs }
    }

    /// Every id referenced by an entity, sorted and unique
    pub fn referenced_ids(&self) -> Vec<ContentId> {
        let mut ids: Vec<ContentId> = self
            .entities
            .iter()
            .flat_map(WearableEntity::referenced_ids)
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }

    pub fn entity(&self, id: &str) -> Option<&WearableEntity> {
        self.entities.iter().find(|e| e.id == id)
    }

    /// Write the catalog into `output_dir`. Existing blobs are left alone.
    pub fn write(&self, output_dir: &Path) -> Result<OutputSummary> {
        fs::create_dir_all(output_dir).map_err(|e| {
            WardrobeError::Config(format!(
                "cannot create output directory {}: {}",
                output_dir.display(),
                e
            ))
        })?;

        let store = ContentStore::new(output_dir.join(CONTENTS_DIR));
        let blobs_written = self.blobs.write_to(&store)?;

        let catalog = output_dir.join(CATALOG_FILE);
        let json = serde_json::to_string_pretty(&self.entities)?;
        fs::write(&catalog, json)?;

        info!(
            entities = self.entities.len(),
            blobs = self.blobs.len(),
            written = blobs_written,
            path = %catalog.display(),
            "wrote catalog"
        );

        Ok(OutputSummary {
            catalog,
            blobs_total: self.blobs.len(),
            blobs_written,
        })
    }

    /// Read a catalog written by [`CatalogManifest::write`], loading every
    /// referenced blob
    pub fn read(output_dir: &Path) -> Result<Self> {
        let catalog = output_dir.join(CATALOG_FILE);
        if !catalog.is_file() {
            return Err(WardrobeError::MissingResource(catalog.display().to_string()));
        }
        let entities: Vec<WearableEntity> = serde_json::from_str(&fs::read_to_string(&catalog)?)?;

        let store = ContentStore::new(output_dir.join(CONTENTS_DIR));
        let manifest = CatalogManifest::new(entities, BlobSet::new());
        for id in manifest.referenced_ids() {
            let bytes = store.read(&id)?;
            manifest.blobs.insert_with_id(id, &bytes);
        }
        Ok(manifest)
    }
}

/// Write `validation-errors.json` listing every failure
pub fn write_validation_errors(failures: &[AssetFailure], output_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)?;
    let report: Vec<AssetErrorReport> = failures.iter().map(AssetErrorReport::from).collect();
    let path = output_dir.join(VALIDATION_ERRORS_FILE);
    fs::write(&path, serde_json::to_string_pretty(&report)?)?;
    Ok(path)
}
