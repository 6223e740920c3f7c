//! Build one asset folder into an entity and its blobs

use crate::config::{BuildConfig, FolderIdScope};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;
use wardrobe_asset::{load_asset, Asset, BlobSet, MANIFEST_FILE, THUMBNAIL_FILE};
use wardrobe_core::{identify, identify_named_set, ContentId, Result, WardrobeError};
use wardrobe_import::{split_asset_models, ExtractedResource, TextureNaming};
use wardrobe_schema::{
    EntityValidator, MetadataBuilder, MetadataInputs, WearableEntity, WearableSchemaValidator,
};

/// Content key the preview image is deployed under
const DEPLOYED_IMAGE_FILE: &str = "image.png";

/// The result of building one asset
#[derive(Debug, Clone)]
pub struct BuiltAsset {
    pub entity: WearableEntity,
    /// Bytes of every file the entity references
    pub blobs: Vec<(ContentId, Vec<u8>)>,
}

impl BuiltAsset {
    /// Add this asset's blobs to a shared set. Returns how many were new.
    pub fn publish(&self, blobs: &BlobSet) -> usize {
        self.blobs
            .iter()
            .filter(|(id, bytes)| blobs.insert_with_id(*id, bytes))
            .count()
    }
}

/// Runs the per-asset pipeline: load, split, address, describe, validate
pub struct AssetBuilder {
    metadata: MetadataBuilder,
    naming: TextureNaming,
    scope: FolderIdScope,
    timestamp: i64,
}

impl AssetBuilder {
    pub fn new(
        metadata: MetadataBuilder,
        naming: TextureNaming,
        scope: FolderIdScope,
        timestamp: i64,
    ) -> Self {
        Self {
            metadata,
            naming,
            scope,
            timestamp,
        }
    }

    /// Builder wired with the default resolver and schema for a configuration
    pub fn from_config(config: &BuildConfig) -> Self {
        Self::with_validator(config, Arc::new(WearableSchemaValidator))
    }

    pub fn with_validator(config: &BuildConfig, validator: Arc<dyn EntityValidator>) -> Self {
        let metadata = MetadataBuilder::new(
            Arc::new(config.resolver()),
            validator,
            config.metadata_settings(),
        );
        Self::new(
            metadata,
            config.texture_naming,
            config.folder_id_scope,
            config.timestamp_millis(),
        )
    }

    pub fn metadata(&self) -> &MetadataBuilder {
        &self.metadata
    }

    /// Build the asset in `folder`.
    ///
    /// Requires `thumbnail.png`; `<name>.png` is picked up as the preview
    /// image when present.
    pub fn build(&self, folder: &Path) -> Result<BuiltAsset> {
        let asset = load_asset(folder)?;
        let image_name = format!("{}.png", asset.name());
        // Names the entity or folder already uses for other files
        let reserved = [MANIFEST_FILE, THUMBNAIL_FILE, image_name.as_str(), DEPLOYED_IMAGE_FILE];
        let files = split_asset_models(&asset.models, self.naming, &reserved)?;

        let thumbnail_path = folder.join(THUMBNAIL_FILE);
        if !thumbnail_path.is_file() {
            return Err(WardrobeError::MissingResource(
                thumbnail_path.display().to_string(),
            ));
        }
        let thumbnail = std::fs::read(&thumbnail_path)?;

        let image_path = folder.join(&image_name);
        let image = if image_path.is_file() {
            Some(std::fs::read(&image_path)?)
        } else {
            None
        };

        let addressed: Vec<(String, ContentId)> = files
            .iter()
            .map(|f| (f.file_name.clone(), identify(&f.buffer)))
            .collect();
        let thumbnail_id = identify(&thumbnail);
        let image_id = image.as_deref().map(identify);
        let content_root = self.folder_id(&asset, &files, &thumbnail, image.as_deref(), &image_name)?;

        debug!(
            asset = %asset.label(),
            files = files.len(),
            root = %content_root,
            "addressed asset files"
        );

        let entity = self.metadata.build(MetadataInputs {
            asset: &asset,
            files: &addressed,
            thumbnail: thumbnail_id,
            image: image_id,
            content_root,
            timestamp: self.timestamp,
        })?;

        let mut blobs: Vec<(ContentId, Vec<u8>)> = addressed
            .iter()
            .map(|(_, id)| *id)
            .zip(files.into_iter().map(|f| f.buffer))
            .collect();
        blobs.push((thumbnail_id, thumbnail));
        if let (Some(id), Some(bytes)) = (image_id, image) {
            blobs.push((id, bytes));
        }

        Ok(BuiltAsset { entity, blobs })
    }

    fn folder_id(
        &self,
        asset: &Asset,
        files: &[ExtractedResource],
        thumbnail: &[u8],
        image: Option<&[u8]>,
        image_name: &str,
    ) -> Result<ContentId> {
        let manifest = match self.scope {
            FolderIdScope::AllFiles => Some(std::fs::read(asset.folder.join(MANIFEST_FILE))?),
            FolderIdScope::Contents => None,
        };

        let mut entries: Vec<(&str, &[u8])> = files
            .iter()
            .map(|f| (f.file_name.as_str(), f.buffer.as_slice()))
            .collect();
        if let Some(manifest) = &manifest {
            entries.push((MANIFEST_FILE, manifest.as_slice()));
            entries.push((THUMBNAIL_FILE, thumbnail));
            if let Some(image) = image {
                entries.push((image_name, image));
            }
        }

        identify_named_set(&entries)
    }
}
