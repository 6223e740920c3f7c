//! Wearable metadata assembly
//!
//! Turns a loaded asset plus the content ids of its files into a validated
//! [`WearableEntity`]. Category default tables fill `replaces` and `hides`
//! only when the manifest leaves them out.

use crate::defaults::{body_shape_for, default_hides, default_replaces};
use crate::entity::{ContentEntry, I18n, ResolvedRepresentation, WearableData, WearableEntity};
use crate::urn::UrnResolver;
use crate::validation::EntityValidator;
use std::sync::Arc;
use wardrobe_asset::Asset;
use wardrobe_core::{ContentId, Result};

pub const BASE_WEARABLE_TAG: &str = "base-wearable";
pub const EXCLUSIVE_TAG: &str = "exclusive";

/// Settings that shape every entity of a run
#[derive(Debug, Clone)]
pub struct MetadataSettings {
    /// Collection used in the legacy id when an asset has none
    pub default_collection: String,
    /// Collections whose assets are tagged `base-wearable`
    pub base_collections: Vec<String>,
    /// Prefix for `contents[].url`; no urls when unset
    pub content_base_url: Option<String>,
}

impl Default for MetadataSettings {
    fn default() -> Self {
        Self {
            default_collection: "base-exclusive".to_string(),
            base_collections: vec!["base-avatars".to_string()],
            content_base_url: None,
        }
    }
}

/// Everything known about one asset once its files are addressed
#[derive(Debug, Clone)]
pub struct MetadataInputs<'a> {
    pub asset: &'a Asset,
    /// Extracted files (models, then their textures) with their ids
    pub files: &'a [(String, ContentId)],
    pub thumbnail: ContentId,
    pub image: Option<ContentId>,
    pub content_root: ContentId,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
}

pub struct MetadataBuilder {
    resolver: Arc<dyn UrnResolver>,
    validator: Arc<dyn EntityValidator>,
    settings: MetadataSettings,
}

impl MetadataBuilder {
    pub fn new(
        resolver: Arc<dyn UrnResolver>,
        validator: Arc<dyn EntityValidator>,
        settings: MetadataSettings,
    ) -> Self {
        Self {
            resolver,
            validator,
            settings,
        }
    }

    pub fn settings(&self) -> &MetadataSettings {
        &self.settings
    }

    pub fn resolver(&self) -> &dyn UrnResolver {
        self.resolver.as_ref()
    }

    /// `dcl://<collection>/<name>` for an asset
    pub fn legacy_id(&self, asset: &Asset) -> String {
        let collection = if asset.collection.is_empty() {
            self.settings.default_collection.as_str()
        } else {
            asset.collection.as_str()
        };
        format!("dcl://{}/{}", collection, asset.name())
    }

    /// Whether the asset's source folder lies under a base collection
    pub fn is_base(&self, asset: &Asset) -> bool {
        asset.folder.components().any(|c| {
            let part = c.as_os_str().to_string_lossy();
            self.settings.base_collections.iter().any(|b| *b == part)
        })
    }

    /// Build and validate the entity. Validation failures carry every issue.
    pub fn build(&self, inputs: MetadataInputs<'_>) -> Result<WearableEntity> {
        let asset = inputs.asset;
        let manifest = &asset.manifest;
        let legacy_id = self.legacy_id(asset);
        let resolved = self.resolver.resolve(&legacy_id)?;

        let mut tags = manifest.tags.clone();
        tags.push(if self.is_base(asset) {
            BASE_WEARABLE_TAG.to_string()
        } else {
            EXCLUSIVE_TAG.to_string()
        });

        let contents: Vec<ContentEntry> = inputs
            .files
            .iter()
            .map(|(file, hash)| ContentEntry {
                file: file.clone(),
                hash: *hash,
                url: self.content_url(hash),
            })
            .collect();

        let representations = manifest
            .representations
            .iter()
            .map(|rep| ResolvedRepresentation {
                body_shapes: vec![body_shape_for(&rep.body_shape_hint).to_string()],
                main_file: rep.model.clone(),
                override_replaces: rep.override_replaces.clone().unwrap_or_default(),
                override_hides: rep.override_hides.clone().unwrap_or_default(),
                contents: contents.clone(),
            })
            .collect();

        let entity = WearableEntity {
            id: resolved.urn,
            legacy_id,
            name: manifest.name.clone(),
            description: manifest.description.clone().unwrap_or_default(),
            collection_address: resolved.collection_address,
            rarity: manifest.rarity.clone(),
            thumbnail: inputs.thumbnail,
            image: inputs.image,
            content_root: inputs.content_root,
            data: WearableData {
                replaces: manifest
                    .replaces
                    .clone()
                    .unwrap_or_else(|| default_replaces(&asset.category)),
                hides: manifest
                    .hides
                    .clone()
                    .unwrap_or_else(|| default_hides(&asset.category)),
                removes_default_hiding: manifest.removes_default_hiding.clone().unwrap_or_default(),
                tags,
                category: asset.category.clone(),
                representations,
            },
            i18n: manifest
                .i18n
                .iter()
                .map(|(code, text)| I18n {
                    code: code.to_string(),
                    text: text.to_string(),
                })
                .collect(),
            created_at: inputs.timestamp,
            updated_at: inputs.timestamp,
        };

        self.validator.check(&entity)?;
        Ok(entity)
    }

    fn content_url(&self, hash: &ContentId) -> Option<String> {
        self.settings
            .content_base_url
            .as_deref()
            .map(|base| format!("{}/contents/{}", base.trim_end_matches('/'), hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::{BODY_SHAPE_FEMALE, BODY_SHAPE_MALE};
    use crate::urn::DecentralandResolver;
    use crate::validation::WearableSchemaValidator;
    use std::path::PathBuf;
    use wardrobe_asset::AssetManifest;
    use wardrobe_core::{identify, WardrobeError};

    fn asset(collection: &str, category: &str, manifest: &str) -> Asset {
        let manifest = AssetManifest::from_json(manifest, "asset.json").unwrap();
        Asset {
            folder: PathBuf::from("/assets")
                .join(collection)
                .join(category)
                .join(&manifest.name),
            collection: collection.to_string(),
            category: category.to_string(),
            models: vec![],
            manifest,
        }
    }

    fn builder(base_url: Option<&str>) -> MetadataBuilder {
        MetadataBuilder::new(
            Arc::new(DecentralandResolver::default()),
            Arc::new(WearableSchemaValidator),
            MetadataSettings {
                content_base_url: base_url.map(String::from),
                ..MetadataSettings::default()
            },
        )
    }

    fn build(asset: &Asset, base_url: Option<&str>) -> Result<WearableEntity> {
        let files = vec![
            ("cap.glb".to_string(), identify(b"glb")),
            ("cap.png".to_string(), identify(b"texture")),
        ];
        builder(base_url).build(MetadataInputs {
            asset,
            files: &files,
            thumbnail: identify(b"thumb"),
            image: None,
            content_root: identify(b"root"),
            timestamp: 1_600_000_000_000,
        })
    }

    const HAT: &str = r#"{
        "name": "cap", "tags": ["cap"], "i18n": { "en": "Cap", "es": "Gorra" },
        "main": [{ "type": "Female", "model": "cap.glb" }, { "type": "Male", "model": "cap.glb", "overrideHides": ["hair"] }]
    }"#;

    #[test]
    fn test_absent_hides_use_category_default() {
        let entity = build(&asset("base-avatars", "hat", HAT), None).unwrap();
        assert_eq!(entity.data.hides, vec!["hair"]);
        assert_eq!(entity.data.replaces, vec!["mask", "tiara", "helmet", "top_head"]);
    }

    #[test]
    fn test_explicit_empty_hides_kept() {
        let manifest = HAT.replacen("\"tags\"", "\"hides\": [], \"tags\"", 1);
        let entity = build(&asset("base-avatars", "hat", &manifest), None).unwrap();
        assert!(entity.data.hides.is_empty());
    }

    #[test]
    fn test_ids_and_tags() {
        let entity = build(&asset("base-avatars", "hat", HAT), None).unwrap();
        assert_eq!(entity.id, "urn:decentraland:off-chain:base-avatars:cap");
        assert_eq!(entity.legacy_id, "dcl://base-avatars/cap");
        assert_eq!(entity.data.tags, vec!["cap", "base-wearable"]);

        let entity = build(&asset("xmas_2019", "hat", HAT), None).unwrap();
        assert_eq!(entity.id, "urn:decentraland:ethereum:collections-v1:xmas_2019:cap");
        assert_eq!(entity.data.tags, vec!["cap", "exclusive"]);
    }

    #[test]
    fn test_representations() {
        let entity = build(&asset("base-avatars", "hat", HAT), None).unwrap();
        let reps = &entity.data.representations;
        assert_eq!(reps.len(), 2);
        assert_eq!(reps[0].body_shapes, vec![BODY_SHAPE_FEMALE]);
        assert_eq!(reps[1].body_shapes, vec![BODY_SHAPE_MALE]);
        assert_eq!(reps[1].override_hides, vec!["hair"]);
        assert!(reps[0].override_hides.is_empty());
        assert_eq!(reps[0].contents.len(), 2);
        assert_eq!(reps[0].contents[1].hash, identify(b"texture"));
        assert!(reps[0].contents[0].url.is_none());
    }

    #[test]
    fn test_content_urls() {
        let entity = build(&asset("base-avatars", "hat", HAT), Some("https://cdn.example.org/")).unwrap();
        let glb = &entity.data.representations[0].contents[0];
        assert_eq!(
            glb.url.as_deref(),
            Some(format!("https://cdn.example.org/contents/{}", glb.hash).as_str())
        );
    }

    #[test]
    fn test_i18n_keeps_order_and_defaults() {
        let entity = build(&asset("base-avatars", "hat", HAT), None).unwrap();
        let codes: Vec<&str> = entity.i18n.iter().map(|i| i.code.as_str()).collect();
        assert_eq!(codes, vec!["en", "es"]);
        assert_eq!(entity.description, "");
        assert!(entity.data.removes_default_hiding.is_empty());
        assert_eq!(entity.created_at, 1_600_000_000_000);
    }

    #[test]
    fn test_invalid_category_fails_validation() {
        let err = build(&asset("base-avatars", "shoes", HAT), None).unwrap_err();
        match err {
            WardrobeError::Validation(issues) => {
                assert!(issues.iter().any(|i| i.path == "/data/category"))
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_unresolvable_id() {
        let err = build(&asset("bad collection", "hat", HAT), None).unwrap_err();
        assert!(matches!(err, WardrobeError::IdentifierResolution { .. }));
    }
}
