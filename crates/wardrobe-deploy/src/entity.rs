//! Deployable entity documents

use serde::Serialize;
use tracing::debug;
use wardrobe_core::{identify, ContentId, Result, WardrobeError};
use wardrobe_schema::{I18n, UrnResolver, WearableEntity};

pub const ENTITY_VERSION: &str = "v3";
pub const ENTITY_TYPE: &str = "wearable";
pub const THUMBNAIL_KEY: &str = "thumbnail.png";
pub const IMAGE_KEY: &str = "image.png";

/// One file of a deployment, keyed by the name the metadata uses
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityContent {
    pub file: String,
    pub hash: ContentId,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeployRepresentation<'a> {
    body_shapes: &'a [String],
    main_file: &'a str,
    override_replaces: &'a [String],
    override_hides: &'a [String],
    contents: Vec<&'a str>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeployData<'a> {
    replaces: &'a [String],
    hides: &'a [String],
    removes_default_hiding: &'a [String],
    tags: &'a [String],
    category: &'a str,
    representations: Vec<DeployRepresentation<'a>>,
}

/// Wearable metadata as the content server expects it: files referenced by
/// name rather than by hash
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeployMetadata<'a> {
    id: &'a str,
    name: &'a str,
    description: &'a str,
    thumbnail: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    collection_address: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rarity: Option<&'a str>,
    data: DeployData<'a>,
    i18n: &'a [I18n],
    created_at: i64,
    updated_at: i64,
}

#[derive(Debug, Clone, Serialize)]
struct EntityDocument<'a> {
    version: &'static str,
    #[serde(rename = "type")]
    entity_type: &'static str,
    pointers: &'a [String],
    timestamp: i64,
    content: &'a [EntityContent],
    metadata: DeployMetadata<'a>,
}

/// Everything needed to push one entity
#[derive(Debug, Clone)]
pub struct PreparedDeployment {
    /// Identifier of the entity document
    pub entity_id: ContentId,
    pub pointers: Vec<String>,
    /// Serialized entity document
    pub document: Vec<u8>,
    pub content: Vec<EntityContent>,
}

impl PreparedDeployment {
    /// Unique content ids to upload, in first-use order
    pub fn blob_ids(&self) -> Vec<ContentId> {
        let mut ids: Vec<ContentId> = Vec::with_capacity(self.content.len());
        for entry in &self.content {
            if !ids.contains(&entry.hash) {
                ids.push(entry.hash);
            }
        }
        ids
    }
}

/// Build the deployable document for a catalog entity.
///
/// Pointers are the entity's URN plus, for collections with a known contract
/// address, the same URN addressed by contract.
pub fn prepare_deployment(
    entity: &WearableEntity,
    resolver: &dyn UrnResolver,
    timestamp: i64,
) -> Result<PreparedDeployment> {
    let pointers = resolver.resolve(&entity.legacy_id)?.pointers();
    let content = content_map(entity)?;

    let representations = entity
        .data
        .representations
        .iter()
        .map(|rep| DeployRepresentation {
            body_shapes: &rep.body_shapes,
            main_file: &rep.main_file,
            override_replaces: &rep.override_replaces,
            override_hides: &rep.override_hides,
            contents: rep.contents.iter().map(|c| c.file.as_str()).collect(),
        })
        .collect();

    let document = EntityDocument {
        version: ENTITY_VERSION,
        entity_type: ENTITY_TYPE,
        pointers: &pointers,
        timestamp,
        content: &content,
        metadata: DeployMetadata {
            id: &entity.id,
            name: &entity.name,
            description: &entity.description,
            thumbnail: THUMBNAIL_KEY,
            image: entity.image.map(|_| IMAGE_KEY),
            collection_address: entity.collection_address.as_deref(),
            rarity: entity.rarity.as_deref(),
            data: DeployData {
                replaces: &entity.data.replaces,
                hides: &entity.data.hides,
                removes_default_hiding: &entity.data.removes_default_hiding,
                tags: &entity.data.tags,
                category: &entity.data.category,
                representations,
            },
            i18n: &entity.i18n,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        },
    };
    let bytes = serde_json::to_vec(&document)?;
    let entity_id = identify(&bytes);

    debug!(id = %entity.id, entity = %entity_id, files = content.len(), "prepared deployment");
    Ok(PreparedDeployment {
        entity_id,
        pointers,
        document: bytes,
        content,
    })
}

fn content_map(entity: &WearableEntity) -> Result<Vec<EntityContent>> {
    let mut content = vec![EntityContent {
        file: THUMBNAIL_KEY.to_string(),
        hash: entity.thumbnail,
    }];
    if let Some(image) = entity.image {
        content.push(EntityContent {
            file: IMAGE_KEY.to_string(),
            hash: image,
        });
    }

    for representation in &entity.data.representations {
        for entry in &representation.contents {
            if entry.file == THUMBNAIL_KEY || entry.file == IMAGE_KEY {
                return Err(WardrobeError::Deploy(format!(
                    "{}: representation file '{}' clashes with a reserved name",
                    entity.id, entry.file
                )));
            }
            match content.iter().find(|c| c.file == entry.file) {
                Some(existing) if existing.hash != entry.hash => {
                    return Err(WardrobeError::Deploy(format!(
                        "{}: file '{}' has different contents across representations",
                        entity.id, entry.file
                    )));
                }
                Some(_) => {}
                None => content.push(EntityContent {
                    file: entry.file.clone(),
                    hash: entry.hash,
                }),
            }
        }
    }
    Ok(content)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use wardrobe_schema::defaults::BODY_SHAPE_MALE;
    use wardrobe_schema::{ContentEntry, DecentralandResolver, ResolvedRepresentation, WearableData};

    pub(crate) fn entity(collection: &str, name: &str, files: &[(&str, &[u8])]) -> WearableEntity {
        let resolver = DecentralandResolver::default();
        let legacy_id = format!("dcl://{}/{}", collection, name);
        let resolved = resolver.resolve(&legacy_id).unwrap();
        let contents: Vec<ContentEntry> = files
            .iter()
            .map(|(file, bytes)| ContentEntry {
                file: file.to_string(),
                hash: identify(bytes),
                url: None,
            })
            .collect();
        WearableEntity {
            id: resolved.urn,
            legacy_id,
            name: name.to_string(),
            description: String::new(),
            collection_address: None,
            rarity: None,
            thumbnail: identify(format!("thumb {}", name).as_bytes()),
            image: None,
            content_root: identify(name.as_bytes()),
            data: WearableData {
                replaces: vec![],
                hides: vec![],
                removes_default_hiding: vec![],
                tags: vec![name.to_string()],
                category: "hat".to_string(),
                representations: vec![ResolvedRepresentation {
                    body_shapes: vec![BODY_SHAPE_MALE.to_string()],
                    main_file: files[0].0.to_string(),
                    override_replaces: vec![],
                    override_hides: vec![],
                    contents,
                }],
            },
            i18n: vec![I18n {
                code: "en".to_string(),
                text: name.to_string(),
            }],
            created_at: 1,
            updated_at: 1,
        }
    }

    #[test]
    fn test_bare_legacy_id_from_catalog() {
        let mut entity = entity("base-avatars", "BaseFemale", &[("body.glb", b"glb")]);
        entity.legacy_id = "Basefemale".to_string();

        let prepared = prepare_deployment(&entity, &DecentralandResolver::default(), 1).unwrap();
        assert_eq!(
            prepared.pointers,
            vec!["urn:decentraland:off-chain:base-avatars:BaseFemale"]
        );
    }

    #[test]
    fn test_document_shape() {
        let entity = entity("base-avatars", "cap", &[("cap.glb", b"glb"), ("skin.png", b"png")]);
        let prepared = prepare_deployment(&entity, &DecentralandResolver::default(), 42).unwrap();

        let doc: serde_json::Value = serde_json::from_slice(&prepared.document).unwrap();
        assert_eq!(doc["version"], "v3");
        assert_eq!(doc["type"], "wearable");
        assert_eq!(doc["timestamp"], 42);
        assert_eq!(doc["pointers"][0], "urn:decentraland:off-chain:base-avatars:cap");
        assert_eq!(doc["metadata"]["thumbnail"], "thumbnail.png");
        assert!(doc["metadata"].get("image").is_none());
        assert_eq!(
            doc["metadata"]["data"]["representations"][0]["contents"],
            serde_json::json!(["cap.glb", "skin.png"])
        );

        let files: Vec<&str> = prepared.content.iter().map(|c| c.file.as_str()).collect();
        assert_eq!(files, vec!["thumbnail.png", "cap.glb", "skin.png"]);
        assert_eq!(prepared.entity_id, identify(&prepared.document));
    }

    #[test]
    fn test_deterministic_for_same_timestamp() {
        let entity = entity("base-avatars", "cap", &[("cap.glb", b"glb")]);
        let resolver = DecentralandResolver::default();
        let a = prepare_deployment(&entity, &resolver, 7).unwrap();
        let b = prepare_deployment(&entity, &resolver, 7).unwrap();
        let c = prepare_deployment(&entity, &resolver, 8).unwrap();
        assert_eq!(a.entity_id, b.entity_id);
        assert_ne!(a.entity_id, c.entity_id);
    }

    #[test]
    fn test_pointers_include_contract_address() {
        let mut addresses = BTreeMap::new();
        addresses.insert("halloween_2019".to_string(), "0xc1f4".to_string());
        let resolver = DecentralandResolver::new(vec!["base-avatars".to_string()], addresses);

        let entity = entity("halloween_2019", "bride", &[("bride.glb", b"glb")]);
        let prepared = prepare_deployment(&entity, &resolver, 0).unwrap();
        assert_eq!(
            prepared.pointers,
            vec![
                "urn:decentraland:ethereum:collections-v1:halloween_2019:bride",
                "urn:decentraland:ethereum:collections-v1:0xc1f4:bride"
            ]
        );
    }

    #[test]
    fn test_reserved_file_names() {
        let entity = entity("base-avatars", "cap", &[("cap.glb", b"glb"), ("thumbnail.png", b"x")]);
        let err = prepare_deployment(&entity, &DecentralandResolver::default(), 0).unwrap_err();
        assert!(matches!(err, WardrobeError::Deploy(_)));
    }

    #[test]
    fn test_blob_ids_unique() {
        // Thumbnail shares bytes with a model file
        let mut entity = entity("base-avatars", "cap", &[("cap.glb", b"same")]);
        entity.thumbnail = identify(b"same");
        let prepared = prepare_deployment(&entity, &DecentralandResolver::default(), 0).unwrap();
        assert_eq!(prepared.content.len(), 2);
        assert_eq!(prepared.blob_ids(), vec![identify(b"same")]);
    }
}
