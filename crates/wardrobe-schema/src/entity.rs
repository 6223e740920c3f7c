//! Wearable entity records

use serde::{Deserialize, Serialize};
use wardrobe_core::ContentId;

/// One file of a representation, addressed by content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentEntry {
    pub file: String,
    pub hash: ContentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedRepresentation {
    pub body_shapes: Vec<String>,
    pub main_file: String,
    pub override_replaces: Vec<String>,
    pub override_hides: Vec<String>,
    pub contents: Vec<ContentEntry>,
}

impl ResolvedRepresentation {
    pub fn content(&self, file: &str) -> Option<&ContentEntry> {
        self.contents.iter().find(|c| c.file == file)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WearableData {
    pub replaces: Vec<String>,
    pub hides: Vec<String>,
    pub removes_default_hiding: Vec<String>,
    pub tags: Vec<String>,
    pub category: String,
    pub representations: Vec<ResolvedRepresentation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct I18n {
    pub code: String,
    pub text: String,
}

/// The metadata record of one wearable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WearableEntity {
    /// Canonical URN
    pub id: String,
    /// `dcl://<collection>/<name>`
    pub legacy_id: String,
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rarity: Option<String>,
    pub thumbnail: ContentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ContentId>,
    /// Folder-level identifier of the asset's files
    pub content_root: ContentId,
    pub data: WearableData,
    pub i18n: Vec<I18n>,
    /// Milliseconds since the Unix epoch
    pub created_at: i64,
    pub updated_at: i64,
}

impl WearableEntity {
    /// Every content id this entity references, thumbnail and image included
    pub fn referenced_ids(&self) -> Vec<ContentId> {
        let mut ids = vec![self.thumbnail];
        ids.extend(self.image);
        for representation in &self.data.representations {
            ids.extend(representation.contents.iter().map(|c| c.hash));
        }
        ids.sort();
        ids.dedup();
        ids
    }
}
