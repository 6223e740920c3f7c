//! Asset manifest definitions

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;
use wardrobe_core::{Result, WardrobeError};

/// Locale to display-name pairs, kept in authored order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Translations(pub Vec<(String, String)>);

impl Translations {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Translations {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (locale, text) in &self.0 {
            map.serialize_entry(locale, text)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Translations {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct OrderedVisitor;

        impl<'de> Visitor<'de> for OrderedVisitor {
            type Value = Translations;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of locale to text")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Translations, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((locale, text)) = access.next_entry::<String, String>()? {
                    entries.push((locale, text));
                }
                Ok(Translations(entries))
            }
        }

        deserializer.deserialize_map(OrderedVisitor)
    }
}

/// One body-shape variant of a wearable, as authored in `asset.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Representation {
    /// Free-text body shape hint such as "Male" or "Female"
    #[serde(rename = "type")]
    pub body_shape_hint: String,
    /// Model file name relative to the asset folder
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_replaces: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_hides: Option<Vec<String>>,
}

/// The declarative `asset.json` of an asset folder.
///
/// `replaces`, `hides` and `removesDefaultHiding` distinguish an absent
/// field (`None`, category defaults apply) from an explicit empty list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetManifest {
    pub name: String,
    #[serde(default)]
    pub i18n: Translations,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, rename = "main")]
    pub representations: Vec<Representation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replaces: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hides: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub removes_default_hiding: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rarity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl AssetManifest {
    /// Parse and check a manifest. `origin` is only used in error messages.
    pub fn from_json(text: &str, origin: &str) -> Result<Self> {
        let manifest: AssetManifest =
            serde_json::from_str(text).map_err(|e| WardrobeError::InvalidManifest {
                path: origin.to_string(),
                reason: e.to_string(),
            })?;

        if manifest.name.trim().is_empty() {
            return Err(WardrobeError::InvalidManifest {
                path: origin.to_string(),
                reason: "'name' must not be empty".to_string(),
            });
        }
        if manifest.tags.is_empty() {
            return Err(WardrobeError::InvalidManifest {
                path: origin.to_string(),
                reason: "'tags' must contain at least one tag".to_string(),
            });
        }

        Ok(manifest)
    }
}

/// A loaded asset folder
#[derive(Debug, Clone)]
pub struct Asset {
    pub manifest: AssetManifest,
    pub collection: String,
    /// Taken from the parent directory name
    pub category: String,
    pub folder: PathBuf,
    /// `.glb` files in the folder, sorted
    pub models: Vec<PathBuf>,
}

impl Asset {
    pub fn name(&self) -> &str {
        &self.manifest.name
    }

    /// `<collection>/<name>`, the handle used in logs and error reports
    pub fn label(&self) -> String {
        format!("{}/{}", self.collection, self.manifest.name)
    }
}
