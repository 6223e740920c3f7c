//! Splitter result types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A binary resource pulled out of a model container
#[derive(Clone, PartialEq, Eq)]
pub struct ExtractedResource {
    /// Final file name, unique within one asset
    pub file_name: String,
    pub buffer: Vec<u8>,
}

impl fmt::Debug for ExtractedResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractedResource")
            .field("file_name", &self.file_name)
            .field("bytes", &self.buffer.len())
            .finish()
    }
}

/// Result of splitting one container
#[derive(Debug, Clone)]
pub struct SplitContainer {
    /// The rewritten container; the original bytes when nothing changed
    pub container: Vec<u8>,
    /// Extracted textures, in image order, without duplicates
    pub resources: Vec<ExtractedResource>,
}

/// How extracted textures are named.
///
/// One policy applies to a whole run; the two are never mixed since the
/// rewritten containers reference resources by these names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureNaming {
    /// `<image name or uri stem>.<ext>`, suffixed with `_<index>` on collision
    #[default]
    RelativePath,
    /// The texture's content identifier, no extension
    ContentHash,
}

impl fmt::Display for TextureNaming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextureNaming::RelativePath => write!(f, "relative-path"),
            TextureNaming::ContentHash => write!(f, "content-hash"),
        }
    }
}

impl FromStr for TextureNaming {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "relative-path" | "relative_path" => Ok(TextureNaming::RelativePath),
            "content-hash" | "content_hash" => Ok(TextureNaming::ContentHash),
            _ => Err(format!(
                "unknown texture naming '{}'; valid values: relative-path, content-hash",
                s
            )),
        }
    }
}
