//! Wardrobe Import - model container handling
//!
//! Separates the textures embedded in GLB containers into standalone
//! files and rewrites the container to reference them by name.

mod splitter;
mod types;

pub use splitter::{split_asset_models, split_textures, write_glb};
pub use types::{ExtractedResource, SplitContainer, TextureNaming};
