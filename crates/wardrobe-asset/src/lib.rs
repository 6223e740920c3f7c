//! Wardrobe Asset - asset folders and blob storage
//!
//! This crate reads the `<collection>/<category>/<asset>` source tree,
//! parses each folder's `asset.json`, and stores content-addressed blobs.

mod scanner;
mod store;
mod types;

pub use scanner::{
    find_assets, list_glb_files, load_asset, load_manifest, parse_legacy_id, scan, ScanFailure,
    ScanResult, MANIFEST_FILE, THUMBNAIL_FILE,
};
pub use store::{BlobSet, ContentStore};
pub use types::{Asset, AssetManifest, Representation, Translations};
