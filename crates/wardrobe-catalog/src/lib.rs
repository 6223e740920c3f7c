//! Wardrobe Catalog - building the wearable catalog
//!
//! Runs every asset folder through the build pipeline, gathers the entities
//! and their deduplicated blobs, and writes them to an output directory.

mod assembler;
mod builder;
mod config;
mod output;
mod report;

pub use assembler::{CatalogAssembler, CatalogBuild};
pub use builder::{AssetBuilder, BuiltAsset};
pub use config::{
    BuildConfig, BuildConfigFile, FolderIdScope, ProcessingMode, DEFAULT_CONCURRENCY,
    PROJECT_CONFIG_FILE,
};
pub use output::{
    write_validation_errors, CatalogManifest, OutputSummary, CATALOG_FILE, CONTENTS_DIR,
    VALIDATION_ERRORS_FILE,
};
pub use report::{AssetErrorReport, AssetFailure, BuildStats};
