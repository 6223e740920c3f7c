//! Catalog build command

use super::{detailed_errors, print_failures};
use anyhow::{bail, Result};
use clap::Args;
use std::path::PathBuf;
use tracing::info;
use wardrobe_asset::{scan, BlobSet};
use wardrobe_catalog::{
    write_validation_errors, BuildConfig, CatalogAssembler, FolderIdScope, ProcessingMode,
};
use wardrobe_import::TextureNaming;

/// Overrides on top of the layered build configuration
#[derive(Args, Debug, Default)]
pub struct BuildArgs {
    /// Asset tree root (<collection>/<category>/<asset>)
    #[arg(long)]
    pub assets: Option<PathBuf>,

    /// Output directory
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Only build these collections (repeatable)
    #[arg(long = "collection")]
    pub collections: Vec<String>,

    /// Build assets one at a time
    #[arg(long)]
    pub serial: bool,

    /// Fail without writing a catalog if any asset fails
    #[arg(long)]
    pub strict: bool,

    /// Texture naming (relative-path or content-hash)
    #[arg(long)]
    pub naming: Option<TextureNaming>,

    /// Files covered by the folder identifier (contents or all-files)
    #[arg(long)]
    pub folder_scope: Option<FolderIdScope>,

    /// Maximum assets built at once
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Base URL written into content entries
    #[arg(long)]
    pub content_base_url: Option<String>,
}

impl BuildArgs {
    /// Apply the flags that were given to a loaded configuration
    pub fn apply(&self, config: &mut BuildConfig) -> Result<()> {
        if let Some(assets) = &self.assets {
            config.assets_root = assets.clone();
        }
        if let Some(output) = &self.output {
            config.output_dir = output.clone();
        }
        if self.serial {
            config.mode = ProcessingMode::Serial;
        }
        if self.strict {
            config.strict = true;
        }
        if let Some(naming) = self.naming {
            config.texture_naming = naming;
        }
        if let Some(scope) = self.folder_scope {
            config.folder_id_scope = scope;
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(url) = &self.content_base_url {
            config.content_base_url = Some(url.clone());
        }
        config.validate()?;
        Ok(())
    }
}

pub async fn run(args: BuildArgs, verbose: bool) -> Result<()> {
    let mut config = BuildConfig::load()?;
    args.apply(&mut config)?;
    config.assets_root = config.absolute_assets_root()?;

    let mut scanned = scan(&config.assets_root)?;
    if !args.collections.is_empty() {
        scanned.retain_collections(&args.collections);
    }
    for failure in &scanned.failures {
        println!("  unreadable: {} ({})", failure.path.display(), failure.error);
    }

    let folders = scanned.asset_folders();
    println!(
        "Building {} asset(s) from {} collection(s) in {}",
        folders.len(),
        scanned.collections.len(),
        config.assets_root.display()
    );
    info!(mode = ?config.mode, concurrency = config.concurrency, naming = %config.texture_naming, "build settings");

    let assembler = CatalogAssembler::from_config(&config, BlobSet::new());
    let build = assembler.build_catalog(&folders).await?;
    print_failures(&build, detailed_errors(verbose));

    if config.strict && !build.is_clean() {
        let path = write_validation_errors(&build.failures, &config.output_dir)?;
        println!("\n{}", build.stats.summary());
        println!("Error report written to {}", path.display());
        bail!(
            "{} asset(s) failed; no catalog written in strict mode",
            build.failures.len()
        );
    }

    let summary = build.manifest.write(&config.output_dir)?;
    if !build.failures.is_empty() {
        write_validation_errors(&build.failures, &config.output_dir)?;
    }

    println!("\n{}", build.stats.summary());
    println!(
        "Wrote {} ({} new blob(s) of {})",
        summary.catalog.display(),
        summary.blobs_written,
        summary.blobs_total
    );
    Ok(())
}
