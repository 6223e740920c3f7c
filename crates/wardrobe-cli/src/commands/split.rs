//! Split command

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use wardrobe_core::identify;
use wardrobe_import::{split_asset_models, TextureNaming};

pub fn run(model: &Path, output: &Path, naming: TextureNaming) -> Result<()> {
    let resources = split_asset_models(&[model], naming, &[])?;

    fs::create_dir_all(output)
        .with_context(|| format!("cannot create {}", output.display()))?;
    for resource in &resources {
        let path = output.join(&resource.file_name);
        fs::write(&path, &resource.buffer)
            .with_context(|| format!("cannot write {}", path.display()))?;
        println!(
            "  {}  {} ({} bytes)",
            identify(&resource.buffer),
            path.display(),
            resource.buffer.len()
        );
    }

    println!(
        "Split {} into {} file(s)",
        model.display(),
        resources.len()
    );
    Ok(())
}
