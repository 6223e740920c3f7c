//! Validate selected asset folders before a deploy

use super::{detailed_errors, print_failures};
use anyhow::{bail, Result};
use std::path::PathBuf;
use wardrobe_asset::BlobSet;
use wardrobe_catalog::{write_validation_errors, BuildConfig, CatalogAssembler};
use wardrobe_schema::WearableEntity;

pub struct ValidateArgs {
    pub folders: Vec<PathBuf>,
    pub output: Option<PathBuf>,
    pub target: Option<String>,
    pub verbose: bool,
}

pub async fn run(args: ValidateArgs) -> Result<()> {
    let mut config = BuildConfig::load()?;
    config.strict = true;
    if let Some(output) = &args.output {
        config.output_dir = output.clone();
    }
    config.validate()?;

    for folder in &args.folders {
        if !folder.is_dir() {
            bail!("{} is not an asset folder", folder.display());
        }
    }

    let assembler = CatalogAssembler::from_config(&config, BlobSet::new());
    let build = assembler.build_catalog(&args.folders).await?;
    print_failures(&build, detailed_errors(args.verbose));

    if !build.is_clean() {
        let path = write_validation_errors(&build.failures, &config.output_dir)?;
        println!("\n{}", build.stats.summary());
        println!("Error report written to {}", path.display());
        bail!("{} asset(s) failed validation", build.failures.len());
    }

    println!("{}", build.stats.summary());
    println!("\nAll assets are valid. Deploy them with:\n");
    println!(
        "{}",
        deploy_command(&build.manifest.entities, args.target.as_deref())
    );
    Ok(())
}

/// The deploy invocation selecting exactly `entities` by legacy id
fn deploy_command(entities: &[WearableEntity], target: Option<&str>) -> String {
    let mut command = format!(
        "wardrobe deploy --identityFilePath <identity-file> --target {}",
        target.unwrap_or("<node-to-deploy>")
    );
    for entity in entities {
        command.push_str(" --id ");
        command.push_str(&entity.legacy_id);
    }
    command
}
