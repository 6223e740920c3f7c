//! Deploy command

use anyhow::{bail, Result};
use clap::Args;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use wardrobe_catalog::{BuildConfig, CatalogManifest};
use wardrobe_deploy::{Credentials, Deployer, HttpRemoteStore, IdFilter, DEPLOY_ERRORS_FILE};

#[derive(Args, Debug)]
pub struct DeployArgs {
    /// Content server base URL
    #[arg(long)]
    pub target: String,

    /// JSON file with `privateKey` and `ethAddress`
    #[arg(long = "identityFilePath")]
    pub identity_file: Option<PathBuf>,

    #[arg(long = "privateKey")]
    pub private_key: Option<String>,

    #[arg(long = "publicKey")]
    pub public_key: Option<String>,

    /// Entity to deploy: exact id or legacy id, or a `*` pattern (repeatable)
    #[arg(long = "id", required = true)]
    pub ids: Vec<String>,

    /// Directory holding catalog.json and contents/ [default: configured output dir]
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Print what would be deployed without contacting the server
    #[arg(long)]
    pub dry_run: bool,

    /// Maximum entities deployed at once
    #[arg(long)]
    pub concurrency: Option<usize>,
}

pub async fn run(args: DeployArgs) -> Result<()> {
    let config = BuildConfig::load()?;
    let identity = Credentials::from_args(args.identity_file, args.private_key, args.public_key)?
        .load()?;
    let filter = IdFilter::new(&args.ids)?;

    let catalog_dir = args.catalog.unwrap_or_else(|| config.output_dir.clone());
    let manifest = CatalogManifest::read(&catalog_dir)?;

    let remote = HttpRemoteStore::new(&args.target);
    println!("Deploying to {}", remote.base_url());

    let deployer = Deployer::new(
        Arc::new(remote),
        Arc::new(config.resolver()),
        identity,
        args.concurrency.unwrap_or(config.concurrency),
    );
    let timestamp = config.timestamp_millis();

    if args.dry_run {
        let plan = deployer.plan(&manifest, &filter, timestamp)?;
        println!("Dry run: {} entities selected", plan.len());
        for deployment in &plan {
            println!(
                "  {} [{}] {} file(s)",
                deployment.entity_id,
                deployment.pointers.join(", "),
                deployment.content.len()
            );
        }
        return Ok(());
    }

    let report = deployer.deploy_catalog(&manifest, &filter, timestamp).await?;
    println!("{}", report.summary());

    if !report.is_success() {
        let path = Path::new(DEPLOY_ERRORS_FILE);
        report.write_errors(path)?;
        println!("Failed deployments written to {}", path.display());
        bail!("{} entities failed to deploy", report.failed.len());
    }
    Ok(())
}
