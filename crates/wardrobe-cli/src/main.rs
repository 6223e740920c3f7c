//! Wardrobe CLI - build, validate and deploy the wearable catalog

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{build, cid, deploy, split, validate};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use wardrobe_import::TextureNaming;

#[derive(Parser)]
#[command(name = "wardrobe")]
#[command(about = "Content-addressed catalog builder for avatar wearables", long_about = None)]
#[command(version)]
struct Cli {
    /// Debug logging and full per-asset error details
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the catalog from an asset tree
    Build(build::BuildArgs),

    /// Build only the given asset folders in strict mode and print the deploy command
    Validate {
        /// Asset folders (<collection>/<category>/<asset>)
        #[arg(required = true)]
        folders: Vec<PathBuf>,

        /// Where validation-errors.json is written
        #[arg(long)]
        output: Option<PathBuf>,

        /// Content server to put in the printed deploy command
        #[arg(long)]
        target: Option<String>,
    },

    /// Deploy catalog entries to a content server
    Deploy(deploy::DeployArgs),

    /// Print content identifiers of files
    Cid {
        /// Files, or directories when combined with --folder
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Print one identifier for all files together
        #[arg(long)]
        folder: bool,
    },

    /// Split the textures out of a GLB model
    Split {
        /// Path to the .glb file
        model: PathBuf,

        /// Output directory
        #[arg(long, default_value = ".")]
        output: PathBuf,

        /// Texture naming (relative-path or content-hash)
        #[arg(long, default_value = "relative-path")]
        naming: TextureNaming,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Build(args) => build::run(args, cli.verbose).await,
        Commands::Validate {
            folders,
            output,
            target,
        } => {
            validate::run(validate::ValidateArgs {
                folders,
                output,
                target,
                verbose: cli.verbose,
            })
            .await
        }
        Commands::Deploy(args) => deploy::run(args).await,
        Commands::Cid { paths, folder } => cid::run(&paths, folder),
        Commands::Split {
            model,
            output,
            naming,
        } => split::run(&model, &output, naming),
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
