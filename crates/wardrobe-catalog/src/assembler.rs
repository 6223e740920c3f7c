//! Catalog assembly across many asset folders
//!
//! Each folder is built independently. In parallel mode every asset gets its
//! own task, bounded by a semaphore, with the CPU-heavy work on the blocking
//! pool. Serial mode builds one asset at a time for diagnosis. Both modes
//! produce the same catalog for the same input.

use crate::builder::AssetBuilder;
use crate::config::{BuildConfig, ProcessingMode, DEFAULT_CONCURRENCY};
use crate::output::CatalogManifest;
use crate::report::{AssetFailure, BuildStats};
use futures::future::join_all;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};
use wardrobe_asset::BlobSet;
use wardrobe_core::{Result, WardrobeError};
use wardrobe_schema::WearableEntity;

/// Outcome of a catalog build
#[derive(Debug, Clone, Default)]
pub struct CatalogBuild {
    pub manifest: CatalogManifest,
    pub failures: Vec<AssetFailure>,
    pub stats: BuildStats,
}

impl CatalogBuild {
    /// True when every asset built
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct CatalogAssembler {
    builder: Arc<AssetBuilder>,
    blobs: BlobSet,
    mode: ProcessingMode,
    concurrency: usize,
}

impl CatalogAssembler {
    /// `blobs` is the shared dedup set for the run; clones of it see every
    /// blob this assembler publishes
    pub fn new(builder: AssetBuilder, blobs: BlobSet) -> Self {
        Self {
            builder: Arc::new(builder),
            blobs,
            mode: ProcessingMode::Parallel,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn from_config(config: &BuildConfig, blobs: BlobSet) -> Self {
        Self::new(AssetBuilder::from_config(config), blobs)
            .with_mode(config.mode)
            .with_concurrency(config.concurrency)
    }

    pub fn with_mode(mut self, mode: ProcessingMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn blobs(&self) -> &BlobSet {
        &self.blobs
    }

    /// Build every folder. A failing asset is recorded and the rest carry on;
    /// only errors that are not local to one asset abort the build.
    pub async fn build_catalog(&self, folders: &[PathBuf]) -> Result<CatalogBuild> {
        info!(
            assets = folders.len(),
            mode = ?self.mode,
            concurrency = self.concurrency,
            "building catalog"
        );

        let outcomes = match self.mode {
            ProcessingMode::Parallel => self.run_parallel(folders).await,
            ProcessingMode::Serial => self.run_serial(folders).await,
        };
        self.collect(outcomes)
    }

    async fn run_serial(&self, folders: &[PathBuf]) -> Vec<(PathBuf, Result<WearableEntity>)> {
        let mut outcomes = Vec::with_capacity(folders.len());
        for folder in folders {
            let outcome = build_one(Arc::clone(&self.builder), self.blobs.clone(), folder.clone()).await;
            outcomes.push((folder.clone(), outcome));
        }
        outcomes
    }

    async fn run_parallel(&self, folders: &[PathBuf]) -> Vec<(PathBuf, Result<WearableEntity>)> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));

        let tasks: Vec<_> = folders
            .iter()
            .cloned()
            .map(|folder| {
                let semaphore = Arc::clone(&semaphore);
                let builder = Arc::clone(&self.builder);
                let blobs = self.blobs.clone();
                tokio::spawn(async move {
                    match semaphore.acquire_owned().await {
                        Ok(_permit) => build_one(builder, blobs, folder).await,
                        Err(e) => Err(WardrobeError::Task(e.to_string())),
                    }
                })
            })
            .collect();

        // Results come back in input order regardless of completion order
        let joined = join_all(tasks).await;
        folders
            .iter()
            .cloned()
            .zip(joined)
            .map(|(folder, joined)| {
                let outcome = joined.unwrap_or_else(|e| Err(WardrobeError::Task(e.to_string())));
                (folder, outcome)
            })
            .collect()
    }

    fn collect(&self, outcomes: Vec<(PathBuf, Result<WearableEntity>)>) -> Result<CatalogBuild> {
        let found = outcomes.len();
        let mut entities = Vec::new();
        let mut failures = Vec::new();
        let mut claimed: HashMap<String, PathBuf> = HashMap::new();

        for (folder, outcome) in outcomes {
            match outcome {
                Ok(entity) => {
                    if let Some(first) = claimed.get(&entity.id) {
                        let err = duplicate_id(&folder, &entity.id, first);
                        warn!(folder = %folder.display(), id = %entity.id, "duplicate entity id");
                        failures.push(AssetFailure::new(&folder, &err));
                        continue;
                    }
                    debug!(id = %entity.id, "built asset");
                    claimed.insert(entity.id.clone(), folder);
                    entities.push(entity);
                }
                Err(err) if !err.is_asset_local() => return Err(err),
                Err(err) => {
                    let failure = AssetFailure::new(&folder, &err);
                    error!(
                        collection = %failure.collection,
                        category = %failure.category,
                        asset = %failure.asset,
                        error = %err,
                        "asset failed"
                    );
                    for issue in &failure.issues {
                        debug!(asset = %failure.asset, path = %issue.path, "{}", issue.message);
                    }
                    failures.push(failure);
                }
            }
        }

        let mut manifest = CatalogManifest::new(entities, BlobSet::new());
        manifest.blobs = self.blobs.subset(&manifest.referenced_ids());

        let stats = BuildStats {
            found,
            succeeded: manifest.entities.len(),
            failed: failures.len(),
            blobs: manifest.blobs.len(),
        };
        info!("{}", stats.summary());

        Ok(CatalogBuild {
            manifest,
            failures,
            stats,
        })
    }
}

async fn build_one(
    builder: Arc<AssetBuilder>,
    blobs: BlobSet,
    folder: PathBuf,
) -> Result<WearableEntity> {
    tokio::task::spawn_blocking(move || -> Result<WearableEntity> {
        let built = builder.build(&folder)?;
        let new_blobs = built.publish(&blobs);
        debug!(id = %built.entity.id, new_blobs, "published blobs");
        Ok(built.entity)
    })
    .await
    .map_err(|e| WardrobeError::Task(e.to_string()))?
}

fn duplicate_id(folder: &Path, id: &str, first: &Path) -> WardrobeError {
    WardrobeError::InvalidManifest {
        path: folder.display().to_string(),
        reason: format!("id {} is already used by {}", id, first.display()),
    }
}
