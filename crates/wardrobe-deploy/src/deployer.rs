//! Pushing catalog entities to a remote store

use crate::entity::{prepare_deployment, PreparedDeployment};
use crate::filter::IdFilter;
use crate::identity::Identity;
use crate::remote::RemoteStore;
use dashmap::DashMap;
use futures::future::join_all;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use tracing::{debug, error, info};
use wardrobe_asset::BlobSet;
use wardrobe_catalog::CatalogManifest;
use wardrobe_core::{ContentId, Result, WardrobeError};
use wardrobe_schema::UrnResolver;

pub const DEPLOY_ERRORS_FILE: &str = "deploy-errors.txt";

/// What a deploy run did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeployReport {
    pub deployed: usize,
    pub uploaded_blobs: usize,
    /// Blobs already present remotely or already sent earlier in the run
    pub skipped_blobs: usize,
    /// Pointers of every entity that failed
    pub failed: Vec<Vec<String>>,
}

impl DeployReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "Deployed {} wearable(s), {} failed; uploaded {} blob(s), skipped {}",
            self.deployed,
            self.failed.len(),
            self.uploaded_blobs,
            self.skipped_blobs
        )
    }

    /// Write the failed pointers, one entity per line
    pub fn write_errors(&self, path: &Path) -> Result<()> {
        let mut text = String::from("Failed to deploy the following wearables:\n");
        for pointers in &self.failed {
            text.push_str(&pointers.join(","));
            text.push('\n');
        }
        std::fs::write(path, text)?;
        Ok(())
    }
}

struct EntityOutcome {
    pointers: Vec<String>,
    uploaded: usize,
    skipped: usize,
    result: Result<()>,
}

/// Deploys catalog entities with bounded concurrency.
///
/// A blob is sent at most once per deployer, however many entities use it.
pub struct Deployer {
    remote: Arc<dyn RemoteStore>,
    resolver: Arc<dyn UrnResolver>,
    identity: Arc<Identity>,
    concurrency: usize,
    uploaded: Arc<UploadedSet>,
}

/// Per-blob upload state. A blob's flag is set once it is known to be
/// remote; holders of its lock wait for an in-flight upload to finish.
type UploadedSet = DashMap<ContentId, Arc<Mutex<bool>>>;

impl Deployer {
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        resolver: Arc<dyn UrnResolver>,
        identity: Identity,
        concurrency: usize,
    ) -> Self {
        Self {
            remote,
            resolver,
            identity: Arc::new(identity),
            concurrency: concurrency.max(1),
            uploaded: Arc::new(DashMap::new()),
        }
    }

    /// Prepare every entity the filter selects, without touching the remote
    pub fn plan(
        &self,
        manifest: &CatalogManifest,
        filter: &IdFilter,
        timestamp: i64,
    ) -> Result<Vec<PreparedDeployment>> {
        manifest
            .entities
            .iter()
            .filter(|e| filter.matches_entity(e))
            .map(|e| prepare_deployment(e, self.resolver.as_ref(), timestamp))
            .collect()
    }

    pub async fn deploy_catalog(
        &self,
        manifest: &CatalogManifest,
        filter: &IdFilter,
        timestamp: i64,
    ) -> Result<DeployReport> {
        let plan = self.plan(manifest, filter, timestamp)?;
        info!(entities = plan.len(), "deploying matching entities");
        for deployment in &plan {
            info!(pointers = %deployment.pointers.join(","), "will deploy");
        }

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let tasks: Vec<_> = plan
            .into_iter()
            .map(|deployment| {
                let semaphore = Arc::clone(&semaphore);
                let remote = Arc::clone(&self.remote);
                let identity = Arc::clone(&self.identity);
                let uploaded = Arc::clone(&self.uploaded);
                let blobs = manifest.blobs.clone();
                tokio::spawn(async move {
                    let pointers = deployment.pointers.clone();
                    match semaphore.acquire_owned().await {
                        Ok(_permit) => {
                            tokio::task::spawn_blocking(move || {
                                deploy_one(remote.as_ref(), &identity, &uploaded, &blobs, deployment)
                            })
                            .await
                            .unwrap_or_else(|e| EntityOutcome {
                                pointers,
                                uploaded: 0,
                                skipped: 0,
                                result: Err(WardrobeError::Task(e.to_string())),
                            })
                        }
                        Err(e) => EntityOutcome {
                            pointers,
                            uploaded: 0,
                            skipped: 0,
                            result: Err(WardrobeError::Task(e.to_string())),
                        },
                    }
                })
            })
            .collect();

        let mut report = DeployReport::default();
        for joined in join_all(tasks).await {
            let outcome = joined.map_err(|e| WardrobeError::Task(e.to_string()))?;
            report.uploaded_blobs += outcome.uploaded;
            report.skipped_blobs += outcome.skipped;
            match outcome.result {
                Ok(()) => report.deployed += 1,
                Err(e) => {
                    error!(pointers = %outcome.pointers.join(","), error = %e, "deployment failed");
                    report.failed.push(outcome.pointers);
                }
            }
        }

        info!("{}", report.summary());
        Ok(report)
    }
}

fn deploy_one(
    remote: &dyn RemoteStore,
    identity: &Identity,
    uploaded: &UploadedSet,
    blobs: &BlobSet,
    deployment: PreparedDeployment,
) -> EntityOutcome {
    let mut outcome = EntityOutcome {
        pointers: deployment.pointers.clone(),
        uploaded: 0,
        skipped: 0,
        result: Ok(()),
    };

    for id in deployment.blob_ids() {
        match upload_blob(remote, uploaded, blobs, &id) {
            Ok(true) => outcome.uploaded += 1,
            Ok(false) => outcome.skipped += 1,
            Err(e) => {
                outcome.result = Err(e);
                return outcome;
            }
        }
    }

    outcome.result = match remote.deploy(&deployment, identity) {
        Ok(timestamp) if timestamp != 0 => {
            debug!(entity = %deployment.entity_id, timestamp, "deployed");
            Ok(())
        }
        Ok(_) => Err(WardrobeError::Deploy(format!(
            "deployment of {} was refused",
            deployment.entity_id
        ))),
        Err(e) => Err(e),
    };
    outcome
}

/// Returns whether the blob was actually sent
fn upload_blob(
    remote: &dyn RemoteStore,
    uploaded: &UploadedSet,
    blobs: &BlobSet,
    id: &ContentId,
) -> Result<bool> {
    let slot = Arc::clone(&uploaded.entry(*id).or_default());
    let mut done = slot
        .lock()
        .map_err(|_| WardrobeError::Task(format!("upload state of {} poisoned", id)))?;
    if *done {
        return Ok(false);
    }
    if remote.exists(id)? {
        *done = true;
        return Ok(false);
    }

    let bytes = blobs
        .get(id)
        .ok_or_else(|| WardrobeError::MissingResource(format!("blob {} not in catalog", id)))?;
    remote.upload(id, &bytes)?;
    *done = true;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::tests::entity;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;
    use wardrobe_core::identify;
    use wardrobe_schema::{DecentralandResolver, WearableEntity};

    #[derive(Default)]
    struct MockRemote {
        stored: Mutex<HashMap<ContentId, Vec<u8>>>,
        uploads: Mutex<Vec<ContentId>>,
        deployed: Mutex<Vec<Vec<String>>>,
        refuse: HashSet<String>,
    }

    impl RemoteStore for MockRemote {
        fn exists(&self, id: &ContentId) -> Result<bool> {
            Ok(self.stored.lock().unwrap().contains_key(id))
        }

        fn upload(&self, id: &ContentId, bytes: &[u8]) -> Result<()> {
            assert_eq!(identify(bytes), *id);
            self.uploads.lock().unwrap().push(*id);
            self.stored.lock().unwrap().insert(*id, bytes.to_vec());
            Ok(())
        }

        fn deploy(&self, deployment: &PreparedDeployment, _identity: &Identity) -> Result<i64> {
            if deployment.pointers.iter().any(|p| self.refuse.contains(p)) {
                return Ok(0);
            }
            let stored = self.stored.lock().unwrap();
            for id in deployment.blob_ids() {
                if !stored.contains_key(&id) {
                    return Err(WardrobeError::Deploy(format!("{} not uploaded", id)));
                }
            }
            self.deployed.lock().unwrap().push(deployment.pointers.clone());
            Ok(1)
        }
    }

    fn identity() -> Identity {
        Identity {
            private_key: "0xabc".to_string(),
            eth_address: "0x123".to_string(),
        }
    }

    fn manifest(entities: &[(WearableEntity, &[&[u8]])]) -> CatalogManifest {
        let blobs = BlobSet::new();
        for (_, files) in entities {
            for bytes in files.iter() {
                blobs.insert(bytes);
            }
        }
        CatalogManifest::new(entities.iter().map(|(e, _)| e.clone()).collect(), blobs)
    }

    fn sample() -> CatalogManifest {
        manifest(&[
            (
                entity("base-avatars", "cap", &[("cap.glb", b"cap"), ("skin.png", b"shared")]),
                &[b"cap", b"shared", b"thumb cap"],
            ),
            (
                entity("base-avatars", "beanie", &[("beanie.glb", b"beanie"), ("skin.png", b"shared")]),
                &[b"beanie", b"shared", b"thumb beanie"],
            ),
            (
                entity("xmas_2019", "F_BlueStar", &[("star.glb", b"star")]),
                &[b"star", b"thumb F_BlueStar"],
            ),
        ])
    }

    fn deployer(remote: Arc<MockRemote>, concurrency: usize) -> Deployer {
        Deployer::new(remote, Arc::new(DecentralandResolver::default()), identity(), concurrency)
    }

    #[tokio::test]
    async fn test_deploys_selected_entities() {
        let remote = Arc::new(MockRemote::default());
        let filter = IdFilter::new(&["dcl://base-avatars/*"]).unwrap();
        let report = deployer(Arc::clone(&remote), 4)
            .deploy_catalog(&sample(), &filter, 1)
            .await
            .unwrap();

        assert!(report.is_success());
        assert_eq!(report.deployed, 2);
        // cap, beanie, shared texture, two thumbnails
        assert_eq!(report.uploaded_blobs, 5);
        assert_eq!(report.skipped_blobs, 1);

        let uploads = remote.uploads.lock().unwrap();
        let unique: HashSet<&ContentId> = uploads.iter().collect();
        assert_eq!(unique.len(), uploads.len());
        assert!(!uploads.contains(&identify(b"star")));
    }

    #[tokio::test]
    async fn test_skips_blobs_already_remote() {
        let remote = Arc::new(MockRemote::default());
        remote
            .stored
            .lock()
            .unwrap()
            .insert(identify(b"star"), b"star".to_vec());

        let filter = IdFilter::new(&["urn:decentraland:ethereum:collections-v1:xmas_2019:F_BlueStar"]).unwrap();
        let report = deployer(Arc::clone(&remote), 1)
            .deploy_catalog(&sample(), &filter, 1)
            .await
            .unwrap();
        assert_eq!(report.deployed, 1);
        assert_eq!(report.uploaded_blobs, 1);
        assert_eq!(report.skipped_blobs, 1);
    }

    #[tokio::test]
    async fn test_refused_and_missing_blobs_fail() {
        let mut remote = MockRemote::default();
        remote
            .refuse
            .insert("urn:decentraland:off-chain:base-avatars:cap".to_string());
        let remote = Arc::new(remote);

        // beanie is missing its thumbnail bytes
        let catalog = manifest(&[
            (
                entity("base-avatars", "cap", &[("cap.glb", b"cap")]),
                &[b"cap", b"thumb cap"],
            ),
            (
                entity("base-avatars", "beanie", &[("beanie.glb", b"beanie")]),
                &[b"beanie"],
            ),
        ]);

        let filter = IdFilter::new(&["*"]).unwrap();
        let report = deployer(Arc::clone(&remote), 2)
            .deploy_catalog(&catalog, &filter, 1)
            .await
            .unwrap();
        assert_eq!(report.deployed, 0);
        assert_eq!(report.failed.len(), 2);
        assert!(remote.deployed.lock().unwrap().is_empty());

        let dir = std::env::temp_dir().join(format!("wardrobe_deploy_test_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(DEPLOY_ERRORS_FILE);
        report.write_errors(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("urn:decentraland:off-chain:base-avatars:cap"));
        assert!(text.contains("urn:decentraland:off-chain:base-avatars:beanie"));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_nothing_selected() {
        let remote = Arc::new(MockRemote::default());
        let filter = IdFilter::new(&["dcl://nope/*"]).unwrap();
        let report = deployer(remote, 2)
            .deploy_catalog(&sample(), &filter, 1)
            .await
            .unwrap();
        assert_eq!(report, DeployReport::default());
    }

    #[test]
    fn test_plan_matches_legacy_ids() {
        let remote = Arc::new(MockRemote::default());
        let filter = IdFilter::new(&["dcl://xmas_2019/F_BlueStar"]).unwrap();
        let plan = deployer(remote, 1).plan(&sample(), &filter, 1).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(
            plan[0].pointers,
            vec!["urn:decentraland:ethereum:collections-v1:xmas_2019:F_BlueStar"]
        );
    }
}
