//! Wardrobe Deploy - publishing a built catalog
//!
//! Selects catalog entities by id, turns each into an entity document, and
//! pushes its files and document to a remote content server.

mod deployer;
mod entity;
mod filter;
mod identity;
mod remote;

pub use deployer::{DeployReport, Deployer, DEPLOY_ERRORS_FILE};
pub use entity::{
    prepare_deployment, EntityContent, PreparedDeployment, ENTITY_TYPE, ENTITY_VERSION, IMAGE_KEY,
    THUMBNAIL_KEY,
};
pub use filter::IdFilter;
pub use identity::{Credentials, Identity};
pub use remote::{normalize_target, HttpRemoteStore, RemoteStore, IDENTITY_HEADER};
