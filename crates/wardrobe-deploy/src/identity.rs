//! Deployment credentials

use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use wardrobe_core::{Result, WardrobeError};

/// Where the deploying identity comes from
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// JSON file holding `{ "privateKey": ..., "ethAddress": ... }`
    IdentityFile(PathBuf),
    KeyPair {
        private_key: String,
        public_key: String,
    },
}

impl Credentials {
    /// Either an identity file or both keys, never a mix
    pub fn from_args(
        identity_file: Option<PathBuf>,
        private_key: Option<String>,
        public_key: Option<String>,
    ) -> Result<Self> {
        match (identity_file, private_key, public_key) {
            (Some(path), None, None) => {
                if !path.is_file() {
                    return Err(WardrobeError::Config(format!(
                        "identity file {} does not exist",
                        path.display()
                    )));
                }
                Ok(Credentials::IdentityFile(path))
            }
            (None, Some(private_key), Some(public_key)) => Ok(Credentials::KeyPair {
                private_key,
                public_key,
            }),
            _ => Err(WardrobeError::Config(
                "either an identity file or both private and public keys must be given, but not a mix"
                    .to_string(),
            )),
        }
    }

    pub fn load(&self) -> Result<Identity> {
        match self {
            Credentials::IdentityFile(path) => {
                let text = std::fs::read_to_string(path)?;
                let identity: Identity = serde_json::from_str(&text).map_err(|e| {
                    WardrobeError::Config(format!("invalid identity file {}: {}", path.display(), e))
                })?;
                if identity.eth_address.trim().is_empty() {
                    return Err(WardrobeError::Config(format!(
                        "identity file {} has no ethAddress",
                        path.display()
                    )));
                }
                Ok(identity)
            }
            Credentials::KeyPair {
                private_key,
                public_key,
            } => Ok(Identity {
                private_key: private_key.clone(),
                eth_address: public_key.clone(),
            }),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::IdentityFile(path) => f.debug_tuple("IdentityFile").field(path).finish(),
            Credentials::KeyPair { public_key, .. } => f
                .debug_struct("KeyPair")
                .field("public_key", public_key)
                .field("private_key", &"<redacted>")
                .finish(),
        }
    }
}

/// The identity a deployment is made under
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub private_key: String,
    pub eth_address: String,
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("eth_address", &self.eth_address)
            .field("private_key", &"<redacted>")
            .finish()
    }
}
