//! Legacy id to canonical URN resolution

use std::collections::BTreeMap;
use tracing::debug;
use wardrobe_core::{Result, WardrobeError};

/// A resolved canonical identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedUrn {
    pub urn: String,
    /// Set for on-chain collections
    pub collection_name: Option<String>,
    /// Contract address of the collection, when known
    pub collection_address: Option<String>,
}

impl ResolvedUrn {
    /// Pointers an entity is deployed under: the URN, plus the URN with the
    /// collection name replaced by its contract address when one is known.
    pub fn pointers(&self) -> Vec<String> {
        let mut pointers = vec![self.urn.clone()];
        if let (Some(name), Some(address)) = (&self.collection_name, &self.collection_address) {
            let by_address = self.urn.replacen(name.as_str(), address, 1);
            if by_address != self.urn {
                pointers.push(by_address);
            }
        }
        pointers
    }
}

/// Maps legacy `dcl://` ids to canonical URNs
pub trait UrnResolver: Send + Sync {
    fn resolve(&self, legacy_id: &str) -> Result<ResolvedUrn>;
}

/// Known historical mis-named ids and their replacements.
///
/// Consulted once, before resolution. Entries are migration debt; new assets
/// must never need one. Ids built from an asset folder always have the
/// `dcl://<collection>/<name>` shape, so bare keys such as `Basefemale` only
/// match ids handed in directly, like the `legacyId` of an entity in a
/// catalog written by older tooling.
#[derive(Debug, Clone)]
pub struct LegacyFixups(BTreeMap<String, String>);

impl Default for LegacyFixups {
    fn default() -> Self {
        let mut table = BTreeMap::new();
        table.insert(
            "Basefemale".to_string(),
            "dcl://base-avatars/BaseFemale".to_string(),
        );
        table.insert(
            "dcl://base-avatars/Moccasin".to_string(),
            "dcl://base-avatars/SchoolShoes".to_string(),
        );
        Self(table)
    }
}

impl LegacyFixups {
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    pub fn apply<'a>(&'a self, legacy_id: &'a str) -> &'a str {
        self.0.get(legacy_id).map(String::as_str).unwrap_or(legacy_id)
    }
}

/// Resolver for the `dcl://<collection>/<name>` scheme.
///
/// Off-chain collections (`base-avatars` by default) resolve to
/// `urn:decentraland:off-chain:<collection>:<name>`; any other collection to
/// `urn:decentraland:ethereum:collections-v1:<collection>:<name>`.
#[derive(Debug, Clone)]
pub struct DecentralandResolver {
    off_chain: Vec<String>,
    addresses: BTreeMap<String, String>,
    fixups: LegacyFixups,
}

impl Default for DecentralandResolver {
    fn default() -> Self {
        Self {
            off_chain: vec!["base-avatars".to_string()],
            addresses: BTreeMap::new(),
            fixups: LegacyFixups::default(),
        }
    }
}

impl DecentralandResolver {
    pub fn new(off_chain: Vec<String>, addresses: BTreeMap<String, String>) -> Self {
        Self {
            off_chain,
            addresses,
            fixups: LegacyFixups::default(),
        }
    }

    pub fn with_fixups(mut self, fixups: LegacyFixups) -> Self {
        self.fixups = fixups;
        self
    }
}

impl UrnResolver for DecentralandResolver {
    fn resolve(&self, legacy_id: &str) -> Result<ResolvedUrn> {
        let fixed = self.fixups.apply(legacy_id);
        if fixed != legacy_id {
            debug!(from = %legacy_id, to = %fixed, "applied legacy id fixup");
        }

        let fail = |reason: &str| WardrobeError::IdentifierResolution {
            id: legacy_id.to_string(),
            reason: reason.to_string(),
        };

        let rest = fixed
            .strip_prefix("dcl://")
            .ok_or_else(|| fail("expected a dcl:// id"))?;
        let (collection, name) = rest
            .split_once('/')
            .ok_or_else(|| fail("expected dcl://<collection>/<name>"))?;
        if !is_segment(collection) || !is_segment(name) {
            return Err(fail("collection and name must be non-empty [A-Za-z0-9_.-] segments"));
        }

        if self.off_chain.iter().any(|c| c == collection) {
            return Ok(ResolvedUrn {
                urn: format!("urn:decentraland:off-chain:{}:{}", collection, name),
                collection_name: None,
                collection_address: None,
            });
        }

        Ok(ResolvedUrn {
            urn: format!(
                "urn:decentraland:ethereum:collections-v1:{}:{}",
                collection, name
            ),
            collection_name: Some(collection.to_string()),
            collection_address: self.addresses.get(collection).cloned(),
        })
    }
}

fn is_segment(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}
