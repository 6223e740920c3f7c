//! Deterministic content identifiers
//!
//! Identifiers are CIDv0 strings (`Qm...`): the base58btc encoding of a
//! sha2-256 multihash over a dag-pb block. Files are laid out the way the
//! UnixFS importer lays them out, so an identifier computed here matches the
//! one a content server computes for the same bytes.

use crate::error::{Result, WardrobeError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Size of a leaf chunk in a file DAG
pub const CHUNK_SIZE: usize = 262_144;

/// Maximum number of children of an interior file node
pub const MAX_LINKS: usize = 174;

const SHA2_256: u8 = 0x12;
const DIGEST_LEN: u8 = 0x20;

// UnixFS Data.Type values
const UNIXFS_DIRECTORY: u64 = 1;
const UNIXFS_FILE: u64 = 2;

/// A content identifier: the sha2-256 digest of a dag-pb block
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct ContentId([u8; 32]);

impl ContentId {
    /// Identify an already-encoded block
    fn of_block(block: &[u8]) -> Self {
        let digest = Sha256::digest(block);
        Self(digest.into())
    }

    /// The multihash bytes (`0x12 0x20 || digest`)
    pub fn multihash(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(34);
        out.push(SHA2_256);
        out.push(DIGEST_LEN);
        out.extend_from_slice(&self.0);
        out
    }

    /// The raw sha2-256 digest
    pub fn digest(&self) -> &[u8; 32] {
        &self.0
    }

    /// Parse a base58btc CIDv0 string
    pub fn parse(s: &str) -> Result<Self> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| WardrobeError::ContentAddressing(format!("'{}' is not base58: {}", s, e)))?;
        if bytes.len() != 34 || bytes[0] != SHA2_256 || bytes[1] != DIGEST_LEN {
            return Err(WardrobeError::ContentAddressing(format!(
                "'{}' is not a sha2-256 multihash",
                s
            )));
        }
        let mut digest = [0u8; 32];
        digest.copy_from_slice(&bytes[2..]);
        Ok(Self(digest))
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(self.multihash()).into_string())
    }
}

impl fmt::Debug for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentId({})", self)
    }
}

impl FromStr for ContentId {
    type Err = WardrobeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for ContentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ContentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Identify a byte buffer as a UnixFS file
pub fn identify(bytes: &[u8]) -> ContentId {
    layout_file(bytes, CHUNK_SIZE, MAX_LINKS).cid
}

/// Identify a file on disk by its contents; the file name plays no part
pub fn identify_file<P: AsRef<Path>>(path: P) -> Result<ContentId> {
    let bytes = std::fs::read(path.as_ref())?;
    Ok(identify(&bytes))
}

/// Identify a set of named buffers as a UnixFS directory.
///
/// Entries are sorted byte-wise by name first, so input order never matters.
/// Two entries with the same name are rejected.
pub fn identify_named_set<N, B>(entries: &[(N, B)]) -> Result<ContentId>
where
    N: AsRef<str>,
    B: AsRef<[u8]>,
{
    let mut sorted: Vec<(&str, &[u8])> = entries
        .iter()
        .map(|(name, bytes)| (name.as_ref(), bytes.as_ref()))
        .collect();
    sorted.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

    for pair in sorted.windows(2) {
        if pair[0].0 == pair[1].0 {
            return Err(WardrobeError::ContentAddressing(format!(
                "duplicate entry name '{}'",
                pair[0].0
            )));
        }
    }

    let mut links = Vec::with_capacity(sorted.len());
    for (name, bytes) in sorted {
        let child = layout_file(bytes, CHUNK_SIZE, MAX_LINKS);
        links.push(Link {
            hash: child.cid,
            name,
            tsize: child.cumulative_size,
        });
    }

    let data = unixfs_data(UNIXFS_DIRECTORY, &[], None, &[]);
    let block = dag_node(&links, &data);
    Ok(ContentId::of_block(&block))
}

/// A node of a file DAG once encoded
#[derive(Debug, Clone)]
struct DagNode {
    cid: ContentId,
    /// Encoded size of this block plus every block below it
    cumulative_size: u64,
    /// Number of file bytes under this node
    file_size: u64,
    #[cfg(test)]
    block: Vec<u8>,
}

struct Link<'a> {
    hash: ContentId,
    name: &'a str,
    tsize: u64,
}

/// Chunk `bytes` and build a balanced tree bottom-up
fn layout_file(bytes: &[u8], chunk_size: usize, max_links: usize) -> DagNode {
    if bytes.len() <= chunk_size {
        return leaf(bytes);
    }

    let mut level: Vec<DagNode> = bytes.chunks(chunk_size).map(leaf).collect();
    loop {
        level = level.chunks(max_links).map(parent).collect();
        if level.len() == 1 {
            break;
        }
    }
    level.remove(0)
}

fn leaf(chunk: &[u8]) -> DagNode {
    let data = unixfs_data(UNIXFS_FILE, chunk, Some(chunk.len() as u64), &[]);
    let block = dag_node(&[], &data);
    DagNode {
        cid: ContentId::of_block(&block),
        cumulative_size: block.len() as u64,
        file_size: chunk.len() as u64,
        #[cfg(test)]
        block,
    }
}

fn parent(children: &[DagNode]) -> DagNode {
    let file_size: u64 = children.iter().map(|c| c.file_size).sum();
    let blocksizes: Vec<u64> = children.iter().map(|c| c.file_size).collect();
    let links: Vec<Link<'_>> = children
        .iter()
        .map(|c| Link {
            hash: c.cid,
            name: "",
            tsize: c.cumulative_size,
        })
        .collect();

    let data = unixfs_data(UNIXFS_FILE, &[], Some(file_size), &blocksizes);
    let block = dag_node(&links, &data);
    let below: u64 = children.iter().map(|c| c.cumulative_size).sum();
    DagNode {
        cid: ContentId::of_block(&block),
        cumulative_size: block.len() as u64 + below,
        file_size,
        #[cfg(test)]
        block,
    }
}

/// Encode a UnixFS `Data` message
fn unixfs_data(kind: u64, data: &[u8], filesize: Option<u64>, blocksizes: &[u64]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + 16);
    put_varint_field(1, kind, &mut out);
    if !data.is_empty() {
        put_bytes_field(2, data, &mut out);
    }
    if let Some(size) = filesize {
        put_varint_field(3, size, &mut out);
    }
    for size in blocksizes {
        put_varint_field(4, *size, &mut out);
    }
    out
}

/// Encode a dag-pb `PBNode`. Links precede data in canonical form.
fn dag_node(links: &[Link<'_>], data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + links.len() * 48 + 8);
    for link in links {
        let mut encoded = Vec::with_capacity(48);
        put_bytes_field(1, &link.hash.multihash(), &mut encoded);
        put_bytes_field(2, link.name.as_bytes(), &mut encoded);
        put_varint_field(3, link.tsize, &mut encoded);
        put_bytes_field(2, &encoded, &mut out);
    }
    put_bytes_field(1, data, &mut out);
    out
}

fn put_varint_field(field: u64, value: u64, out: &mut Vec<u8>) {
    put_varint(field << 3, out);
    put_varint(value, out);
}

fn put_bytes_field(field: u64, bytes: &[u8], out: &mut Vec<u8>) {
    put_varint((field << 3) | 2, out);
    put_varint(bytes.len() as u64, out);
    out.extend_from_slice(bytes);
}

fn put_varint(mut value: u64, out: &mut Vec<u8>) {
    while value >= 0x80 {
        out.push((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}
