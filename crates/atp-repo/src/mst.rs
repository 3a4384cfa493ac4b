// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::storage::BlockStorage;
use atp_error::{Error, Result};
use atp_syntax::CidLink;
use cid::Cid;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Node model
// ---------------------------------------------------------------------------

/// A decoded Merkle Search Tree node.
///
/// Children are content-address links only; dereferencing is an explicit
/// [`BlockStorage`] call, never a pointer traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MstNode {
    /// Subtree containing keys ordered before every entry in this node.
    pub left: Option<CidLink>,
    /// Entries in key order.
    pub entries: Vec<MstEntry>,
}

/// One record entry inside an MST node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MstEntry {
    /// Bytes shared with the previous key.
    pub prefix_len: usize,
    /// Key bytes after the shared prefix.
    pub key_suffix: Vec<u8>,
    /// Record value link.
    pub value: CidLink,
    /// Subtree between this entry and the next.
    pub right: Option<CidLink>,
}

// Wire shape: {l: CID?, e: [{p: int, k: bytes, v: CID, t: CID?}]}.
#[derive(Debug, Serialize, Deserialize)]
struct NodeWire {
    l: Option<Cid>,
    e: Vec<EntryWire>,
}

#[derive(Debug, Serialize, Deserialize)]
struct EntryWire {
    p: u64,
    #[serde(with = "serde_bytes")]
    k: Vec<u8>,
    v: Cid,
    t: Option<Cid>,
}

impl MstNode {
    /// Decode a node from its DAG-CBOR block bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let wire: NodeWire = serde_ipld_dagcbor::from_slice(bytes)
            .map_err(|e| Error::Mst(format!("node decoding: {e}")))?;
        Ok(Self {
            left: wire.l.map(link_from_cid),
            entries: wire
                .e
                .into_iter()
                .map(|entry| MstEntry {
                    prefix_len: entry.p as usize,
                    key_suffix: entry.k,
                    value: link_from_cid(entry.v),
                    right: entry.t.map(link_from_cid),
                })
                .collect(),
        })
    }
}

fn link_from_cid(cid: Cid) -> CidLink {
    CidLink::new(cid.to_string()).expect("CID strings are non-empty")
}

// ---------------------------------------------------------------------------
// MstReader
// ---------------------------------------------------------------------------

/// Read-only MST traversal over a [`BlockStorage`].
pub struct MstReader<'a, S: BlockStorage + ?Sized> {
    storage: &'a S,
}

impl<'a, S: BlockStorage + ?Sized> MstReader<'a, S> {
    /// A reader over `storage`.
    pub fn new(storage: &'a S) -> Self {
        Self { storage }
    }

    /// In-order walk from `root`, yielding `(key, value)` pairs in
    /// lexicographic key order.
    pub fn walk(&self, root: &CidLink) -> Result<Vec<(String, CidLink)>> {
        let mut records = Vec::new();
        let mut last_key = String::new();
        self.walk_node(root, &mut last_key, &mut records)?;
        Ok(records)
    }

    /// Look up a single key; the same walk with a short-circuit return.
    pub fn lookup(&self, root: &CidLink, key: &str) -> Result<Option<CidLink>> {
        let mut last_key = String::new();
        self.lookup_node(root, key, &mut last_key)
    }

    fn load(&self, link: &CidLink) -> Result<MstNode> {
        let bytes = self
            .storage
            .get(link.as_str())
            .ok_or_else(|| Error::Mst(format!("missing block {link}")))?;
        MstNode::decode(&bytes)
    }

    fn walk_node(
        &self,
        link: &CidLink,
        last_key: &mut String,
        records: &mut Vec<(String, CidLink)>,
    ) -> Result<()> {
        let node = self.load(link)?;
        if let Some(ref left) = node.left {
            self.walk_node(left, last_key, records)?;
        }
        for entry in &node.entries {
            let key = reconstruct_key(last_key, entry)?;
            records.push((key.clone(), entry.value.clone()));
            *last_key = key;
            if let Some(ref right) = entry.right {
                self.walk_node(right, last_key, records)?;
            }
        }
        Ok(())
    }

    fn lookup_node(
        &self,
        link: &CidLink,
        target: &str,
        last_key: &mut String,
    ) -> Result<Option<CidLink>> {
        let node = self.load(link)?;
        if let Some(ref left) = node.left {
            if let Some(found) = self.lookup_node(left, target, last_key)? {
                return Ok(Some(found));
            }
        }
        for entry in &node.entries {
            let key = reconstruct_key(last_key, entry)?;
            *last_key = key.clone();
            if key == target {
                return Ok(Some(entry.value.clone()));
            }
            if let Some(ref right) = entry.right {
                if let Some(found) = self.lookup_node(right, target, last_key)? {
                    return Ok(Some(found));
                }
            }
        }
        Ok(None)
    }
}

/// `previous_key[0..prefix_len] ++ key_suffix`, decoded as UTF-8.
fn reconstruct_key(last_key: &str, entry: &MstEntry) -> Result<String> {
    let prefix = last_key.as_bytes().get(..entry.prefix_len).ok_or_else(|| {
        Error::Mst(format!(
            "prefix length {} exceeds previous key length {}",
            entry.prefix_len,
            last_key.len()
        ))
    })?;
    let mut key_bytes = prefix.to_vec();
    key_bytes.extend_from_slice(&entry.key_suffix);
    String::from_utf8(key_bytes).map_err(|e| Error::Mst(format!("key is not UTF-8: {e}")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
