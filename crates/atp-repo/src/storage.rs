// SPDX-License-Identifier: MIT OR Apache-2.0

use cid::multihash::Multihash;
use cid::Cid;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;

/// Multicodec code for raw block payloads.
pub const RAW_CODEC: u64 = 0x55;
/// Multihash code for SHA-256.
pub const SHA2_256: u64 = 0x12;

// ---------------------------------------------------------------------------
// BlockStorage
// ---------------------------------------------------------------------------

/// Content-addressed block storage capability.
///
/// CID strings are opaque to callers; distinct byte content must yield
/// distinct CIDs.
pub trait BlockStorage: Send + Sync {
    /// Store `bytes`, returning their CID.
    fn put(&self, bytes: Vec<u8>) -> String;
    /// The bytes stored under `cid`, if any.
    fn get(&self, cid: &str) -> Option<Vec<u8>>;
    /// Whether `cid` is present.
    fn has(&self, cid: &str) -> bool;
    /// Remove `cid`. Removing an unknown CID is a no-op.
    fn delete(&self, cid: &str);
    /// Number of stored blocks.
    fn count(&self) -> usize;
}

// ---------------------------------------------------------------------------
// MemoryBlockStorage
// ---------------------------------------------------------------------------

/// In-memory [`BlockStorage`] deriving real CIDv1 (raw, sha2-256)
/// addresses, so the map is genuinely content-addressed.
#[derive(Debug, Default)]
pub struct MemoryBlockStorage {
    blocks: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryBlockStorage {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// The CIDv1 a block of `bytes` would be stored under.
    pub fn cid_for(bytes: &[u8]) -> String {
        let digest = Sha256::digest(bytes);
        let hash = Multihash::<64>::wrap(SHA2_256, digest.as_slice())
            .expect("sha-256 digest fits a 64-byte multihash");
        Cid::new_v1(RAW_CODEC, hash).to_string()
    }
}

impl BlockStorage for MemoryBlockStorage {
    fn put(&self, bytes: Vec<u8>) -> String {
        let cid = Self::cid_for(&bytes);
        self.blocks
            .lock()
            .expect("block storage lock poisoned")
            .insert(cid.clone(), bytes);
        cid
    }

    fn get(&self, cid: &str) -> Option<Vec<u8>> {
        self.blocks
            .lock()
            .expect("block storage lock poisoned")
            .get(cid)
            .cloned()
    }

    fn has(&self, cid: &str) -> bool {
        self.blocks
            .lock()
            .expect("block storage lock poisoned")
            .contains_key(cid)
    }

    fn delete(&self, cid: &str) {
        self.blocks
            .lock()
            .expect("block storage lock poisoned")
            .remove(cid);
    }

    fn count(&self) -> usize {
        self.blocks.lock().expect("block storage lock poisoned").len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_round_trip() {
        let storage = MemoryBlockStorage::new();
        let cid = storage.put(b"hello blocks".to_vec());
        assert_eq!(storage.get(&cid).unwrap(), b"hello blocks");
        assert!(storage.has(&cid));
        assert_eq!(storage.count(), 1);
    }

    #[test]
    fn distinct_content_distinct_cids() {
        let storage = MemoryBlockStorage::new();
        let a = storage.put(b"a".to_vec());
        let b = storage.put(b"b".to_vec());
        assert_ne!(a, b);
        assert_eq!(storage.count(), 2);
    }

    #[test]
    fn identical_content_deduplicates() {
        let storage = MemoryBlockStorage::new();
        let a = storage.put(b"same".to_vec());
        let b = storage.put(b"same".to_vec());
        assert_eq!(a, b);
        assert_eq!(storage.count(), 1);
    }

    #[test]
    fn delete_unknown_cid_is_a_noop() {
        let storage = MemoryBlockStorage::new();
        storage.delete("bafkreinothere");
        assert_eq!(storage.count(), 0);
    }

    #[test]
    fn delete_removes_block() {
        let storage = MemoryBlockStorage::new();
        let cid = storage.put(b"bye".to_vec());
        storage.delete(&cid);
        assert!(!storage.has(&cid));
        assert!(storage.get(&cid).is_none());
        assert_eq!(storage.count(), 0);
    }

    #[test]
    fn cids_are_cidv1() {
        let cid = MemoryBlockStorage::cid_for(b"x");
        let parsed = cid::Cid::try_from(cid.as_str()).unwrap();
        assert_eq!(parsed.version(), cid::Version::V1);
        assert_eq!(parsed.codec(), RAW_CODEC);
    }
}
