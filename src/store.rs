use crate::error::{Error, Result};
use crate::hash::Hash;
use crate::index::Index;

/// Raw key-value contract a storage backend must provide (§6). Keys are
/// opaque byte strings produced by [`NodeStore`]; backends need not
/// understand their structure.
pub trait Backend {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;
    fn set(&self, key: &[u8], value: &[u8]) -> Result<()>;
    fn delete(&self, key: &[u8]) -> Result<()>;
    fn has(&self, key: &[u8]) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }
}

/// A leaf's persisted contents: the (index, value) pair a leaf-hash was
/// computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeafRecord {
    pub index: Index,
    pub value: Hash,
}

const TAG_NODE: u8 = b'n';
const TAG_LEAF: u8 = b'l';
const TAG_INDEX: u8 = b'i';

fn key_for(tag: u8, bytes: &[u8; 32]) -> [u8; 33] {
    let mut key = [0u8; 33];
    key[0] = tag;
    key[1..].copy_from_slice(bytes);
    key
}

/// Typed view over a raw [`Backend`]: the node/leaf/index operations of C2,
/// keyed by disjoint tag-prefixed keys so a single flat backend suffices.
pub struct NodeStore<B: Backend> {
    backend: B,
}

impl<B: Backend> NodeStore<B> {
    pub fn new(backend: B) -> Self {
        NodeStore { backend }
    }

    pub fn get_node(&self, h: &Hash) -> Result<Option<(Hash, Hash)>> {
        let key = key_for(TAG_NODE, h);
        match self.backend.get(&key)? {
            None => Ok(None),
            Some(bytes) => {
                if bytes.len() != 64 {
                    return Err(Error::CorruptStore("internal node value was not 64 bytes"));
                }
                let mut l = [0u8; 32];
                let mut r = [0u8; 32];
                l.copy_from_slice(&bytes[0..32]);
                r.copy_from_slice(&bytes[32..64]);
                Ok(Some((l, r)))
            }
        }
    }

    pub fn put_node(&self, h: &Hash, l: &Hash, r: &Hash) -> Result<()> {
        let key = key_for(TAG_NODE, h);
        let mut value = Vec::with_capacity(64);
        value.extend_from_slice(l);
        value.extend_from_slice(r);
        self.backend.set(&key, &value)
    }

    pub fn delete_node(&self, h: &Hash) -> Result<()> {
        let key = key_for(TAG_NODE, h);
        self.backend.delete(&key)
    }

    pub fn get_leaf(&self, h: &Hash) -> Result<Option<LeafRecord>> {
        let key = key_for(TAG_LEAF, h);
        match self.backend.get(&key)? {
            None => Ok(None),
            Some(bytes) => {
                if bytes.len() != 64 {
                    return Err(Error::CorruptStore("leaf record value was not 64 bytes"));
                }
                let mut value = [0u8; 32];
                let mut index_bytes = [0u8; 32];
                value.copy_from_slice(&bytes[0..32]);
                index_bytes.copy_from_slice(&bytes[32..64]);
                Ok(Some(LeafRecord {
                    index: Index::from_be_bytes(index_bytes),
                    value,
                }))
            }
        }
    }

    /// Stores the leaf record and keeps the index→leaf-hash map consistent
    /// with it (I3).
    pub fn put_leaf(&self, h: &Hash, record: &LeafRecord) -> Result<()> {
        let key = key_for(TAG_LEAF, h);
        let mut value = Vec::with_capacity(64);
        value.extend_from_slice(&record.value);
        value.extend_from_slice(&record.index.to_be_bytes());
        self.backend.set(&key, &value)?;
        let index_key = key_for(TAG_INDEX, &record.index.to_be_bytes());
        self.backend.set(&index_key, h)
    }

    /// Removes the leaf record and its index mapping together.
    pub fn delete_leaf(&self, h: &Hash) -> Result<()> {
        if let Some(record) = self.get_leaf(h)? {
            let index_key = key_for(TAG_INDEX, &record.index.to_be_bytes());
            self.backend.delete(&index_key)?;
        }
        let key = key_for(TAG_LEAF, h);
        self.backend.delete(&key)
    }

    pub fn lookup_by_index(&self, i: &Index) -> Result<Option<Hash>> {
        let key = key_for(TAG_INDEX, &i.to_be_bytes());
        match self.backend.get(&key)? {
            None => Ok(None),
            Some(bytes) => {
                if bytes.len() != 32 {
                    return Err(Error::CorruptStore("index->hash value was not 32 bytes"));
                }
                let mut h = [0u8; 32];
                h.copy_from_slice(&bytes);
                Ok(Some(h))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_backend::MemoryBackend;

    #[test]
    fn put_get_node_round_trip() {
        let store = NodeStore::new(MemoryBackend::new());
        let h = [1u8; 32];
        let l = [2u8; 32];
        let r = [3u8; 32];
        store.put_node(&h, &l, &r).unwrap();
        assert_eq!(store.get_node(&h).unwrap(), Some((l, r)));
        assert_eq!(store.get_node(&[9u8; 32]).unwrap(), None);
    }

    #[test]
    fn delete_node_removes_it() {
        let store = NodeStore::new(MemoryBackend::new());
        let h = [1u8; 32];
        store.put_node(&h, &[2u8; 32], &[3u8; 32]).unwrap();
        store.delete_node(&h).unwrap();
        assert_eq!(store.get_node(&h).unwrap(), None);
    }

    #[test]
    fn put_leaf_updates_index_map() {
        let store = NodeStore::new(MemoryBackend::new());
        let h = [7u8; 32];
        let record = LeafRecord {
            index: Index::from_u64(42),
            value: [9u8; 32],
        };
        store.put_leaf(&h, &record).unwrap();
        assert_eq!(store.get_leaf(&h).unwrap(), Some(record));
        assert_eq!(store.lookup_by_index(&Index::from_u64(42)).unwrap(), Some(h));
    }

    #[test]
    fn delete_leaf_removes_index_map_too() {
        let store = NodeStore::new(MemoryBackend::new());
        let h = [7u8; 32];
        let record = LeafRecord {
            index: Index::from_u64(42),
            value: [9u8; 32],
        };
        store.put_leaf(&h, &record).unwrap();
        store.delete_leaf(&h).unwrap();
        assert_eq!(store.get_leaf(&h).unwrap(), None);
        assert_eq!(store.lookup_by_index(&Index::from_u64(42)).unwrap(), None);
    }

    #[test]
    fn node_and_leaf_keyspaces_are_disjoint() {
        let store = NodeStore::new(MemoryBackend::new());
        let h = [5u8; 32];
        store.put_node(&h, &[1u8; 32], &[2u8; 32]).unwrap();
        let record = LeafRecord {
            index: Index::from_u64(1),
            value: [3u8; 32],
        };
        store.put_leaf(&h, &record).unwrap();
        // Same hash `h` used as both a node key and a leaf key must not collide.
        assert!(store.get_node(&h).unwrap().is_some());
        assert!(store.get_leaf(&h).unwrap().is_some());
    }
}
