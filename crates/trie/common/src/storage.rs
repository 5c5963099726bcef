use crate::{error::StorageError, key::BitKey, node::Node};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Path-keyed persistence for trie nodes plus the single root-key slot.
///
/// Absent entries read as `Ok(None)`; only genuine backend failures surface
/// as [`StorageError`]. One record is kept per node, keyed by its full
/// root-relative path; the root-key slot names the record the trie descends
/// from, and an empty slot means an empty trie.
pub trait TrieStorage {
    /// View of the backend handed to the commitment pass; admits node reads
    /// and writes from concurrent tasks.
    type Synced<'a>: SyncedStorage
    where
        Self: 'a;

    /// Reads the node stored at `key`.
    fn get(&self, key: &BitKey) -> Result<Option<Node>, StorageError>;

    /// Writes the node at `key`, replacing any previous record.
    fn put(&mut self, key: &BitKey, node: &Node) -> Result<(), StorageError>;

    /// Removes the node at `key`. Removing an absent key is not an error.
    fn delete(&mut self, key: &BitKey) -> Result<(), StorageError>;

    /// Reads the root-key slot.
    fn root_key(&self) -> Result<Option<BitKey>, StorageError>;

    /// Writes the root-key slot.
    fn put_root_key(&mut self, key: &BitKey) -> Result<(), StorageError>;

    /// Clears the root-key slot. Clearing an empty slot is not an error.
    fn delete_root_key(&mut self) -> Result<(), StorageError>;

    /// Borrows the backend as a synced view for the duration of a commitment
    /// pass.
    fn synced(&mut self) -> Self::Synced<'_>;
}

/// Node access safe under the commitment pass's internal parallelism.
#[auto_impl::auto_impl(&)]
pub trait SyncedStorage: Sync {
    /// Reads the node stored at `key`.
    fn get(&self, key: &BitKey) -> Result<Option<Node>, StorageError>;

    /// Writes the node at `key`.
    fn put(&self, key: &BitKey, node: &Node) -> Result<(), StorageError>;
}

/// Hash-map backend used by tests, benches and scratch tries.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    nodes: HashMap<BitKey, Node>,
    root_key: Option<BitKey>,
}

impl MemoryStorage {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether no nodes are stored.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterates over the stored node keys.
    pub fn keys(&self) -> impl Iterator<Item = &BitKey> {
        self.nodes.keys()
    }
}

impl TrieStorage for MemoryStorage {
    type Synced<'a>
        = SyncedMemoryStorage<'a>
    where
        Self: 'a;

    fn get(&self, key: &BitKey) -> Result<Option<Node>, StorageError> {
        Ok(self.nodes.get(key).cloned())
    }

    fn put(&mut self, key: &BitKey, node: &Node) -> Result<(), StorageError> {
        self.nodes.insert(*key, node.clone());
        Ok(())
    }

    fn delete(&mut self, key: &BitKey) -> Result<(), StorageError> {
        self.nodes.remove(key);
        Ok(())
    }

    fn root_key(&self) -> Result<Option<BitKey>, StorageError> {
        Ok(self.root_key)
    }

    fn put_root_key(&mut self, key: &BitKey) -> Result<(), StorageError> {
        self.root_key = Some(*key);
        Ok(())
    }

    fn delete_root_key(&mut self) -> Result<(), StorageError> {
        self.root_key = None;
        Ok(())
    }

    fn synced(&mut self) -> SyncedMemoryStorage<'_> {
        SyncedMemoryStorage { inner: RwLock::new(self) }
    }
}

/// Lock-mediated view of a [`MemoryStorage`] for the commitment pass.
#[derive(Debug)]
pub struct SyncedMemoryStorage<'a> {
    inner: RwLock<&'a mut MemoryStorage>,
}

impl SyncedStorage for SyncedMemoryStorage<'_> {
    fn get(&self, key: &BitKey) -> Result<Option<Node>, StorageError> {
        Ok(self.inner.read().nodes.get(key).cloned())
    }

    fn put(&self, key: &BitKey, node: &Node) -> Result<(), StorageError> {
        self.inner.write().nodes.insert(*key, node.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use starknet_types_core::felt::Felt;

    fn key(value: u64) -> BitKey {
        BitKey::from_felt(&Felt::from(value), 8)
    }

    #[test]
    fn point_operations() {
        let mut storage = MemoryStorage::new();
        let k = key(3);
        assert_eq!(storage.get(&k).unwrap(), None);

        let node = Node::leaf(Felt::from(7_u64));
        storage.put(&k, &node).unwrap();
        assert_eq!(storage.get(&k).unwrap(), Some(node));
        assert_eq!(storage.len(), 1);

        storage.delete(&k).unwrap();
        assert_eq!(storage.get(&k).unwrap(), None);
        // deleting twice is fine
        storage.delete(&k).unwrap();
        assert!(storage.is_empty());
    }

    #[test]
    fn root_key_slot() {
        let mut storage = MemoryStorage::new();
        assert_eq!(storage.root_key().unwrap(), None);
        storage.put_root_key(&key(5)).unwrap();
        assert_eq!(storage.root_key().unwrap(), Some(key(5)));
        storage.delete_root_key().unwrap();
        assert_eq!(storage.root_key().unwrap(), None);
    }

    #[test]
    fn synced_view_supports_concurrent_writers() {
        let mut storage = MemoryStorage::new();
        let view = storage.synced();
        std::thread::scope(|scope| {
            for chunk in 0..4_u64 {
                let view = &view;
                scope.spawn(move || {
                    for i in 0..16 {
                        let k = key(chunk * 16 + i);
                        view.put(&k, &Node::leaf(Felt::from(chunk))).unwrap();
                        assert!(view.get(&k).unwrap().is_some());
                    }
                });
            }
        });
        drop(view);
        assert_eq!(storage.len(), 64);
    }
}
