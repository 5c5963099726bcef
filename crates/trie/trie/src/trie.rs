use crate::{commit::Committer, node_set::StorageNode, TrieError};
use core::marker::PhantomData;
use flint_trie_common::{BitKey, Node, TrieStorage, MAX_HEIGHT};
use starknet_types_core::{felt::Felt, hash::StarkHash};
use std::fmt::Write as _;
use tracing::{debug, trace};

/// Depth up to which the commitment pass recurses on parallel tasks.
const DEFAULT_MAX_PARALLEL_DEPTH: u8 = 8;

/// A dense binary Merkle Patricia Trie over field-element keys and values.
///
/// Nodes are keyed on their full root-relative path, so point reads are O(1)
/// and inserts O(log n) against a flat keyspace. Single-child chains are
/// path-compressed: the stored root may sit several levels deep when only one
/// branch of the key space is populated. The commitment nevertheless equals
/// the canonical sparse Merkle Patricia Trie commitment of the Starknet state
/// specification over the same key/value mapping.
///
/// Mutations restructure locally and record the affected paths; hashes are
/// recomputed lazily along those paths when [`Trie::root`] runs. A trie
/// expects a single external mutator; only the commitment pass uses internal
/// parallelism, mediated by the storage's synced view.
pub struct Trie<S, H> {
    storage: S,
    height: u8,
    root_key: Option<BitKey>,
    max_key: Felt,
    dirty_nodes: Vec<BitKey>,
    root_key_is_dirty: bool,
    max_parallel_depth: u8,
    _hasher: PhantomData<H>,
}

impl<S: std::fmt::Debug, H> std::fmt::Debug for Trie<S, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Trie")
            .field("storage", &self.storage)
            .field("height", &self.height)
            .field("root_key", &self.root_key)
            .field("max_key", &self.max_key)
            .field("dirty_nodes", &self.dirty_nodes)
            .field("root_key_is_dirty", &self.root_key_is_dirty)
            .field("max_parallel_depth", &self.max_parallel_depth)
            .finish()
    }
}

impl<S, H> Trie<S, H>
where
    S: TrieStorage,
    H: StarkHash,
{
    /// Opens the trie persisted in `storage`.
    ///
    /// Recovers the root key from the backend; an absent slot means an empty
    /// trie. Leaves live at depth `height`.
    pub fn new(storage: S, height: u8) -> Result<Self, TrieError> {
        if height > MAX_HEIGHT {
            return Err(TrieError::InvalidHeight { height });
        }
        let max_key = BitKey::filled(height).as_felt();
        let root_key = storage.root_key()?;
        Ok(Self {
            storage,
            height,
            root_key,
            max_key,
            dirty_nodes: Vec::new(),
            root_key_is_dirty: false,
            max_parallel_depth: DEFAULT_MAX_PARALLEL_DEPTH,
            _hasher: PhantomData,
        })
    }

    /// Overrides the depth up to which the commitment pass parallelizes.
    ///
    /// The computed commitment does not depend on this value.
    pub const fn with_max_parallel_depth(mut self, depth: u8) -> Self {
        self.max_parallel_depth = depth;
        self
    }

    /// Trie height; leaves live at this depth.
    pub const fn height(&self) -> u8 {
        self.height
    }

    /// Storage key of the root node, when the trie is non-empty.
    pub const fn root_key(&self) -> Option<&BitKey> {
        self.root_key.as_ref()
    }

    /// Converts a field-element key into the storage key of its leaf slot.
    pub fn felt_to_key(&self, key: &Felt) -> BitKey {
        BitKey::from_felt(key, self.height)
    }

    /// Value stored under `key`; `Felt::ZERO` when the key is absent.
    pub fn get(&self, key: &Felt) -> Result<Felt, TrieError> {
        let leaf_key = self.felt_to_key(key);
        Ok(self.storage.get(&leaf_key)?.map(|node| node.value).unwrap_or(Felt::ZERO))
    }

    /// Node stored at an arbitrary storage key.
    pub fn node(&self, key: &BitKey) -> Result<Option<Node>, TrieError> {
        Ok(self.storage.get(key)?)
    }

    /// Stores `node` at `key` verbatim, bypassing the write path. Bulk
    /// loaders use this to lay down pre-built structure.
    pub fn put_inner(&mut self, key: &BitKey, node: &Node) -> Result<(), TrieError> {
        Ok(self.storage.put(key, node)?)
    }

    /// Updates the value stored under `key`, returning the previous value.
    ///
    /// A zero `value` deletes the key. `Some(Felt::ZERO)` reports a fresh
    /// insert, `Some(old)` an overwrite or deletion, `None` a no-op (zero
    /// written to an absent key).
    pub fn put(&mut self, key: &Felt, value: &Felt) -> Result<Option<Felt>, TrieError> {
        self.put_with_proof(key, value, &[])
    }

    /// Same as [`Trie::put`], additionally consulting `proof` so the write
    /// can splice into a partially-materialized trie.
    ///
    /// When the insertion sibling turns out to be a proof node from the set,
    /// no branching node is created: the proof node itself becomes the new
    /// leaf's parent and keeps the recorded hash for its other side.
    pub fn put_with_proof(
        &mut self,
        key: &Felt,
        value: &Felt,
        proof: &[StorageNode],
    ) -> Result<Option<Felt>, TrieError> {
        if key > &self.max_key {
            return Err(TrieError::KeyOutOfRange { key: *key, height: self.height });
        }

        let leaf_key = self.felt_to_key(key);
        let leaf = Node::leaf(*value);

        if let Some(old) = self.update_leaf(&leaf_key, &leaf, value)? {
            return Ok(Some(old));
        }

        let nodes = self.nodes_from_root(&leaf_key)?;
        let Some(sibling) = nodes.last() else {
            return self.insert_into_empty(leaf_key, &leaf, value);
        };

        // The fast path intercepted nonzero overwrites, so an exact key match
        // here is a deletion request.
        if sibling.key == leaf_key {
            let old = sibling.node.value;
            self.delete_last(&nodes)?;
            return Ok(Some(old));
        }
        if *value == Felt::ZERO {
            // deleting an absent key
            return Ok(None);
        }

        let proof_parent = proof.iter().find(|entry| entry.key == sibling.key);
        let sibling = proof_parent.unwrap_or(sibling);
        self.insert_branch(&leaf_key, &leaf, &nodes, sibling, proof_parent.is_some())?;
        Ok(Some(Felt::ZERO))
    }

    /// Computes the trie commitment, persisting refreshed node hashes and the
    /// root-key slot. Clears the dirty list.
    pub fn root(&mut self) -> Result<Felt, TrieError> {
        // The root key goes out first so a reopened trie can find the root
        // even if hashing fails midway.
        if self.root_key_is_dirty {
            match &self.root_key {
                Some(key) => self.storage.put_root_key(key)?,
                None => self.storage.delete_root_key()?,
            }
            self.root_key_is_dirty = false;
        }

        let Some(root_key) = self.root_key else {
            return Ok(Felt::ZERO);
        };

        trace!(target: "trie::root", dirty = self.dirty_nodes.len(), "computing commitment");
        let view = self.storage.synced();
        let committer =
            Committer::new(&view, &self.dirty_nodes, self.height, self.max_parallel_depth);
        let root = committer.update_if_dirty::<H>(&root_key)?;
        drop(view);
        self.dirty_nodes.clear();

        let root_hash = root.hash::<H>(&root_key.relative_path(None));
        debug!(target: "trie::root", root = %root_hash, "commitment computed");
        Ok(root_hash)
    }

    /// Forces commitment computation, discarding the value.
    pub fn commit(&mut self) -> Result<(), TrieError> {
        self.root().map(drop)
    }

    /// Renders the trie structure as indented text, for debugging.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        self.dump_node(&mut out, 0, self.root_key.as_ref(), None);
        out
    }

    /// Overwrites an existing leaf in place, skipping the descent. Returns
    /// `None` when the write is not a plain leaf overwrite.
    fn update_leaf(
        &mut self,
        leaf_key: &BitKey,
        node: &Node,
        value: &Felt,
    ) -> Result<Option<Felt>, TrieError> {
        if *value == Felt::ZERO {
            return Ok(None);
        }
        let Some(existing) = self.storage.get(leaf_key)? else {
            return Ok(None);
        };
        self.storage.put(leaf_key, node)?;
        self.dirty_nodes.push(*leaf_key);
        trace!(target: "trie::put", key = %leaf_key, "leaf overwritten");
        Ok(Some(existing.value))
    }

    fn insert_into_empty(
        &mut self,
        leaf_key: BitKey,
        node: &Node,
        value: &Felt,
    ) -> Result<Option<Felt>, TrieError> {
        if *value == Felt::ZERO {
            return Ok(None);
        }
        self.storage.put(&leaf_key, node)?;
        self.set_root_key(Some(leaf_key));
        trace!(target: "trie::put", key = %leaf_key, "first leaf inserted");
        Ok(Some(Felt::ZERO))
    }

    /// Nodes traversed from the root towards `key`, root first.
    ///
    /// Descends while the current node's key is a strict prefix of `key`,
    /// choosing the child selected by the key's bit below the current depth.
    /// The final entry is the insertion sibling: the nearest node that is not
    /// a strict prefix, or the deepest materialized ancestor when a missing
    /// (proof) child cuts the walk short.
    fn nodes_from_root(&self, key: &BitKey) -> Result<Vec<StorageNode>, TrieError> {
        let mut nodes = Vec::new();
        let mut cur = self.root_key;
        while let Some(cur_key) = cur {
            let node = self.storage.get(&cur_key)?.ok_or(TrieError::MissingNode(cur_key))?;
            let descend = cur_key.len() < key.len() && key.has_prefix(&cur_key);
            cur = if descend {
                if key.is_bit_set(key.len() - cur_key.len() - 1) {
                    node.right
                } else {
                    node.left
                }
            } else {
                None
            };
            nodes.push(StorageNode::new(cur_key, node));
            if !descend {
                break;
            }
        }
        Ok(nodes)
    }

    /// Removes the trailing node of a descent and collapses its parent: the
    /// parent would keep a single child, so the sibling is promoted into the
    /// parent's place.
    fn delete_last(&mut self, nodes: &[StorageNode]) -> Result<(), TrieError> {
        let Some((last, ancestors)) = nodes.split_last() else {
            return Ok(());
        };
        self.storage.delete(&last.key)?;
        trace!(target: "trie::put", key = %last.key, "leaf removed");

        let Some((parent, grandparents)) = ancestors.split_last() else {
            // the deleted node was the sole root
            self.set_root_key(None);
            return Ok(());
        };
        self.storage.delete(&parent.key)?;

        let sibling_key = if parent.node.left == Some(last.key) {
            parent.node.right
        } else {
            parent.node.left
        };
        let sibling_key = sibling_key.expect("collapsed parent keeps a materialized sibling");

        match grandparents.last() {
            None => self.set_root_key(Some(sibling_key)),
            Some(grandparent) => {
                let mut relinked = grandparent.node.clone();
                if relinked.left == Some(parent.key) {
                    relinked.left = Some(sibling_key);
                } else {
                    relinked.right = Some(sibling_key);
                }
                self.storage.put(&grandparent.key, &relinked)?;
                self.dirty_nodes.push(sibling_key);
            }
        }
        Ok(())
    }

    /// Splices a new leaf in next to `sibling`: either materializes a fresh
    /// branching node at their common prefix, or adopts the proof node
    /// already stored there when the sibling came from the proof set.
    fn insert_branch(
        &mut self,
        leaf_key: &BitKey,
        leaf: &Node,
        nodes: &[StorageNode],
        sibling: &StorageNode,
        sibling_is_proof: bool,
    ) -> Result<(), TrieError> {
        let (common_key, _) = BitKey::common_key(leaf_key, &sibling.key);
        let new_is_right = leaf_key.is_bit_set(leaf_key.len() - common_key.len() - 1);

        if sibling_is_proof {
            let mut parent =
                self.storage.get(&common_key)?.ok_or(TrieError::MissingNode(common_key))?;
            let leaf_commit = leaf.hash::<H>(&leaf_key.relative_path(Some(&common_key)));
            if new_is_right {
                parent.right = Some(*leaf_key);
                parent.right_hash = Some(leaf_commit);
            } else {
                parent.left = Some(*leaf_key);
                parent.left_hash = Some(leaf_commit);
            }
            self.storage.put(&common_key, &parent)?;
            self.dirty_nodes.push(common_key);
            self.dirty_nodes.push(*leaf_key);
        } else {
            let (left_key, right_key, left_node, right_node) = if new_is_right {
                (sibling.key, *leaf_key, &sibling.node, leaf)
            } else {
                (*leaf_key, sibling.key, leaf, &sibling.node)
            };
            let parent = Node {
                value: H::hash(
                    &left_node.hash::<H>(&left_key.relative_path(Some(&common_key))),
                    &right_node.hash::<H>(&right_key.relative_path(Some(&common_key))),
                ),
                left: Some(left_key),
                right: Some(right_key),
                left_hash: None,
                right_hash: None,
            };
            self.storage.put(&common_key, &parent)?;

            if nodes.len() > 1 {
                let grandparent = &nodes[nodes.len() - 2];
                let mut relinked = grandparent.node.clone();
                if relinked.left == Some(sibling.key) {
                    relinked.left = Some(common_key);
                } else {
                    relinked.right = Some(common_key);
                }
                self.storage.put(&grandparent.key, &relinked)?;
                self.dirty_nodes.push(common_key);
            } else {
                self.set_root_key(Some(common_key));
            }
        }

        self.storage.put(leaf_key, leaf)?;
        trace!(target: "trie::put", key = %leaf_key, parent = %common_key, "leaf inserted");
        Ok(())
    }

    fn set_root_key(&mut self, key: Option<BitKey>) {
        self.root_key = key;
        self.root_key_is_dirty = true;
    }

    fn dump_node(
        &self,
        out: &mut String,
        level: usize,
        key: Option<&BitKey>,
        parent: Option<&BitKey>,
    ) {
        let indent = "  ".repeat(level);
        let Some(key) = key else {
            let _ = writeln!(out, "{indent}EMPTY");
            return;
        };
        let Ok(Some(node)) = self.storage.get(key) else {
            let _ = writeln!(out, "{indent}{key}: <missing>");
            return;
        };
        let _ = writeln!(
            out,
            "{indent}key: {key} path: {} left: {:?} right: {:?} lh: {:?} rh: {:?} value: {:#x}",
            key.relative_path(parent),
            node.left,
            node.right,
            node.left_hash,
            node.right_hash,
            node.value,
        );
        if node.left.is_some() || node.right.is_some() {
            self.dump_node(out, level + 1, node.left.as_ref(), Some(key));
            self.dump_node(out, level + 1, node.right.as_ref(), Some(key));
        }
    }
}
