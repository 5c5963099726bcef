use flint_trie_common::{BitKey, MergeConflict, Node};
use indexmap::{map::Entry, IndexMap};
use starknet_types_core::felt::Felt;

/// A keyed node record: the storage key plus the node stored (or to be
/// stored) there.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageNode {
    /// Full root-relative path of the node.
    pub key: BitKey,
    /// The node record itself.
    pub node: Node,
}

impl StorageNode {
    /// Creates a record for `node` at `key`.
    pub const fn new(key: BitKey, node: Node) -> Self {
        Self { key, node }
    }

    /// A record carrying only a commitment: both children absent. This is the
    /// shape proof nodes arrive in before their subtrees are materialized.
    pub const fn partial(key: BitKey, value: Felt) -> Self {
        Self { key, node: Node::leaf(value) }
    }

    /// Merges `other` into `self`: the keys must match; node fields merge
    /// per [`Node::merge`].
    pub fn merge(&mut self, other: &Self) -> Result<(), MergeConflict> {
        if self.key != other.key {
            return Err(MergeConflict::Key(self.key, other.key));
        }
        self.node.merge(&other.node)
    }
}

/// Insertion-ordered set of [`StorageNode`]s keyed by storage key.
///
/// Inserting a key already present merges the two records instead of
/// replacing, rejecting conflicting fields. Proof verification assembles its
/// node sets through this type before handing them to
/// [`put_with_proof`](crate::Trie::put_with_proof).
#[derive(Clone, Debug, Default)]
pub struct StorageNodeSet {
    set: IndexMap<BitKey, StorageNode>,
}

impl StorageNodeSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// The record stored for `key`, if any.
    pub fn get(&self, key: &BitKey) -> Option<&StorageNode> {
        self.set.get(key)
    }

    /// Adds `node` to the set, merging with any record already present under
    /// its key.
    pub fn put(&mut self, node: StorageNode) -> Result<(), MergeConflict> {
        match self.set.entry(node.key) {
            Entry::Occupied(mut entry) => entry.get_mut().merge(&node),
            Entry::Vacant(entry) => {
                entry.insert(node);
                Ok(())
            }
        }
    }

    /// The records in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &StorageNode> {
        self.set.values()
    }

    /// Consumes the set, yielding the records in insertion order.
    pub fn into_nodes(self) -> Vec<StorageNode> {
        self.set.into_values().collect()
    }

    /// Number of records in the set.
    pub fn len(&self) -> usize {
        self.set.len()
    }

    /// Whether the set holds no records.
    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(value: u64, len: u8) -> BitKey {
        BitKey::from_felt(&Felt::from(value), len)
    }

    #[test]
    fn put_preserves_insertion_order() {
        let mut set = StorageNodeSet::new();
        for value in [5_u64, 1, 3] {
            set.put(StorageNode::partial(key(value, 8), Felt::from(value))).unwrap();
        }
        let keys: Vec<_> = set.nodes().map(|n| n.key).collect();
        assert_eq!(keys, vec![key(5, 8), key(1, 8), key(3, 8)]);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn duplicate_put_merges() {
        let mut set = StorageNodeSet::new();
        let k = key(5, 8);
        set.put(StorageNode::partial(k, Felt::from(9_u64))).unwrap();

        let mut refinement = StorageNode::partial(k, Felt::from(9_u64));
        refinement.node.left_hash = Some(Felt::from(4_u64));
        set.put(refinement).unwrap();

        assert_eq!(set.len(), 1);
        assert_eq!(set.get(&k).unwrap().node.left_hash, Some(Felt::from(4_u64)));
    }

    #[test]
    fn conflicting_merge_is_rejected() {
        let mut set = StorageNodeSet::new();
        let k = key(5, 8);
        let mut a = StorageNode::partial(k, Felt::ZERO);
        a.node.right_hash = Some(Felt::from(1_u64));
        let mut b = StorageNode::partial(k, Felt::ZERO);
        b.node.right_hash = Some(Felt::from(2_u64));

        set.put(a).unwrap();
        assert_eq!(set.put(b), Err(MergeConflict::Field { field: "right_hash" }));
    }

    #[test]
    fn mismatched_keys_do_not_merge() {
        let mut a = StorageNode::partial(key(1, 8), Felt::ZERO);
        let b = StorageNode::partial(key(2, 8), Felt::ZERO);
        assert_eq!(a.merge(&b), Err(MergeConflict::Key(key(1, 8), key(2, 8))));
    }
}
