use crate::{error::MergeConflict, key::BitKey};
use starknet_types_core::{felt::Felt, hash::StarkHash};

/// A dense-trie node record.
///
/// Leaves carry the user value and no children. Internal nodes carry a child
/// key per side and cache the subtree commitment in `value`; the cache is
/// refreshed only by the commitment pass and may be stale between a mutation
/// and the next root computation.
///
/// A side whose subtree is not locally materialized (a proof child) has its
/// child key absent and the subtree commitment recorded in the matching
/// `*_hash` field instead.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Node {
    /// Leaf value, or the cached subtree commitment of an internal node.
    pub value: Felt,
    /// Left child storage key; `None` when the subtree is not materialized.
    pub left: Option<BitKey>,
    /// Right child storage key; `None` when the subtree is not materialized.
    pub right: Option<BitKey>,
    /// Commitment of the left subtree when `left` is `None`.
    pub left_hash: Option<Felt>,
    /// Commitment of the right subtree when `right` is `None`.
    pub right_hash: Option<Felt>,
}

impl Node {
    /// A leaf carrying `value`.
    pub const fn leaf(value: Felt) -> Self {
        Self { value, left: None, right: None, left_hash: None, right_hash: None }
    }

    /// Commitment of this node as seen from its parent, where `path` is the
    /// relative path from the parent down to this node.
    ///
    /// A non-empty path lifts the commitment through the compressed edge:
    /// `H(value, path) + len(path)`, per the Starknet state specification.
    /// This keeps the dense layout's commitment equal to the canonical sparse
    /// trie's.
    pub fn hash<H: StarkHash>(&self, path: &BitKey) -> Felt {
        if path.is_empty() {
            return self.value;
        }
        H::hash(&self.value, &path.as_felt()) + Felt::from(path.len())
    }

    /// Merges `other` into `self` during proof-set assembly.
    ///
    /// Fields populated on both sides must agree; fields populated on one
    /// side only are adopted. A zero `value` counts as unpopulated: internal
    /// node values are commitments and never legitimately zero in a record
    /// under merge.
    pub fn merge(&mut self, other: &Self) -> Result<(), MergeConflict> {
        fn check<T: PartialEq>(
            mine: &Option<T>,
            theirs: &Option<T>,
            field: &'static str,
        ) -> Result<(), MergeConflict> {
            match (mine, theirs) {
                (Some(a), Some(b)) if a != b => Err(MergeConflict::Field { field }),
                _ => Ok(()),
            }
        }

        if self.value != other.value && self.value != Felt::ZERO && other.value != Felt::ZERO {
            return Err(MergeConflict::Field { field: "value" });
        }
        check(&self.left, &other.left, "left")?;
        check(&self.right, &other.right, "right")?;
        check(&self.left_hash, &other.left_hash, "left_hash")?;
        check(&self.right_hash, &other.right_hash, "right_hash")?;

        if self.value == Felt::ZERO {
            self.value = other.value;
        }
        self.left = self.left.or(other.left);
        self.right = self.right.or(other.right);
        self.left_hash = self.left_hash.or(other.left_hash);
        self.right_hash = self.right_hash.or(other.right_hash);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use starknet_types_core::hash::{Pedersen, Poseidon};

    #[test]
    fn hash_with_empty_path_is_the_value() {
        let node = Node::leaf(Felt::from(42_u64));
        assert_eq!(node.hash::<Pedersen>(&BitKey::EMPTY), Felt::from(42_u64));
        assert_eq!(node.hash::<Poseidon>(&BitKey::EMPTY), Felt::from(42_u64));
    }

    #[test]
    fn hash_lifts_through_the_edge() {
        let value = Felt::from(42_u64);
        let path = BitKey::from_felt(&Felt::from(0b101_u64), 3);
        let expected = Pedersen::hash(&value, &Felt::from(0b101_u64)) + Felt::from(3_u64);
        assert_eq!(Node::leaf(value).hash::<Pedersen>(&path), expected);
    }

    #[test]
    fn merge_adopts_missing_fields() {
        let key = BitKey::from_felt(&Felt::from(1_u64), 4);
        let mut node = Node { right_hash: Some(Felt::from(7_u64)), ..Default::default() };
        let other = Node {
            value: Felt::from(3_u64),
            left: Some(key),
            ..Default::default()
        };
        node.merge(&other).unwrap();
        assert_eq!(node.value, Felt::from(3_u64));
        assert_eq!(node.left, Some(key));
        assert_eq!(node.right_hash, Some(Felt::from(7_u64)));
    }

    #[test]
    fn merge_rejects_conflicting_fields() {
        let mut node = Node { right_hash: Some(Felt::from(7_u64)), ..Default::default() };
        let other = Node { right_hash: Some(Felt::from(8_u64)), ..Default::default() };
        assert_eq!(node.merge(&other), Err(MergeConflict::Field { field: "right_hash" }));

        let mut node = Node::leaf(Felt::from(1_u64));
        let other = Node::leaf(Felt::from(2_u64));
        assert_eq!(node.merge(&other), Err(MergeConflict::Field { field: "value" }));
    }

    #[test]
    fn merge_is_a_noop_on_agreement() {
        let mut node = Node::leaf(Felt::from(5_u64));
        let copy = node.clone();
        node.merge(&copy).unwrap();
        assert_eq!(node, copy);
    }
}
