//! Scratch-trie constructors and an independent reference implementation of
//! the Starknet sparse commitment, used to cross-check the dense trie.

use crate::Trie;
use flint_trie_common::{BitKey, MemoryStorage};
use starknet_types_core::{
    felt::Felt,
    hash::{Pedersen, Poseidon, StarkHash},
};
use std::collections::BTreeMap;

/// Fresh in-memory Pedersen trie of the given height.
pub fn pedersen_trie(height: u8) -> Trie<MemoryStorage, Pedersen> {
    Trie::new(MemoryStorage::new(), height).expect("height is valid")
}

/// Fresh in-memory Poseidon trie of the given height.
pub fn poseidon_trie(height: u8) -> Trie<MemoryStorage, Poseidon> {
    Trie::new(MemoryStorage::new(), height).expect("height is valid")
}

/// Commitment of the canonical sparse Merkle Patricia Trie over `entries`,
/// computed directly from the Starknet state specification.
///
/// Every node is a `(length, path, bottom)` triple: binary nodes have
/// `length == 0` and hash both resolved children, maximal single-child chains
/// collapse into edges, and a node resolves to `bottom` when `length == 0`
/// and to `H(bottom, path) + length` otherwise. Later entries win over
/// earlier ones for the same key; zero values delete.
pub fn reference_root<H: StarkHash>(entries: &[(Felt, Felt)], height: u8) -> Felt {
    let mut map = BTreeMap::new();
    for (key, value) in entries {
        if *value == Felt::ZERO {
            map.remove(&BitKey::from_felt(key, height));
        } else {
            map.insert(BitKey::from_felt(key, height), *value);
        }
    }
    let leaves: Vec<(BitKey, Felt)> = map.into_iter().collect();
    match subtree::<H>(&leaves, 0, height) {
        Some(root) => root.resolve::<H>(),
        None => Felt::ZERO,
    }
}

/// A `(length, path, bottom)` description of a subtree whose root slot sits
/// at depth `head`; the edge path is read out of `witness`, a leaf key below
/// the subtree.
struct Subtree<'a> {
    head: u8,
    tail: u8,
    bottom: Felt,
    witness: &'a BitKey,
}

impl Subtree<'_> {
    fn resolve<H: StarkHash>(&self) -> Felt {
        let length = self.tail - self.head;
        if length == 0 {
            return self.bottom;
        }
        let path = BitKey::from_bits(&self.witness.as_bits()[self.head as usize..self.tail as usize]);
        H::hash(&self.bottom, &path.as_felt()) + Felt::from(length)
    }
}

fn subtree<'a, H: StarkHash>(
    leaves: &'a [(BitKey, Felt)],
    depth: u8,
    height: u8,
) -> Option<Subtree<'a>> {
    let (first, _) = leaves.first()?;
    if depth == height {
        return Some(Subtree { head: height, tail: height, bottom: leaves[0].1, witness: first });
    }
    let split = leaves.partition_point(|(key, _)| !key.as_bits()[depth as usize]);
    let left = subtree::<H>(&leaves[..split], depth + 1, height);
    let right = subtree::<H>(&leaves[split..], depth + 1, height);
    match (left, right) {
        (Some(left), Some(right)) => Some(Subtree {
            head: depth,
            tail: depth,
            bottom: H::hash(&left.resolve::<H>(), &right.resolve::<H>()),
            witness: left.witness,
        }),
        (Some(child), None) | (None, Some(child)) => Some(Subtree { head: depth, ..child }),
        (None, None) => unreachable!("leaves is non-empty"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_of_nothing_is_zero() {
        assert_eq!(reference_root::<Pedersen>(&[], 251), Felt::ZERO);
    }

    #[test]
    fn reference_of_one_leaf_is_an_edge_to_it() {
        let (key, value) = (Felt::from(5_u64), Felt::from(66_u64));
        let expected = Pedersen::hash(&value, &key) + Felt::from(251_u64);
        assert_eq!(reference_root::<Pedersen>(&[(key, value)], 251), expected);
    }

    #[test]
    fn reference_applies_later_entries_last() {
        let key = Felt::from(5_u64);
        let entries = [(key, Felt::from(1_u64)), (key, Felt::from(2_u64))];
        assert_eq!(
            reference_root::<Pedersen>(&entries, 251),
            reference_root::<Pedersen>(&[(key, Felt::from(2_u64))], 251),
        );
        // a trailing zero entry deletes the key
        let deleted = [(key, Felt::from(1_u64)), (key, Felt::ZERO)];
        assert_eq!(reference_root::<Pedersen>(&deleted, 251), Felt::ZERO);
    }
}
