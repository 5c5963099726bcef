use crate::TrieError;
use flint_trie_common::{BitKey, Node, SyncedStorage};
use starknet_types_core::{felt::Felt, hash::StarkHash};

/// Re-hashes the dirty paths of a trie against the storage's synced view.
///
/// Subtrees with no dirty key below them keep their cached commitment.
/// Recursion at depths up to `max_parallel_depth` splits the two child
/// subtrees onto parallel tasks; deeper levels recurse sequentially. The
/// computed commitment is identical either way.
pub(crate) struct Committer<'a, V> {
    view: &'a V,
    dirty: &'a [BitKey],
    height: u8,
    max_parallel_depth: u8,
}

impl<'a, V: SyncedStorage> Committer<'a, V> {
    pub(crate) const fn new(
        view: &'a V,
        dirty: &'a [BitKey],
        height: u8,
        max_parallel_depth: u8,
    ) -> Self {
        Self { view, dirty, height, max_parallel_depth }
    }

    /// Returns the node at `key` with its subtree commitment refreshed where
    /// dirty paths (or partially-materialized branches) require it.
    pub(crate) fn update_if_dirty<H: StarkHash>(&self, key: &BitKey) -> Result<Node, TrieError> {
        let mut node = self.view.get(key)?.ok_or(TrieError::MissingNode(*key))?;

        if key.len() == self.height {
            return Ok(node);
        }

        let mut should_update =
            self.dirty.iter().any(|dirty| key.len() < dirty.len() && dirty.has_prefix(key));
        match (&node.left, &node.right) {
            // proof stub: opaque, never recomputed
            (None, None) => should_update = false,
            // partially materialized: the real side must be folded in
            (None, Some(_)) | (Some(_), None) => should_update = true,
            (Some(_), Some(_)) => {}
        }
        if !should_update {
            return Ok(node);
        }

        let (left, right) = if key.len() <= self.max_parallel_depth {
            let (left, right) = rayon::join(
                || self.child_commitment::<H>(key, node.left.as_ref(), node.left_hash),
                || self.child_commitment::<H>(key, node.right.as_ref(), node.right_hash),
            );
            (left?, right?)
        } else {
            (
                self.child_commitment::<H>(key, node.left.as_ref(), node.left_hash)?,
                self.child_commitment::<H>(key, node.right.as_ref(), node.right_hash)?,
            )
        };

        node.value = H::hash(&left, &right);
        self.view.put(key, &node)?;
        Ok(node)
    }

    /// Commitment contributed by one child: the refreshed subtree hash lifted
    /// over the relative path for a real child, the recorded hash for a proof
    /// child.
    fn child_commitment<H: StarkHash>(
        &self,
        parent: &BitKey,
        child: Option<&BitKey>,
        proof_hash: Option<Felt>,
    ) -> Result<Felt, TrieError> {
        match child {
            Some(child_key) => {
                let node = self.update_if_dirty::<H>(child_key)?;
                Ok(node.hash::<H>(&child_key.relative_path(Some(parent))))
            }
            None => Ok(proof_hash.expect("a stored branch keeps a hash for its missing child")),
        }
    }
}
