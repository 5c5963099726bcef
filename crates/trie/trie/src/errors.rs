use flint_trie_common::{BitKey, MergeConflict, StorageError};
use starknet_types_core::felt::Felt;
use thiserror::Error;

/// Error returned by trie operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrieError {
    /// The supplied key does not fit in the trie's key space.
    #[error("key {key:#x} exceeds the maximum key for height {height}")]
    KeyOutOfRange {
        /// The rejected key.
        key: Felt,
        /// Height of the trie the key was offered to.
        height: u8,
    },
    /// The requested height exceeds the field's usable bits.
    #[error("max trie height is {max}, got {height}", max = flint_trie_common::MAX_HEIGHT)]
    InvalidHeight {
        /// The rejected height.
        height: u8,
    },
    /// A node referenced by the trie structure is absent from storage.
    #[error("node at {0} is referenced but not stored")]
    MissingNode(BitKey),
    /// The storage backend failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// A proof-set merge found conflicting records.
    #[error(transparent)]
    Merge(#[from] MergeConflict),
}
