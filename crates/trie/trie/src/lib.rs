//! A dense binary Merkle Patricia Trie producing Starknet-equivalent state
//! commitments.
//!
//! Nodes are keyed on their root-relative path rather than their hash, giving
//! O(1) point reads and O(log n) inserts over a flat keyspace. Although every
//! stored internal node has exactly two children (real or proof), the
//! commitment equals the one defined by the Starknet state specification for
//! the sparse Merkle Patricia Trie over the same key/value set.
//!
//! ## Feature Flags
//!
//! - `test-utils`: Export the scratch-trie constructors and the reference
//!   sparse commitment.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

/// The trie engine: traversal, mutation, dirty tracking, commitment.
mod trie;
pub use trie::Trie;

/// Dirty-path re-hashing with bounded parallelism near the root.
mod commit;

/// Keyed node records and the insertion-ordered proof set.
mod node_set;
pub use node_set::{StorageNode, StorageNodeSet};

mod errors;
pub use errors::TrieError;

/// Scratch-trie constructors and the reference sparse commitment.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// re-export for convenience
pub use flint_trie_common::*;
