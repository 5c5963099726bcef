//! Shared primitives for the flint dense Merkle Patricia Trie: bit-string
//! keys addressing nodes by their root-relative path, the node record with
//! its Starknet commitment rules, and the storage contract the trie engine
//! runs against.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

/// Bit-string keys addressing trie nodes by path.
pub mod key;

/// The trie node record and its hashing and merge rules.
pub mod node;

/// Storage contract and the in-memory reference backend.
pub mod storage;

mod error;

pub use error::{MergeConflict, StorageError};
pub use key::{BitKey, MAX_HEIGHT};
pub use node::Node;
pub use storage::{MemoryStorage, SyncedMemoryStorage, SyncedStorage, TrieStorage};
