use crate::key::BitKey;
use thiserror::Error;

/// Failure surfaced by a [`TrieStorage`](crate::storage::TrieStorage)
/// backend. Absent entries are not errors; they read as `Ok(None)`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// The backend failed a read.
    #[error("storage read failed: {0}")]
    Read(String),
    /// The backend failed a write.
    #[error("storage write failed: {0}")]
    Write(String),
}

/// Two node records disagreed while being merged into a proof set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeConflict {
    /// The records describe distinct storage keys.
    #[error("cannot merge nodes for distinct keys {0} and {1}")]
    Key(BitKey, BitKey),
    /// Both records populate the named field with different values.
    #[error("conflicting `{field}` during node merge")]
    Field {
        /// The node field both records populate.
        field: &'static str,
    },
}
