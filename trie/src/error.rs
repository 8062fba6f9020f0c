use senate_store::StoreError;
use senate_types::Hash;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrieError {
    #[error("trie root not found in store: {0}")]
    MissingRoot(Hash),

    #[error("trie node not found in store: {0}")]
    MissingNode(Hash),

    #[error("malformed trie node {0}: {1}")]
    Corrupt(Hash, String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
