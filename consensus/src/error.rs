//! The closed error set of the consensus engine.

use senate_crypto::CryptoError;
use senate_store::StoreError;
use senate_trie::TrieError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SenateError {
    /// The header's number is unknown to the engine (genesis during seal or
    /// seal verification).
    #[error("unknown block")]
    UnknownBlock,

    #[error("block in the future")]
    FutureBlock,

    #[error("unknown ancestor")]
    UnknownAncestor,

    #[error("extra-data 32 byte vanity prefix missing")]
    MissingVanity,

    #[error("extra-data 65 byte signature suffix missing")]
    MissingSignature,

    #[error("non-zero mix digest")]
    InvalidMixDigest,

    #[error("non empty uncle hash")]
    InvalidUncleHash,

    #[error("invalid timestamp")]
    InvalidTimestamp,

    #[error("unauthorized validator")]
    Unauthorized,

    #[error("uncles not allowed")]
    UnclesNotAllowed,

    #[error("malformed extra payload")]
    MalformedExtra,

    #[error("invalid trie root")]
    InvalidTrieRoot,

    #[error("snapshot missing: {0}")]
    SnapshotMissing(String),

    #[error("election failed: {0}")]
    ElectionFailed(String),

    #[error("failed to write snapshot")]
    SnapshotWriteFailed,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Trie(#[from] TrieError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}
