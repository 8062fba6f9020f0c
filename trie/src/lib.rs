//! Authenticated key/value trie over a pluggable [`senate_store::Store`].
//!
//! A Merkle-Patricia-style hexary trie: keys are split into nibbles, inner
//! nodes are branches with sixteen children, and single-key subtrees collapse
//! into leaves. Every node is bincode-serialized and content-addressed in the
//! store under its Keccak-256 hash, so a trie is fully reconstructible from
//! `(store, root_hash)` and two tries with equal content have equal roots
//! regardless of insertion order.
//!
//! The trie does not cache across blocks; caching is the store's concern.

pub mod error;
pub mod node;
pub mod trie;

pub use error::TrieError;
pub use trie::Trie;
