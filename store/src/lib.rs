//! Abstract storage for the Senate consensus engine.
//!
//! Every storage backend (LMDB, in-memory for testing) implements the
//! [`Store`] trait. The rest of the workspace depends only on the trait; trie
//! nodes, configs and snapshot data are all opaque byte values here.

pub mod error;
pub mod memory;

pub use error::StoreError;
pub use memory::MemoryStore;

/// A concurrency-safe key/value backend.
///
/// Reads may run concurrently; writes are serialized by the backend. Batched
/// writes ([`Store::put_batch`]) must be atomic: a snapshot commit either
/// lands completely or not at all.
pub trait Store: Send + Sync {
    /// Look up a key. `Ok(None)` when absent.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    /// Insert or overwrite a key.
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError>;

    /// Remove a key. Removing an absent key is not an error.
    fn delete(&self, key: &[u8]) -> Result<(), StoreError>;

    /// Write a batch of keys atomically.
    fn put_batch(&self, items: &[(Vec<u8>, Vec<u8>)]) -> Result<(), StoreError>;
}
