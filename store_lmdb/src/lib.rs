//! LMDB storage backend for the Senate consensus engine.
//!
//! Implements the [`senate_store::Store`] trait using the `heed` LMDB
//! bindings. Trie nodes, configs and snapshot values all live in a single
//! database; LMDB gives durability on every write-transaction commit and
//! concurrent readers for free, which is exactly the contract the snapshot
//! layer expects.

pub mod error;
pub mod store;

pub use error::LmdbError;
pub use store::LmdbStore;
