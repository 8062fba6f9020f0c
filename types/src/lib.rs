//! Fundamental types for the Senate consensus engine.
//!
//! This crate defines the core types shared across every other crate in the
//! workspace: addresses, hashes, headers, transactions, chain configuration,
//! and time helpers.

pub mod address;
pub mod block;
pub mod config;
pub mod hash;
pub mod header;
pub mod time;
pub mod transaction;

pub use address::Address;
pub use block::Block;
pub use config::{ConfigDiff, SenateConfig};
pub use hash::Hash;
pub use header::{Header, EMPTY_UNCLE_HASH};
pub use transaction::Transaction;
