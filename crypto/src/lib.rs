//! Cryptographic primitives for the Senate consensus engine.
//!
//! - **Keccak-256** for hashing (seal hashes, trie node addresses, account
//!   addresses)
//! - **secp256k1 recoverable ECDSA** for header seals — 65-byte `r || s || v`
//!   signatures from which the signer address is recovered
//! - Address derivation from uncompressed public keys

pub mod error;
pub mod hash;
pub mod sign;

pub use error::CryptoError;
pub use hash::{keccak256, keccak256_list};
pub use sign::{address_of, recover_signer, sign_recoverable, signing_address, SigningKey};
