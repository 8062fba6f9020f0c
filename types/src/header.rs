//! Block header as the consensus engine sees it.

use crate::{Address, Hash};
use serde::{Deserialize, Serialize};

/// Keccak-256 of the RLP encoding of an empty uncle list. Uncles are
/// meaningless under DPoS; every valid header carries this constant.
pub const EMPTY_UNCLE_HASH: Hash = Hash::new([
    0x1d, 0xcc, 0x4d, 0xe8, 0xde, 0xc7, 0x5d, 0x7a, 0xab, 0x85, 0xb5, 0x67, 0xb6, 0xcc, 0xd4,
    0x1a, 0xd3, 0x12, 0x45, 0x1b, 0x94, 0x8a, 0x74, 0x13, 0xf0, 0xa1, 0x42, 0xfd, 0x40, 0xd4,
    0x93, 0x47,
]);

/// A block header.
///
/// `extra` carries the consensus payload framed as
/// `vanity(32) || payload || seal(65)`; everything else mirrors the host
/// chain's header layout. `mix_digest` and `nonce` are reserved for fork
/// protection and must stay zero.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub parent_hash: Hash,
    pub uncle_hash: Hash,
    pub coinbase: Address,
    /// Account-state root, set during finalization.
    pub root: Hash,
    pub tx_hash: Hash,
    pub receipt_hash: Hash,
    pub bloom: Vec<u8>,
    pub difficulty: u64,
    pub number: u64,
    pub gas_limit: u64,
    pub gas_used: u64,
    /// Unix timestamp in seconds.
    pub time: u64,
    pub extra: Vec<u8>,
    pub mix_digest: Hash,
    pub nonce: [u8; 8],
}

impl Header {
    /// An all-zero header for the given block number, used as a scaffold by
    /// miners before `prepare` fills the consensus fields.
    pub fn scaffold(number: u64) -> Self {
        Self {
            parent_hash: Hash::ZERO,
            uncle_hash: EMPTY_UNCLE_HASH,
            coinbase: Address::ZERO,
            root: Hash::ZERO,
            tx_hash: Hash::ZERO,
            receipt_hash: Hash::ZERO,
            bloom: Vec::new(),
            difficulty: 0,
            number,
            gas_limit: 0,
            gas_used: 0,
            time: 0,
            extra: Vec::new(),
            mix_digest: Hash::ZERO,
            nonce: [0u8; 8],
        }
    }
}
