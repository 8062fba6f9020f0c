//! The consensus payload embedded in each header's extra field.
//!
//! Framing: `vanity(32) || payload || seal(65)`. The payload is the canonical
//! bincode encoding of [`HeaderExtra`]; encoding equal payloads yields
//! byte-identical output (the payload is hashed as part of the header), and
//! decoding rejects truncation and trailing garbage.

use bincode::Options;
use senate_types::{Address, ConfigDiff, Hash, Header};
use serde::{Deserialize, Serialize};

use crate::error::SenateError;
use crate::root::Root;

/// Fixed-size free-form prefix preserved verbatim across `prepare`.
pub const EXTRA_VANITY: usize = 32;

/// Trailing `r || s || v` seal length.
pub const EXTRA_SEAL: usize = 65;

/// A candidacy declaration as replayed from the governance log.
///
/// `bond` is the sender's balance captured when the declaring transaction was
/// processed; carrying it in the log keeps replay free of state lookups.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declare {
    pub candidate: Address,
    pub alias: String,
    pub bond: u128,
}

/// A delegation vote: `delegator` entrusts its stake weight to `candidate`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub delegator: Address,
    pub candidate: Address,
}

/// A new governance proposal. The id is the proposing transaction's hash.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalRecord {
    pub id: Hash,
    pub proposer: Address,
    pub diff: ConfigDiff,
    pub deadline: u64,
}

/// A ballot cast on an open proposal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotRecord {
    pub id: Hash,
    pub voter: Address,
    pub approve: bool,
}

/// The consensus payload of one block.
///
/// Carries the snapshot root the block commits to, the epoch coordinates, the
/// validator sequence elected at an epoch boundary (empty otherwise), and the
/// complete governance log of the block so that header-only verification can
/// replay it without the transaction bodies.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderExtra {
    pub root: Root,
    pub epoch: u64,
    pub epoch_time: u64,
    pub current_epoch_validators: Vec<Address>,
    pub current_block_confirmations: Vec<Address>,
    pub declares: Vec<Declare>,
    pub cancels: Vec<Address>,
    pub votes: Vec<VoteRecord>,
    pub proposals: Vec<ProposalRecord>,
    pub declarations: Vec<BallotRecord>,
}

fn codec() -> impl Options {
    bincode::options()
        .with_fixint_encoding()
        .reject_trailing_bytes()
}

impl HeaderExtra {
    /// Canonical payload bytes; byte-identical for equal payloads.
    pub fn encode(&self) -> Vec<u8> {
        codec()
            .serialize(self)
            .expect("header extra serialization should not fail")
    }

    /// Inverse of [`HeaderExtra::encode`]. Truncated input, trailing bytes or
    /// any tag mismatch fail with `MalformedExtra`.
    pub fn decode(payload: &[u8]) -> Result<Self, SenateError> {
        codec()
            .deserialize(payload)
            .map_err(|_| SenateError::MalformedExtra)
    }

    /// Decode the payload between a header's vanity and seal.
    pub fn decode_from_header(header: &Header) -> Result<Self, SenateError> {
        let (_, payload, _) = split_extra(&header.extra)?;
        Self::decode(payload)
    }
}

/// Split header extra bytes into `(vanity, payload, seal)`.
pub fn split_extra(extra: &[u8]) -> Result<(&[u8], &[u8], &[u8]), SenateError> {
    if extra.len() < EXTRA_VANITY {
        return Err(SenateError::MissingVanity);
    }
    if extra.len() < EXTRA_VANITY + EXTRA_SEAL {
        return Err(SenateError::MissingSignature);
    }
    let (vanity, rest) = extra.split_at(EXTRA_VANITY);
    let (payload, seal) = rest.split_at(rest.len() - EXTRA_SEAL);
    Ok((vanity, payload, seal))
}

/// Frame a payload with the given vanity (zero-padded or truncated to 32
/// bytes) and a zeroed seal slot.
pub fn frame_extra(vanity: &[u8], payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(EXTRA_VANITY + payload.len() + EXTRA_SEAL);
    let take = vanity.len().min(EXTRA_VANITY);
    out.extend_from_slice(&vanity[..take]);
    out.resize(EXTRA_VANITY, 0);
    out.extend_from_slice(payload);
    out.resize(EXTRA_VANITY + payload.len() + EXTRA_SEAL, 0);
    out
}
