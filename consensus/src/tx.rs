//! Governance transactions: parsing and processing into the replay log.
//!
//! Governance commands travel as ordinary transactions addressed to the
//! reserved system contract; the engine scans a block's transactions, applies
//! the valid commands to a scratch snapshot and records them in the header
//! extra. Invalid or unparseable commands are silently dropped: the
//! transaction still pays gas and stays in the block, it just leaves no trace
//! in the snapshot, which keeps replay-based verification exact.

use bincode::Options;
use senate_types::{Address, ConfigDiff, Hash, Header, SenateConfig, Transaction};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::engine::StateDb;
use crate::error::SenateError;
use crate::extra::{BallotRecord, Declare, HeaderExtra, ProposalRecord, VoteRecord};
use crate::snapshot::Snapshot;

/// The reserved address governance transactions are sent to.
pub const SYSTEM_CONTRACT_ADDRESS: Address = Address::new([
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x10, 0x01,
]);

/// A parsed governance command. The sender is the transaction's recovered
/// sender; commands carry only what the sender cannot be trusted less about.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SenateTx {
    /// Declare (or refresh) candidacy with a display alias.
    Declare { alias: String },
    /// Withdraw candidacy.
    Cancel,
    /// Delegate the sender's stake weight to a candidate.
    Vote { candidate: Address },
    /// Open a config-diff proposal, voteable until `deadline`.
    Propose { diff: ConfigDiff, deadline: u64 },
    /// Cast a ballot on an open proposal.
    DeclareOnProposal { id: Hash, approve: bool },
}

fn codec() -> impl Options {
    bincode::options()
        .with_fixint_encoding()
        .reject_trailing_bytes()
}

impl SenateTx {
    /// Command bytes for a transaction's data field.
    pub fn encode(&self) -> Vec<u8> {
        codec()
            .serialize(self)
            .expect("command serialization should not fail")
    }

    /// Parse a transaction data field. `None` on any decoding failure; a
    /// garbled command is a paid no-op, not an error.
    pub fn decode(data: &[u8]) -> Option<Self> {
        codec().deserialize(data).ok()
    }
}

/// Scan `txs` for governance commands, validate them against `scratch` (which
/// tracks intra-block effects) and append the survivors to `extra`'s replay
/// log. The real snapshot is untouched: it gets mutated once, by
/// [`Snapshot::apply`], from the very log built here.
pub(crate) fn process_transactions(
    config: &SenateConfig,
    state: &dyn StateDb,
    header: &Header,
    scratch: &mut Snapshot,
    extra: &mut HeaderExtra,
    txs: &[Transaction],
) -> Result<(), SenateError> {
    for tx in txs.iter().filter(|tx| tx.is_to(&SYSTEM_CONTRACT_ADDRESS)) {
        let Some(command) = SenateTx::decode(&tx.data) else {
            trace!(tx = %tx.hash, "dropping unparseable governance command");
            continue;
        };
        match command {
            SenateTx::Declare { alias } => {
                let bond = state.balance(&tx.sender);
                if bond < config.min_candidate_balance {
                    trace!(sender = %tx.sender, bond, "declare below candidate balance floor");
                    continue;
                }
                let record = Declare {
                    candidate: tx.sender,
                    alias,
                    bond,
                };
                scratch.apply_declare(&record, header.number)?;
                extra.declares.push(record);
            }
            SenateTx::Cancel => {
                if scratch.apply_cancel(&tx.sender)? {
                    extra.cancels.push(tx.sender);
                }
            }
            SenateTx::Vote { candidate } => {
                let record = VoteRecord {
                    delegator: tx.sender,
                    candidate,
                };
                if scratch.apply_vote(&record, header.number)? {
                    extra.votes.push(record);
                }
            }
            SenateTx::Propose { diff, deadline } => {
                let record = ProposalRecord {
                    id: tx.hash,
                    proposer: tx.sender,
                    diff,
                    deadline,
                };
                if scratch.apply_proposal(&record, header.time)? {
                    extra.proposals.push(record);
                }
            }
            SenateTx::DeclareOnProposal { id, approve } => {
                let record = BallotRecord {
                    id,
                    voter: tx.sender,
                    approve,
                };
                if scratch.apply_ballot(&record, header.time)? {
                    extra.declarations.push(record);
                }
            }
        }
    }
    Ok(())
}
