//! The live snapshot: seven authenticated tries plus the active config.
//!
//! A snapshot is the mutable embodiment of a [`Root`] while a block is being
//! verified or sealed. It is created empty (genesis) or loaded from the
//! content-addressed sub-roots, mutated through [`Snapshot::apply`], and
//! sealed by [`Snapshot::commit`]. A snapshot is not safe for concurrent
//! mutation; every verify/finalize call constructs its own from the store.

use std::collections::BTreeMap;
use std::sync::Arc;

use senate_crypto::keccak256;
use senate_store::Store;
use senate_trie::{Trie, TrieError};
use senate_types::{Address, ConfigDiff, Hash, Header, SenateConfig};
use serde::{Deserialize, Serialize};

use crate::error::SenateError;
use crate::extra::{BallotRecord, Declare, HeaderExtra, ProposalRecord, VoteRecord};
use crate::root::Root;

/// Store key namespace for content-addressed configs.
const CONFIG_PREFIX: &[u8] = b"cfg/";

fn config_key(hash: &Hash) -> Vec<u8> {
    let mut key = Vec::with_capacity(CONFIG_PREFIX.len() + 32);
    key.extend_from_slice(CONFIG_PREFIX);
    key.extend_from_slice(hash.as_bytes());
    key
}

/// Content hash identifying a config version.
pub fn config_hash(config: &SenateConfig) -> Hash {
    let bytes = bincode::serialize(config).expect("config serialization should not fail");
    keccak256(&bytes)
}

/// Fetch a historical config by its content hash.
pub fn load_config(store: &dyn Store, hash: &Hash) -> Result<SenateConfig, SenateError> {
    let bytes = store
        .get(&config_key(hash))?
        .ok_or_else(|| SenateError::SnapshotMissing(format!("config {hash}")))?;
    bincode::deserialize(&bytes)
        .map_err(|e| SenateError::Store(senate_store::StoreError::Corruption(e.to_string())))
}

/// An account that has declared intent to be elected.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub address: Address,
    /// Balance captured when the declaration was processed.
    pub bond: u128,
    /// Block number of the latest declaration.
    pub declared_at: u64,
}

/// Declaration metadata, kept as history even after a cancel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    pub candidate: Address,
    pub alias: String,
    pub block_number: u64,
}

/// The authoritative vote record of one delegator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub delegator: Address,
    pub candidate: Address,
    pub block_number: u64,
}

/// Blocks minted by one validator within one epoch. `last_number` makes the
/// increment idempotent per block.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintCount {
    pub count: u64,
    pub last_number: u64,
}

/// A pending governance proposal with its ballot box.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: Hash,
    pub proposer: Address,
    pub diff: ConfigDiff,
    pub start: u64,
    pub deadline: u64,
    /// Ballots keyed by voter; a `BTreeMap` so serialization is canonical.
    pub ballots: BTreeMap<Address, bool>,
}

/// The seven tries plus the active config.
#[derive(Clone)]
pub struct Snapshot {
    store: Arc<dyn Store>,
    config: SenateConfig,
    candidate: Trie,
    declare: Trie,
    delegate: Trie,
    epoch: Trie,
    mint_cnt: Trie,
    proposal: Trie,
    vote: Trie,
}

impl Snapshot {
    /// An empty snapshot carrying the bootstrap config. Used for genesis and
    /// as the parent snapshot of block one.
    pub fn new(store: Arc<dyn Store>, config: SenateConfig) -> Self {
        Self {
            config,
            candidate: Trie::empty(store.clone()),
            declare: Trie::empty(store.clone()),
            delegate: Trie::empty(store.clone()),
            epoch: Trie::empty(store.clone()),
            mint_cnt: Trie::empty(store.clone()),
            proposal: Trie::empty(store.clone()),
            vote: Trie::empty(store.clone()),
            store,
        }
    }

    /// Reconstruct the snapshot committed under `root`. Fails with
    /// `SnapshotMissing` if any sub-root is not resolvable from the store.
    pub fn load(store: Arc<dyn Store>, root: &Root) -> Result<Self, SenateError> {
        let config = load_config(&*store, &root.config_hash)?;
        let open = |hash: Hash| -> Result<Trie, SenateError> {
            Trie::open(store.clone(), hash).map_err(|e| match e {
                TrieError::MissingRoot(hash) => {
                    SenateError::SnapshotMissing(format!("trie root {hash}"))
                }
                other => other.into(),
            })
        };
        let candidate = open(root.candidate_hash)?;
        let declare = open(root.declare_hash)?;
        let delegate = open(root.delegate_hash)?;
        let epoch = open(root.epoch_hash)?;
        let mint_cnt = open(root.mint_cnt_hash)?;
        let proposal = open(root.proposal_hash)?;
        let vote = open(root.vote_hash)?;
        Ok(Self {
            config,
            candidate,
            declare,
            delegate,
            epoch,
            mint_cnt,
            proposal,
            vote,
            store,
        })
    }

    /// The config active at this snapshot.
    pub fn config(&self) -> &SenateConfig {
        &self.config
    }

    /// The current composite root. Computed lazily but stable for a given
    /// content.
    pub fn root(&self) -> Result<Root, SenateError> {
        Ok(Root {
            candidate_hash: self.candidate.root_hash()?,
            config_hash: config_hash(&self.config),
            declare_hash: self.declare.root_hash()?,
            delegate_hash: self.delegate.root_hash()?,
            epoch_hash: self.epoch.root_hash()?,
            mint_cnt_hash: self.mint_cnt.root_hash()?,
            proposal_hash: self.proposal.root_hash()?,
            vote_hash: self.vote.root_hash()?,
        })
    }

    /// Persist every dirty node and the config table entry in one atomic
    /// batch, asserting the content matches `expected`.
    pub fn commit(&mut self, expected: &Root) -> Result<(), SenateError> {
        if self.root()? != *expected {
            return Err(SenateError::InvalidTrieRoot);
        }
        let mut batch = Vec::new();
        self.candidate.commit_into(&mut batch);
        self.declare.commit_into(&mut batch);
        self.delegate.commit_into(&mut batch);
        self.epoch.commit_into(&mut batch);
        self.mint_cnt.commit_into(&mut batch);
        self.proposal.commit_into(&mut batch);
        self.vote.commit_into(&mut batch);
        batch.push((
            config_key(&expected.config_hash),
            bincode::serialize(&self.config).expect("config serialization should not fail"),
        ));
        self.store
            .put_batch(&batch)
            .map_err(|_| SenateError::SnapshotWriteFailed)
    }

    /// Replay one block's consensus payload. This is the single replay
    /// implementation shared by sealing and verification: (1) record the
    /// freshly elected validator sequence at an epoch boundary, (2) replay the
    /// governance log in recorded order, (3) settle proposals whose deadline
    /// passed, (4) count the mint. Deterministic in `(self, header, extra)`.
    pub fn apply(&mut self, header: &Header, extra: &HeaderExtra) -> Result<(), SenateError> {
        if !extra.current_epoch_validators.is_empty() {
            self.store_validators(extra.epoch, &extra.current_epoch_validators)?;
        }
        for declare in &extra.declares {
            self.apply_declare(declare, header.number)?;
        }
        for candidate in &extra.cancels {
            self.apply_cancel(candidate)?;
        }
        for vote in &extra.votes {
            self.apply_vote(vote, header.number)?;
        }
        for proposal in &extra.proposals {
            self.apply_proposal(proposal, header.time)?;
        }
        for ballot in &extra.declarations {
            self.apply_ballot(ballot, header.time)?;
        }
        self.settle_proposals(extra.epoch, header.time)?;
        self.mint_block(extra.epoch, header.number, header.coinbase)?;
        Ok(())
    }

    /// Record that `validator` minted block `number` of `epoch`. Idempotent
    /// per `(epoch, number)`.
    pub fn mint_block(
        &mut self,
        epoch: u64,
        number: u64,
        validator: Address,
    ) -> Result<(), SenateError> {
        let key = mint_key(epoch, &validator);
        let mut count: MintCount = match self.mint_cnt.get(&key)? {
            Some(bytes) => decode_value(&bytes)?,
            None => MintCount::default(),
        };
        if count.count > 0 && count.last_number == number {
            return Ok(());
        }
        count.count += 1;
        count.last_number = number;
        self.mint_cnt.put(&key, &encode_value(&count))?;
        Ok(())
    }

    /// Blocks minted by `validator` in `epoch`.
    pub fn mint_count(&self, epoch: u64, validator: &Address) -> Result<u64, SenateError> {
        Ok(match self.mint_cnt.get(&mint_key(epoch, validator))? {
            Some(bytes) => decode_value::<MintCount>(&bytes)?.count,
            None => 0,
        })
    }

    /// The validator sequence frozen for `epoch`, if elected.
    pub fn validators(&self, epoch: u64) -> Result<Option<Vec<Address>>, SenateError> {
        Ok(match self.epoch.get(&epoch.to_be_bytes())? {
            Some(bytes) => Some(decode_value(&bytes)?),
            None => None,
        })
    }

    /// Freeze the validator sequence for `epoch`.
    pub fn store_validators(
        &mut self,
        epoch: u64,
        validators: &[Address],
    ) -> Result<(), SenateError> {
        self.epoch
            .put(&epoch.to_be_bytes(), &encode_value(&validators.to_vec()))?;
        Ok(())
    }

    /// Look up a candidate entry.
    pub fn candidate(&self, address: &Address) -> Result<Option<Candidate>, SenateError> {
        Ok(match self.candidate.get(address.as_bytes())? {
            Some(bytes) => Some(decode_value(&bytes)?),
            None => None,
        })
    }

    /// All current candidates, ordered by address.
    pub fn candidates(&self) -> Result<Vec<Candidate>, SenateError> {
        self.candidate
            .iter_prefix(&[])?
            .into_iter()
            .map(|(_, bytes)| decode_value(&bytes))
            .collect()
    }

    /// All delegators currently backing `candidate`, ordered by address.
    pub fn delegators_of(&self, candidate: &Address) -> Result<Vec<Address>, SenateError> {
        let entries = self.delegate.iter_prefix(candidate.as_bytes())?;
        let mut out = Vec::with_capacity(entries.len());
        for (key, _) in entries {
            if key.len() != 40 {
                continue;
            }
            let mut delegator = [0u8; 20];
            delegator.copy_from_slice(&key[20..]);
            out.push(Address::new(delegator));
        }
        Ok(out)
    }

    /// The vote record of a delegator, if any.
    pub fn vote_of(&self, delegator: &Address) -> Result<Option<Vote>, SenateError> {
        Ok(match self.vote.get(delegator.as_bytes())? {
            Some(bytes) => Some(decode_value(&bytes)?),
            None => None,
        })
    }

    /// A pending proposal by id.
    pub fn proposal(&self, id: &Hash) -> Result<Option<Proposal>, SenateError> {
        Ok(match self.proposal.get(id.as_bytes())? {
            Some(bytes) => Some(decode_value(&bytes)?),
            None => None,
        })
    }

    /// Insert or refresh the candidate entry and its declaration metadata.
    pub(crate) fn apply_declare(
        &mut self,
        declare: &Declare,
        number: u64,
    ) -> Result<(), SenateError> {
        let candidate = Candidate {
            address: declare.candidate,
            bond: declare.bond,
            declared_at: number,
        };
        self.candidate
            .put(declare.candidate.as_bytes(), &encode_value(&candidate))?;
        let declaration = Declaration {
            candidate: declare.candidate,
            alias: declare.alias.clone(),
            block_number: number,
        };
        self.declare
            .put(declare.candidate.as_bytes(), &encode_value(&declaration))?;
        Ok(())
    }

    /// Withdraw a candidacy. Vote records and the delegate index are left in
    /// place; delegations to an ex-candidate simply stop counting at tally
    /// time until the voter re-votes.
    pub(crate) fn apply_cancel(&mut self, candidate: &Address) -> Result<bool, SenateError> {
        if self.candidate.get(candidate.as_bytes())?.is_none() {
            return Ok(false);
        }
        self.candidate.delete(candidate.as_bytes())?;
        Ok(true)
    }

    /// Cast or overwrite a delegation vote. Rejected (no-op) when the target
    /// is not currently a candidate.
    pub(crate) fn apply_vote(
        &mut self,
        vote: &VoteRecord,
        number: u64,
    ) -> Result<bool, SenateError> {
        if self.candidate.get(vote.candidate.as_bytes())?.is_none() {
            return Ok(false);
        }
        if let Some(previous) = self.vote_of(&vote.delegator)? {
            self.delegate
                .delete(&delegate_key(&previous.candidate, &vote.delegator))?;
        }
        let record = Vote {
            delegator: vote.delegator,
            candidate: vote.candidate,
            block_number: number,
        };
        self.vote
            .put(vote.delegator.as_bytes(), &encode_value(&record))?;
        self.delegate
            .put(&delegate_key(&vote.candidate, &vote.delegator), &[])?;
        Ok(true)
    }

    /// Open a proposal. Rejected on duplicate id or a deadline already past.
    pub(crate) fn apply_proposal(
        &mut self,
        record: &ProposalRecord,
        time: u64,
    ) -> Result<bool, SenateError> {
        if record.deadline < time || self.proposal.get(record.id.as_bytes())?.is_some() {
            return Ok(false);
        }
        let proposal = Proposal {
            id: record.id,
            proposer: record.proposer,
            diff: record.diff.clone(),
            start: time,
            deadline: record.deadline,
            ballots: BTreeMap::new(),
        };
        self.proposal
            .put(record.id.as_bytes(), &encode_value(&proposal))?;
        Ok(true)
    }

    /// Record a ballot. Rejected when the proposal is unknown or expired.
    pub(crate) fn apply_ballot(
        &mut self,
        ballot: &BallotRecord,
        time: u64,
    ) -> Result<bool, SenateError> {
        let Some(mut proposal) = self.proposal(&ballot.id)? else {
            return Ok(false);
        };
        if time > proposal.deadline {
            return Ok(false);
        }
        proposal.ballots.insert(ballot.voter, ballot.approve);
        self.proposal
            .put(ballot.id.as_bytes(), &encode_value(&proposal))?;
        Ok(true)
    }

    /// Settle every proposal whose deadline has passed: adopt the config diff
    /// when the current-epoch validators voted yea > nay, discard otherwise.
    fn settle_proposals(&mut self, epoch: u64, time: u64) -> Result<(), SenateError> {
        let due: Vec<Proposal> = self
            .proposal
            .iter_prefix(&[])?
            .into_iter()
            .map(|(_, bytes)| decode_value::<Proposal>(&bytes))
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .filter(|p| p.deadline <= time)
            .collect();
        if due.is_empty() {
            return Ok(());
        }

        let validators = self.validators(epoch)?.unwrap_or_default();
        for proposal in due {
            let (mut yea, mut nay) = (0u64, 0u64);
            for validator in &validators {
                match proposal.ballots.get(validator) {
                    Some(true) => yea += 1,
                    Some(false) => nay += 1,
                    None => {}
                }
            }
            if yea > nay {
                self.config = proposal.diff.apply_to(&self.config);
            }
            self.proposal.delete(proposal.id.as_bytes())?;
        }
        Ok(())
    }
}

fn delegate_key(candidate: &Address, delegator: &Address) -> Vec<u8> {
    let mut key = Vec::with_capacity(40);
    key.extend_from_slice(candidate.as_bytes());
    key.extend_from_slice(delegator.as_bytes());
    key
}

fn mint_key(epoch: u64, validator: &Address) -> Vec<u8> {
    let mut key = Vec::with_capacity(28);
    key.extend_from_slice(&epoch.to_be_bytes());
    key.extend_from_slice(validator.as_bytes());
    key
}

fn encode_value<T: Serialize>(value: &T) -> Vec<u8> {
    bincode::serialize(value).expect("snapshot value serialization should not fail")
}

fn decode_value<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T, SenateError> {
    bincode::deserialize(bytes)
        .map_err(|e| SenateError::Store(senate_store::StoreError::Corruption(e.to_string())))
}
