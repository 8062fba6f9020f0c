//! Chain configuration governing the Senate.
//!
//! Configs are content-addressed: the active config's hash is embedded in
//! every block's composite root, and prior configs remain retrievable so that
//! historical blocks stay verifiable under the rules of their time.

use crate::Address;
use serde::{Deserialize, Serialize};

/// Runtime parameters of the Senate consensus.
///
/// Every field is governable through proposals; an adopted proposal produces a
/// new config identified by a new content hash.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenateConfig {
    /// Slot duration in seconds; one block per slot.
    pub period: u64,

    /// Epoch duration in seconds. The validator set is frozen for the whole
    /// epoch.
    pub epoch: u64,

    /// Maximum number of validators elected per epoch.
    pub max_validators_count: u64,

    /// Minimum balance an account must hold to declare candidacy.
    pub min_candidate_balance: u128,

    /// Minimum balance below which a delegator's vote contributes zero weight.
    pub min_voter_balance: u128,

    /// Reward credited to the block's coinbase during finalization.
    pub block_reward: u128,

    /// Genesis validator set, active during the first epoch until the first
    /// election has run.
    pub validators: Vec<Address>,
}

impl Default for SenateConfig {
    fn default() -> Self {
        Self {
            period: 3,
            epoch: 300,
            max_validators_count: 21,
            min_candidate_balance: 1_000,
            min_voter_balance: 10,
            block_reward: 5,
            validators: Vec::new(),
        }
    }
}

/// A sparse diff over [`SenateConfig`], carried by governance proposals.
///
/// `None` fields are left unchanged. The genesis validator list is not
/// governable; validator rotation is the election's job.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigDiff {
    pub period: Option<u64>,
    pub epoch: Option<u64>,
    pub max_validators_count: Option<u64>,
    pub min_candidate_balance: Option<u128>,
    pub min_voter_balance: Option<u128>,
    pub block_reward: Option<u128>,
}

impl ConfigDiff {
    /// Apply this diff to a base config, producing the successor config.
    pub fn apply_to(&self, base: &SenateConfig) -> SenateConfig {
        SenateConfig {
            period: self.period.unwrap_or(base.period),
            epoch: self.epoch.unwrap_or(base.epoch),
            max_validators_count: self
                .max_validators_count
                .unwrap_or(base.max_validators_count),
            min_candidate_balance: self
                .min_candidate_balance
                .unwrap_or(base.min_candidate_balance),
            min_voter_balance: self.min_voter_balance.unwrap_or(base.min_voter_balance),
            block_reward: self.block_reward.unwrap_or(base.block_reward),
            validators: base.validators.clone(),
        }
    }

    /// Whether the diff changes nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
