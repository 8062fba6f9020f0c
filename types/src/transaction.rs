//! The slice of a transaction the consensus engine needs.
//!
//! Signature verification and sender recovery happen in the outer pipeline;
//! by the time a transaction reaches the engine its `sender` is authentic.

use crate::{Address, Hash};
use serde::{Deserialize, Serialize};

/// A transaction as seen by the consensus engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub hash: Hash,
    /// Recovered sender, verified by the outer pipeline.
    pub sender: Address,
    /// `None` for contract creation.
    pub to: Option<Address>,
    pub value: u128,
    pub data: Vec<u8>,
}

impl Transaction {
    /// Whether this transaction is addressed to the given account.
    pub fn is_to(&self, address: &Address) -> bool {
        self.to.as_ref() == Some(address)
    }
}
