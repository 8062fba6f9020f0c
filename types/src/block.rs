//! Assembled block handed back to the miner.

use crate::{Header, Transaction};
use serde::{Deserialize, Serialize};

/// A block: header plus the transactions it includes.
///
/// Receipts, uncles and the rest of the body stay with the host chain; the
/// engine only assembles and seals what it is responsible for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: Header,
    pub transactions: Vec<Transaction>,
    /// Always empty under DPoS; kept so the uncle rule stays checkable.
    pub uncles: Vec<Header>,
}

impl Block {
    pub fn new(header: Header, transactions: Vec<Transaction>) -> Self {
        Self {
            header,
            transactions,
            uncles: Vec::new(),
        }
    }

    /// Replace the header with its sealed counterpart.
    pub fn with_seal(&self, header: Header) -> Self {
        Self {
            header,
            transactions: self.transactions.clone(),
            uncles: self.uncles.clone(),
        }
    }
}
