//! The composite root identifying a snapshot version.

use senate_types::Hash;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The eight hashes that pin down one snapshot version.
///
/// Seven are roots of authenticated tries; `config_hash` is the content hash
/// of the active chain configuration. Two roots are equal iff every component
/// is equal, and a snapshot is fully reconstructible from `(store, Root)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Root {
    pub candidate_hash: Hash,
    pub config_hash: Hash,
    pub declare_hash: Hash,
    pub delegate_hash: Hash,
    pub epoch_hash: Hash,
    pub mint_cnt_hash: Hash,
    pub proposal_hash: Hash,
    pub vote_hash: Hash,
}

impl fmt::Display for Root {
    /// Lists every component so mismatching roots can be diffed across nodes.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "candidate_hash={}", self.candidate_hash)?;
        writeln!(f, "config_hash={}", self.config_hash)?;
        writeln!(f, "declare_hash={}", self.declare_hash)?;
        writeln!(f, "delegate_hash={}", self.delegate_hash)?;
        writeln!(f, "epoch_hash={}", self.epoch_hash)?;
        writeln!(f, "mint_cnt_hash={}", self.mint_cnt_hash)?;
        writeln!(f, "proposal_hash={}", self.proposal_hash)?;
        write!(f, "vote_hash={}", self.vote_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_field_wise() {
        let mut a = Root::default();
        let b = Root::default();
        assert_eq!(a, b);

        a.vote_hash = Hash::new([1u8; 32]);
        assert_ne!(a, b);
    }

    #[test]
    fn display_lists_every_component() {
        let root = Root::default();
        let text = root.to_string();
        for field in [
            "candidate_hash=",
            "config_hash=",
            "declare_hash=",
            "delegate_hash=",
            "epoch_hash=",
            "mint_cnt_hash=",
            "proposal_hash=",
            "vote_hash=",
        ] {
            assert!(text.contains(field), "missing {field} in {text}");
        }
    }
}
