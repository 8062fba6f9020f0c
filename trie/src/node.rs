//! Trie nodes and their stored form.

use senate_types::Hash;
use serde::{Deserialize, Serialize};

/// A reference to a child subtree: either the content address of a persisted
/// node, or an in-memory node that has not been committed yet.
#[derive(Clone, Debug)]
pub(crate) enum Link {
    Hash(Hash),
    Node(Box<Node>),
}

/// An in-memory trie node.
///
/// Canonical form: a subtree holding exactly one key is a `Leaf` carrying the
/// key's remaining nibbles; any subtree holding two or more keys is a
/// `Branch`. Insert and delete both preserve this, which is what makes the
/// root a pure function of the key/value content.
#[derive(Clone, Debug)]
pub(crate) enum Node {
    Leaf {
        /// Remaining key nibbles below this node.
        path: Vec<u8>,
        value: Vec<u8>,
    },
    Branch {
        children: [Option<Link>; 16],
        /// Value for the key ending exactly at this node.
        value: Option<Vec<u8>>,
    },
}

impl Node {
    pub(crate) fn empty_children() -> [Option<Link>; 16] {
        std::array::from_fn(|_| None)
    }
}

/// The serialized form of a node: children are always content addresses.
/// This is the exact byte layout that gets hashed, so it must stay stable.
#[derive(Serialize, Deserialize)]
pub(crate) enum StoredNode {
    Leaf {
        path: Vec<u8>,
        value: Vec<u8>,
    },
    Branch {
        children: [Option<Hash>; 16],
        value: Option<Vec<u8>>,
    },
}

/// Split a byte key into nibbles, high half first.
pub(crate) fn to_nibbles(key: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(key.len() * 2);
    for byte in key {
        out.push(byte >> 4);
        out.push(byte & 0x0f);
    }
    out
}

/// Reassemble a byte key from nibbles. `None` for odd-length input.
pub(crate) fn from_nibbles(nibbles: &[u8]) -> Option<Vec<u8>> {
    if nibbles.len() % 2 != 0 {
        return None;
    }
    let mut out = Vec::with_capacity(nibbles.len() / 2);
    for pair in nibbles.chunks(2) {
        out.push((pair[0] << 4) | pair[1]);
    }
    Some(out)
}

/// Length of the longest common prefix of two nibble slices.
pub(crate) fn common_prefix(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nibble_roundtrip() {
        let key = [0xde, 0xad, 0xbe, 0xef];
        let nibbles = to_nibbles(&key);
        assert_eq!(nibbles, vec![0xd, 0xe, 0xa, 0xd, 0xb, 0xe, 0xe, 0xf]);
        assert_eq!(from_nibbles(&nibbles), Some(key.to_vec()));
    }

    #[test]
    fn odd_nibble_count_rejected() {
        assert_eq!(from_nibbles(&[0x1, 0x2, 0x3]), None);
    }

    #[test]
    fn common_prefix_lengths() {
        assert_eq!(common_prefix(&[1, 2, 3], &[1, 2, 4]), 2);
        assert_eq!(common_prefix(&[1, 2], &[1, 2]), 2);
        assert_eq!(common_prefix(&[5], &[6]), 0);
        assert_eq!(common_prefix(&[], &[1]), 0);
    }
}
