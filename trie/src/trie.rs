//! The authenticated trie.

use std::sync::Arc;

use senate_crypto::keccak256;
use senate_store::Store;
use senate_types::Hash;

use crate::error::TrieError;
use crate::node::{common_prefix, from_nibbles, to_nibbles, Link, Node, StoredNode};

/// Store key namespace for trie nodes (content address follows).
const NODE_PREFIX: &[u8] = b"n/";

fn node_key(hash: &Hash) -> Vec<u8> {
    let mut key = Vec::with_capacity(NODE_PREFIX.len() + 32);
    key.extend_from_slice(NODE_PREFIX);
    key.extend_from_slice(hash.as_bytes());
    key
}

/// An authenticated key/value trie over a pluggable store.
///
/// Mutations stay in memory until [`Trie::commit`]; an uncommitted trie can be
/// cloned cheaply to obtain an independent scratch copy.
#[derive(Clone)]
pub struct Trie {
    store: Arc<dyn Store>,
    root: Option<Link>,
}

impl Trie {
    /// A new, empty trie. The empty root is the all-zero hash.
    pub fn empty(store: Arc<dyn Store>) -> Self {
        Self { store, root: None }
    }

    /// Open the trie persisted under `root`. Fails with
    /// [`TrieError::MissingRoot`] if the root node is not in the store.
    pub fn open(store: Arc<dyn Store>, root: Hash) -> Result<Self, TrieError> {
        if root.is_zero() {
            return Ok(Self::empty(store));
        }
        if store.get(&node_key(&root))?.is_none() {
            return Err(TrieError::MissingRoot(root));
        }
        Ok(Self {
            store,
            root: Some(Link::Hash(root)),
        })
    }

    /// Look up a key.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, TrieError> {
        let nibbles = to_nibbles(key);
        let mut rest: &[u8] = &nibbles;
        let Some(link) = &self.root else {
            return Ok(None);
        };
        let mut node = self.resolve(link)?;
        loop {
            match node {
                Node::Leaf { path, value } => {
                    return Ok(if path == rest { Some(value) } else { None });
                }
                Node::Branch { children, value } => {
                    if rest.is_empty() {
                        return Ok(value);
                    }
                    match &children[rest[0] as usize] {
                        None => return Ok(None),
                        Some(link) => {
                            node = self.resolve(link)?;
                            rest = &rest[1..];
                        }
                    }
                }
            }
        }
    }

    /// Insert or overwrite a key.
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), TrieError> {
        let nibbles = to_nibbles(key);
        let root = self.root.take();
        let node = self.insert(root, &nibbles, value.to_vec())?;
        self.root = Some(Link::Node(Box::new(node)));
        Ok(())
    }

    /// Remove a key. Removing an absent key leaves the trie unchanged.
    pub fn delete(&mut self, key: &[u8]) -> Result<(), TrieError> {
        let nibbles = to_nibbles(key);
        if let Some(link) = self.root.take() {
            self.root = self.remove(link, &nibbles)?.map(|n| Link::Node(Box::new(n)));
        }
        Ok(())
    }

    /// All key/value pairs whose key starts with `prefix`, in lexicographic
    /// key order.
    pub fn iter_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, TrieError> {
        let mut out = Vec::new();
        if let Some(link) = &self.root {
            let node = self.resolve(link)?;
            self.collect(&node, &mut Vec::new(), &to_nibbles(prefix), &mut out)?;
        }
        Ok(out)
    }

    /// The current root hash. Computed from in-memory nodes without touching
    /// the store's persisted state; stable for a given content.
    pub fn root_hash(&self) -> Result<Hash, TrieError> {
        match &self.root {
            None => Ok(Hash::ZERO),
            Some(link) => self.link_hash(link),
        }
    }

    /// Persist all dirty nodes and return the root hash.
    pub fn commit(&mut self) -> Result<Hash, TrieError> {
        let mut batch = Vec::new();
        let root = self.commit_into(&mut batch);
        if !batch.is_empty() {
            self.store.put_batch(&batch)?;
        }
        Ok(root)
    }

    /// Serialize dirty nodes into `batch` without writing them, converting
    /// the in-memory tree to persisted references. The caller owns the write,
    /// which lets a snapshot commit several tries in one atomic batch.
    pub fn commit_into(&mut self, batch: &mut Vec<(Vec<u8>, Vec<u8>)>) -> Hash {
        match self.root.as_mut() {
            None => Hash::ZERO,
            Some(link) => flush(link, batch),
        }
    }

    fn load_node(&self, hash: &Hash) -> Result<Node, TrieError> {
        let bytes = self
            .store
            .get(&node_key(hash))?
            .ok_or(TrieError::MissingNode(*hash))?;
        let stored: StoredNode = bincode::deserialize(&bytes)
            .map_err(|e| TrieError::Corrupt(*hash, e.to_string()))?;
        Ok(match stored {
            StoredNode::Leaf { path, value } => Node::Leaf { path, value },
            StoredNode::Branch { children, value } => {
                let mut links = Node::empty_children();
                for (slot, child) in links.iter_mut().zip(children) {
                    *slot = child.map(Link::Hash);
                }
                Node::Branch {
                    children: links,
                    value,
                }
            }
        })
    }

    fn resolve(&self, link: &Link) -> Result<Node, TrieError> {
        match link {
            Link::Hash(hash) => self.load_node(hash),
            Link::Node(node) => Ok((**node).clone()),
        }
    }

    fn insert(&self, link: Option<Link>, path: &[u8], value: Vec<u8>) -> Result<Node, TrieError> {
        let Some(link) = link else {
            return Ok(Node::Leaf {
                path: path.to_vec(),
                value,
            });
        };
        match self.resolve(&link)? {
            Node::Leaf {
                path: leaf_path,
                value: leaf_value,
            } => {
                if leaf_path == path {
                    return Ok(Node::Leaf {
                        path: leaf_path,
                        value,
                    });
                }

                // Split: a branch at the divergence point, wrapped in a chain
                // of single-child branches covering the shared prefix.
                let split = common_prefix(&leaf_path, path);
                let mut children = Node::empty_children();
                let mut branch_value = None;
                if leaf_path.len() == split {
                    branch_value = Some(leaf_value);
                } else {
                    children[leaf_path[split] as usize] = Some(Link::Node(Box::new(Node::Leaf {
                        path: leaf_path[split + 1..].to_vec(),
                        value: leaf_value,
                    })));
                }
                if path.len() == split {
                    branch_value = Some(value);
                } else {
                    children[path[split] as usize] = Some(Link::Node(Box::new(Node::Leaf {
                        path: path[split + 1..].to_vec(),
                        value,
                    })));
                }
                let mut node = Node::Branch {
                    children,
                    value: branch_value,
                };
                for &nibble in leaf_path[..split].iter().rev() {
                    let mut chain = Node::empty_children();
                    chain[nibble as usize] = Some(Link::Node(Box::new(node)));
                    node = Node::Branch {
                        children: chain,
                        value: None,
                    };
                }
                Ok(node)
            }
            Node::Branch {
                mut children,
                value: branch_value,
            } => {
                if path.is_empty() {
                    return Ok(Node::Branch {
                        children,
                        value: Some(value),
                    });
                }
                let idx = path[0] as usize;
                let child = children[idx].take();
                let new_child = self.insert(child, &path[1..], value)?;
                children[idx] = Some(Link::Node(Box::new(new_child)));
                Ok(Node::Branch {
                    children,
                    value: branch_value,
                })
            }
        }
    }

    fn remove(&self, link: Link, path: &[u8]) -> Result<Option<Node>, TrieError> {
        match self.resolve(&link)? {
            Node::Leaf {
                path: leaf_path,
                value,
            } => Ok(if leaf_path == path {
                None
            } else {
                Some(Node::Leaf {
                    path: leaf_path,
                    value,
                })
            }),
            Node::Branch {
                mut children,
                mut value,
            } => {
                if path.is_empty() {
                    value = None;
                } else if let Some(child) = children[path[0] as usize].take() {
                    children[path[0] as usize] = self
                        .remove(child, &path[1..])?
                        .map(|n| Link::Node(Box::new(n)));
                }
                self.collapse(children, value)
            }
        }
    }

    /// Restore the canonical form after a removal: an empty branch vanishes, a
    /// value-only branch becomes a leaf, and a single-child branch merges into
    /// its child when the child is a leaf.
    fn collapse(
        &self,
        mut children: [Option<Link>; 16],
        value: Option<Vec<u8>>,
    ) -> Result<Option<Node>, TrieError> {
        let occupied: Vec<usize> = (0..16).filter(|i| children[*i].is_some()).collect();
        match (occupied.len(), value) {
            (0, None) => Ok(None),
            (0, Some(value)) => Ok(Some(Node::Leaf {
                path: Vec::new(),
                value,
            })),
            (1, None) => {
                let idx = occupied[0];
                let child = children[idx].take().expect("occupied slot");
                match self.resolve(&child)? {
                    Node::Leaf { path, value } => {
                        let mut merged = Vec::with_capacity(path.len() + 1);
                        merged.push(idx as u8);
                        merged.extend_from_slice(&path);
                        Ok(Some(Node::Leaf {
                            path: merged,
                            value,
                        }))
                    }
                    Node::Branch { .. } => {
                        children[idx] = Some(child);
                        Ok(Some(Node::Branch {
                            children,
                            value: None,
                        }))
                    }
                }
            }
            (_, value) => Ok(Some(Node::Branch { children, value })),
        }
    }

    fn link_hash(&self, link: &Link) -> Result<Hash, TrieError> {
        match link {
            Link::Hash(hash) => Ok(*hash),
            Link::Node(node) => {
                let stored = self.to_stored(node)?;
                let bytes = bincode::serialize(&stored)
                    .expect("trie node serialization should not fail");
                Ok(keccak256(&bytes))
            }
        }
    }

    fn to_stored(&self, node: &Node) -> Result<StoredNode, TrieError> {
        Ok(match node {
            Node::Leaf { path, value } => StoredNode::Leaf {
                path: path.clone(),
                value: value.clone(),
            },
            Node::Branch { children, value } => {
                let mut hashes: [Option<Hash>; 16] = [None; 16];
                for (slot, child) in hashes.iter_mut().zip(children.iter()) {
                    if let Some(link) = child {
                        *slot = Some(self.link_hash(link)?);
                    }
                }
                StoredNode::Branch {
                    children: hashes,
                    value: value.clone(),
                }
            }
        })
    }

    fn collect(
        &self,
        node: &Node,
        acc: &mut Vec<u8>,
        remaining: &[u8],
        out: &mut Vec<(Vec<u8>, Vec<u8>)>,
    ) -> Result<(), TrieError> {
        match node {
            Node::Leaf { path, value } => {
                let covered = remaining.len() <= path.len() && path[..remaining.len()] == *remaining;
                if covered {
                    let mut full = acc.clone();
                    full.extend_from_slice(path);
                    if let Some(key) = from_nibbles(&full) {
                        out.push((key, value.clone()));
                    }
                }
            }
            Node::Branch { children, value } => {
                if remaining.is_empty() {
                    if let Some(value) = value {
                        if let Some(key) = from_nibbles(acc) {
                            out.push((key, value.clone()));
                        }
                    }
                    for (nibble, child) in children.iter().enumerate() {
                        if let Some(link) = child {
                            let node = self.resolve(link)?;
                            acc.push(nibble as u8);
                            self.collect(&node, acc, &[], out)?;
                            acc.pop();
                        }
                    }
                } else if let Some(link) = &children[remaining[0] as usize] {
                    let node = self.resolve(link)?;
                    acc.push(remaining[0]);
                    self.collect(&node, acc, &remaining[1..], out)?;
                    acc.pop();
                }
            }
        }
        Ok(())
    }
}

fn flush(link: &mut Link, batch: &mut Vec<(Vec<u8>, Vec<u8>)>) -> Hash {
    let hash = match link {
        Link::Hash(hash) => return *hash,
        Link::Node(node) => {
            let stored = match node.as_mut() {
                Node::Leaf { path, value } => StoredNode::Leaf {
                    path: path.clone(),
                    value: value.clone(),
                },
                Node::Branch { children, value } => {
                    let mut hashes: [Option<Hash>; 16] = [None; 16];
                    for (slot, child) in hashes.iter_mut().zip(children.iter_mut()) {
                        if let Some(link) = child {
                            *slot = Some(flush(link, batch));
                        }
                    }
                    StoredNode::Branch {
                        children: hashes,
                        value: value.clone(),
                    }
                }
            };
            let bytes =
                bincode::serialize(&stored).expect("trie node serialization should not fail");
            let hash = keccak256(&bytes);
            batch.push((node_key(&hash), bytes));
            hash
        }
    };
    *link = Link::Hash(hash);
    hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use senate_store::MemoryStore;

    fn new_trie() -> Trie {
        Trie::empty(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn empty_trie_has_zero_root() {
        let trie = new_trie();
        assert_eq!(trie.root_hash().unwrap(), Hash::ZERO);
        assert_eq!(trie.get(b"missing").unwrap(), None);
    }

    #[test]
    fn put_get_overwrite() {
        let mut trie = new_trie();
        trie.put(b"key", b"one").unwrap();
        assert_eq!(trie.get(b"key").unwrap(), Some(b"one".to_vec()));

        trie.put(b"key", b"two").unwrap();
        assert_eq!(trie.get(b"key").unwrap(), Some(b"two".to_vec()));
    }

    #[test]
    fn root_is_insertion_order_independent() {
        let keys: [&[u8]; 4] = [b"abcd", b"abce", b"xyz", b"ab"];

        let mut forward = new_trie();
        for key in keys {
            forward.put(key, key).unwrap();
        }
        let mut backward = new_trie();
        for key in keys.iter().rev() {
            backward.put(key, key).unwrap();
        }
        assert_eq!(
            forward.root_hash().unwrap(),
            backward.root_hash().unwrap()
        );
    }

    #[test]
    fn delete_restores_prior_root() {
        let mut trie = new_trie();
        trie.put(b"alpha", b"1").unwrap();
        trie.put(b"alps", b"2").unwrap();
        let before = trie.root_hash().unwrap();

        trie.put(b"beta", b"3").unwrap();
        trie.delete(b"beta").unwrap();
        assert_eq!(trie.root_hash().unwrap(), before);

        trie.delete(b"alpha").unwrap();
        trie.delete(b"alps").unwrap();
        assert_eq!(trie.root_hash().unwrap(), Hash::ZERO);
    }

    #[test]
    fn delete_absent_key_is_noop() {
        let mut trie = new_trie();
        trie.put(b"present", b"v").unwrap();
        let before = trie.root_hash().unwrap();
        trie.delete(b"absent").unwrap();
        assert_eq!(trie.root_hash().unwrap(), before);
    }

    #[test]
    fn iter_prefix_returns_sorted_matches() {
        let mut trie = new_trie();
        trie.put(b"aa/1", b"one").unwrap();
        trie.put(b"aa/3", b"three").unwrap();
        trie.put(b"aa/2", b"two").unwrap();
        trie.put(b"bb/1", b"other").unwrap();

        let matches = trie.iter_prefix(b"aa/").unwrap();
        let keys: Vec<&[u8]> = matches.iter().map(|(k, _)| k.as_slice()).collect();
        assert_eq!(keys, vec![&b"aa/1"[..], &b"aa/2"[..], &b"aa/3"[..]]);

        let all = trie.iter_prefix(b"").unwrap();
        assert_eq!(all.len(), 4);
    }

    #[test]
    fn commit_then_open_roundtrip() {
        let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
        let mut trie = Trie::empty(store.clone());
        trie.put(b"one", b"1").unwrap();
        trie.put(b"two", b"2").unwrap();
        let root = trie.commit().unwrap();

        let reopened = Trie::open(store, root).unwrap();
        assert_eq!(reopened.get(b"one").unwrap(), Some(b"1".to_vec()));
        assert_eq!(reopened.get(b"two").unwrap(), Some(b"2".to_vec()));
        assert_eq!(reopened.root_hash().unwrap(), root);
    }

    #[test]
    fn mutate_after_commit_preserves_old_version() {
        let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
        let mut trie = Trie::empty(store.clone());
        trie.put(b"k", b"old").unwrap();
        let old_root = trie.commit().unwrap();

        trie.put(b"k", b"new").unwrap();
        let new_root = trie.commit().unwrap();
        assert_ne!(old_root, new_root);

        let old = Trie::open(store.clone(), old_root).unwrap();
        assert_eq!(old.get(b"k").unwrap(), Some(b"old".to_vec()));
        let new = Trie::open(store, new_root).unwrap();
        assert_eq!(new.get(b"k").unwrap(), Some(b"new".to_vec()));
    }

    #[test]
    fn open_unknown_root_fails() {
        let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
        let bogus = Hash::new([0x77; 32]);
        match Trie::open(store, bogus) {
            Err(TrieError::MissingRoot(h)) => assert_eq!(h, bogus),
            other => panic!("expected MissingRoot, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn scratch_clone_does_not_affect_original() {
        let mut trie = new_trie();
        trie.put(b"base", b"v").unwrap();
        let base_root = trie.root_hash().unwrap();

        let mut scratch = trie.clone();
        scratch.put(b"extra", b"w").unwrap();
        assert_ne!(scratch.root_hash().unwrap(), base_root);
        assert_eq!(trie.root_hash().unwrap(), base_root);
    }

    #[test]
    fn key_that_is_prefix_of_another() {
        let mut trie = new_trie();
        trie.put(b"ab", b"short").unwrap();
        trie.put(b"abcd", b"long").unwrap();
        assert_eq!(trie.get(b"ab").unwrap(), Some(b"short".to_vec()));
        assert_eq!(trie.get(b"abcd").unwrap(), Some(b"long".to_vec()));

        trie.delete(b"ab").unwrap();
        assert_eq!(trie.get(b"ab").unwrap(), None);
        assert_eq!(trie.get(b"abcd").unwrap(), Some(b"long".to_vec()));

        let mut fresh = new_trie();
        fresh.put(b"abcd", b"long").unwrap();
        assert_eq!(trie.root_hash().unwrap(), fresh.root_hash().unwrap());
    }
}
