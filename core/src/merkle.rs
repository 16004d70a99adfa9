//! Sparse binary Merkle tree over the 32-bit words of guest memory.
//!
//! Leaves are `SHA-256(word_le)` and inner nodes `SHA-256(left || right)`. Only subtrees that
//! differ from the all-zero memory are stored; everything else is covered by a table of
//! precomputed empty-subtree hashes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::Digest;

pub fn leaf_hash(word: u32) -> Digest {
    Digest::hash(&word.to_le_bytes())
}

/// `zero_hashes(depth)[l]` is the root of an all-zero subtree of height `l`
pub fn zero_hashes(depth: u32) -> Vec<Digest> {
    let mut zeros = Vec::with_capacity(depth as usize + 1);
    zeros.push(leaf_hash(0));
    for l in 0..depth as usize {
        zeros.push(Digest::hash_pair(&zeros[l], &zeros[l]));
    }
    zeros
}

#[derive(Clone, Debug)]
pub struct MemoryTree {
    depth: u32,
    zeros: Vec<Digest>,
    /// `levels[0]` holds leaves, `levels[depth]` the root; missing entries are empty subtrees
    levels: Vec<HashMap<u32, Digest>>,
}

impl MemoryTree {
    pub fn new(depth: u32) -> Self {
        Self {
            depth,
            zeros: zero_hashes(depth),
            levels: vec![HashMap::new(); depth as usize + 1],
        }
    }

    /// Builds the tree for a set of non-zero words, hashing every touched node once
    pub fn from_words(depth: u32, words: impl IntoIterator<Item = (u32, u32)>) -> Self {
        let mut tree = Self::new(depth);
        for (index, word) in words {
            if word != 0 {
                tree.levels[0].insert(index, leaf_hash(word));
            }
        }
        for l in 0..depth as usize {
            let mut parents: Vec<u32> = tree.levels[l].keys().map(|i| i >> 1).collect();
            parents.sort_unstable();
            parents.dedup();
            for p in parents {
                let node = Digest::hash_pair(&tree.node(l, p << 1), &tree.node(l, (p << 1) | 1));
                tree.levels[l + 1].insert(p, node);
            }
        }
        tree
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn root(&self) -> Digest {
        self.node(self.depth as usize, 0)
    }

    fn node(&self, level: usize, index: u32) -> Digest {
        self.levels[level].get(&index).copied().unwrap_or(self.zeros[level])
    }

    /// Sets the leaf of word `index` and recomputes its ancestors
    pub fn update(&mut self, index: u32, word: u32) {
        let mut i = index;
        let mut node = leaf_hash(word);
        for l in 0..=self.depth as usize {
            if node == self.zeros[l] {
                self.levels[l].remove(&i);
            } else {
                self.levels[l].insert(i, node);
            }
            if l == self.depth as usize {
                break;
            }
            let sibling = self.node(l, i ^ 1);
            node = if i & 1 == 0 {
                Digest::hash_pair(&node, &sibling)
            } else {
                Digest::hash_pair(&sibling, &node)
            };
            i >>= 1;
        }
    }

    /// Authentication path of word `index`, siblings listed from the leaf level up
    pub fn path(&self, index: u32) -> MerklePath {
        let mut siblings = Vec::with_capacity(self.depth as usize);
        let mut i = index;
        for l in 0..self.depth as usize {
            siblings.push(self.node(l, i ^ 1));
            i >>= 1;
        }
        MerklePath { siblings }
    }

    /// Number of stored non-empty nodes, used for memory estimates
    pub fn stored_nodes(&self) -> usize {
        self.levels.iter().map(|l| l.len()).sum()
    }
}

/// Sibling hashes from a leaf to the root
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerklePath {
    pub siblings: Vec<Digest>,
}

impl MerklePath {
    /// Recomputes the root implied by `leaf` sitting at position `index`
    pub fn root_from_leaf(&self, index: u32, leaf: Digest) -> Digest {
        let mut node = leaf;
        let mut i = index;
        for sibling in &self.siblings {
            node = if i & 1 == 0 {
                Digest::hash_pair(&node, sibling)
            } else {
                Digest::hash_pair(sibling, &node)
            };
            i >>= 1;
        }
        node
    }

    /// Root implied by memory word `value` at word index `index`
    pub fn root_for_word(&self, index: u32, value: u32) -> Digest {
        self.root_from_leaf(index, leaf_hash(value))
    }

    pub fn verify_word(&self, root: &Digest, depth: u32, index: u32, value: u32) -> bool {
        self.siblings.len() == depth as usize
            && (depth >= 32 || index >> depth == 0)
            && self.root_for_word(index, value) == *root
    }
}
