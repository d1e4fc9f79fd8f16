//! Local mirror of the on-chain membership set: an incremental MiMC Merkle tree
//! of fixed depth whose empty leaves hold a configurable zero value.

use crate::mimc::MimcSponge;
use ark_bn254::Fr;
use whistle_types::{WhistleError, WhistleResult};

/// Upper bound on supported depths; the on-chain set takes depth as a `uint8`
/// and anything deeper is unprovable in practice.
pub const MAX_TREE_DEPTH: usize = 32;

/// Sibling path from a leaf to the root.
///
/// `path_indices[i]` is `true` when the node at level `i` is a right child.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MerklePath {
    pub leaf_index: usize,
    pub path_elements: Vec<Fr>,
    pub path_indices: Vec<bool>,
}

#[derive(Clone, Debug)]
pub struct MembershipTree<'a> {
    sponge: &'a MimcSponge,
    depth: usize,
    leaves: Vec<Fr>,
    zeros: Vec<Fr>,
}

impl<'a> MembershipTree<'a> {
    /// Precomputes the empty subtree root for every level.
    pub fn new(sponge: &'a MimcSponge, depth: usize, zero_value: Fr) -> WhistleResult<Self> {
        if depth == 0 || depth > MAX_TREE_DEPTH {
            return Err(WhistleError::Crypto(format!(
                "Membership depth must be within 1..={}, got {}",
                MAX_TREE_DEPTH, depth
            )));
        }

        let mut zeros = Vec::with_capacity(depth + 1);
        let mut current = zero_value;
        zeros.push(current);
        for _ in 0..depth {
            current = sponge.hash_left_right(current, current);
            zeros.push(current);
        }

        Ok(Self {
            sponge,
            depth,
            leaves: Vec::new(),
            zeros,
        })
    }

    /// Rebuilds the tree from leaves in insertion order.
    pub fn from_leaves(
        sponge: &'a MimcSponge,
        depth: usize,
        zero_value: Fr,
        leaves: &[Fr],
    ) -> WhistleResult<Self> {
        let mut tree = Self::new(sponge, depth, zero_value)?;
        for leaf in leaves {
            tree.insert(*leaf)?;
        }
        Ok(tree)
    }

    pub fn capacity(&self) -> usize {
        1usize << self.depth
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Appends a leaf and returns its index.
    pub fn insert(&mut self, leaf: Fr) -> WhistleResult<usize> {
        if self.leaves.len() >= self.capacity() {
            return Err(WhistleError::Crypto(format!(
                "Membership set is full ({} leaves)",
                self.capacity()
            )));
        }
        let index = self.leaves.len();
        self.leaves.push(leaf);
        Ok(index)
    }

    pub fn index_of(&self, leaf: &Fr) -> Option<usize> {
        self.leaves.iter().position(|l| l == leaf)
    }

    pub fn root(&self) -> Fr {
        self.levels()
            .last()
            .and_then(|level| level.first().copied())
            .unwrap_or(self.zeros[self.depth])
    }

    pub fn path(&self, leaf_index: usize) -> WhistleResult<MerklePath> {
        if leaf_index >= self.leaves.len() {
            return Err(WhistleError::Crypto(format!(
                "Leaf index {} out of range ({} leaves)",
                leaf_index,
                self.leaves.len()
            )));
        }

        let levels = self.levels();
        let mut path_elements = Vec::with_capacity(self.depth);
        let mut path_indices = Vec::with_capacity(self.depth);
        let mut idx = leaf_index;

        for (level, nodes) in levels.iter().take(self.depth).enumerate() {
            let sibling = nodes.get(idx ^ 1).copied().unwrap_or(self.zeros[level]);
            path_elements.push(sibling);
            path_indices.push(idx & 1 == 1);
            idx >>= 1;
        }

        Ok(MerklePath {
            leaf_index,
            path_elements,
            path_indices,
        })
    }

    pub fn verify_path(&self, leaf: Fr, path: &MerklePath, root: Fr) -> bool {
        let mut current = leaf;
        for (sibling, is_right) in path.path_elements.iter().zip(&path.path_indices) {
            current = if *is_right {
                self.sponge.hash_left_right(*sibling, current)
            } else {
                self.sponge.hash_left_right(current, *sibling)
            };
        }
        current == root
    }

    pub fn leaves(&self) -> &[Fr] {
        &self.leaves
    }

    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    // Only populated nodes are materialised; missing right siblings are the
    // empty subtree root of that level.
    fn levels(&self) -> Vec<Vec<Fr>> {
        let mut levels = Vec::with_capacity(self.depth + 1);
        let mut level = self.leaves.clone();

        for depth_idx in 0..self.depth {
            let next: Vec<Fr> = level
                .chunks(2)
                .map(|pair| {
                    let right = pair.get(1).copied().unwrap_or(self.zeros[depth_idx]);
                    self.sponge.hash_left_right(pair[0], right)
                })
                .collect();
            levels.push(level);
            level = next;
        }
        levels.push(level);
        levels
    }
}
