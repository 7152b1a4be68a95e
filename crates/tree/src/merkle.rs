//! Sorted-pair binary Merkle tree.
//!
//! Leaves are sorted and de-duplicated before the tree is built, and each
//! parent is `SHA256(min(left, right) || max(left, right))`. An odd node at
//! the end of a level is promoted to the next level unchanged.

use sha2::{Digest, Sha256};

use rewardcraft_core::{Hash, ZERO_HASH};

/// Hash two sibling nodes in canonical (sorted) order.
pub fn hash_pair(a: &Hash, b: &Hash) -> Hash {
    let (first, second) = if a <= b { (a, b) } else { (b, a) };
    let mut hasher = Sha256::new();
    hasher.update(first);
    hasher.update(second);
    let result = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&result);
    out
}

/// Inclusion proof: sibling hashes from the leaf level upwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MerkleProof {
    pub siblings: Vec<Hash>,
}

impl MerkleProof {
    pub fn new(siblings: Vec<Hash>) -> Self {
        Self { siblings }
    }

    /// Fold the siblings over `leaf` to recompute the root.
    pub fn compute_root(&self, leaf: &Hash) -> Hash {
        self.siblings
            .iter()
            .fold(*leaf, |node, sibling| hash_pair(&node, sibling))
    }

    pub fn len(&self) -> usize {
        self.siblings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.siblings.is_empty()
    }
}

/// Binary Merkle tree keeping every level for proof generation.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    /// `layers[0]` are the sorted leaves, the last layer holds the root
    layers: Vec<Vec<Hash>>,
}

impl MerkleTree {
    /// Build a tree over `leaves`. Order of the input does not matter.
    pub fn from_leaves(leaves: &[Hash]) -> Self {
        let mut base = leaves.to_vec();
        base.sort_unstable();
        base.dedup();

        let mut layers = vec![base];
        while layers.last().map_or(false, |layer| layer.len() > 1) {
            let current = &layers[layers.len() - 1];
            let next: Vec<Hash> = current
                .chunks(2)
                .map(|pair| match pair {
                    [left, right] => hash_pair(left, right),
                    _ => pair[0],
                })
                .collect();
            layers.push(next);
        }

        Self { layers }
    }

    /// Tree root; the zero hash for an empty tree.
    pub fn root(&self) -> Hash {
        self.layers
            .last()
            .and_then(|layer| layer.first())
            .copied()
            .unwrap_or(ZERO_HASH)
    }

    /// Number of distinct leaves.
    pub fn leaf_count(&self) -> usize {
        self.layers.first().map_or(0, |layer| layer.len())
    }

    /// Generate an inclusion proof for `leaf`, or `None` if it is not in the tree.
    pub fn proof(&self, leaf: &Hash) -> Option<MerkleProof> {
        let mut index = self.layers.first()?.binary_search(leaf).ok()?;
        let mut siblings = Vec::with_capacity(self.layers.len());

        for layer in &self.layers[..self.layers.len() - 1] {
            let pair = index ^ 1;
            if pair < layer.len() {
                siblings.push(layer[pair]);
            }
            index /= 2;
        }

        Some(MerkleProof { siblings })
    }

    /// Check that `proof` links `leaf` to `root`.
    pub fn verify(root: &Hash, leaf: &Hash, proof: &MerkleProof) -> bool {
        proof.compute_root(leaf) == *root
    }
}
