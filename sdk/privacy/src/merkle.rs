//! Merkle Path Reconstruction
//!
//! Recomputes the root of the venue's commitment tree from a leaf and its
//! authentication path. The tree itself lives on the ledger.
//!
//! ```text
//!                    Root
//!                   /    \
//!                 H01    H23
//!                /  \   /   \
//!               H0  H1 H2   H3
//!               |   |   |    |
//!              C0  C1  C2   C3  (Commitments)
//!
//! level i: index even -> H(acc, sibling), odd -> H(sibling, acc); index /= 2
//! ```
//!
//! Reconstruction does not decide whether a root is trusted. That is the job
//! of a [`TrustedRoots`] source.

use std::collections::VecDeque;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::element::Element;
use crate::error::{PrivacyError, Result};
use crate::hash::FieldHasher;

/// Deepest supported tree (2^32 leaves)
pub const MAX_TREE_DEPTH: usize = 32;

/// Recompute a root from `leaf`, its sibling hashes (leaf level first) and
/// the leaf index. O(depth).
pub fn merkle_root(
    hasher: &dyn FieldHasher,
    leaf: Element,
    siblings: &[Element],
    leaf_index: u64,
) -> Element {
    let mut current = leaf;
    let mut index = leaf_index;

    for sibling in siblings {
        current = if index & 1 == 0 {
            hasher.hash2(current, *sibling)
        } else {
            hasher.hash2(*sibling, current)
        };
        index /= 2;
    }

    current
}

/// Authentication path for one leaf
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerkleAuthPath {
    /// Sibling hashes from leaf to root
    pub siblings: Vec<Element>,
    /// Position of the leaf
    pub leaf_index: u64,
}

impl MerkleAuthPath {
    pub fn new(siblings: Vec<Element>, leaf_index: u64) -> Self {
        Self {
            siblings,
            leaf_index,
        }
    }

    pub fn depth(&self) -> usize {
        self.siblings.len()
    }

    /// Reject paths whose shape cannot describe a leaf of a supported tree
    pub fn validate(&self) -> Result<()> {
        let depth = self.depth();
        if depth == 0 || depth > MAX_TREE_DEPTH {
            return Err(PrivacyError::InvalidPathDepth {
                depth,
                max: MAX_TREE_DEPTH,
            });
        }
        if self.leaf_index >> depth != 0 {
            return Err(PrivacyError::LeafIndexOutOfRange {
                index: self.leaf_index,
                depth,
            });
        }
        Ok(())
    }

    pub fn compute_root(&self, hasher: &dyn FieldHasher, leaf: Element) -> Element {
        merkle_root(hasher, leaf, &self.siblings, self.leaf_index)
    }
}

/// Read-only view of the roots the ledger currently accepts
pub trait TrustedRoots: Send + Sync {
    fn is_trusted(&self, root: &Element) -> bool;
}

/// Root history for the commitment tree
///
/// Stores recent roots so proofs can reference a slightly stale root.
#[derive(Debug, Default)]
pub struct RootHistory {
    /// Recent roots (most recent first)
    roots: VecDeque<Element>,
    /// Maximum history size
    max_size: usize,
}

impl RootHistory {
    pub fn new(max_size: usize) -> Self {
        Self {
            roots: VecDeque::with_capacity(max_size),
            max_size,
        }
    }

    /// Add a newly accepted root
    pub fn push(&mut self, root: Element) {
        self.roots.push_front(root);
        self.roots.truncate(self.max_size);
    }

    /// Check if a root is current or recent
    pub fn is_valid(&self, root: &Element) -> bool {
        self.roots.contains(root)
    }

    /// Get the most recent root
    pub fn current(&self) -> Option<&Element> {
        self.roots.front()
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

impl TrustedRoots for RootHistory {
    fn is_trusted(&self, root: &Element) -> bool {
        self.is_valid(root)
    }
}

impl TrustedRoots for RwLock<RootHistory> {
    fn is_trusted(&self, root: &Element) -> bool {
        // a poisoned history trusts nothing
        self.read().map(|h| h.is_valid(root)).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::LinearHasher;

    #[test]
    fn test_even_index_puts_leaf_left() {
        let h = LinearHasher;
        let leaf = Element::from(1u64);
        let sib = Element::from(2u64);
        assert_eq!(merkle_root(&h, leaf, &[sib], 0), h.hash2(leaf, sib));
        assert_eq!(merkle_root(&h, leaf, &[sib], 1), h.hash2(sib, leaf));
    }

    #[test]
    fn test_index_halves_per_level() {
        let h = LinearHasher;
        let leaf = Element::from(10u64);
        let s0 = Element::from(20u64);
        let s1 = Element::from(30u64);

        // index 2 = 0b10: left at level 0, right at level 1
        let l0 = h.hash2(leaf, s0);
        let expected = h.hash2(s1, l0);
        assert_eq!(merkle_root(&h, leaf, &[s0, s1], 2), expected);
    }

    #[test]
    fn test_empty_path_returns_leaf() {
        let leaf = Element::from(5u64);
        assert_eq!(merkle_root(&LinearHasher, leaf, &[], 0), leaf);
    }

    #[test]
    fn test_validate_path_shape() {
        let path = MerkleAuthPath::new(vec![Element::zero(); 3], 7);
        assert!(path.validate().is_ok());

        let path = MerkleAuthPath::new(vec![Element::zero(); 3], 8);
        assert_eq!(
            path.validate(),
            Err(PrivacyError::LeafIndexOutOfRange { index: 8, depth: 3 })
        );

        let path = MerkleAuthPath::new(vec![], 0);
        assert!(matches!(
            path.validate(),
            Err(PrivacyError::InvalidPathDepth { depth: 0, .. })
        ));

        let path = MerkleAuthPath::new(vec![Element::zero(); MAX_TREE_DEPTH + 1], 0);
        assert!(path.validate().is_err());
    }

    #[test]
    fn test_root_history() {
        let mut history = RootHistory::new(2);

        let r1 = Element::from(1u64);
        let r2 = Element::from(2u64);
        let r3 = Element::from(3u64);

        history.push(r1);
        history.push(r2);
        assert!(history.is_trusted(&r1));

        history.push(r3);
        assert!(!history.is_trusted(&r1), "oldest root should be evicted");
        assert!(history.is_trusted(&r2));
        assert_eq!(history.current(), Some(&r3));
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_shared_history() {
        let shared = RwLock::new(RootHistory::new(4));
        let root = Element::from(9u64);
        assert!(!shared.is_trusted(&root));
        shared.write().unwrap().push(root);
        assert!(shared.is_trusted(&root));
    }
}
