//! Checks path reconstruction against a tree built level by level.

use shade_privacy::{Element, FieldHasher, MerkleAuthPath, PoseidonHasher, merkle_root};

/// Full binary tree kept as a list of levels (leaves first)
struct ReferenceTree {
    levels: Vec<Vec<Element>>,
}

impl ReferenceTree {
    fn build(hasher: &dyn FieldHasher, leaves: Vec<Element>) -> Self {
        assert!(leaves.len().is_power_of_two());
        let mut levels = vec![leaves];
        while levels.last().unwrap().len() > 1 {
            let next = levels
                .last()
                .unwrap()
                .chunks(2)
                .map(|pair| hasher.hash2(pair[0], pair[1]))
                .collect();
            levels.push(next);
        }
        Self { levels }
    }

    fn root(&self) -> Element {
        self.levels.last().unwrap()[0]
    }

    fn path(&self, index: usize) -> MerkleAuthPath {
        let mut siblings = Vec::new();
        let mut i = index;
        for level in &self.levels[..self.levels.len() - 1] {
            siblings.push(level[i ^ 1]);
            i /= 2;
        }
        MerkleAuthPath::new(siblings, index as u64)
    }
}

fn leaves(n: u64) -> Vec<Element> {
    (0..n).map(|i| Element::from(1000 + i)).collect()
}

#[test]
fn every_leaf_reconstructs_the_reference_root() {
    let hasher = PoseidonHasher::new();
    let tree = ReferenceTree::build(&hasher, leaves(8));

    for index in 0..8 {
        let path = tree.path(index);
        path.validate().unwrap();
        let leaf = tree.levels[0][index];
        assert_eq!(path.compute_root(&hasher, leaf), tree.root(), "leaf {index}");
    }
}

#[test]
fn swapping_order_at_any_level_changes_the_root() {
    let hasher = PoseidonHasher::new();
    let tree = ReferenceTree::build(&hasher, leaves(8));
    let index = 5usize;
    let path = tree.path(index);
    let leaf = tree.levels[0][index];

    for flipped in 0..path.depth() {
        // recompute with the concatenation order reversed at one level only
        let mut current = leaf;
        let mut i = path.leaf_index;
        for (level, sibling) in path.siblings.iter().enumerate() {
            let leaf_on_left = (i & 1 == 0) != (level == flipped);
            current = if leaf_on_left {
                hasher.hash2(current, *sibling)
            } else {
                hasher.hash2(*sibling, current)
            };
            i /= 2;
        }
        assert_ne!(current, tree.root(), "flip at level {flipped}");
    }
}

#[test]
fn wrong_index_or_leaf_misses_the_root() {
    let hasher = PoseidonHasher::new();
    let tree = ReferenceTree::build(&hasher, leaves(4));
    let path = tree.path(2);
    let leaf = tree.levels[0][2];

    assert_ne!(merkle_root(&hasher, leaf, &path.siblings, 3), tree.root());
    assert_ne!(
        path.compute_root(&hasher, Element::from(424242u64)),
        tree.root()
    );
}
