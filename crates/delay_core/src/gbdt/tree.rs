//! Regression tree structures for delay inference
//!
//! Thresholds compare raw integer feature values; leaf values are
//! fixed-point delay minutes at `SCALE` precision.

use serde::{Deserialize, Serialize};

/// One node of a regression tree
///
/// Split nodes route a row left when `row[feature_idx] <= threshold`.
/// Leaves carry `leaf` and use `-1` for `feature_idx`, `left` and `right`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Node {
    pub id: i32,
    pub left: i32,
    pub right: i32,
    pub feature_idx: i32,
    /// Raw feature value, not scaled
    pub threshold: i64,
    /// Delay in micro-minutes
    pub leaf: Option<i64>,
}

impl Node {
    pub fn split(id: i32, feature_idx: i32, threshold: i64, left: i32, right: i32) -> Self {
        Self {
            id,
            left,
            right,
            feature_idx,
            threshold,
            leaf: None,
        }
    }

    pub fn leaf(id: i32, value: i64) -> Self {
        Self {
            leaf: Some(value),
            ..Self::split(id, -1, 0, -1, -1)
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.leaf.is_some() || self.feature_idx < 0
    }
}

/// A single regression tree; node 0 is the root
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Tree {
    pub nodes: Vec<Node>,

    /// Shrinkage applied to leaf values (fixed-point, `SCALE` = 1.0)
    pub weight: i64,
}

impl Tree {
    pub fn new(nodes: Vec<Node>, weight: i64) -> Self {
        Self { nodes, weight }
    }

    /// Index of the leaf reached by a feature vector
    ///
    /// Returns `None` for a malformed tree (out-of-range child or feature).
    pub fn leaf_index(&self, features: &[i64]) -> Option<usize> {
        let mut idx = 0usize;

        // A valid path visits each node at most once.
        for _ in 0..=self.nodes.len() {
            let node = self.nodes.get(idx)?;
            if node.is_leaf() {
                return Some(idx);
            }

            let value = *features.get(usize::try_from(node.feature_idx).ok()?)?;
            let next = if value <= node.threshold {
                node.left
            } else {
                node.right
            };
            idx = usize::try_from(next).ok()?;
        }

        None
    }

    /// Raw (unweighted) leaf value for a feature vector, 0 on malformed trees
    pub fn evaluate(&self, features: &[i64]) -> i64 {
        self.leaf_index(features)
            .and_then(|idx| self.nodes[idx].leaf)
            .unwrap_or(0)
    }

    pub fn num_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Validate tree structure against the model's feature count
    pub fn validate(&self, feature_count: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }

        for (i, node) in self.nodes.iter().enumerate() {
            if node.is_leaf() {
                if node.leaf.is_none() {
                    return Err(format!("leaf node {i} has no leaf value"));
                }
                continue;
            }

            for (side, child) in [("left", node.left), ("right", node.right)] {
                if child <= i as i32 || child as usize >= self.nodes.len() {
                    return Err(format!("node {i} has invalid {side} child: {child}"));
                }
            }

            if node.feature_idx < 0 || node.feature_idx as usize >= feature_count {
                return Err(format!(
                    "node {} has invalid feature index: {}",
                    i, node.feature_idx
                ));
            }
        }

        Ok(())
    }
}
