//! Leaf-wise regression tree builder
//!
//! Grows a tree by repeatedly splitting the leaf with the largest gain
//! until the leaf budget is spent or no split is worth making. Candidate
//! splits come from per-feature histograms over quantised values; all
//! sums and gains use integer arithmetic.

use delay_core::gbdt::Node;
use delay_core::SCALE;
use std::collections::BTreeMap;

use crate::deterministic::SplitTieBreaker;

/// Growth parameters for a single tree, penalties in fixed-point
#[derive(Clone, Debug)]
pub struct TreeConfig {
    pub num_leaves: usize,
    /// 0 means unlimited
    pub max_depth: usize,
    pub min_data_in_leaf: usize,
    pub min_sum_hessian: i64,
    pub lambda_l1: i64,
    pub lambda_l2: i64,
    pub quant_step: i64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            num_leaves: 31,
            max_depth: 0,
            min_data_in_leaf: 20,
            min_sum_hessian: 1_000,
            lambda_l1: 100_000,
            lambda_l2: 100_000,
            quant_step: 1,
        }
    }
}

/// Rows that ended in one leaf of a grown tree
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeafRegion {
    /// Index of the leaf in `GrownTree::nodes`
    pub node: usize,
    pub rows: Vec<usize>,
}

/// Tree nodes plus the training rows of every leaf
#[derive(Clone, Debug)]
pub struct GrownTree {
    pub nodes: Vec<Node>,
    pub leaves: Vec<LeafRegion>,
}

impl GrownTree {
    pub fn num_leaves(&self) -> usize {
        self.leaves.len()
    }

    /// Overwrite the value of the leaf stored at `node`
    pub fn set_leaf_value(&mut self, node: usize, value: i64) {
        if let Some(n) = self.nodes.get_mut(node) {
            n.leaf = Some(value);
        }
    }
}

/// Split candidate with gain and tie-breaker
#[derive(Debug, Clone)]
struct SplitCandidate {
    feature_idx: usize,
    /// Largest quantised value routed left
    bin: i64,
    gain: i64,
    tie_breaker: SplitTieBreaker,
}

impl SplitCandidate {
    fn beats(&self, other: &SplitCandidate) -> bool {
        self.gain > other.gain || (self.gain == other.gain && self.tie_breaker < other.tie_breaker)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct BinStats {
    gradient: i64,
    hessian: i64,
    count: usize,
}

#[derive(Debug)]
struct OpenLeaf {
    node: usize,
    rows: Vec<usize>,
    depth: usize,
    best: Option<SplitCandidate>,
}

/// Build a regression tree from gradients over a subset of rows
pub struct CartBuilder<'a> {
    config: TreeConfig,
    features: &'a [Vec<i64>],
    gradients: &'a [i64],
    hessians: &'a [i64],
}

impl<'a> CartBuilder<'a> {
    pub fn new(
        features: &'a [Vec<i64>],
        gradients: &'a [i64],
        hessians: &'a [i64],
        config: TreeConfig,
    ) -> Self {
        debug_assert_eq!(features.len(), gradients.len());
        debug_assert_eq!(features.len(), hessians.len());

        Self {
            config,
            features,
            gradients,
            hessians,
        }
    }

    /// Grow a tree on `rows`, splitting only on `allowed_features`
    pub fn build(&self, rows: &[usize], allowed_features: &[usize]) -> GrownTree {
        let mut nodes = vec![Node::leaf(0, 0)];
        let mut open = vec![OpenLeaf {
            node: 0,
            rows: rows.to_vec(),
            depth: 0,
            best: self.find_best_split(rows, allowed_features, 0, 0),
        }];

        while open.len() < self.config.num_leaves {
            let Some(pick) = self.pick_leaf(&open) else {
                break;
            };

            let leaf = open.swap_remove(pick);
            let Some(split) = leaf.best else {
                break;
            };

            let (left_rows, right_rows) = self.partition(&leaf.rows, split.feature_idx, split.bin);
            let left = nodes.len();
            let right = left + 1;

            nodes[leaf.node] = Node::split(
                leaf.node as i32,
                split.feature_idx as i32,
                self.raw_threshold(split.bin),
                left as i32,
                right as i32,
            );
            nodes.push(Node::leaf(left as i32, 0));
            nodes.push(Node::leaf(right as i32, 0));

            for (node, child_rows) in [(left, left_rows), (right, right_rows)] {
                let depth = leaf.depth + 1;
                let best = self.find_best_split(&child_rows, allowed_features, node, depth);
                open.push(OpenLeaf {
                    node,
                    rows: child_rows,
                    depth,
                    best,
                });
            }
        }

        let mut leaves: Vec<LeafRegion> = open
            .into_iter()
            .map(|leaf| LeafRegion {
                node: leaf.node,
                rows: leaf.rows,
            })
            .collect();
        leaves.sort_by_key(|leaf| leaf.node);

        for leaf in &leaves {
            nodes[leaf.node].leaf = Some(self.leaf_output(&leaf.rows));
        }

        GrownTree { nodes, leaves }
    }

    /// Open leaf holding the best available split
    fn pick_leaf(&self, open: &[OpenLeaf]) -> Option<usize> {
        let mut best: Option<(usize, &SplitCandidate)> = None;

        for (i, leaf) in open.iter().enumerate() {
            if let Some(candidate) = &leaf.best {
                best = match best {
                    Some((_, current)) if !candidate.beats(current) => best,
                    _ => Some((i, candidate)),
                };
            }
        }

        best.map(|(i, _)| i)
    }

    /// Find the best split using per-feature histograms and prefix sums
    fn find_best_split(
        &self,
        rows: &[usize],
        allowed_features: &[usize],
        leaf_id: usize,
        depth: usize,
    ) -> Option<SplitCandidate> {
        if self.config.max_depth > 0 && depth >= self.config.max_depth {
            return None;
        }
        if rows.len() < 2 * self.config.min_data_in_leaf {
            return None;
        }

        let (total_g, total_h) = self.sum_gradients_hessians(rows);
        let parent_gain = self.leaf_gain(total_g, total_h);
        let mut best: Option<SplitCandidate> = None;

        for &feature_idx in allowed_features {
            let histogram = self.histogram(rows, feature_idx);
            if histogram.len() < 2 {
                continue;
            }

            let mut left = BinStats::default();
            // The last bin cannot be a threshold: nothing would go right.
            for (&bin, stats) in histogram.iter().take(histogram.len() - 1) {
                left.gradient = left.gradient.saturating_add(stats.gradient);
                left.hessian = left.hessian.saturating_add(stats.hessian);
                left.count += stats.count;

                let right_count = rows.len() - left.count;
                if left.count < self.config.min_data_in_leaf {
                    continue;
                }
                if right_count < self.config.min_data_in_leaf {
                    break;
                }

                let right_g = total_g.saturating_sub(left.gradient);
                let right_h = total_h.saturating_sub(left.hessian);
                if left.hessian < self.config.min_sum_hessian || right_h < self.config.min_sum_hessian {
                    continue;
                }

                let gain = self
                    .leaf_gain(left.gradient, left.hessian)
                    .saturating_add(self.leaf_gain(right_g, right_h))
                    .saturating_sub(parent_gain);
                if gain <= 0 {
                    continue;
                }

                let candidate = SplitCandidate {
                    feature_idx,
                    bin,
                    gain,
                    tie_breaker: SplitTieBreaker::new(feature_idx, bin, leaf_id),
                };

                if best.as_ref().map_or(true, |current| candidate.beats(current)) {
                    best = Some(candidate);
                }
            }
        }

        best
    }

    fn histogram(&self, rows: &[usize], feature_idx: usize) -> BTreeMap<i64, BinStats> {
        let mut bins: BTreeMap<i64, BinStats> = BTreeMap::new();

        for &row in rows {
            let bin = self.quantize(self.features[row][feature_idx]);
            let stats = bins.entry(bin).or_default();
            stats.gradient = stats.gradient.saturating_add(self.gradients[row]);
            stats.hessian = stats.hessian.saturating_add(self.hessians[row]);
            stats.count += 1;
        }

        bins
    }

    fn quantize(&self, value: i64) -> i64 {
        value.div_euclid(self.config.quant_step) * self.config.quant_step
    }

    /// Largest raw value that falls into `bin`
    fn raw_threshold(&self, bin: i64) -> i64 {
        bin.saturating_add(self.config.quant_step - 1)
    }

    fn partition(&self, rows: &[usize], feature_idx: usize, bin: i64) -> (Vec<usize>, Vec<usize>) {
        rows.iter()
            .partition(|&&row| self.quantize(self.features[row][feature_idx]) <= bin)
    }

    /// Gradient sum shrunk towards zero by the L1 penalty
    fn threshold_l1(&self, gradient: i64) -> i128 {
        let g = i128::from(gradient);
        let l1 = i128::from(self.config.lambda_l1);
        g.signum() * (g.abs() - l1).max(0)
    }

    /// Structure score `T(G)^2 / (H + lambda_l2)`
    fn leaf_gain(&self, gradient: i64, hessian: i64) -> i64 {
        let denom = i128::from(hessian) + i128::from(self.config.lambda_l2);
        if denom <= 0 {
            return 0;
        }
        let g = self.threshold_l1(gradient);
        ((g * g) / denom).clamp(0, i128::from(i64::MAX)) as i64
    }

    /// Optimal leaf value `-T(G) / (H + lambda_l2)` at `SCALE`
    fn leaf_output(&self, rows: &[usize]) -> i64 {
        let (g, h) = self.sum_gradients_hessians(rows);
        let denom = i128::from(h) + i128::from(self.config.lambda_l2);
        if denom <= 0 {
            return 0;
        }

        let value = -(self.threshold_l1(g) * i128::from(SCALE)) / denom;
        value.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
    }

    fn sum_gradients_hessians(&self, rows: &[usize]) -> (i64, i64) {
        rows.iter().fold((0i64, 0i64), |(g, h), &row| {
            (
                g.saturating_add(self.gradients[row]),
                h.saturating_add(self.hessians[row]),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use delay_core::Tree;

    fn config(num_leaves: usize, min_data: usize) -> TreeConfig {
        TreeConfig {
            num_leaves,
            min_data_in_leaf: min_data,
            lambda_l1: 0,
            lambda_l2: 0,
            ..TreeConfig::default()
        }
    }

    #[test]
    fn test_single_split_separates_gradients() {
        // Feature 1 carries the signal; feature 0 is noise.
        let features = vec![vec![5, 1], vec![3, 2], vec![5, 8], vec![3, 9]];
        let gradients = vec![-SCALE, -SCALE, SCALE, SCALE];
        let hessians = vec![SCALE; 4];

        let builder = CartBuilder::new(&features, &gradients, &hessians, config(2, 1));
        let grown = builder.build(&[0, 1, 2, 3], &[0, 1]);

        assert_eq!(grown.num_leaves(), 2);
        let root = &grown.nodes[0];
        assert_eq!(root.feature_idx, 1);
        assert_eq!(root.threshold, 2);

        let tree = Tree::new(grown.nodes.clone(), SCALE);
        assert_eq!(tree.evaluate(&[0, 1]), SCALE);
        assert_eq!(tree.evaluate(&[0, 9]), -SCALE);
        assert!(tree.validate(2).is_ok());

        assert_eq!(grown.leaves[0].rows, vec![0, 1]);
        assert_eq!(grown.leaves[1].rows, vec![2, 3]);
    }

    #[test]
    fn test_leaf_budget_is_respected() {
        let features: Vec<Vec<i64>> = (0..16).map(|i| vec![i]).collect();
        let gradients: Vec<i64> = (0..16).map(|i| (i - 8) * SCALE).collect();
        let hessians = vec![SCALE; 16];

        let builder = CartBuilder::new(&features, &gradients, &hessians, config(3, 1));
        let grown = builder.build(&(0..16).collect::<Vec<_>>(), &[0]);

        assert_eq!(grown.num_leaves(), 3);
        assert_eq!(grown.nodes.len(), 5);
        let total_rows: usize = grown.leaves.iter().map(|l| l.rows.len()).sum();
        assert_eq!(total_rows, 16);
    }

    #[test]
    fn test_min_data_in_leaf_blocks_small_splits() {
        let features = vec![vec![1], vec![2], vec![3]];
        let gradients = vec![-SCALE, SCALE, SCALE];
        let hessians = vec![SCALE; 3];

        let builder = CartBuilder::new(&features, &gradients, &hessians, config(31, 2));
        let grown = builder.build(&[0, 1, 2], &[0]);

        assert_eq!(grown.num_leaves(), 1);
        assert!(grown.nodes[0].is_leaf());
    }

    #[test]
    fn test_disallowed_features_are_not_used() {
        let features = vec![vec![1, 7], vec![2, 7], vec![3, 7], vec![4, 7]];
        let gradients = vec![-SCALE, -SCALE, SCALE, SCALE];
        let hessians = vec![SCALE; 4];

        let builder = CartBuilder::new(&features, &gradients, &hessians, config(4, 1));
        let grown = builder.build(&[0, 1, 2, 3], &[1]);
        assert_eq!(grown.num_leaves(), 1);
    }

    #[test]
    fn test_quantised_thresholds_cover_bin() {
        let features = vec![vec![0], vec![4], vec![10], vec![14]];
        let gradients = vec![-SCALE, -SCALE, SCALE, SCALE];
        let hessians = vec![SCALE; 4];

        let cfg = TreeConfig {
            quant_step: 5,
            ..config(2, 1)
        };
        let grown = CartBuilder::new(&features, &gradients, &hessians, cfg).build(&[0, 1, 2, 3], &[0]);

        // Bin 0 holds raw values 0..=4
        assert_eq!(grown.nodes[0].threshold, 4);
    }

    #[test]
    fn test_l1_penalty_shrinks_leaf_output() {
        let features = vec![vec![1], vec![1]];
        let gradients = vec![-SCALE, -SCALE];
        let hessians = vec![SCALE; 2];

        let cfg = TreeConfig {
            lambda_l1: SCALE,
            ..config(2, 1)
        };
        let grown = CartBuilder::new(&features, &gradients, &hessians, cfg).build(&[0, 1], &[0]);
        // -T(-2) / 2 = -(-1) / 2
        assert_eq!(grown.nodes[0].leaf, Some(SCALE / 2));
    }
}
