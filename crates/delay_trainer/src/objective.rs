//! Loss functions in fixed-point arithmetic
//!
//! Gradients and hessians are scaled by `SCALE`, so a hessian of one
//! sample is `SCALE` and an L1 gradient is `±SCALE`.

use delay_core::SCALE;

use crate::config::Objective;

impl Objective {
    /// Starting score of every row: median target for L1, mean for L2
    pub fn init_score(&self, targets: &[i64]) -> i64 {
        if targets.is_empty() {
            return 0;
        }

        match self {
            Objective::L1 => median(&mut targets.to_vec()),
            Objective::L2 => {
                let sum: i128 = targets.iter().map(|&t| i128::from(t)).sum();
                (sum / targets.len() as i128) as i64
            }
        }
    }

    /// First and second derivative of the loss at `score`
    pub fn gradient_pair(&self, target: i64, score: i64) -> (i64, i64) {
        match self {
            Objective::L1 => ((score - target).signum() * SCALE, SCALE),
            Objective::L2 => (score.saturating_sub(target), SCALE),
        }
    }

    /// Fill gradient and hessian buffers for all rows
    pub fn gradients(&self, targets: &[i64], scores: &[i64], gradients: &mut [i64], hessians: &mut [i64]) {
        for (i, (&target, &score)) in targets.iter().zip(scores).enumerate() {
            let (g, h) = self.gradient_pair(target, score);
            gradients[i] = g;
            hessians[i] = h;
        }
    }

    /// Whether leaf outputs are replaced by the residual median after growth
    pub fn renews_leaves(&self) -> bool {
        matches!(self, Objective::L1)
    }
}

/// Median of a non-empty slice; even lengths average the middle pair
pub fn median(values: &mut [i64]) -> i64 {
    if values.is_empty() {
        return 0;
    }

    values.sort_unstable();
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        values[mid]
    } else {
        let sum = i128::from(values[mid - 1]) + i128::from(values[mid]);
        sum.div_euclid(2) as i64
    }
}
