//! Fixed-point GBDT model used to score trips
//!
//! Trees route on raw integer features (`feature <= threshold` goes left)
//! and carry fixed-point leaf values at `SCALE` (1e6) precision. The
//! learning rate lives in each tree's `weight`, so a model trained with
//! shrinkage 0.01 stores `weight = 10_000`.
//!
//! # Model Format
//!
//! ```json
//! {
//!   "bias": 12000000,
//!   "feature_count": 10,
//!   "scale": 1000000,
//!   "trees": [
//!     {
//!       "nodes": [
//!         {"feature_idx": 5, "id": 0, "leaf": null, "left": 1, "right": 2, "threshold": 0},
//!         {"feature_idx": -1, "id": 1, "leaf": -1500000, "left": -1, "right": -1, "threshold": 0},
//!         {"feature_idx": -1, "id": 2, "leaf": 9000000, "left": -1, "right": -1, "threshold": 0}
//!       ],
//!       "weight": 10000
//!     }
//!   ],
//!   "version": 1
//! }
//! ```

pub mod model;
pub mod tree;

pub use model::{from_fixed, to_fixed, Model, MODEL_VERSION, SCALE};
pub use tree::{Node, Tree};
