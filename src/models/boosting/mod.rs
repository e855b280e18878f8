//! Gradient-boosted regression trees.

mod gradient_boosting;
mod tree;

pub use gradient_boosting::{calendar_features, GradientBoosting};
pub use tree::{RegressionTree, TreeParams};
