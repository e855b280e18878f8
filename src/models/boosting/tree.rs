//! Second-order regression trees for squared loss.

/// A node in the flattened tree.
#[derive(Debug, Clone, PartialEq)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf(f64),
}

/// Growth limits and regularisation of a single tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeParams {
    pub max_depth: usize,
    /// L2 penalty on leaf weights.
    pub lambda: f64,
    /// Minimum loss reduction required to split.
    pub gamma: f64,
    /// Minimum number of samples (hessian sum) in a child.
    pub min_child_weight: f64,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: 3,
            lambda: 1.0,
            gamma: 0.0,
            min_child_weight: 1.0,
        }
    }
}

/// Regression tree fitted to residuals by exact greedy search.
///
/// With squared loss every sample has hessian 1, so a node holding samples
/// `I` with residual sum `G` has weight `G / (|I| + λ)` and the gain of a
/// split is `½·[G_L²/(n_L+λ) + G_R²/(n_R+λ) − G²/(n+λ)] − γ`.
#[derive(Debug, Clone)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    /// Grow a tree on `rows` (one feature vector per sample) against `residuals`.
    pub fn fit(rows: &[Vec<f64>], residuals: &[f64], params: &TreeParams) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        let indices: Vec<usize> = (0..rows.len()).collect();
        tree.grow(rows, residuals, indices, 0, params);
        tree
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes.get(idx) {
                Some(Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    idx = if row[*feature] < *threshold { *left } else { *right };
                }
                Some(Node::Leaf(weight)) => return *weight,
                None => return 0.0,
            }
        }
    }

    /// Number of leaves.
    pub fn leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf(_)))
            .count()
    }

    fn grow(
        &mut self,
        rows: &[Vec<f64>],
        residuals: &[f64],
        indices: Vec<usize>,
        depth: usize,
        params: &TreeParams,
    ) -> usize {
        let id = self.nodes.len();
        let sum: f64 = indices.iter().map(|&i| residuals[i]).sum();
        let weight = sum / (indices.len() as f64 + params.lambda);
        self.nodes.push(Node::Leaf(weight));

        if depth >= params.max_depth {
            return id;
        }
        let Some(split) = best_split(rows, residuals, &indices, params) else {
            return id;
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| rows[i][split.feature] < split.threshold);
        let left = self.grow(rows, residuals, left_idx, depth + 1, params);
        let right = self.grow(rows, residuals, right_idx, depth + 1, params);
        self.nodes[id] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        id
    }
}

struct Split {
    feature: usize,
    threshold: f64,
}

fn best_split(
    rows: &[Vec<f64>],
    residuals: &[f64],
    indices: &[usize],
    params: &TreeParams,
) -> Option<Split> {
    let n_features = rows.first().map_or(0, Vec::len);
    let total: f64 = indices.iter().map(|&i| residuals[i]).sum();
    let n = indices.len() as f64;
    let parent = total * total / (n + params.lambda);

    let mut best: Option<(f64, Split)> = None;
    for feature in 0..n_features {
        let mut sorted = indices.to_vec();
        sorted.sort_by(|&a, &b| rows[a][feature].total_cmp(&rows[b][feature]));

        let mut left_sum = 0.0;
        for (k, pair) in sorted.windows(2).enumerate() {
            left_sum += residuals[pair[0]];
            let (lo, hi) = (rows[pair[0]][feature], rows[pair[1]][feature]);
            if lo == hi {
                continue;
            }
            let n_left = (k + 1) as f64;
            let n_right = n - n_left;
            if n_left < params.min_child_weight || n_right < params.min_child_weight {
                continue;
            }
            let right_sum = total - left_sum;
            let gain = 0.5
                * (left_sum * left_sum / (n_left + params.lambda)
                    + right_sum * right_sum / (n_right + params.lambda)
                    - parent)
                - params.gamma;
            if gain > 1e-12 && best.as_ref().map_or(true, |(g, _)| gain > *g) {
                best = Some((
                    gain,
                    Split {
                        feature,
                        threshold: 0.5 * (lo + hi),
                    },
                ));
            }
        }
    }
    best.map(|(_, split)| split)
}
