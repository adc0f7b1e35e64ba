//! Squared-error regression tree used as the boosting base learner.

use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

/// Tree growth limits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: 4,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

#[derive(Debug, Clone, Copy)]
struct BestSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
}

/// A fitted CART regression tree.
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionTree {
    root: Node,
    // squared-error reduction credited to each feature
    gains: Vec<f64>,
}

struct Builder<'a> {
    x: &'a [Vec<f64>],
    y: &'a [f64],
    params: TreeParams,
    gains: Vec<f64>,
}

impl RegressionTree {
    /// Fits a tree on the rows `indices` of `x`/`y`.
    ///
    /// Candidate features are visited in an order drawn from `rng`, so equal
    /// gains resolve the same way for the same seed.
    pub fn fit(
        x: &[Vec<f64>],
        y: &[f64],
        indices: &[usize],
        params: TreeParams,
        rng: &mut ChaCha8Rng,
    ) -> Self {
        let n_features = x.first().map(Vec::len).unwrap_or(0);
        let mut builder = Builder {
            x,
            y,
            params,
            gains: vec![0.0; n_features],
        };
        let root = builder.grow(indices.to_vec(), 0, rng);
        Self {
            root,
            gains: builder.gains,
        }
    }

    pub fn predict_one(&self, row: &[f64]) -> f64 {
        let mut node = &self.root;
        loop {
            match node {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold { left } else { right };
                }
            }
        }
    }

    /// Unnormalized squared-error reduction per feature.
    pub fn feature_gains(&self) -> &[f64] {
        &self.gains
    }

    pub fn depth(&self) -> usize {
        fn depth(node: &Node) -> usize {
            match node {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + depth(left).max(depth(right)),
            }
        }
        depth(&self.root)
    }

    pub fn n_leaves(&self) -> usize {
        fn leaves(node: &Node) -> usize {
            match node {
                Node::Leaf { .. } => 1,
                Node::Split { left, right, .. } => leaves(left) + leaves(right),
            }
        }
        leaves(&self.root)
    }
}

impl Builder<'_> {
    fn grow(&mut self, indices: Vec<usize>, depth: usize, rng: &mut ChaCha8Rng) -> Node {
        let n = indices.len();
        let mean = indices.iter().map(|&i| self.y[i]).sum::<f64>() / n.max(1) as f64;
        let sse: f64 = indices.iter().map(|&i| (self.y[i] - mean).powi(2)).sum();

        if depth >= self.params.max_depth
            || n < self.params.min_samples_split
            || n < 2 * self.params.min_samples_leaf
            || sse / (n.max(1) as f64) < 1e-10
        {
            return Node::Leaf { value: mean };
        }

        let Some(best) = self.best_split(&indices, mean, sse, rng) else {
            return Node::Leaf { value: mean };
        };

        self.gains[best.feature] += best.gain;

        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| self.x[i][best.feature] <= best.threshold);

        Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left: Box::new(self.grow(left, depth + 1, rng)),
            right: Box::new(self.grow(right, depth + 1, rng)),
        }
    }

    /// Scans every feature's sorted values once, using prefix sums of the
    /// centered targets to score each boundary between distinct values.
    fn best_split(
        &self,
        indices: &[usize],
        mean: f64,
        sse: f64,
        rng: &mut ChaCha8Rng,
    ) -> Option<BestSplit> {
        let n = indices.len();
        let min_leaf = self.params.min_samples_leaf;
        let total: f64 = indices.iter().map(|&i| self.y[i] - mean).sum();

        let mut features: Vec<usize> = (0..self.gains.len()).collect();
        features.shuffle(rng);

        let mut best: Option<BestSplit> = None;
        let mut sorted = indices.to_vec();

        for feature in features {
            sorted.sort_by(|&a, &b| self.x[a][feature].total_cmp(&self.x[b][feature]));

            let mut left_sum = 0.0;
            let mut left_sq = 0.0;

            for k in 1..n {
                let c = self.y[sorted[k - 1]] - mean;
                left_sum += c;
                left_sq += c * c;

                if k < min_leaf || n - k < min_leaf {
                    continue;
                }
                let lo = self.x[sorted[k - 1]][feature];
                let hi = self.x[sorted[k]][feature];
                if lo == hi {
                    continue;
                }

                let right_sum = total - left_sum;
                let right_sq = sse - left_sq;
                let left_sse = left_sq - left_sum * left_sum / k as f64;
                let right_sse = right_sq - right_sum * right_sum / (n - k) as f64;
                let gain = sse - (left_sse + right_sse);

                if gain > best.map_or(0.0, |b| b.gain) {
                    let mut threshold = (lo + hi) / 2.0;
                    if threshold >= hi {
                        threshold = lo;
                    }
                    best = Some(BestSplit {
                        feature,
                        threshold,
                        gain,
                    });
                }
            }
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn fit(x: &[Vec<f64>], y: &[f64], params: TreeParams) -> RegressionTree {
        let indices: Vec<usize> = (0..y.len()).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        RegressionTree::fit(x, y, &indices, params, &mut rng)
    }

    #[test]
    fn test_step_function_is_recovered() {
        let x: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64]).collect();
        let y: Vec<f64> = (0..20).map(|i| if i < 10 { 1.0 } else { 5.0 }).collect();

        let tree = fit(&x, &y, TreeParams::default());
        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.predict_one(&[3.0]), 1.0);
        assert_eq!(tree.predict_one(&[15.0]), 5.0);
        assert_eq!(tree.predict_one(&[9.5]), 1.0);
        assert_eq!(tree.predict_one(&[9.6]), 5.0);
    }

    #[test]
    fn test_irrelevant_feature_gets_no_gain() {
        let x: Vec<Vec<f64>> = (0..16).map(|i| vec![1.0, i as f64]).collect();
        let y: Vec<f64> = (0..16).map(|i| (i * i) as f64).collect();

        let tree = fit(&x, &y, TreeParams::default());
        assert_eq!(tree.feature_gains()[0], 0.0);
        assert!(tree.feature_gains()[1] > 0.0);
    }

    #[test]
    fn test_depth_limit_respected() {
        let x: Vec<Vec<f64>> = (0..64).map(|i| vec![i as f64]).collect();
        let y: Vec<f64> = (0..64).map(|i| (i as f64).sin()).collect();

        let params = TreeParams {
            max_depth: 3,
            ..Default::default()
        };
        let tree = fit(&x, &y, params);
        assert!(tree.depth() <= 3);
        assert!(tree.n_leaves() <= 8);
    }

    #[test]
    fn test_min_samples_leaf_respected() {
        let x: Vec<Vec<f64>> = (0..4).map(|i| vec![i as f64]).collect();
        let y = vec![0.0, 0.0, 0.0, 100.0];

        let params = TreeParams {
            min_samples_leaf: 2,
            ..Default::default()
        };
        let tree = fit(&x, &y, params);
        assert_eq!(tree.n_leaves(), 2);
        assert_eq!(tree.predict_one(&[3.0]), 50.0);
    }

    #[test]
    fn test_single_sample_is_a_leaf() {
        let tree = fit(&[vec![1.0, 2.0]], &[42.0], TreeParams::default());
        assert_eq!(tree.n_leaves(), 1);
        assert_eq!(tree.predict_one(&[0.0, 0.0]), 42.0);
        assert!(tree.feature_gains().iter().all(|&g| g == 0.0));
    }
}
