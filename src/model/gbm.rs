//! Gradient-boosted regression trees with squared-error loss.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::model::tree::{RegressionTree, TreeParams};

/// Boosting hyperparameters.
#[derive(Debug, Clone, PartialEq)]
pub struct BoostingParams {
    /// Number of sequential boosting rounds (trees)
    pub n_estimators: usize,
    /// Shrinkage applied to every tree's contribution
    pub learning_rate: f64,
    pub tree: TreeParams,
    /// Seed for the per-node feature ordering
    pub seed: u64,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_estimators: 300,
            learning_rate: 0.05,
            tree: TreeParams::default(),
            seed: 42,
        }
    }
}

/// Additive ensemble: `init + learning_rate * sum(tree(x))`.
#[derive(Debug, Clone)]
pub struct GradientBoostedRegressor {
    init: f64,
    learning_rate: f64,
    trees: Vec<RegressionTree>,
    feature_importances: Vec<f64>,
}

impl GradientBoostedRegressor {
    /// Fits the ensemble, each round regressing a tree on the current
    /// residuals.
    ///
    /// # Errors
    ///
    /// Fails when there are no samples, no features, or rows of uneven width.
    pub fn fit(x: &[Vec<f64>], y: &[f64], params: &BoostingParams) -> Result<Self> {
        if x.is_empty() || x.len() != y.len() {
            return Err(PipelineError::InsufficientData(format!(
                "cannot fit on {} feature rows and {} targets",
                x.len(),
                y.len()
            )));
        }
        let n_features = x[0].len();
        if n_features == 0 || x.iter().any(|row| row.len() != n_features) {
            return Err(PipelineError::DegenerateData(
                "feature rows must share a positive width".to_string(),
            ));
        }

        let n = y.len();
        let indices: Vec<usize> = (0..n).collect();
        let init = y.iter().sum::<f64>() / n as f64;
        let mut predictions = vec![init; n];
        let mut residuals = vec![0.0; n];
        let mut trees = Vec::with_capacity(params.n_estimators);
        let mut rng = ChaCha8Rng::seed_from_u64(params.seed);

        info!(
            samples = n,
            features = n_features,
            n_estimators = params.n_estimators,
            learning_rate = params.learning_rate,
            max_depth = params.tree.max_depth,
            "Training gradient boosted regressor"
        );

        for round in 0..params.n_estimators {
            for i in 0..n {
                residuals[i] = y[i] - predictions[i];
            }
            let tree = RegressionTree::fit(x, &residuals, &indices, params.tree, &mut rng);
            for i in 0..n {
                predictions[i] += params.learning_rate * tree.predict_one(&x[i]);
            }
            if round % 50 == 0 {
                debug!(round, leaves = tree.n_leaves(), "Boosting round");
            }
            trees.push(tree);
        }

        let feature_importances = combine_importances(&trees, n_features);

        Ok(Self {
            init,
            learning_rate: params.learning_rate,
            trees,
            feature_importances,
        })
    }

    pub fn predict_one(&self, row: &[f64]) -> f64 {
        self.init
            + self.learning_rate * self.trees.iter().map(|t| t.predict_one(row)).sum::<f64>()
    }

    pub fn predict(&self, x: &[Vec<f64>]) -> Vec<f64> {
        x.iter().map(|row| self.predict_one(row)).collect()
    }

    /// Per-feature share of the ensemble's variance reduction; sums to 1
    /// unless no tree ever split, in which case every entry is 0.
    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

/// Pools the raw squared-error reductions of every tree per feature and
/// normalizes once, so each tree weighs in by the variance it removed.
fn combine_importances(trees: &[RegressionTree], n_features: usize) -> Vec<f64> {
    let mut total = vec![0.0; n_features];
    for tree in trees {
        for (acc, g) in total.iter_mut().zip(tree.feature_gains()) {
            *acc += g;
        }
    }
    let sum: f64 = total.iter().sum();
    if sum > 0.0 {
        for v in &mut total {
            *v /= sum;
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic(n: usize) -> (Vec<Vec<f64>>, Vec<f64>) {
        let x: Vec<Vec<f64>> = (0..n)
            .map(|i| {
                let a = i as f64;
                let b = ((i * 7) % 11) as f64;
                vec![a, b, 3.0]
            })
            .collect();
        let y = x.iter().map(|r| 4.0 * r[0] + 0.1 * r[1] * r[1]).collect();
        (x, y)
    }

    #[test]
    fn test_training_error_shrinks() {
        let (x, y) = synthetic(60);
        let params = BoostingParams {
            n_estimators: 100,
            learning_rate: 0.1,
            ..Default::default()
        };
        let model = GradientBoostedRegressor::fit(&x, &y, &params).unwrap();
        let mean = y.iter().sum::<f64>() / y.len() as f64;

        let baseline: f64 = y.iter().map(|t| (t - mean).abs()).sum();
        let fitted: f64 = model
            .predict(&x)
            .iter()
            .zip(&y)
            .map(|(p, t)| (p - t).abs())
            .sum();
        assert!(fitted < baseline * 0.1);
        assert_eq!(model.n_trees(), 100);
    }

    #[test]
    fn test_importances_normalized_and_ignore_constant_feature() {
        let (x, y) = synthetic(40);
        let model = GradientBoostedRegressor::fit(&x, &y, &BoostingParams::default()).unwrap();
        let importances = model.feature_importances();
        let sum: f64 = importances.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert_eq!(importances[2], 0.0);
        assert!(importances[0] > importances[1]);
    }

    #[test]
    fn test_importances_weight_trees_by_variance_removed() {
        let x: Vec<Vec<f64>> = (0..64)
            .map(|i| vec![i as f64, ((i * 7) % 11) as f64])
            .collect();
        let y: Vec<f64> = x
            .iter()
            .map(|r| if r[0] >= 32.0 { 100.0 } else { 0.0 } + (1.3 * r[1]).sin())
            .collect();

        let model = GradientBoostedRegressor::fit(&x, &y, &BoostingParams::default()).unwrap();
        let importances = model.feature_importances();
        assert!(importances[0] > 0.99, "step share {}", importances[0]);
        assert!(importances[1] < 0.01, "sine share {}", importances[1]);
    }

    #[test]
    fn test_combined_importances_are_pooled_gains() {
        let x: Vec<Vec<f64>> = (0..16).map(|i| vec![(i / 8) as f64, (i % 2) as f64]).collect();
        let big: Vec<f64> = x.iter().map(|r| 50.0 * r[0]).collect();
        let small: Vec<f64> = x.iter().map(|r| r[1]).collect();
        let indices: Vec<usize> = (0..16).collect();
        let params = TreeParams {
            max_depth: 1,
            ..Default::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let trees = vec![
            RegressionTree::fit(&x, &big, &indices, params, &mut rng),
            RegressionTree::fit(&x, &small, &indices, params, &mut rng),
        ];
        let pooled: Vec<f64> = (0..2)
            .map(|f| trees[0].feature_gains()[f] + trees[1].feature_gains()[f])
            .collect();
        let total: f64 = pooled.iter().sum();
        assert!(trees[1].feature_gains()[1] > 0.0);

        let combined = combine_importances(&trees, 2);
        assert!((combined[0] - pooled[0] / total).abs() < 1e-12);
        assert!((combined[1] - pooled[1] / total).abs() < 1e-12);
        // A tree that removes 4 units of variance must not count like one removing 10000.
        assert!(combined[0] > 0.99);
    }

    #[test]
    fn test_same_seed_same_predictions() {
        let (x, y) = synthetic(30);
        let params = BoostingParams::default();
        let a = GradientBoostedRegressor::fit(&x, &y, &params).unwrap();
        let b = GradientBoostedRegressor::fit(&x, &y, &params).unwrap();
        assert_eq!(a.predict(&x), b.predict(&x));
        assert_eq!(a.feature_importances(), b.feature_importances());
    }

    #[test]
    fn test_single_row_predicts_its_target() {
        let model =
            GradientBoostedRegressor::fit(&[vec![1.0, 2.0]], &[10.0], &BoostingParams::default())
                .unwrap();
        assert_eq!(model.predict_one(&[5.0, 5.0]), 10.0);
        assert!(model.feature_importances().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_empty_input_rejected() {
        let err = GradientBoostedRegressor::fit(&[], &[], &BoostingParams::default()).unwrap_err();
        assert!(matches!(err, PipelineError::InsufficientData(_)));
    }
}
