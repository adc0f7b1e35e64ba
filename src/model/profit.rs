//! Profit model: fit on a seeded training partition, score on the holdout,
//! then predict every route.

use tracing::{info, warn};

use crate::analyzers::types::{FEATURE_NAMES, FeatureImportance, ModelMetrics, RouteFeatureRow};
use crate::config::ModelSettings;
use crate::error::{PipelineError, Result};
use crate::model::gbm::{BoostingParams, GradientBoostedRegressor};
use crate::model::metrics::{mean_absolute_error, r2_score, root_mean_squared_error};
use crate::model::split::train_holdout_split;
use crate::model::tree::TreeParams;

/// Everything the profit model produces for one feature table.
#[derive(Debug, Clone)]
pub struct ModelReport {
    pub metrics: ModelMetrics,
    /// Sorted by importance, highest first.
    pub importances: Vec<FeatureImportance>,
    /// Input rows, in input order, carrying prediction and error.
    pub rows: Vec<RouteFeatureRow>,
}

#[derive(Debug, Clone)]
pub struct ProfitModel {
    settings: ModelSettings,
}

impl From<&ModelSettings> for BoostingParams {
    fn from(m: &ModelSettings) -> Self {
        Self {
            n_estimators: m.n_estimators,
            learning_rate: m.learning_rate,
            tree: TreeParams {
                max_depth: m.max_depth,
                min_samples_split: m.min_samples_split,
                min_samples_leaf: m.min_samples_leaf,
            },
            seed: m.seed,
        }
    }
}

impl ProfitModel {
    pub fn new(settings: ModelSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    /// Trains on the training partition, evaluates on the holdout and
    /// applies the fitted model to all rows.
    ///
    /// # Errors
    ///
    /// `InsufficientData` when there are fewer than `min_rows` rows or either
    /// partition would be empty; `DegenerateData` when profit is constant or
    /// no feature varies.
    #[tracing::instrument(skip_all, fields(rows = rows.len()))]
    pub fn run(&self, rows: &[RouteFeatureRow]) -> Result<ModelReport> {
        let s = &self.settings;
        if rows.len() < s.min_rows.max(1) {
            return Err(PipelineError::InsufficientData(format!(
                "{} route rows available, at least {} required",
                rows.len(),
                s.min_rows.max(1)
            )));
        }

        let x: Vec<Vec<f64>> = rows.iter().map(RouteFeatureRow::features).collect();
        let y: Vec<f64> = rows.iter().map(|r| r.profit).collect();
        check_variation(&x, &y)?;

        let partition = train_holdout_split(rows.len(), s.test_fraction, s.seed);
        if partition.train.is_empty() || partition.holdout.is_empty() {
            return Err(PipelineError::InsufficientData(format!(
                "split of {} rows at test_fraction {} leaves {} training and {} holdout rows",
                rows.len(),
                s.test_fraction,
                partition.train.len(),
                partition.holdout.len()
            )));
        }

        let x_train: Vec<Vec<f64>> = partition.train.iter().map(|&i| x[i].clone()).collect();
        let y_train: Vec<f64> = partition.train.iter().map(|&i| y[i]).collect();
        let model = GradientBoostedRegressor::fit(&x_train, &y_train, &BoostingParams::from(s))?;

        let y_holdout: Vec<f64> = partition.holdout.iter().map(|&i| y[i]).collect();
        let holdout_pred: Vec<f64> = partition
            .holdout
            .iter()
            .map(|&i| model.predict_one(&x[i]))
            .collect();

        let metrics = ModelMetrics {
            r2: r2_score(&y_holdout, &holdout_pred),
            mae: mean_absolute_error(&y_holdout, &holdout_pred),
            rmse: root_mean_squared_error(&y_holdout, &holdout_pred),
            n_train: partition.train.len(),
            n_holdout: partition.holdout.len(),
        };

        if model.feature_importances().iter().all(|&v| v == 0.0) {
            warn!("No tree found a useful split; feature importances are all zero");
        }
        let importances = rank_importances(model.feature_importances());

        let rows = rows
            .iter()
            .zip(&x)
            .map(|(row, features)| row.with_prediction(model.predict_one(features)))
            .collect();

        info!(
            r2 = metrics.r2,
            mae = metrics.mae,
            n_train = metrics.n_train,
            n_holdout = metrics.n_holdout,
            top_feature = importances.first().map(|f| f.feature.as_str()).unwrap_or(""),
            "Profit model evaluated"
        );

        Ok(ModelReport {
            metrics,
            importances,
            rows,
        })
    }
}

fn check_variation(x: &[Vec<f64>], y: &[f64]) -> Result<()> {
    let first = y[0];
    if y.iter().all(|&v| v == first) {
        return Err(PipelineError::DegenerateData(format!(
            "profit is constant ({first}) across all routes"
        )));
    }

    let varies = |col: usize| x.iter().any(|row| row[col] != x[0][col]);
    if !(0..FEATURE_NAMES.len()).any(varies) {
        return Err(PipelineError::DegenerateData(
            "no feature varies across routes".to_string(),
        ));
    }
    Ok(())
}

/// Pairs importances with feature names, highest first; ties keep
/// feature order.
fn rank_importances(values: &[f64]) -> Vec<FeatureImportance> {
    let mut ranked: Vec<FeatureImportance> = FEATURE_NAMES
        .iter()
        .zip(values)
        .map(|(name, &importance)| FeatureImportance {
            feature: name.to_string(),
            importance,
        })
        .collect();
    ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::route_key::RouteKey;

    fn row(i: usize) -> RouteFeatureRow {
        let flights = 5 + i % 7;
        let distance = 200.0 + (i * 37 % 900) as f64;
        let fare = 150.0 + (i * 13 % 250) as f64;
        let passengers = 40.0 + (i * 11 % 120) as f64;
        let cost = flights as f64 * distance * 9.18;
        let revenue = fare * passengers;
        RouteFeatureRow {
            route: RouteKey::new(&format!("A{i:02}"), "ZZZ"),
            origin: format!("A{i:02}"),
            destination: "ZZZ".to_string(),
            flight_count: flights,
            mean_dep_delay: (i % 5) as f64,
            mean_arr_delay: (i % 3) as f64,
            mean_distance: distance,
            mean_occupancy: 0.5 + (i % 4) as f64 / 10.0,
            mean_fare: fare,
            total_passengers: passengers,
            revenue,
            cost,
            profit: revenue - cost,
            predicted_profit: None,
            error: None,
        }
    }

    fn fast_settings() -> ModelSettings {
        ModelSettings {
            n_estimators: 50,
            ..Default::default()
        }
    }

    #[test]
    fn test_run_reports_metrics_and_predictions() {
        let rows: Vec<RouteFeatureRow> = (0..40).map(row).collect();
        let report = ProfitModel::new(fast_settings()).run(&rows).unwrap();

        assert_eq!(report.metrics.n_holdout, 10);
        assert_eq!(report.metrics.n_train, 30);
        assert!(report.metrics.r2 <= 1.0);
        assert!(report.metrics.mae >= 0.0);
        assert_eq!(report.rows.len(), 40);
        for (out, input) in report.rows.iter().zip(&rows) {
            assert_eq!(out.route, input.route);
            let predicted = out.predicted_profit.unwrap();
            assert!((out.error.unwrap() - (predicted - input.profit)).abs() < 1e-9);
        }
    }

    #[test]
    fn test_importances_ranked_and_complete() {
        let rows: Vec<RouteFeatureRow> = (0..40).map(row).collect();
        let report = ProfitModel::new(fast_settings()).run(&rows).unwrap();

        assert_eq!(report.importances.len(), FEATURE_NAMES.len());
        let sum: f64 = report.importances.iter().map(|f| f.importance).sum();
        assert!((sum - 1.0).abs() < 1e-9);
        for pair in report.importances.windows(2) {
            assert!(pair[0].importance >= pair[1].importance);
        }
    }

    #[test]
    fn test_same_seed_is_reproducible() {
        let rows: Vec<RouteFeatureRow> = (0..24).map(row).collect();
        let model = ProfitModel::new(fast_settings());
        let a = model.run(&rows).unwrap();
        let b = model.run(&rows).unwrap();
        assert_eq!(a.metrics, b.metrics);
        assert_eq!(a.importances, b.importances);
        assert_eq!(a.rows, b.rows);
    }

    #[test]
    fn test_two_rows_fit_with_single_holdout() {
        let rows = vec![row(1), row(2)];
        let report = ProfitModel::new(fast_settings()).run(&rows).unwrap();
        assert_eq!(report.metrics.n_train, 1);
        assert_eq!(report.metrics.n_holdout, 1);
        assert!(report.metrics.r2 == 0.0 || report.metrics.r2 == 1.0);
        assert!(report.importances.iter().all(|f| f.importance == 0.0));
    }

    #[test]
    fn test_too_few_rows_rejected() {
        let err = ProfitModel::new(fast_settings()).run(&[row(1)]).unwrap_err();
        assert!(matches!(err, PipelineError::InsufficientData(_)));

        let err = ProfitModel::new(fast_settings()).run(&[]).unwrap_err();
        assert!(matches!(err, PipelineError::InsufficientData(_)));
    }

    #[test]
    fn test_constant_profit_rejected() {
        let rows: Vec<RouteFeatureRow> = (0..10)
            .map(|i| RouteFeatureRow {
                profit: 100.0,
                ..row(i)
            })
            .collect();
        let err = ProfitModel::new(fast_settings()).run(&rows).unwrap_err();
        assert!(matches!(err, PipelineError::DegenerateData(_)));
    }

    #[test]
    fn test_constant_features_rejected() {
        let rows: Vec<RouteFeatureRow> = (0..10)
            .map(|i| RouteFeatureRow {
                profit: i as f64,
                ..row(3)
            })
            .collect();
        let err = ProfitModel::new(fast_settings()).run(&rows).unwrap_err();
        assert!(matches!(err, PipelineError::DegenerateData(_)));
    }

    #[test]
    fn test_empty_training_partition_rejected() {
        let settings = ModelSettings {
            test_fraction: 0.9,
            ..fast_settings()
        };
        let err = ProfitModel::new(settings).run(&[row(1), row(2)]).unwrap_err();
        assert!(matches!(err, PipelineError::InsufficientData(_)));
    }
}
