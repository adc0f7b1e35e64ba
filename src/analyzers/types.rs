//! Data types used by the route analysis pipeline.

use chrono::NaiveDate;
use serde::Serialize;

use crate::analyzers::route_key::RouteKey;

/// Model inputs, in matrix column order.
pub const FEATURE_NAMES: [&str; 8] = [
    "FLIGHTS",
    "DISTANCE",
    "DEP_DELAY",
    "ARR_DELAY",
    "OCCUPANCY",
    "PASSENGERS",
    "FARE",
    "COST",
];

/// Model target.
pub const TARGET_NAME: &str = "PROFIT";

/// Per-route summary of both flights and tickets, prior to null filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteAggregate {
    pub route: RouteKey,
    /// Endpoints of the first flight leg seen on the route.
    pub origin: String,
    pub destination: String,

    // flight side
    pub flight_count: usize,
    pub mean_dep_delay: Option<f64>,
    pub mean_arr_delay: Option<f64>,
    pub mean_distance: Option<f64>,
    pub mean_occupancy: Option<f64>,

    // ticket side
    pub mean_fare: Option<f64>,
    pub total_passengers: Option<f64>,
}

/// A fully populated route with its economics and, once the model has run,
/// its predicted profit and residual.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteFeatureRow {
    #[serde(rename = "ROUTE")]
    pub route: RouteKey,
    #[serde(rename = "ORIGIN")]
    pub origin: String,
    #[serde(rename = "DESTINATION")]
    pub destination: String,
    #[serde(rename = "FLIGHTS")]
    pub flight_count: usize,
    #[serde(rename = "DEP_DELAY")]
    pub mean_dep_delay: f64,
    #[serde(rename = "ARR_DELAY")]
    pub mean_arr_delay: f64,
    #[serde(rename = "DISTANCE")]
    pub mean_distance: f64,
    #[serde(rename = "OCCUPANCY")]
    pub mean_occupancy: f64,
    #[serde(rename = "FARE")]
    pub mean_fare: f64,
    #[serde(rename = "PASSENGERS")]
    pub total_passengers: f64,
    #[serde(rename = "REVENUE")]
    pub revenue: f64,
    #[serde(rename = "COST")]
    pub cost: f64,
    #[serde(rename = "PROFIT")]
    pub profit: f64,
    #[serde(rename = "PREDICTED_PROFIT")]
    pub predicted_profit: Option<f64>,
    #[serde(rename = "ERROR")]
    pub error: Option<f64>,
}

impl RouteFeatureRow {
    /// Feature vector in [`FEATURE_NAMES`] order.
    pub fn features(&self) -> Vec<f64> {
        vec![
            self.flight_count as f64,
            self.mean_distance,
            self.mean_dep_delay,
            self.mean_arr_delay,
            self.mean_occupancy,
            self.total_passengers,
            self.mean_fare,
            self.cost,
        ]
    }

    /// Copy of the row carrying a prediction and its error.
    pub fn with_prediction(&self, predicted: f64) -> Self {
        Self {
            predicted_profit: Some(predicted),
            error: Some(predicted - self.profit),
            ..self.clone()
        }
    }
}

/// One model input ranked by its share of the ensemble's variance reduction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Holdout fit quality.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelMetrics {
    pub r2: f64,
    pub mae: f64,
    pub rmse: f64,
    pub n_train: usize,
    pub n_holdout: usize,
}

/// Daily flight volume and departure delay from the cleaned legs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyTrend {
    pub date: NaiveDate,
    pub flights: usize,
    pub mean_dep_delay: Option<f64>,
    pub rolling_flights: Option<f64>,
    pub rolling_dep_delay: Option<f64>,
}

/// Airport position parsed from a `"lon, lat"` coordinate string.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AirportLocation {
    pub iata_code: String,
    pub longitude: f64,
    pub latitude: f64,
}

/// A high-value route drawn between its two airports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteLink {
    pub route: RouteKey,
    pub origin: String,
    pub destination: String,
    pub profit: f64,
    pub origin_longitude: f64,
    pub origin_latitude: f64,
    pub destination_longitude: f64,
    pub destination_latitude: f64,
}

/// Profit ranking and concentration across the modeled routes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfitSummary {
    pub routes: usize,
    pub total_profit: f64,
    pub median_profit: f64,
    /// Routes counted in the top share (at least one).
    pub top_share_routes: usize,
    pub top_share_profit: f64,
    /// `top_share_profit / total_profit`, only defined for positive totals.
    pub top_share_ratio: Option<f64>,
}
