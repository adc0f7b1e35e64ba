//! Route economics: revenue, operating cost and profit.

use tracing::{debug, info};

use crate::analyzers::types::{RouteAggregate, RouteFeatureRow};
use crate::config::EconomicSettings;

/// Feature rows ready for modeling plus the count of routes left out.
#[derive(Debug, Clone)]
pub struct FeatureTable {
    pub rows: Vec<RouteFeatureRow>,
    pub null_rows: usize,
}

/// Derives revenue, cost and profit for one route.
///
/// `revenue = mean_fare * total_passengers`,
/// `cost = flight_count * mean_distance * cost_per_mile`,
/// `profit = revenue - cost`.
///
/// Returns `None` if any required aggregate is missing or a derived value is
/// not finite.
pub fn route_features(route: &RouteAggregate, cost_per_mile: f64) -> Option<RouteFeatureRow> {
    let mean_fare = route.mean_fare?;
    let total_passengers = route.total_passengers?;
    let mean_distance = route.mean_distance?;

    let revenue = mean_fare * total_passengers;
    let cost = route.flight_count as f64 * mean_distance * cost_per_mile;
    let profit = revenue - cost;

    let row = RouteFeatureRow {
        route: route.route.clone(),
        origin: route.origin.clone(),
        destination: route.destination.clone(),
        flight_count: route.flight_count,
        mean_dep_delay: route.mean_dep_delay?,
        mean_arr_delay: route.mean_arr_delay?,
        mean_distance,
        mean_occupancy: route.mean_occupancy?,
        mean_fare,
        total_passengers,
        revenue,
        cost,
        profit,
        predicted_profit: None,
        error: None,
    };

    let finite = row.features().iter().all(|v| v.is_finite())
        && row.revenue.is_finite()
        && row.profit.is_finite();
    finite.then_some(row)
}

/// Builds the model input table, excluding routes with any missing feature.
#[tracing::instrument(skip_all, fields(routes = routes.len()))]
pub fn engineer_features(routes: &[RouteAggregate], economics: &EconomicSettings) -> FeatureTable {
    let mut rows = Vec::with_capacity(routes.len());
    let mut null_rows = 0usize;

    for route in routes {
        match route_features(route, economics.cost_per_mile) {
            Some(row) => rows.push(row),
            None => {
                debug!(route = %route.route, "Route dropped for missing features");
                null_rows += 1;
            }
        }
    }

    info!(
        rows = rows.len(),
        null_rows,
        cost_per_mile = economics.cost_per_mile,
        "Route features engineered"
    );

    FeatureTable { rows, null_rows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::route_key::RouteKey;

    fn aggregate() -> RouteAggregate {
        RouteAggregate {
            route: RouteKey::new("JFK", "LAX"),
            origin: "JFK".to_string(),
            destination: "LAX".to_string(),
            flight_count: 10,
            mean_dep_delay: Some(12.0),
            mean_arr_delay: Some(9.0),
            mean_distance: Some(500.0),
            mean_occupancy: Some(0.75),
            mean_fare: Some(200.0),
            total_passengers: Some(50.0),
        }
    }

    #[test]
    fn test_profit_formula() {
        let row = route_features(&aggregate(), 9.18).unwrap();
        assert_eq!(row.revenue, 10_000.0);
        assert!((row.cost - 45_900.0).abs() < 1e-9);
        assert!((row.profit - -35_900.0).abs() < 1e-9);
        assert_eq!(row.predicted_profit, None);
    }

    #[test]
    fn test_cost_per_mile_is_configurable() {
        let economics = EconomicSettings { cost_per_mile: 1.0 };
        let table = engineer_features(&[aggregate()], &economics);
        assert_eq!(table.rows[0].cost, 5_000.0);
        assert_eq!(table.rows[0].profit, 5_000.0);
    }

    #[test]
    fn test_any_missing_aggregate_excludes_route() {
        let mut no_delay = aggregate();
        no_delay.mean_dep_delay = None;
        let mut no_fare = aggregate();
        no_fare.mean_fare = None;
        no_fare.route = RouteKey::new("BOS", "JFK");
        let mut no_passengers = aggregate();
        no_passengers.total_passengers = None;

        let table = engineer_features(
            &[aggregate(), no_delay, no_fare, no_passengers],
            &EconomicSettings::default(),
        );
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.null_rows, 3);
    }

    #[test]
    fn test_feature_vector_order() {
        let row = route_features(&aggregate(), 9.18).unwrap();
        let features = row.features();
        assert_eq!(features.len(), crate::analyzers::types::FEATURE_NAMES.len());
        assert_eq!(features[0], 10.0);
        assert_eq!(features[1], 500.0);
        assert_eq!(features[5], 50.0);
        assert_eq!(features[6], 200.0);
    }
}
