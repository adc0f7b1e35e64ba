//! Descriptive views over the modeled routes and cleaned tables: profit
//! ranking and concentration, daily flight trends and the route network of
//! the most profitable routes.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info, warn};

use crate::analyzers::types::{
    AirportLocation, DailyTrend, ProfitSummary, RouteFeatureRow, RouteLink,
};
use crate::analyzers::utility::{RunningMean, median, rolling_mean};
use crate::cleaning::airports::{COORDINATES, IATA_CODE};
use crate::cleaning::flights::{DEP_DELAY, FL_DATE};
use crate::error::Result;
use crate::parser::{is_missing, parse_date, parse_number};
use crate::table::Table;

/// Routes ordered by profit, highest first. Equal profits keep input order.
pub fn rank_by_profit(rows: &[RouteFeatureRow]) -> Vec<&RouteFeatureRow> {
    let mut ranked: Vec<&RouteFeatureRow> = rows.iter().collect();
    ranked.sort_by(|a, b| b.profit.total_cmp(&a.profit));
    ranked
}

/// The `n` most profitable routes.
pub fn top_routes(rows: &[RouteFeatureRow], n: usize) -> Vec<&RouteFeatureRow> {
    let mut ranked = rank_by_profit(rows);
    ranked.truncate(n);
    ranked
}

/// Total and median profit, plus how much of the total the top `share` of
/// routes captures. Returns `None` for an empty table.
pub fn profit_summary(rows: &[RouteFeatureRow], share: f64) -> Option<ProfitSummary> {
    let profits: Vec<f64> = rows.iter().map(|r| r.profit).collect();
    let median_profit = median(&profits)?;
    let total_profit: f64 = profits.iter().sum();

    let top_share_routes = ((share * rows.len() as f64).ceil() as usize).clamp(1, rows.len());
    let top_share_profit: f64 = rank_by_profit(rows)
        .iter()
        .take(top_share_routes)
        .map(|r| r.profit)
        .sum();
    let top_share_ratio = (total_profit > 0.0).then(|| top_share_profit / total_profit);

    Some(ProfitSummary {
        routes: rows.len(),
        total_profit,
        median_profit,
        top_share_routes,
        top_share_profit,
        top_share_ratio,
    })
}

/// Flight count and mean departure delay per flight date, with trailing
/// means over `window` consecutive dates.
///
/// A table without `FL_DATE` yields no trend; rows with an unreadable date
/// are skipped.
#[tracing::instrument(skip_all, fields(rows = flights.len(), window))]
pub fn daily_trends(flights: &Table, window: usize) -> Vec<DailyTrend> {
    let Some(date_idx) = flights.column_index(FL_DATE) else {
        warn!(dataset = flights.name(), "No FL_DATE column; daily trends skipped");
        return Vec::new();
    };
    let delay_idx = flights.column_index(DEP_DELAY);

    let mut days: BTreeMap<chrono::NaiveDate, (usize, RunningMean)> = BTreeMap::new();
    let mut undated = 0usize;

    for record in flights.records() {
        let Some(date) = record.get(date_idx).and_then(parse_date) else {
            undated += 1;
            continue;
        };
        let delay = delay_idx.and_then(|i| record.get(i)).and_then(parse_number);
        let entry = days.entry(date).or_default();
        entry.0 += 1;
        entry.1.push(delay);
    }

    if undated > 0 {
        debug!(undated, "Flights without a readable FL_DATE");
    }

    let counts: Vec<Option<f64>> = days.values().map(|(n, _)| Some(*n as f64)).collect();
    let delays: Vec<Option<f64>> = days.values().map(|(_, d)| d.value()).collect();
    let rolling_flights = rolling_mean(&counts, window);
    let rolling_delays = rolling_mean(&delays, window);

    days.into_iter()
        .enumerate()
        .map(|(i, (date, (flights, delay)))| DailyTrend {
            date,
            flights,
            mean_dep_delay: delay.value(),
            rolling_flights: rolling_flights[i],
            rolling_dep_delay: rolling_delays[i],
        })
        .collect()
}

/// Parses `"lon, lat"` into a coordinate pair.
pub fn parse_coordinates(value: &str) -> Option<(f64, f64)> {
    let (lon, lat) = value.split_once(',')?;
    Some((parse_number(lon)?, parse_number(lat)?))
}

/// IATA code to position for every cleaned airport with usable coordinates.
///
/// # Errors
///
/// Fails if the table lacks `IATA_CODE` or `COORDINATES`.
pub fn airport_locations(airports: &Table) -> Result<HashMap<String, AirportLocation>> {
    let code_idx = airports.require_column(IATA_CODE)?;
    let coord_idx = airports.require_column(COORDINATES)?;

    let mut locations = HashMap::new();
    for record in airports.records() {
        let code = record.get(code_idx).unwrap_or("");
        if is_missing(code) {
            continue;
        }
        let Some((longitude, latitude)) = record.get(coord_idx).and_then(parse_coordinates)
        else {
            continue;
        };
        let code = code.trim().to_string();
        locations.entry(code.clone()).or_insert(AirportLocation {
            iata_code: code,
            longitude,
            latitude,
        });
    }

    debug!(airports = locations.len(), "Airport locations parsed");
    Ok(locations)
}

/// Links between the endpoints of `routes`, plus the number of routes left
/// out because an endpoint has no known location.
pub fn route_network(
    routes: &[&RouteFeatureRow],
    locations: &HashMap<String, AirportLocation>,
) -> (Vec<RouteLink>, usize) {
    let mut links = Vec::with_capacity(routes.len());
    let mut skipped = 0usize;

    for row in routes {
        match (locations.get(&row.origin), locations.get(&row.destination)) {
            (Some(from), Some(to)) => links.push(RouteLink {
                route: row.route.clone(),
                origin: row.origin.clone(),
                destination: row.destination.clone(),
                profit: row.profit,
                origin_longitude: from.longitude,
                origin_latitude: from.latitude,
                destination_longitude: to.longitude,
                destination_latitude: to.latitude,
            }),
            _ => skipped += 1,
        }
    }

    info!(links = links.len(), skipped, "Route network built");
    (links, skipped)
}
