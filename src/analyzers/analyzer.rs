use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::analyzers::aggregate::aggregate_routes;
use crate::analyzers::features::engineer_features;
use crate::analyzers::insights::{
    airport_locations, daily_trends, profit_summary, route_network, top_routes,
};
use crate::analyzers::types::{
    DailyTrend, FeatureImportance, ModelMetrics, ProfitSummary, RouteFeatureRow, RouteLink,
};
use crate::cleaning::{clean_airports, clean_flights, clean_tickets};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::model::ProfitModel;
use crate::output::cleaned_file_name;
use crate::parser::read_table;
use crate::stats::{CleaningStats, RunDiagnostics};
use crate::table::Table;

pub const AIRPORTS: &str = "airports";
pub const FLIGHTS: &str = "flights";
pub const TICKETS: &str = "tickets";

/// The three input datasets, raw or cleaned.
#[derive(Debug, Clone)]
pub struct Tables {
    pub airports: Table,
    pub flights: Table,
    pub tickets: Table,
}

/// Everything one modeling run produces.
#[derive(Debug, Clone)]
pub struct RouteAnalysis {
    /// Modeled routes carrying predictions, in route key order.
    pub features: Vec<RouteFeatureRow>,
    pub metrics: ModelMetrics,
    pub importances: Vec<FeatureImportance>,
    pub diagnostics: RunDiagnostics,
    pub profit_summary: Option<ProfitSummary>,
    pub top_routes: Vec<RouteFeatureRow>,
    pub trends: Vec<DailyTrend>,
    pub network: Vec<RouteLink>,
    /// Top routes left out of the network for lack of airport coordinates.
    pub network_skipped: usize,
}

/// Reads the raw airports, flights and tickets files from the data directory.
pub fn load_raw_tables(config: &PipelineConfig) -> Result<Tables> {
    let dir = &config.paths.data_dir;
    Ok(Tables {
        airports: read_table(dir.join(&config.paths.airports_file), AIRPORTS)?,
        flights: read_table(dir.join(&config.paths.flights_file), FLIGHTS)?,
        tickets: read_table(dir.join(&config.paths.tickets_file), TICKETS)?,
    })
}

/// Reads previously written cleaned tables, plain or gzipped.
pub fn load_cleaned_tables(config: &PipelineConfig) -> Result<Tables> {
    let dir = config.cleaned_dir();
    Ok(Tables {
        airports: read_table(cleaned_input(&dir, AIRPORTS), AIRPORTS)?,
        flights: read_table(cleaned_input(&dir, FLIGHTS), FLIGHTS)?,
        tickets: read_table(cleaned_input(&dir, TICKETS), TICKETS)?,
    })
}

fn cleaned_input(dir: &Path, dataset: &str) -> PathBuf {
    let plain = dir.join(cleaned_file_name(dataset, false));
    let gzipped = dir.join(cleaned_file_name(dataset, true));
    if !plain.exists() && gzipped.exists() {
        gzipped
    } else {
        plain
    }
}

/// Applies the three record filters.
///
/// # Errors
///
/// Fails if any filter is missing one of its required columns.
pub fn clean_tables(raw: &Tables, config: &PipelineConfig) -> Result<(Tables, Vec<CleaningStats>)> {
    let airports = clean_airports(&raw.airports, &config.filters)?;
    let flights = clean_flights(&raw.flights)?;
    let tickets = clean_tickets(&raw.tickets, &config.filters)?;

    let stats = vec![airports.stats, flights.stats, tickets.stats];
    let tables = Tables {
        airports: airports.table,
        flights: flights.table,
        tickets: tickets.table,
    };
    Ok((tables, stats))
}

/// Aggregates cleaned tables to routes, engineers features, trains and
/// applies the profit model, and derives the descriptive insights.
///
/// `cleaning` carries the filter counts of this run, if cleaning happened in
/// the same process.
///
/// # Errors
///
/// Propagates schema, join, data quality and modeling errors; no partial
/// result is returned.
#[tracing::instrument(skip_all)]
pub fn analyze(
    tables: &Tables,
    cleaning: Vec<CleaningStats>,
    config: &PipelineConfig,
) -> Result<RouteAnalysis> {
    let aggregation = aggregate_routes(&tables.flights, &tables.tickets, &config.columns)?;
    let feature_table = engineer_features(&aggregation.routes, &config.economics);

    let report = ProfitModel::new(config.model.clone()).run(&feature_table.rows)?;

    let diagnostics = RunDiagnostics {
        cleaning,
        join: aggregation.stats,
        null_feature_rows: feature_table.null_rows,
        modeled_rows: report.rows.len(),
    };
    info!(
        joined_routes = diagnostics.join.joined_routes,
        null_feature_rows = diagnostics.null_feature_rows,
        modeled_rows = diagnostics.modeled_rows,
        modeled_pct = diagnostics.modeled_pct(),
        "Route table ready"
    );

    let report_settings = &config.report;
    let summary = profit_summary(&report.rows, report_settings.concentration_share);
    let top: Vec<RouteFeatureRow> = top_routes(&report.rows, report_settings.top_routes)
        .into_iter()
        .cloned()
        .collect();
    let trends = daily_trends(&tables.flights, report_settings.rolling_window);

    let (network, network_skipped) = match airport_locations(&tables.airports) {
        Ok(locations) => {
            let refs: Vec<&RouteFeatureRow> = top.iter().collect();
            route_network(&refs, &locations)
        }
        Err(e) => {
            warn!(error = %e, "Airport locations unavailable; route network skipped");
            (Vec::new(), top.len())
        }
    };

    Ok(RouteAnalysis {
        features: report.rows,
        metrics: report.metrics,
        importances: report.importances,
        diagnostics,
        profit_summary: summary,
        top_routes: top,
        trends,
        network,
        network_skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cleaned_tables() -> Tables {
        Tables {
            airports: Table::from_rows(
                AIRPORTS,
                &["IATA_CODE", "COORDINATES"],
                &[&["JFK", "-73.78, 40.64"], &["LAX", "-118.41, 33.94"]],
            ),
            flights: Table::from_rows(
                FLIGHTS,
                &[
                    "FL_DATE",
                    "ORIGIN",
                    "DEST",
                    "DEP_DELAY",
                    "ARR_DELAY",
                    "DISTANCE",
                    "OCCUPANCY_RATE",
                ],
                &[
                    &["2019-03-01", "JFK", "LAX", "10", "5", "2475", "0.8"],
                    &["2019-03-02", "LAX", "JFK", "20", "15", "2475", "0.7"],
                    &["2019-03-02", "BOS", "ORD", "0", "0", "867", "0.6"],
                    &["2019-03-03", "ORD", "BOS", "5", "0", "867", "0.9"],
                ],
            ),
            tickets: Table::from_rows(
                TICKETS,
                &["ORIGIN", "DESTINATION", "ITIN_FARE", "PASSENGERS"],
                &[
                    &["JFK", "LAX", "450", "2"],
                    &["BOS", "ORD", "180", "1"],
                    &["ORD", "BOS", "220", "3"],
                ],
            ),
        }
    }

    #[test]
    fn test_analyze_two_routes() {
        let analysis = analyze(&cleaned_tables(), Vec::new(), &PipelineConfig::default()).unwrap();

        assert_eq!(analysis.features.len(), 2);
        assert!(analysis.features.iter().all(|r| r.predicted_profit.is_some()));
        assert_eq!(analysis.metrics.n_train + analysis.metrics.n_holdout, 2);
        assert_eq!(analysis.diagnostics.join.joined_routes, 2);
        assert_eq!(analysis.diagnostics.modeled_rows, 2);
        assert_eq!(analysis.trends.len(), 3);
        assert_eq!(analysis.top_routes.len(), 2);
        assert_eq!(analysis.network.len() + analysis.network_skipped, 2);
        assert_eq!(analysis.network_skipped, 1);
    }

    #[test]
    fn test_analyze_without_coordinates_still_models() {
        let mut tables = cleaned_tables();
        tables.airports = Table::from_rows(AIRPORTS, &["IATA_CODE"], &[&["JFK"]]);
        let analysis = analyze(&tables, Vec::new(), &PipelineConfig::default()).unwrap();
        assert!(analysis.network.is_empty());
        assert_eq!(analysis.network_skipped, 2);
    }

    #[test]
    fn test_clean_tables_reports_each_dataset() {
        let raw = Tables {
            airports: Table::from_rows(
                AIRPORTS,
                &["ISO_COUNTRY", "TYPE", "IATA_CODE", "COORDINATES"],
                &[&["US", "large_airport", "JFK", "-73.78, 40.64"]],
            ),
            flights: Table::from_rows(
                FLIGHTS,
                &["CANCELLED", "DEP_DELAY", "ARR_DELAY", "DISTANCE", "OCCUPANCY_RATE"],
                &[&["0", "5", "-2", "100", "0.5"], &["1", "5", "5", "100", "0.5"]],
            ),
            tickets: Table::from_rows(
                TICKETS,
                &["ROUNDTRIP", "YEAR", "QUARTER", "ITIN_FARE", "PASSENGERS"],
                &[&["1", "2019", "1", "300", "1"], &["0", "2019", "1", "300", "1"]],
            ),
        };
        let (cleaned, stats) = clean_tables(&raw, &PipelineConfig::default()).unwrap();
        assert_eq!(stats.len(), 3);
        assert_eq!(stats[0].dataset, AIRPORTS);
        assert_eq!(cleaned.flights.len(), 1);
        assert_eq!(cleaned.tickets.len(), 1);
        assert_eq!(stats[2].dropped(), 1);
    }
}
