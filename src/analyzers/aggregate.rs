use std::collections::BTreeMap;
use tracing::info;

use crate::analyzers::route_key::{Endpoints, RouteKey, flight_endpoints, ticket_endpoints};
use crate::analyzers::types::RouteAggregate;
use crate::analyzers::utility::{RunningMean, RunningSum};
use crate::cleaning::flights::{ARR_DELAY, DEP_DELAY, DISTANCE, OCCUPANCY_RATE};
use crate::cleaning::tickets::{ITIN_FARE, PASSENGERS};
use crate::config::ColumnSettings;
use crate::error::{PipelineError, Result};
use crate::parser::numeric_column;
use crate::stats::JoinStats;
use crate::table::Table;

/// Flight-side accumulator for one route.
#[derive(Debug, Clone, Default)]
pub struct FlightSummary {
    pub origin: String,
    pub destination: String,
    pub flight_count: usize,
    pub dep_delay: RunningMean,
    pub arr_delay: RunningMean,
    pub distance: RunningMean,
    pub occupancy: RunningMean,
}

/// Ticket-side accumulator for one route.
#[derive(Debug, Clone, Default)]
pub struct TicketSummary {
    pub fare: RunningMean,
    pub passengers: RunningSum,
}

/// Joined routes together with the join's coverage counts.
#[derive(Debug, Clone)]
pub struct RouteAggregation {
    pub routes: Vec<RouteAggregate>,
    pub stats: JoinStats,
}

/// Groups cleaned flight legs by route: leg count and mean delays, distance
/// and occupancy. Returns the summaries and the number of legs without a key.
pub fn summarize_flights(
    flights: &Table,
    endpoints: &Endpoints,
) -> Result<(BTreeMap<RouteKey, FlightSummary>, usize)> {
    let dep = numeric_column(flights, DEP_DELAY)?;
    let arr = numeric_column(flights, ARR_DELAY)?;
    let distance = numeric_column(flights, DISTANCE)?;
    let occupancy = numeric_column(flights, OCCUPANCY_RATE)?;

    let mut routes: BTreeMap<RouteKey, FlightSummary> = BTreeMap::new();
    let mut unkeyed = 0usize;

    for (row, record) in flights.records().iter().enumerate() {
        let Some(key) = endpoints.key(record) else {
            unkeyed += 1;
            continue;
        };

        let summary = routes.entry(key).or_insert_with(|| FlightSummary {
            origin: record.get(endpoints.origin).unwrap_or("").trim().to_string(),
            destination: record.get(endpoints.destination).unwrap_or("").trim().to_string(),
            ..Default::default()
        });

        summary.flight_count += 1;
        summary.dep_delay.push(dep[row]);
        summary.arr_delay.push(arr[row]);
        summary.distance.push(distance[row]);
        summary.occupancy.push(occupancy[row]);
    }

    Ok((routes, unkeyed))
}

/// Groups cleaned tickets by route: mean fare and total passengers.
pub fn summarize_tickets(
    tickets: &Table,
    endpoints: &Endpoints,
) -> Result<(BTreeMap<RouteKey, TicketSummary>, usize)> {
    let fare = numeric_column(tickets, ITIN_FARE)?;
    let passengers = numeric_column(tickets, PASSENGERS)?;

    let mut routes: BTreeMap<RouteKey, TicketSummary> = BTreeMap::new();
    let mut unkeyed = 0usize;

    for (row, record) in tickets.records().iter().enumerate() {
        let Some(key) = endpoints.key(record) else {
            unkeyed += 1;
            continue;
        };

        let summary = routes.entry(key).or_default();
        summary.fare.push(fare[row]);
        summary.passengers.push(passengers[row]);
    }

    Ok((routes, unkeyed))
}

/// Inner join on route key. Routes seen on only one side are counted, not
/// emitted. Output is ordered by route key.
pub fn join_routes(
    flights: BTreeMap<RouteKey, FlightSummary>,
    tickets: &BTreeMap<RouteKey, TicketSummary>,
) -> (Vec<RouteAggregate>, JoinStats) {
    let mut stats = JoinStats {
        flight_routes: flights.len(),
        ticket_routes: tickets.len(),
        ..Default::default()
    };

    let routes: Vec<RouteAggregate> = flights
        .into_iter()
        .filter_map(|(route, flight)| {
            let ticket = tickets.get(&route)?;
            Some(RouteAggregate {
                route,
                origin: flight.origin,
                destination: flight.destination,
                flight_count: flight.flight_count,
                mean_dep_delay: flight.dep_delay.value(),
                mean_arr_delay: flight.arr_delay.value(),
                mean_distance: flight.distance.value(),
                mean_occupancy: flight.occupancy.value(),
                mean_fare: ticket.fare.value(),
                total_passengers: ticket.passengers.value(),
            })
        })
        .collect();

    stats.joined_routes = routes.len();
    stats.flight_only_routes = stats.flight_routes - routes.len();
    stats.ticket_only_routes = stats.ticket_routes - routes.len();

    (routes, stats)
}

/// Aggregates cleaned flights and tickets to one row per route present in
/// both tables.
///
/// # Errors
///
/// Schema errors for missing or unresolvable columns, and
/// [`PipelineError::JoinEmpty`] when no route survives the join.
#[tracing::instrument(skip_all, fields(flights = flights.len(), tickets = tickets.len()))]
pub fn aggregate_routes(
    flights: &Table,
    tickets: &Table,
    columns: &ColumnSettings,
) -> Result<RouteAggregation> {
    let flight_ends = flight_endpoints(flights, columns)?;
    let ticket_ends = ticket_endpoints(tickets, columns)?;

    let (flight_routes, unkeyed_flights) = summarize_flights(flights, &flight_ends)?;
    let (ticket_routes, unkeyed_tickets) = summarize_tickets(tickets, &ticket_ends)?;

    let (routes, mut stats) = join_routes(flight_routes, &ticket_routes);
    stats.unkeyed_flights = unkeyed_flights;
    stats.unkeyed_tickets = unkeyed_tickets;

    info!(
        flight_routes = stats.flight_routes,
        ticket_routes = stats.ticket_routes,
        joined_routes = stats.joined_routes,
        flight_only = stats.flight_only_routes,
        ticket_only = stats.ticket_only_routes,
        unkeyed_flights,
        unkeyed_tickets,
        "Routes aggregated"
    );

    if routes.is_empty() {
        return Err(PipelineError::JoinEmpty {
            flight_routes: stats.flight_routes,
            ticket_routes: stats.ticket_routes,
        });
    }

    Ok(RouteAggregation { routes, stats })
}
