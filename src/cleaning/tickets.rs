use crate::cleaning::{Cleaned, cell, filter_records};
use crate::config::FilterSettings;
use crate::error::Result;
use crate::parser::{is_missing, parse_flag, parse_number};
use crate::table::Table;

pub const ROUNDTRIP: &str = "ROUNDTRIP";
pub const YEAR: &str = "YEAR";
pub const QUARTER: &str = "QUARTER";
pub const ITIN_FARE: &str = "ITIN_FARE";
pub const PASSENGERS: &str = "PASSENGERS";

/// Keeps round-trip itineraries of the configured year and quarter that carry
/// both a fare and a passenger count.
#[tracing::instrument(skip_all, fields(rows = table.len()))]
pub fn clean_tickets(table: &Table, filters: &FilterSettings) -> Result<Cleaned> {
    let roundtrip_idx = table.require_column(ROUNDTRIP)?;
    let year_idx = table.require_column(YEAR)?;
    let quarter_idx = table.require_column(QUARTER)?;
    let fare_idx = table.require_column(ITIN_FARE)?;
    let passengers_idx = table.require_column(PASSENGERS)?;

    let year = f64::from(filters.ticket_year);
    let quarter = f64::from(filters.ticket_quarter);

    Ok(filter_records(table, |record| {
        let keep = parse_flag(cell(record, roundtrip_idx)) == Some(true)
            && parse_number(cell(record, year_idx)) == Some(year)
            && parse_number(cell(record, quarter_idx)) == Some(quarter)
            && !is_missing(cell(record, fare_idx))
            && !is_missing(cell(record, passengers_idx));

        keep.then(|| record.clone())
    }))
}
