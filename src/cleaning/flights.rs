use csv::StringRecord;

use crate::cleaning::{Cleaned, cell, filter_records};
use crate::error::Result;
use crate::parser::{is_missing, parse_flag, parse_number};
use crate::table::Table;

pub const CANCELLED: &str = "CANCELLED";
pub const DEP_DELAY: &str = "DEP_DELAY";
pub const ARR_DELAY: &str = "ARR_DELAY";
pub const DISTANCE: &str = "DISTANCE";
pub const OCCUPANCY_RATE: &str = "OCCUPANCY_RATE";
pub const FL_DATE: &str = "FL_DATE";

/// Drops cancelled legs and legs without distance or occupancy, and floors
/// negative (early) delays at zero.
///
/// Missing delays are left missing; route means skip them later.
#[tracing::instrument(skip_all, fields(rows = table.len()))]
pub fn clean_flights(table: &Table) -> Result<Cleaned> {
    let cancelled_idx = table.require_column(CANCELLED)?;
    let dep_idx = table.require_column(DEP_DELAY)?;
    let arr_idx = table.require_column(ARR_DELAY)?;
    let distance_idx = table.require_column(DISTANCE)?;
    let occupancy_idx = table.require_column(OCCUPANCY_RATE)?;

    Ok(filter_records(table, |record| {
        if parse_flag(cell(record, cancelled_idx)) != Some(false) {
            return None;
        }
        if is_missing(cell(record, distance_idx)) || is_missing(cell(record, occupancy_idx)) {
            return None;
        }
        Some(floor_delays(record, &[dep_idx, arr_idx]))
    }))
}

fn floor_delays(record: &StringRecord, delay_cols: &[usize]) -> StringRecord {
    let early = |idx: usize, record: &StringRecord| {
        parse_number(cell(record, idx)).is_some_and(|v| v < 0.0)
    };
    if !delay_cols.iter().any(|&idx| early(idx, record)) {
        return record.clone();
    }

    record
        .iter()
        .enumerate()
        .map(|(idx, value)| {
            if delay_cols.contains(&idx) && early(idx, record) {
                "0"
            } else {
                value
            }
        })
        .collect()
}
