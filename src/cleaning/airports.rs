use crate::cleaning::{Cleaned, cell, filter_records};
use crate::config::FilterSettings;
use crate::error::Result;
use crate::parser::is_missing;
use crate::table::Table;

pub const COUNTRY: &str = "ISO_COUNTRY";
pub const TYPE: &str = "TYPE";
pub const IATA_CODE: &str = "IATA_CODE";
pub const COORDINATES: &str = "COORDINATES";

/// Keeps airports in the configured country and size classes that carry an
/// IATA code.
#[tracing::instrument(skip_all, fields(rows = table.len()))]
pub fn clean_airports(table: &Table, filters: &FilterSettings) -> Result<Cleaned> {
    let country_idx = table.require_column(COUNTRY)?;
    let type_idx = table.require_column(TYPE)?;
    let iata_idx = table.require_column(IATA_CODE)?;

    Ok(filter_records(table, |record| {
        let in_country = cell(record, country_idx).trim() == filters.airport_country;
        let airport_type = cell(record, type_idx).trim();
        let sized = filters.airport_types.iter().any(|t| t == airport_type);
        let has_code = !is_missing(cell(record, iata_idx));

        (in_country && sized && has_code).then(|| record.clone())
    }))
}
