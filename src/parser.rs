//! Delimited-text ingestion and cell value coercion.

use chrono::{NaiveDate, NaiveDateTime};
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};
use crate::table::Table;

const MISSING_MARKERS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "null", "NULL", "None"];

/// Reads a whole delimited file into memory.
///
/// Files ending in `.gz` are decompressed on the fly.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or a row is malformed.
#[tracing::instrument(skip(path), fields(path = %path.as_ref().display()))]
pub fn read_table<P: AsRef<Path>>(path: P, name: &str) -> Result<Table> {
    let path = path.as_ref();
    let start = Instant::now();
    let file = File::open(path)?;

    let table = if path.extension().and_then(|e| e.to_str()) == Some("gz") {
        read_table_from(MultiGzDecoder::new(BufReader::new(file)), name)?
    } else {
        read_table_from(BufReader::new(file), name)?
    };

    info!(
        dataset = name,
        rows = table.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Table loaded"
    );
    Ok(table)
}

/// Reads a table from any reader producing CSV with a header row.
pub fn read_table_from<R: Read>(reader: R, name: &str) -> Result<Table> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let mut records = Vec::new();
    for result in rdr.records() {
        records.push(result?);
    }

    debug!(dataset = name, columns = headers.len(), "Parsed header");
    Ok(Table::new(name, &headers, records))
}

/// True for the empty string and the usual textual null markers.
pub fn is_missing(value: &str) -> bool {
    MISSING_MARKERS.contains(&value.trim())
}

/// Parses a numeric cell. Missing and unparsable cells yield `None`.
pub fn parse_number(value: &str) -> Option<f64> {
    if is_missing(value) {
        return None;
    }
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parses a boolean-like cell (`1`/`0`, `true`/`false`, `yes`/`no`, ...).
pub fn parse_flag(value: &str) -> Option<bool> {
    if is_missing(value) {
        return None;
    }
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" => Some(true),
        "false" | "f" | "no" | "n" => Some(false),
        other => other.parse::<f64>().ok().map(|v| v != 0.0),
    }
}

/// Parses a flight date such as `2019-03-02` or `3/2/2019`.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    if is_missing(value) {
        return None;
    }
    let value = value.trim();
    for fmt in ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(value, fmt) {
            return Some(date);
        }
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(ts.date());
        }
    }
    None
}

/// Coerces a column to numbers, turning unparsable cells into `None`.
///
/// # Errors
///
/// Fails with a schema error if the column is absent, and with a data
/// quality error if the column holds values but none of them are numeric.
pub fn numeric_column(table: &Table, column: &str) -> Result<Vec<Option<f64>>> {
    let idx = table.require_column(column)?;
    let mut unparsable = 0usize;
    let mut parsed = 0usize;

    let values: Vec<Option<f64>> = table
        .column_values(idx)
        .map(|cell| {
            let value = parse_number(cell);
            match value {
                Some(_) => parsed += 1,
                None if !is_missing(cell) => unparsable += 1,
                None => {}
            }
            value
        })
        .collect();

    if parsed == 0 && unparsable > 0 {
        return Err(PipelineError::DataQuality {
            table: table.name().to_string(),
            column: column.to_string(),
            unparsable,
        });
    }
    if unparsable > 0 {
        warn!(
            dataset = table.name(),
            column, unparsable, "Unparsable numeric cells coerced to missing"
        );
    }

    Ok(values)
}

/// Trimmed text of a column, with missing markers mapped to `None`.
pub fn text_column<'a>(table: &'a Table, column: &str) -> Result<Vec<Option<&'a str>>> {
    let idx = table.require_column(column)?;
    Ok(table
        .column_values(idx)
        .map(|cell| if is_missing(cell) { None } else { Some(cell.trim()) })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_markers() {
        assert!(is_missing(""));
        assert!(is_missing("  "));
        assert!(is_missing("NaN"));
        assert!(is_missing("NULL"));
        assert!(!is_missing("0"));
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("12.5"), Some(12.5));
        assert_eq!(parse_number(" -3 "), Some(-3.0));
        assert_eq!(parse_number("NA"), None);
        assert_eq!(parse_number("$200"), None);
        assert_eq!(parse_number("inf"), None);
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("1"), Some(true));
        assert_eq!(parse_flag("1.0"), Some(true));
        assert_eq!(parse_flag("0.0"), Some(false));
        assert_eq!(parse_flag("False"), Some(false));
        assert_eq!(parse_flag("T"), Some(true));
        assert_eq!(parse_flag(""), None);
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2019, 3, 2);
        assert_eq!(parse_date("2019-03-02"), expected);
        assert_eq!(parse_date("3/2/2019"), expected);
        assert_eq!(parse_date("2019-03-02 00:00:00"), expected);
        assert_eq!(parse_date("yesterday"), None);
    }

    #[test]
    fn test_read_table_from_csv() {
        let data = "iata_code,type\nJFK,large_airport\nXYZ,\n";
        let table = read_table_from(data.as_bytes(), "airports").unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.column_index("IATA_CODE"), Some(0));
        assert_eq!(table.records()[1].get(1), Some(""));
    }

    #[test]
    fn test_numeric_column_coerces_bad_cells() {
        let table = Table::from_rows("flights", &["DISTANCE"], &[&["100"], &["abc"], &[""]]);
        let values = numeric_column(&table, "DISTANCE").unwrap();
        assert_eq!(values, vec![Some(100.0), None, None]);
    }

    #[test]
    fn test_numeric_column_without_numbers_is_data_quality_error() {
        let table = Table::from_rows("tickets", &["ITIN_FARE"], &[&["free"], &["n/a?"]]);
        let err = numeric_column(&table, "ITIN_FARE").unwrap_err();
        assert!(matches!(err, PipelineError::DataQuality { unparsable: 2, .. }));
    }

    #[test]
    fn test_numeric_column_all_missing_is_not_an_error() {
        let table = Table::from_rows("tickets", &["ITIN_FARE"], &[&[""], &["NA"]]);
        let values = numeric_column(&table, "ITIN_FARE").unwrap();
        assert_eq!(values, vec![None, None]);
    }
}
