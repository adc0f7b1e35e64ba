//! Order-independent route identifiers and endpoint column resolution.

use serde::Serialize;
use std::fmt;
use tracing::debug;

use crate::config::ColumnSettings;
use crate::error::{PipelineError, Result};
use crate::parser::{is_missing, parse_number};
use crate::table::{Table, canonical_column};

pub const SEPARATOR: char = '_';

/// Prefixes used to discover flight endpoint columns when none are configured.
pub const ORIGIN_PREFIX: &str = "ORIGIN";
pub const DEST_PREFIX: &str = "DEST";

/// Longest value an airport code column may hold.
const MAX_CODE_LEN: usize = 3;

/// Canonical identifier of an unordered airport pair.
///
/// `RouteKey::new("LAX", "JFK")` and `RouteKey::new("JFK", "LAX")` are both
/// `JFK_LAX`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct RouteKey(String);

impl RouteKey {
    pub fn new(a: &str, b: &str) -> Self {
        let (a, b) = (a.trim(), b.trim());
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        RouteKey(format!("{first}{SEPARATOR}{second}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolved column positions of a table's origin and destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub origin: usize,
    pub destination: usize,
}

impl Endpoints {
    /// Key for one record, or `None` when either endpoint is missing.
    pub fn key(&self, record: &csv::StringRecord) -> Option<RouteKey> {
        let origin = record.get(self.origin).filter(|v| !is_missing(v))?;
        let destination = record.get(self.destination).filter(|v| !is_missing(v))?;
        Some(RouteKey::new(origin, destination))
    }
}

/// Flight endpoints: the configured columns, else prefix discovery.
pub fn flight_endpoints(table: &Table, columns: &ColumnSettings) -> Result<Endpoints> {
    let origin = match &columns.flight_origin {
        Some(name) => table.require_column(name)?,
        None => discover_endpoint(table, ORIGIN_PREFIX)?,
    };
    let destination = match &columns.flight_destination {
        Some(name) => table.require_column(name)?,
        None => discover_endpoint(table, DEST_PREFIX)?,
    };
    Ok(Endpoints {
        origin,
        destination,
    })
}

/// Ticket endpoints always come from fixed (configurable) column names.
pub fn ticket_endpoints(table: &Table, columns: &ColumnSettings) -> Result<Endpoints> {
    Ok(Endpoints {
        origin: table.require_column(&columns.ticket_origin)?,
        destination: table.require_column(&columns.ticket_destination)?,
    })
}

/// Finds the single textual column named `prefix*` whose present values are
/// all at most three characters long.
///
/// Same-prefix columns holding numeric ids (`ORIGIN_AIRPORT_ID`) or longer
/// text (`ORIGIN_CITY_NAME`) are rejected.
///
/// # Errors
///
/// Fails when no column qualifies or when more than one does.
pub fn discover_endpoint(table: &Table, prefix: &str) -> Result<usize> {
    let prefix = canonical_column(prefix);
    let candidates: Vec<usize> = table
        .headers()
        .iter()
        .enumerate()
        .filter(|(_, name)| name.starts_with(&prefix))
        .map(|(idx, _)| idx)
        .filter(|&idx| looks_like_codes(table, idx))
        .collect();

    match candidates.as_slice() {
        [idx] => {
            debug!(
                dataset = table.name(),
                prefix = %prefix,
                column = table.headers().get(*idx).unwrap_or(""),
                "Endpoint column discovered"
            );
            Ok(*idx)
        }
        [] => Err(PipelineError::EndpointNotFound {
            table: table.name().to_string(),
            prefix,
        }),
        many => Err(PipelineError::AmbiguousEndpoint {
            table: table.name().to_string(),
            prefix,
            candidates: many
                .iter()
                .map(|&idx| table.headers().get(idx).unwrap_or("").to_string())
                .collect(),
        }),
    }
}

fn looks_like_codes(table: &Table, idx: usize) -> bool {
    let mut textual = false;
    for value in table.column_values(idx).filter(|v| !is_missing(v)) {
        let value = value.trim();
        if value.chars().count() > MAX_CODE_LEN {
            return false;
        }
        if parse_number(value).is_none() {
            textual = true;
        }
    }
    textual
}
