//! Per-entity record filters.
//!
//! Each filter takes a raw [`Table`] and returns a new table holding every
//! original column but only the rows that satisfy the entity's predicates.
//! Filters never mutate their input and are idempotent: cleaning an already
//! cleaned table returns it unchanged.

pub mod airports;
pub mod flights;
pub mod tickets;

pub use airports::clean_airports;
pub use flights::clean_flights;
pub use tickets::clean_tickets;

use csv::StringRecord;
use std::time::Instant;
use tracing::info;

use crate::stats::CleaningStats;
use crate::table::Table;

/// A cleaned table with the counts of its filter pass.
#[derive(Debug, Clone)]
pub struct Cleaned {
    pub table: Table,
    pub stats: CleaningStats,
}

/// Runs `keep` over every record; `Some` rows (possibly rewritten) are kept.
pub(crate) fn filter_records<F>(table: &Table, mut keep: F) -> Cleaned
where
    F: FnMut(&StringRecord) -> Option<StringRecord>,
{
    let start = Instant::now();
    let records: Vec<StringRecord> = table.records().iter().filter_map(|r| keep(r)).collect();
    let cleaned = table.with_records(records);

    let stats = CleaningStats {
        dataset: table.name().to_string(),
        rows_in: table.len(),
        rows_out: cleaned.len(),
        elapsed_ms: start.elapsed().as_millis() as u64,
    };

    info!(
        dataset = %stats.dataset,
        rows_in = stats.rows_in,
        rows_out = stats.rows_out,
        dropped = stats.dropped(),
        elapsed_ms = stats.elapsed_ms,
        "Table cleaned"
    );

    Cleaned {
        table: cleaned,
        stats,
    }
}

/// Cell accessor tolerant of short records.
pub(crate) fn cell(record: &StringRecord, idx: usize) -> &str {
    record.get(idx).unwrap_or("")
}
