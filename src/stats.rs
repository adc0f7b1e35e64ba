//! Row and drop counts collected while the pipeline runs.

use serde::Serialize;

/// Outcome of one record filter pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleaningStats {
    pub dataset: String,
    pub rows_in: usize,
    pub rows_out: usize,
    pub elapsed_ms: u64,
}

impl CleaningStats {
    pub fn dropped(&self) -> usize {
        self.rows_in - self.rows_out
    }

    pub fn retained_pct(&self) -> f64 {
        pct(self.rows_out, self.rows_in)
    }
}

/// Coverage of the flights/tickets route join.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct JoinStats {
    pub flight_routes: usize,
    pub ticket_routes: usize,
    pub joined_routes: usize,
    pub flight_only_routes: usize,
    pub ticket_only_routes: usize,

    // rows without a usable origin/destination pair
    pub unkeyed_flights: usize,
    pub unkeyed_tickets: usize,
}

/// Everything that was dropped between raw input and the modeled table.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct RunDiagnostics {
    pub cleaning: Vec<CleaningStats>,
    pub join: JoinStats,
    pub null_feature_rows: usize,
    pub modeled_rows: usize,
}

impl RunDiagnostics {
    /// Share of joined routes that reached the model, in percent.
    pub fn modeled_pct(&self) -> f64 {
        pct(self.modeled_rows, self.join.joined_routes)
    }
}

pub fn pct(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        (part as f64 / total as f64) * 100.0
    }
}
