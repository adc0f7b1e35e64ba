//! Error taxonomy shared by every pipeline stage.

use thiserror::Error;

/// Errors raised while cleaning, aggregating or modeling route data.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{table}: required column '{column}' not found")]
    MissingColumn { table: String, column: String },

    #[error("{table}: no endpoint column matches prefix '{prefix}'")]
    EndpointNotFound { table: String, prefix: String },

    #[error("{table}: endpoint prefix '{prefix}' is ambiguous between {candidates:?}")]
    AmbiguousEndpoint {
        table: String,
        prefix: String,
        candidates: Vec<String>,
    },

    #[error("{table}: column '{column}' has no numeric values ({unparsable} unparsable cells)")]
    DataQuality {
        table: String,
        column: String,
        unparsable: usize,
    },

    #[error("no route is present in both flights ({flight_routes} routes) and tickets ({ticket_routes} routes)")]
    JoinEmpty {
        flight_routes: usize,
        ticket_routes: usize,
    },

    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("degenerate data: {0}")]
    DegenerateData(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    pub(crate) fn missing_column(table: &str, column: &str) -> Self {
        PipelineError::MissingColumn {
            table: table.to_string(),
            column: column.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
