//! Pipeline configuration loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file at all) yields the
//! standard Q1-2019 analysis:
//!
//! ```toml
//! [paths]
//! data_dir = "data"
//! output_dir = "outputs"
//!
//! [economics]
//! cost_per_mile = 9.18
//!
//! [model]
//! n_estimators = 300
//! learning_rate = 0.05
//! max_depth = 4
//! seed = 42
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, Result};

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "route_profit.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub paths: PathSettings,
    #[serde(default)]
    pub filters: FilterSettings,
    #[serde(default)]
    pub columns: ColumnSettings,
    #[serde(default)]
    pub economics: EconomicSettings,
    #[serde(default)]
    pub model: ModelSettings,
    #[serde(default)]
    pub report: ReportSettings,
}

/// Input and output locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_airports_file")]
    pub airports_file: String,
    #[serde(default = "default_flights_file")]
    pub flights_file: String,
    #[serde(default = "default_tickets_file")]
    pub tickets_file: String,
}

/// Predicate values used by the record filters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterSettings {
    #[serde(default = "default_airport_country")]
    pub airport_country: String,
    #[serde(default = "default_airport_types")]
    pub airport_types: Vec<String>,
    #[serde(default = "default_ticket_year")]
    pub ticket_year: i32,
    #[serde(default = "default_ticket_quarter")]
    pub ticket_quarter: u8,
}

/// Physical column names for the route endpoints.
///
/// Flight endpoints are discovered by prefix when left unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSettings {
    #[serde(default)]
    pub flight_origin: Option<String>,
    #[serde(default)]
    pub flight_destination: Option<String>,
    #[serde(default = "default_ticket_origin")]
    pub ticket_origin: String,
    #[serde(default = "default_ticket_destination")]
    pub ticket_destination: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EconomicSettings {
    /// Operating cost charged per flown mile, in USD.
    #[serde(default = "default_cost_per_mile")]
    pub cost_per_mile: f64,
}

/// Gradient boosting and split hyperparameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSettings {
    #[serde(default = "default_n_estimators")]
    pub n_estimators: usize,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default = "default_min_samples_split")]
    pub min_samples_split: usize,
    #[serde(default = "default_min_samples_leaf")]
    pub min_samples_leaf: usize,
    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_min_rows")]
    pub min_rows: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSettings {
    #[serde(default = "default_top_routes")]
    pub top_routes: usize,
    #[serde(default = "default_rolling_window")]
    pub rolling_window: usize,
    #[serde(default = "default_concentration_share")]
    pub concentration_share: f64,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("outputs")
}

fn default_airports_file() -> String {
    "Airport_Codes.csv".to_string()
}

fn default_flights_file() -> String {
    "Flights.csv".to_string()
}

fn default_tickets_file() -> String {
    "Tickets.csv".to_string()
}

fn default_airport_country() -> String {
    "US".to_string()
}

fn default_airport_types() -> Vec<String> {
    vec!["medium_airport".to_string(), "large_airport".to_string()]
}

fn default_ticket_year() -> i32 {
    2019
}

fn default_ticket_quarter() -> u8 {
    1
}

fn default_ticket_origin() -> String {
    "ORIGIN".to_string()
}

fn default_ticket_destination() -> String {
    "DESTINATION".to_string()
}

fn default_cost_per_mile() -> f64 {
    9.18
}

fn default_n_estimators() -> usize {
    300
}

fn default_learning_rate() -> f64 {
    0.05
}

fn default_max_depth() -> usize {
    4
}

fn default_min_samples_split() -> usize {
    2
}

fn default_min_samples_leaf() -> usize {
    1
}

fn default_test_fraction() -> f64 {
    0.25
}

fn default_seed() -> u64 {
    42
}

fn default_min_rows() -> usize {
    2
}

fn default_top_routes() -> usize {
    10
}

fn default_rolling_window() -> usize {
    7
}

fn default_concentration_share() -> f64 {
    0.2
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            output_dir: default_output_dir(),
            airports_file: default_airports_file(),
            flights_file: default_flights_file(),
            tickets_file: default_tickets_file(),
        }
    }
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            airport_country: default_airport_country(),
            airport_types: default_airport_types(),
            ticket_year: default_ticket_year(),
            ticket_quarter: default_ticket_quarter(),
        }
    }
}

impl Default for ColumnSettings {
    fn default() -> Self {
        Self {
            flight_origin: None,
            flight_destination: None,
            ticket_origin: default_ticket_origin(),
            ticket_destination: default_ticket_destination(),
        }
    }
}

impl Default for EconomicSettings {
    fn default() -> Self {
        Self {
            cost_per_mile: default_cost_per_mile(),
        }
    }
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            n_estimators: default_n_estimators(),
            learning_rate: default_learning_rate(),
            max_depth: default_max_depth(),
            min_samples_split: default_min_samples_split(),
            min_samples_leaf: default_min_samples_leaf(),
            test_fraction: default_test_fraction(),
            seed: default_seed(),
            min_rows: default_min_rows(),
        }
    }
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            top_routes: default_top_routes(),
            rolling_window: default_rolling_window(),
            concentration_share: default_concentration_share(),
        }
    }
}

impl PipelineConfig {
    /// Parses a TOML document and validates the result.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: PipelineConfig = toml::from_str(content)
            .map_err(|e| PipelineError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            PipelineError::Config(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Resolves the config source: explicit path, then `ROUTE_PROFIT_CONFIG`,
    /// then [`DEFAULT_CONFIG_FILE`] if it exists, then built-in defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        if let Ok(path) = std::env::var("ROUTE_PROFIT_CONFIG") {
            return Self::from_file(path);
        }
        let local = Path::new(DEFAULT_CONFIG_FILE);
        if local.exists() {
            return Self::from_file(local);
        }
        Ok(Self::default())
    }

    fn validate(&self) -> Result<()> {
        let m = &self.model;
        if !(m.test_fraction > 0.0 && m.test_fraction < 1.0) {
            return Err(PipelineError::Config(format!(
                "model.test_fraction must be in (0, 1), got {}",
                m.test_fraction
            )));
        }
        if m.n_estimators == 0 || m.max_depth == 0 {
            return Err(PipelineError::Config(
                "model.n_estimators and model.max_depth must be positive".to_string(),
            ));
        }
        if !(m.learning_rate > 0.0) {
            return Err(PipelineError::Config(format!(
                "model.learning_rate must be positive, got {}",
                m.learning_rate
            )));
        }
        if m.min_samples_leaf == 0 || m.min_samples_split < 2 {
            return Err(PipelineError::Config(
                "model.min_samples_leaf must be >= 1 and model.min_samples_split >= 2".to_string(),
            ));
        }
        if !self.economics.cost_per_mile.is_finite() {
            return Err(PipelineError::Config(
                "economics.cost_per_mile must be finite".to_string(),
            ));
        }
        if self.report.rolling_window == 0 {
            return Err(PipelineError::Config(
                "report.rolling_window must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn cleaned_dir(&self) -> PathBuf {
        self.paths.output_dir.join("cleaned")
    }

    pub fn analysis_dir(&self) -> PathBuf {
        self.paths.output_dir.join("analysis")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = PipelineConfig::from_toml_str("").unwrap();
        assert_eq!(config.economics.cost_per_mile, 9.18);
        assert_eq!(config.model.n_estimators, 300);
        assert_eq!(config.model.max_depth, 4);
        assert_eq!(config.model.seed, 42);
        assert_eq!(config.filters.ticket_year, 2019);
        assert_eq!(config.filters.airport_types.len(), 2);
        assert!(config.columns.flight_origin.is_none());
        assert_eq!(config.columns.ticket_destination, "DESTINATION");
    }

    #[test]
    fn test_partial_section_overrides() {
        let config = PipelineConfig::from_toml_str(
            r#"
            [economics]
            cost_per_mile = 12.5

            [columns]
            flight_origin = "ORIGIN"
            "#,
        )
        .unwrap();
        assert_eq!(config.economics.cost_per_mile, 12.5);
        assert_eq!(config.columns.flight_origin.as_deref(), Some("ORIGIN"));
        assert!(config.columns.flight_destination.is_none());
        assert_eq!(config.model.learning_rate, 0.05);
    }

    #[test]
    fn test_invalid_test_fraction_rejected() {
        let err = PipelineConfig::from_toml_str("[model]\ntest_fraction = 1.5\n").unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn test_malformed_toml_rejected() {
        let err = PipelineConfig::from_toml_str("[model\n").unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn test_output_layout() {
        let config = PipelineConfig::default();
        assert_eq!(config.cleaned_dir(), PathBuf::from("outputs/cleaned"));
        assert_eq!(config.analysis_dir(), PathBuf::from("outputs/analysis"));
    }
}
