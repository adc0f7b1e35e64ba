//! Persistence of cleaned tables and analysis artifacts.
//!
//! Tables go out as CSV (gzipped when the path ends in `.gz`), metrics as
//! pretty JSON, and the run summary as Markdown.

use chrono::{DateTime, Utc};
use csv::WriterBuilder;
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::analyzers::analyzer::{AIRPORTS, FLIGHTS, RouteAnalysis, TICKETS, Tables};
use crate::analyzers::types::{FeatureImportance, ModelMetrics, ProfitSummary};
use crate::error::{PipelineError, Result};
use crate::stats::RunDiagnostics;
use crate::table::Table;

pub const ROUTE_FEATURES_FILE: &str = "route_features.csv";
pub const METRICS_FILE: &str = "metrics.json";
pub const DAILY_TRENDS_FILE: &str = "daily_trends.csv";
pub const ROUTE_NETWORK_FILE: &str = "route_network.csv";
pub const SUMMARY_FILE: &str = "summary.md";

/// `<dataset>_clean.csv`, with a `.gz` suffix when compressed.
pub fn cleaned_file_name(dataset: &str, gzip: bool) -> String {
    if gzip {
        format!("{dataset}_clean.csv.gz")
    } else {
        format!("{dataset}_clean.csv")
    }
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(BufWriter::new(File::create(path)?))
}

fn is_gzip(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("gz")
}

/// Writes a table with its header row.
pub fn write_table(table: &Table, path: &Path) -> Result<()> {
    let file = create(path)?;
    if is_gzip(path) {
        let encoder = GzEncoder::new(file, Compression::default());
        let encoder = write_records(table, encoder)?;
        encoder.finish()?.flush()?;
    } else {
        write_records(table, file)?.flush()?;
    }
    debug!(dataset = table.name(), rows = table.len(), path = %path.display(), "Table written");
    Ok(())
}

fn write_records<W: Write>(table: &Table, sink: W) -> Result<W> {
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(sink);
    writer.write_record(table.headers())?;
    for record in table.records() {
        writer.write_record(record)?;
    }
    writer.flush()?;
    writer
        .into_inner()
        .map_err(|e| PipelineError::Io(e.into_error()))
}

/// Writes the three cleaned tables into `dir`, returning the paths written.
#[tracing::instrument(skip(tables), fields(dir = %dir.display()))]
pub fn write_cleaned(tables: &Tables, dir: &Path, gzip: bool) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(3);
    for (dataset, table) in [
        (AIRPORTS, &tables.airports),
        (FLIGHTS, &tables.flights),
        (TICKETS, &tables.tickets),
    ] {
        let path = dir.join(cleaned_file_name(dataset, gzip));
        write_table(table, &path)?;
        written.push(path);
    }
    info!(files = written.len(), gzip, "Cleaned tables written");
    Ok(written)
}

/// Serializes a slice of rows as CSV with a header derived from `T`.
pub fn write_rows<T: Serialize>(rows: &[T], path: &Path) -> Result<()> {
    let mut writer = WriterBuilder::new().from_writer(create(path)?);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    debug!(rows = rows.len(), path = %path.display(), "Rows written");
    Ok(())
}

/// Contents of `metrics.json`. Holds no wall-clock data, so reruns on the
/// same inputs produce identical files.
#[derive(Debug, Serialize)]
pub struct MetricsDocument<'a> {
    pub metrics: &'a ModelMetrics,
    pub feature_importances: &'a [FeatureImportance],
    pub diagnostics: &'a RunDiagnostics,
    pub profit_summary: Option<&'a ProfitSummary>,
    pub network_skipped: usize,
}

impl<'a> MetricsDocument<'a> {
    pub fn new(analysis: &'a RouteAnalysis) -> Self {
        Self {
            metrics: &analysis.metrics,
            feature_importances: &analysis.importances,
            diagnostics: &analysis.diagnostics,
            profit_summary: analysis.profit_summary.as_ref(),
            network_skipped: analysis.network_skipped,
        }
    }
}

pub fn write_metrics(analysis: &RouteAnalysis, path: &Path) -> Result<()> {
    let mut file = create(path)?;
    serde_json::to_writer_pretty(&mut file, &MetricsDocument::new(analysis))?;
    file.write_all(b"\n")?;
    file.flush()?;
    Ok(())
}

fn usd(value: f64) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    let digits = format!("{:.0}", value.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("{sign}${grouped}")
}

/// Markdown report of the run: model quality, profit drivers, top routes and
/// what was dropped on the way.
pub struct Summary<'a> {
    pub analysis: &'a RouteAnalysis,
    pub generated_at: DateTime<Utc>,
}

impl Summary<'_> {
    fn write_performance(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = &self.analysis.metrics;
        writeln!(f, "## Model performance\n")?;
        writeln!(f, "- R²: {:.3}", m.r2)?;
        writeln!(f, "- MAE: {}", usd(m.mae))?;
        writeln!(f, "- RMSE: {}", usd(m.rmse))?;
        writeln!(f, "- Training routes: {}", m.n_train)?;
        writeln!(f, "- Holdout routes: {}\n", m.n_holdout)?;

        writeln!(f, "## Profit drivers\n")?;
        for (rank, fi) in self.analysis.importances.iter().enumerate() {
            writeln!(f, "{}. {}: {:.1}%", rank + 1, fi.feature, fi.importance * 100.0)?;
        }
        writeln!(f)
    }

    fn write_routes(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.analysis.top_routes.is_empty() {
            writeln!(f, "## Most profitable routes\n")?;
            writeln!(f, "| Route | Flights | Profit | Predicted |")?;
            writeln!(f, "|---|---:|---:|---:|")?;
            for row in &self.analysis.top_routes {
                let predicted = row.predicted_profit.map(usd).unwrap_or_default();
                writeln!(
                    f,
                    "| {} | {} | {} | {} |",
                    row.route,
                    row.flight_count,
                    usd(row.profit),
                    predicted
                )?;
            }
            writeln!(f)?;
        }

        if let Some(p) = &self.analysis.profit_summary {
            writeln!(f, "## Profit concentration\n")?;
            writeln!(f, "- Total profit: {}", usd(p.total_profit))?;
            writeln!(f, "- Median route profit: {}", usd(p.median_profit))?;
            match p.top_share_ratio {
                Some(ratio) => writeln!(
                    f,
                    "- Top {} routes capture {:.1}% of total profit\n",
                    p.top_share_routes,
                    ratio * 100.0
                )?,
                None => writeln!(
                    f,
                    "- Top {} routes earn {}\n",
                    p.top_share_routes,
                    usd(p.top_share_profit)
                )?,
            }
        }
        Ok(())
    }

    fn write_coverage(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = &self.analysis.diagnostics;
        writeln!(f, "## Data coverage\n")?;
        for c in &d.cleaning {
            writeln!(
                f,
                "- {}: {} of {} rows kept ({} dropped)",
                c.dataset,
                c.rows_out,
                c.rows_in,
                c.dropped()
            )?;
        }
        writeln!(
            f,
            "- Routes: {} in flights, {} in tickets, {} joined",
            d.join.flight_routes, d.join.ticket_routes, d.join.joined_routes
        )?;
        writeln!(
            f,
            "- Rows without a route key: {} flights, {} tickets",
            d.join.unkeyed_flights, d.join.unkeyed_tickets
        )?;
        writeln!(
            f,
            "- Routes excluded for missing features: {}",
            d.null_feature_rows
        )?;
        writeln!(f, "- Routes modeled: {}", d.modeled_rows)
    }
}

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# Route Profitability Summary\n")?;
        writeln!(
            f,
            "Generated at {}\n",
            self.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        )?;
        writeln!(
            f,
            "Objective: predict route profit from operational and commercial metrics.\n"
        )?;
        writeln!(f, "Model: gradient boosted regression trees.\n")?;

        self.write_performance(f)?;
        self.write_routes(f)?;
        self.write_coverage(f)
    }
}

pub fn render_summary(analysis: &RouteAnalysis, generated_at: DateTime<Utc>) -> String {
    Summary {
        analysis,
        generated_at,
    }
    .to_string()
}

/// Writes every analysis artifact into `dir`.
#[tracing::instrument(skip(analysis), fields(dir = %dir.display()))]
pub fn write_analysis(analysis: &RouteAnalysis, dir: &Path) -> Result<()> {
    write_rows(&analysis.features, &dir.join(ROUTE_FEATURES_FILE))?;
    write_metrics(analysis, &dir.join(METRICS_FILE))?;
    write_rows(&analysis.trends, &dir.join(DAILY_TRENDS_FILE))?;
    write_rows(&analysis.network, &dir.join(ROUTE_NETWORK_FILE))?;
    fs::write(dir.join(SUMMARY_FILE), render_summary(analysis, Utc::now()))?;

    info!(routes = analysis.features.len(), "Analysis artifacts written");
    Ok(())
}

/// Logs the headline numbers of a run.
pub fn log_metrics(analysis: &RouteAnalysis) {
    let m = &analysis.metrics;
    info!(r2 = m.r2, mae = m.mae, rmse = m.rmse, "Holdout metrics");
    for f in &analysis.importances {
        info!(feature = %f.feature, importance = f.importance, "Feature importance");
    }
    debug!("{:#?}", analysis.diagnostics);
}
