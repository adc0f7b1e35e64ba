//! CLI entry point for the route profitability pipeline.
//!
//! `clean` filters the raw airport, flight and ticket files; `model` trains
//! and applies the profit model on previously cleaned files; `run` does both.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use route_profit::analyzers::analyzer::{
    Tables, analyze, clean_tables, load_cleaned_tables, load_raw_tables,
};
use route_profit::config::PipelineConfig;
use route_profit::output::{log_metrics, write_analysis, write_cleaned};
use route_profit::stats::CleaningStats;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "route_profit")]
#[command(about = "Clean airline datasets and model route profitability", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Filter the raw datasets and write the cleaned tables
    Clean {
        /// TOML configuration file
        #[arg(short, long, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Gzip compress the cleaned tables
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
    /// Aggregate cleaned tables, fit the profit model and write the analysis
    Model {
        /// TOML configuration file
        #[arg(short, long, value_name = "PATH")]
        config: Option<PathBuf>,
    },
    /// Clean and model in one pass
    Run {
        /// TOML configuration file
        #[arg(short, long, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Gzip compress the cleaned tables
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/route_profit.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("route_profit.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    if let Err(e) = dispatch(cli.command) {
        error!(error = %format!("{e:#}"), "Pipeline failed");
        return Err(e);
    }
    Ok(())
}

fn dispatch(command: Commands) -> Result<()> {
    match command {
        Commands::Clean { config, gzip } => {
            let config = load_config(config.as_deref())?;
            clean_stage(&config, gzip)?;
        }
        Commands::Model { config } => {
            let config = load_config(config.as_deref())?;
            let tables = load_cleaned_tables(&config).context("load stage failed")?;
            model_stage(&config, &tables, Vec::new())?;
        }
        Commands::Run { config, gzip } => {
            let config = load_config(config.as_deref())?;
            let (tables, stats) = clean_stage(&config, gzip)?;
            model_stage(&config, &tables, stats)?;
        }
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    let config = PipelineConfig::resolve(path).context("config stage failed")?;
    info!(
        data_dir = %config.paths.data_dir.display(),
        output_dir = %config.paths.output_dir.display(),
        "Configuration loaded"
    );
    Ok(config)
}

#[tracing::instrument(skip(config))]
fn clean_stage(config: &PipelineConfig, gzip: bool) -> Result<(Tables, Vec<CleaningStats>)> {
    let raw = load_raw_tables(config).context("load stage failed")?;
    let (tables, stats) = clean_tables(&raw, config).context("clean stage failed")?;
    write_cleaned(&tables, &config.cleaned_dir(), gzip).context("write stage failed")?;
    Ok((tables, stats))
}

#[tracing::instrument(skip_all)]
fn model_stage(config: &PipelineConfig, tables: &Tables, stats: Vec<CleaningStats>) -> Result<()> {
    let analysis = analyze(tables, stats, config).context("model stage failed")?;
    log_metrics(&analysis);

    let dir = config.analysis_dir();
    write_analysis(&analysis, &dir).context("write stage failed")?;
    info!(dir = %dir.display(), routes = analysis.features.len(), "Run complete");
    Ok(())
}
