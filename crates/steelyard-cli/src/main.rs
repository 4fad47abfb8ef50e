//! Steelyard - warehouse tooling for the steel shipments dataset
//!
//! The `steelyard` command drives the three operational workflows:
//!
//! - `load`: bulk-load the compressed CSV export into the raw table
//! - `quality`: run the data-quality checks and persist the scored report
//! - `eda`: run the exploratory analysis and render its charts and summary

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::{info, Level};

use steelyard_core::AppConfig;
use steelyard_ops::{EdaReporter, LoadPipeline, QualityChecker, ReportBuilder};
use steelyard_warehouse::{BigQueryGateway, WarehouseGateway};

#[derive(Parser)]
#[command(name = "steelyard")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Warehouse loading, quality checks, and EDA reporting", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bulk-load the source CSV into the raw shipments table
    Load,

    /// Run the quality checks and write the scored report
    Quality,

    /// Run the exploratory analysis: summary JSON plus charts
    Eda,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    steelyard_core::init_tracing(cli.json, level);

    let config = AppConfig::from_env();
    config.validate()?;

    let gateway: Arc<dyn WarehouseGateway> = Arc::new(
        BigQueryGateway::from_env(&config.project_id)
            .context("failed to build warehouse gateway")?,
    );

    match cli.command {
        Commands::Load => cmd_load(gateway, config).await,
        Commands::Quality => cmd_quality(gateway, config).await,
        Commands::Eda => cmd_eda(gateway, config).await,
    }
}

/// Bulk-load the source CSV, watching for Ctrl-C during the poll wait.
async fn cmd_load(gateway: Arc<dyn WarehouseGateway>, config: AppConfig) -> Result<()> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, abandoning the poll wait");
            let _ = tx.send(true);
        }
    });

    println!("Loading {} into {}", config.source_uri, config.table_id());

    let pipeline = LoadPipeline::new(gateway, config);
    let outcome = pipeline.run(rx).await.context("load pipeline failed")?;

    println!("Load complete");
    println!("  Rows loaded:     {}", outcome.rows_loaded);
    println!("  Files processed: {}", outcome.files_processed);
    println!(
        "  Table size:      {:.2} GiB",
        outcome.bytes as f64 / (1024.0 * 1024.0 * 1024.0)
    );

    Ok(())
}

/// Run the builtin quality checks and persist the scored report.
async fn cmd_quality(gateway: Arc<dyn WarehouseGateway>, config: AppConfig) -> Result<()> {
    let checker = Arc::new(QualityChecker::new(gateway, config.clone()));
    let builder = ReportBuilder::new(&config);

    let report = builder
        .run(&QualityChecker::builtin_checks(&checker))
        .await
        .context("quality report run failed")?;

    println!("Quality report for {}", report.target_identifier);
    for outcome in &report.checks {
        println!("  {:<20} {}", outcome.name, outcome.verdict.status());
    }
    println!(
        "Score: {:.1}% ({}/{} passed)",
        report.overall_score, report.summary.passed_checks, report.summary.total_checks
    );
    println!("Assessment: {}", report.tier().label());

    Ok(())
}

/// Run the exploratory analysis sequence end to end.
async fn cmd_eda(gateway: Arc<dyn WarehouseGateway>, config: AppConfig) -> Result<()> {
    let notebooks_dir = config.notebooks_dir.clone();
    let reporter = EdaReporter::new(gateway, config);
    let summary = reporter
        .run_all()
        .await
        .context("exploratory analysis failed")?;

    println!("EDA summary for {}", summary.target_identifier);
    if let Some(overview) = &summary.data_overview {
        println!("  Total records: {}", overview.total_records);
        println!(
            "  Date range:    {} to {} ({:.1} years)",
            overview.earliest_date, overview.latest_date, overview.duration_years
        );
        println!("  Source files:  {}", overview.source_files);
    }
    if let Some(schema) = &summary.schema {
        println!("  Columns:       {}", schema.total_columns);
    }
    println!("  Columns scanned for quality: {}", summary.data_quality.len());
    println!("Artifacts written to {}", notebooks_dir.display());

    Ok(())
}
