//! Ledger Report Binary
//!
//! Reads an exported group snapshot and prints balances plus suggested transfers.
//!
//! ```text
//! ledger-report <SNAPSHOT> [--format text|json]
//! ```

use anyhow::Context;
use clap::Parser;
use ledger_core::{GroupSnapshot, MemoryStore};
use settlement::{config::ReportFormat, report::render_text, Config, SettlementEngine};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Print balances and suggested transfers for an exported group
#[derive(Debug, Parser)]
#[command(name = "ledger-report", version)]
struct Args {
    /// Snapshot file written by `export_snapshot`
    snapshot: PathBuf,

    /// Output format (overrides SETTLEMENT_REPORT_FORMAT)
    #[arg(long, value_enum)]
    format: Option<ReportFormat>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    // Load configuration
    let mut config = if let Ok(config_path) = std::env::var("SETTLEMENT_CONFIG") {
        info!("Loading config from: {}", config_path);
        Config::from_file(&config_path)?
    } else {
        Config::from_env()?
    };
    if let Some(format) = args.format {
        config.report.format = format;
    }

    let json = tokio::fs::read_to_string(&args.snapshot)
        .await
        .with_context(|| format!("failed to read {}", args.snapshot.display()))?;
    let snapshot = GroupSnapshot::from_json(&json)?;
    let history = snapshot.history.clone();

    // Snapshots are replayed in memory; nothing is written back
    let engine = SettlementEngine::with_repository(config.clone(), Arc::new(MemoryStore::new()))?;
    let group_id = engine.import_snapshot(snapshot).await?;
    let summary = engine.group_summary(&group_id).await?;

    info!(
        "Group {}: {} balances, {} suggested transfers",
        group_id,
        summary.balances.len(),
        summary.suggestions.len()
    );

    match config.report.format {
        ReportFormat::Text => print!(
            "{}",
            render_text(&summary, &history, config.ledger.default_currency)
        ),
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
    }

    Ok(())
}
