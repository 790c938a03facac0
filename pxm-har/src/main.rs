//! pxm-har - HAR metrics merger
//!
//! Reads the four HAR exports of one pixel/conversions API setup and prints
//! the merged per-event metrics table as JSON. Logs go to stderr so stdout
//! carries only the table.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use pxm_common::config::ConfigResolver;
use pxm_common::logging::init_tracing;
use pxm_har::{build_metrics_from_paths, MetricsReport};
use tokio::signal;
use tracing::{info, warn};

/// Command-line arguments for pxm-har
#[derive(Parser, Debug)]
#[command(name = "pxm-har")]
#[command(about = "Merge pixel/CAPI HAR exports into one per-event metrics table")]
#[command(version)]
struct Args {
    /// The four HAR files (setup_quality, new_har_event_count,
    /// additional_attributed_conversions, deduplication), in any order
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// TOML configuration file (falls back to PXM_CONFIG, then the default location)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write JSON here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Drop every "recommendation or issue" column
    #[arg(long)]
    prune_recommendations: bool,

    /// Pretty-print JSON
    #[arg(long)]
    pretty: bool,

    /// Log per-source ingest summaries
    #[arg(long)]
    summary: bool,

    /// Log level (falls back to PXM_LOG_LEVEL, then config)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let resolver = ConfigResolver::new(args.config.clone());
    let config = resolver.resolve().context("Failed to load configuration")?;
    let level = resolver.log_level(args.log_level.as_deref(), &config);
    init_tracing(&level).context("Failed to initialize logging")?;

    info!(
        "Starting pxm-har v{} with {} file(s)",
        env!("CARGO_PKG_VERSION"),
        args.files.len()
    );

    // Interrupting before the batch completes discards everything
    let report = tokio::select! {
        result = build_metrics_from_paths(&args.files) => {
            result.context("Failed to build metrics table")?
        }
        _ = signal::ctrl_c() => {
            warn!("Received Ctrl+C, discarding partial results");
            bail!("Interrupted before the batch completed");
        }
    };

    if args.summary {
        log_summaries(&report);
    }

    let report = if args.prune_recommendations || config.report.prune_recommendations {
        report.pruned()
    } else {
        report
    };

    let pretty = args.pretty || config.report.pretty;
    let json = if pretty {
        serde_json::to_string_pretty(&report.records)
    } else {
        serde_json::to_string(&report.records)
    }
    .context("Failed to serialize metrics table")?;

    match args.output.or(config.report.output) {
        Some(path) => {
            tokio::fs::write(&path, json)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote {} rows to {}", report.records.len(), path.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}

fn log_summaries(report: &MetricsReport) {
    for summary in &report.summaries {
        info!(
            source = %summary.source,
            entries = summary.entries,
            applied = summary.applied,
            updates = summary.updates,
            skipped = summary.skipped_total(),
            "Ingest summary"
        );
        for (reason, count) in &summary.skipped {
            info!(source = %summary.source, %reason, count, "Skipped captures");
        }
        for (reason, count) in &summary.skipped_items {
            info!(source = %summary.source, %reason, count, "Skipped items");
        }
    }
}
