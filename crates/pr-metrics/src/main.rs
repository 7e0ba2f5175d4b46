//! CLI for exporting pull request metrics
//!
//! Run `pr-metrics --help` for usage information.

// CLI binaries legitimately need println! for user output
#![allow(clippy::disallowed_macros)]

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use jira_sync::annotations::{self, Annotation};
use jira_sync::KeyExtractor;
use pr_metrics::{
    calculate_metrics, Exporter, GitHubClient, LeadTimeConfig, LeadTimeRecord, MetricsConfig,
    MetricsReport,
};

#[derive(Parser)]
#[command(name = "pr-metrics")]
#[command(about = "Export pull request lead time and Jira compliance metrics")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Webhook payload path
    #[arg(long, global = true, env = "GITHUB_EVENT_PATH")]
    event_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export metrics for recently updated pull requests
    Export {
        /// Lookback window in days (overrides DAYS_BACK)
        #[arg(long)]
        days_back: Option<u32>,

        /// Output directory (overrides METRICS_OUTPUT_DIR)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Record the lead time of the pull request in the current event
    LeadTime {
        /// Output directory (overrides DASHBOARD_OUTPUT_DIR)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries annotations
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    let result = match cli.command {
        Commands::Export {
            days_back,
            output_dir,
        } => run_export(days_back, output_dir).await,
        Commands::LeadTime { output_dir } => run_lead_time(cli.event_path.as_deref(), output_dir),
    };

    if let Err(err) = &result {
        println!("{}", Annotation::error(format!("{err:#}")));
    }
    result
}

async fn run_export(days_back: Option<u32>, output_dir: Option<PathBuf>) -> Result<()> {
    let mut config = MetricsConfig::from_env()?;
    if let Some(days) = days_back {
        config.days_back = days;
    }
    if let Some(dir) = output_dir {
        config.output_dir = dir;
    }

    info!(
        repository = %config.repository,
        days = config.days_back,
        "Exporting pull request metrics"
    );
    if config.token.is_none() {
        warn!("GITHUB_TOKEN is not set, using unauthenticated requests");
    }

    let client = GitHubClient::new(&config.api_url, config.token.as_deref(), config.timeout)
        .context("Failed to build GitHub client")?;
    let prs = client
        .recent_pull_requests(&config.repository, config.since())
        .await
        .context("Failed to fetch pull requests")?;

    let extractor = KeyExtractor::new(config.projects.clone());
    let report = MetricsReport::new(calculate_metrics(&prs, &extractor), &config);
    let exporter = Exporter::new(&config.output_dir)?;
    exporter.export(&report, &prs, &extractor)?;

    info!(
        compliance = report.summary.jira_compliance_rate,
        avg_merge_hours = report.summary.avg_time_to_merge_hours,
        "Metrics summary"
    );
    emit(&[Annotation::notice(format!(
        "Exported metrics for {} pull requests to {}: Jira compliance {}%, average time to merge {} hours",
        report.summary.total_prs,
        exporter.output_dir().display(),
        report.summary.jira_compliance_rate,
        report.summary.avg_time_to_merge_hours,
    ))])
}

fn run_lead_time(event_path: Option<&Path>, output_dir: Option<PathBuf>) -> Result<()> {
    let mut config = LeadTimeConfig::from_env();
    if let Some(dir) = output_dir {
        config.output_dir = dir;
    }

    let Some(record) = LeadTimeRecord::load(event_path)? else {
        return emit(&[Annotation::notice(
            "No pull request payload; skipping lead time export",
        )]);
    };

    record.write(&config.output_dir)?;
    let message = match record.lead_time_hours {
        Some(hours) => format!("PR #{} lead time: {hours} hours", record.number),
        None => format!("PR #{} is not merged yet", record.number),
    };
    emit(&[Annotation::notice(message)])
}

fn emit(annotations: &[Annotation]) -> Result<()> {
    annotations::emit(annotations).context("Failed to write annotations")
}
