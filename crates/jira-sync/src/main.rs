//! CLI for syncing GitHub pull request events to Jira
//!
//! Run `jira-sync --help` for usage information.

// CLI binaries legitimately need println! for user output
#![allow(clippy::disallowed_macros)]

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use jira_sync::annotations::{self, Annotation};
use jira_sync::config;
use jira_sync::event::load_event;
use jira_sync::{
    prepare, EventError, IssueKey, JiraClient, KeyExtractor, SkipReason, SyncConfig, SyncEngine,
    SyncOutcome,
};

#[derive(Parser)]
#[command(name = "jira-sync")]
#[command(about = "Sync GitHub pull request events to Jira issues")]
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
    /// Link the PR to its Jira issue, comment and transition
    Sync,

    /// Print the Jira keys referenced by the current branch and PR as JSON
    Extract,
}

/// Output of `jira-sync extract`.
#[derive(Serialize)]
struct ExtractOutput {
    jira_keys: Vec<IssueKey>,
    ref_name: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries annotations and JSON
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    let event_path = cli.event_path.as_deref();
    let result = match cli.command {
        Commands::Sync => run_sync(event_path).await,
        Commands::Extract => run_extract(event_path),
    };

    if let Err(err) = &result {
        println!("{}", Annotation::error(format!("{err:#}")));
    }
    result
}

async fn run_sync(event_path: Option<&Path>) -> Result<()> {
    let event = match load_event(event_path) {
        Ok(Some(event)) => event,
        Ok(None) => return report(&SyncOutcome::Skipped(SkipReason::NoPayload)),
        Err(EventError::NotPullRequest) => {
            return report(&SyncOutcome::Skipped(SkipReason::NotPullRequest))
        }
        Err(e) => return Err(e.into()),
    };

    // Skips are decided before credentials are read
    let lookup = |var: &str| std::env::var(var).ok();
    let extractor = KeyExtractor::new(config::project_filter_from(&lookup));
    let prepared = match prepare(&extractor, &event) {
        Ok(prepared) => prepared,
        Err(reason) => return report(&SyncOutcome::Skipped(reason)),
    };

    let config = SyncConfig::from_env()?;
    let client = JiraClient::new(&config.jira).context("Failed to build Jira client")?;
    let engine = SyncEngine::new(client, extractor, config.transitions.clone());

    let sync = engine.execute(prepared, &event).await?;
    if sync.has_warnings() {
        warn!(key = %sync.key, pr = event.number, "Sync finished with warnings");
    } else {
        info!(key = %sync.key, pr = event.number, "Sync finished");
    }
    report(&SyncOutcome::Completed(sync))
}

fn report(outcome: &SyncOutcome) -> Result<()> {
    annotations::emit(&outcome.annotations()).context("Failed to write annotations")
}

fn run_extract(event_path: Option<&Path>) -> Result<()> {
    let lookup = |var: &str| std::env::var(var).ok();
    let extractor = KeyExtractor::new(config::project_filter_from(&lookup));

    let event = match load_event(event_path) {
        Ok(event) => event,
        Err(EventError::NotPullRequest) => None,
        Err(e) => return Err(e.into()),
    };

    let ref_name = config::optional_var(&lookup, "GITHUB_HEAD_REF")
        .or_else(|| config::optional_var(&lookup, "GITHUB_REF_NAME"))
        .or_else(|| event.as_ref().map(|e| e.head_ref.clone()))
        .unwrap_or_default();

    let (title, body) = event
        .as_ref()
        .map_or(("", ""), |e| (e.title.as_str(), e.body.as_str()));

    let output = ExtractOutput {
        jira_keys: extractor.unique_keys(&[ref_name.as_str(), title, body]),
        ref_name,
    };
    info!(keys = output.jira_keys.len(), "Extracted Jira keys");

    println!("{}", serde_json::to_string(&output)?);
    Ok(())
}
