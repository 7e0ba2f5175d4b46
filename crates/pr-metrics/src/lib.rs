//! Pull request metrics for the Jira integration.
//!
//! This crate provides:
//! - A paginated GitHub client for recently updated pull requests
//! - Aggregate metrics (state counts, Jira-key compliance, merge latency,
//!   monthly trend)
//! - JSON and CSV report export
//! - Per-event lead time export for dashboards
//!
//! # Example
//!
//! ```no_run
//! use pr_metrics::{calculate_metrics, Exporter, GitHubClient, MetricsConfig, MetricsReport};
//! use jira_sync::KeyExtractor;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = MetricsConfig::from_env()?;
//! let client = GitHubClient::new(&config.api_url, config.token.as_deref(), config.timeout)?;
//! let prs = client.recent_pull_requests(&config.repository, config.since()).await?;
//!
//! let extractor = KeyExtractor::new(config.projects.clone());
//! let report = MetricsReport::new(calculate_metrics(&prs, &extractor), &config);
//! Exporter::new(&config.output_dir)?.export(&report, &prs, &extractor)?;
//! # Ok(())
//! # }
//! ```

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod config;
pub mod error;
pub mod export;
pub mod github;
pub mod lead_time;
pub mod metrics;

pub use config::{LeadTimeConfig, MetricsConfig};
pub use error::MetricsError;
pub use export::{Exporter, PullRequestRow};
pub use github::{GitHubClient, PullRequest};
pub use lead_time::LeadTimeRecord;
pub use metrics::{calculate_metrics, MetricsAccumulator, MetricsReport, MetricsSummary};
