//! Configuration from environment variables.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::path::PathBuf;
use std::time::Duration;

use jira_sync::config::{optional_var, parsed_var, project_filter_from, required_var, timeout_from};
use jira_sync::{ConfigError, ProjectFilter};

/// Repository in `owner/repo` form.
pub const ENV_GITHUB_REPOSITORY: &str = "GITHUB_REPOSITORY";
/// Token for the GitHub REST API.
pub const ENV_GITHUB_TOKEN: &str = "GITHUB_TOKEN";
/// REST API root (set by GitHub Actions, differs on GHES).
pub const ENV_GITHUB_API_URL: &str = "GITHUB_API_URL";
/// Lookback window in days.
pub const ENV_DAYS_BACK: &str = "DAYS_BACK";
/// Directory for the batch reports.
pub const ENV_METRICS_OUTPUT_DIR: &str = "METRICS_OUTPUT_DIR";
/// Directory for the per-event lead time reports.
pub const ENV_DASHBOARD_OUTPUT_DIR: &str = "DASHBOARD_OUTPUT_DIR";

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_DAYS_BACK: u32 = 30;
pub const DEFAULT_METRICS_DIR: &str = "metrics";
pub const DEFAULT_DASHBOARD_DIR: &str = "dashboard/out";

/// Configuration for `pr-metrics export`.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    pub repository: String,
    pub token: Option<String>,
    pub api_url: String,
    pub days_back: u32,
    pub output_dir: PathBuf,
    pub projects: Option<ProjectFilter>,
    pub timeout: Duration,
}

impl MetricsConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let repository = required_var(&lookup, ENV_GITHUB_REPOSITORY)?;
        if !is_owner_repo(&repository) {
            return Err(ConfigError::Invalid {
                var: ENV_GITHUB_REPOSITORY,
                value: repository,
            });
        }

        Ok(Self {
            repository,
            token: optional_var(&lookup, ENV_GITHUB_TOKEN),
            api_url: optional_var(&lookup, ENV_GITHUB_API_URL)
                .unwrap_or_else(|| DEFAULT_API_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            days_back: parsed_var(&lookup, ENV_DAYS_BACK, DEFAULT_DAYS_BACK)?,
            output_dir: optional_var(&lookup, ENV_METRICS_OUTPUT_DIR)
                .map_or_else(|| PathBuf::from(DEFAULT_METRICS_DIR), PathBuf::from),
            projects: project_filter_from(&lookup),
            timeout: timeout_from(&lookup)?,
        })
    }

    /// Oldest `updated_at` included in the export.
    #[must_use]
    pub fn since(&self) -> DateTime<Utc> {
        self.since_from(Utc::now())
    }

    #[must_use]
    pub fn since_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - ChronoDuration::days(i64::from(self.days_back))
    }
}

/// Configuration for `pr-metrics lead-time`.
#[derive(Debug, Clone)]
pub struct LeadTimeConfig {
    pub output_dir: PathBuf,
}

impl LeadTimeConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            output_dir: optional_var(&lookup, ENV_DASHBOARD_OUTPUT_DIR)
                .map_or_else(|| PathBuf::from(DEFAULT_DASHBOARD_DIR), PathBuf::from),
        }
    }
}

fn is_owner_repo(repository: &str) -> bool {
    matches!(
        repository.split_once('/'),
        Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() && !repo.contains('/')
    )
}
