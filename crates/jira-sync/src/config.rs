//! Configuration from environment variables.
//!
//! Everything is read once at startup. Required values fail fast with
//! [`ConfigError::Missing`] before any network call is made.

use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::keys::ProjectFilter;

/// Jira site base URL (e.g. `https://example.atlassian.net`).
pub const ENV_JIRA_BASE_URL: &str = "JIRA_BASE_URL";
/// Jira account email used for basic auth.
pub const ENV_JIRA_USER_EMAIL: &str = "JIRA_USER_EMAIL";
/// Jira API token used for basic auth.
pub const ENV_JIRA_API_TOKEN: &str = "JIRA_API_TOKEN";
/// Comma-separated project allow-list.
pub const ENV_JIRA_ALLOWED_PROJECTS: &str = "JIRA_ALLOWED_PROJECTS";
/// Transition applied when a PR is opened or updated.
pub const ENV_JIRA_TRANSITION_IN_REVIEW: &str = "JIRA_TRANSITION_IN_REVIEW";
/// Transition applied when a PR is merged.
pub const ENV_JIRA_TRANSITION_DONE: &str = "JIRA_TRANSITION_DONE";
/// Per-request timeout in seconds.
pub const ENV_HTTP_TIMEOUT_SECS: &str = "HTTP_TIMEOUT_SECS";

/// Default timeout for every outbound request.
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;

/// Jira connection settings.
#[derive(Debug, Clone)]
pub struct JiraConfig {
    /// Site URL without trailing slash
    pub base_url: String,
    pub user_email: String,
    pub api_token: String,
    pub timeout: Duration,
}

/// Transition names (or ids) to drive per PR lifecycle step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionConfig {
    pub in_review: Option<String>,
    pub done: Option<String>,
}

/// Full configuration for `jira-sync sync`.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub jira: JiraConfig,
    pub projects: Option<ProjectFilter>,
    pub transitions: TransitionConfig,
}

impl SyncConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = required_var(&lookup, ENV_JIRA_BASE_URL)?
            .trim_end_matches('/')
            .to_string();

        let jira = JiraConfig {
            base_url,
            user_email: required_var(&lookup, ENV_JIRA_USER_EMAIL)?,
            api_token: required_var(&lookup, ENV_JIRA_API_TOKEN)?,
            timeout: timeout_from(&lookup)?,
        };

        Ok(Self {
            jira,
            projects: project_filter_from(&lookup),
            transitions: TransitionConfig {
                in_review: optional_var(&lookup, ENV_JIRA_TRANSITION_IN_REVIEW),
                done: optional_var(&lookup, ENV_JIRA_TRANSITION_DONE),
            },
        })
    }
}

/// Read a variable that must be present and non-empty.
pub fn required_var<F>(lookup: &F, var: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    optional_var(lookup, var).ok_or(ConfigError::Missing(var))
}

/// Read a variable, treating empty or whitespace-only values as unset.
pub fn optional_var<F>(lookup: &F, var: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(var)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a variable, falling back to `default` when unset.
pub fn parsed_var<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match optional_var(lookup, var) {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
        None => Ok(default),
    }
}

/// Request timeout from `HTTP_TIMEOUT_SECS`.
pub fn timeout_from<F>(lookup: &F) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let secs = parsed_var(lookup, ENV_HTTP_TIMEOUT_SECS, DEFAULT_TIMEOUT_SECS)?;
    if secs == 0 {
        return Err(ConfigError::Invalid {
            var: ENV_HTTP_TIMEOUT_SECS,
            value: secs.to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}

/// Project allow-list from `JIRA_ALLOWED_PROJECTS`.
pub fn project_filter_from<F>(lookup: &F) -> Option<ProjectFilter>
where
    F: Fn(&str) -> Option<String>,
{
    optional_var(lookup, ENV_JIRA_ALLOWED_PROJECTS).and_then(|list| ProjectFilter::parse(&list))
}
