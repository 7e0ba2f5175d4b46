//! Error types for configuration, payload decoding, Jira access and sync.

use std::path::PathBuf;
use thiserror::Error;

use crate::keys::IssueKey;

/// Errors raised while reading configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is unset or empty
    #[error("Required environment variable {0} is not set")]
    Missing(&'static str),

    /// A variable is set but cannot be parsed
    #[error("Invalid value for {var}: '{value}'")]
    Invalid { var: &'static str, value: String },
}

/// Errors raised while loading the webhook payload.
#[derive(Debug, Error)]
pub enum EventError {
    /// The payload file could not be read
    #[error("Failed to read event payload {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The payload is not valid JSON for a webhook event
    #[error("Failed to parse event payload: {0}")]
    Parse(#[from] serde_json::Error),

    /// The payload carries no `pull_request` object
    #[error("Event payload has no pull_request object")]
    NotPullRequest,
}

/// Errors returned by the Jira REST client.
#[derive(Debug, Error)]
pub enum JiraError {
    /// HTTP request failed (connection, timeout, TLS)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Jira answered with a non-success status
    #[error("Jira API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Resource does not exist or is hidden from the current credentials
    #[error("Not found: {0}")]
    NotFound(String),

    /// Response body did not match the expected shape
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Fatal sync failures. Everything else is reported as a warning.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The issue could not be verified before any mutation
    #[error("Jira issue {key} is not accessible: {source}")]
    IssueUnavailable {
        key: IssueKey,
        #[source]
        source: JiraError,
    },
}
