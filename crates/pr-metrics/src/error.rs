//! Error types for metrics export.

use jira_sync::{ConfigError, EventError};
use thiserror::Error;

/// Errors that can occur while fetching or exporting metrics.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Missing or invalid configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Webhook payload could not be loaded
    #[error(transparent)]
    Event(#[from] EventError),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// GitHub answered with a non-success status
    #[error("GitHub API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Report file could not be written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV encoding failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON encoding or decoding failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
