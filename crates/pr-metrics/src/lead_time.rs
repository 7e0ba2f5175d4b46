//! Lead time of the pull request in the current webhook event.
//!
//! Each run overwrites `latest.json` and appends one row to `history.csv`,
//! so a dashboard job can accumulate history across workflow runs.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::MetricsError;
use crate::github::hours_between;
use crate::metrics::round2;
use jira_sync::event::load_event;
use jira_sync::{EventError, PullRequestEvent};

pub const LATEST_JSON: &str = "latest.json";
pub const HISTORY_CSV: &str = "history.csv";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadTimeRecord {
    pub number: u64,
    pub state: String,
    pub created_at: Option<DateTime<Utc>>,
    pub merged_at: Option<DateTime<Utc>>,
    /// Creation to merge, 2 dp; `None` until merged
    pub lead_time_hours: Option<f64>,
}

impl LeadTimeRecord {
    #[must_use]
    pub fn from_event(event: &PullRequestEvent) -> Self {
        let lead_time_hours = match (event.created_at, event.merged_at) {
            (Some(created), Some(merged)) => Some(round2(hours_between(created, merged))),
            _ => None,
        };

        Self {
            number: event.number,
            state: event.state.as_str().to_string(),
            created_at: event.created_at,
            merged_at: event.merged_at,
            lead_time_hours,
        }
    }

    /// Build the record from the payload at `path`.
    ///
    /// Returns `Ok(None)` when there is no payload or it is not a pull
    /// request event.
    pub fn load(path: Option<&Path>) -> Result<Option<Self>, MetricsError> {
        match load_event(path) {
            Ok(event) => Ok(event.as_ref().map(Self::from_event)),
            Err(EventError::NotPullRequest) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write `latest.json` and append to `history.csv` under `dir`.
    pub fn write(&self, dir: &Path) -> Result<PathBuf, MetricsError> {
        fs::create_dir_all(dir)?;

        let latest = dir.join(LATEST_JSON);
        fs::write(&latest, serde_json::to_string_pretty(self)?)?;

        let history = dir.join(HISTORY_CSV);
        let is_new = !history.exists();
        let file = OpenOptions::new().create(true).append(true).open(&history)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(is_new)
            .from_writer(file);
        writer.serialize(self)?;
        writer.flush()?;

        info!(
            pr = self.number,
            lead_time_hours = ?self.lead_time_hours,
            dir = %dir.display(),
            "Lead time exported"
        );
        Ok(history)
    }
}
