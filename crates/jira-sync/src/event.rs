//! GitHub `pull_request` webhook payload.
//!
//! The raw payload is decoded once into [`PullRequestEvent`]. Defaults for
//! missing fields:
//! - strings (title, body, refs, URL, user) become empty
//! - `merged` becomes `false`
//! - a missing `state` is `closed` for the `closed` action and `open` otherwise
//! - unknown actions are kept as [`PrAction::Other`]

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;
use std::path::Path;

use crate::error::EventError;

/// Webhook `action` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrAction {
    Opened,
    Reopened,
    ReadyForReview,
    Synchronize,
    Closed,
    /// Any action the sync does not act on (labeled, edited, ...)
    Other(String),
}

impl PrAction {
    #[must_use]
    pub fn parse(action: &str) -> Self {
        match action {
            "opened" => Self::Opened,
            "reopened" => Self::Reopened,
            "ready_for_review" => Self::ReadyForReview,
            "synchronize" => Self::Synchronize,
            "closed" => Self::Closed,
            other => Self::Other(other.to_string()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Opened => "opened",
            Self::Reopened => "reopened",
            Self::ReadyForReview => "ready_for_review",
            Self::Synchronize => "synchronize",
            Self::Closed => "closed",
            Self::Other(other) => other,
        }
    }
}

impl fmt::Display for PrAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pull request state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrState {
    Open,
    Closed,
}

impl PrState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

/// Immutable snapshot of a pull request event.
#[derive(Debug, Clone, PartialEq)]
pub struct PullRequestEvent {
    pub action: PrAction,
    pub number: u64,
    pub title: String,
    pub body: String,
    pub head_ref: String,
    pub base_ref: String,
    pub state: PrState,
    pub merged: bool,
    pub html_url: String,
    /// PR author login
    pub user: String,
    /// Login of whoever triggered the event, when the payload names one
    pub sender: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub merged_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub merge_commit_sha: Option<String>,
}

impl PullRequestEvent {
    /// Decode a webhook payload.
    pub fn from_json(payload: &str) -> Result<Self, EventError> {
        let raw: WebhookPayload = serde_json::from_str(payload)?;
        raw.into_event()
    }

    /// Read and decode a webhook payload file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, EventError> {
        let path = path.as_ref();
        let payload = std::fs::read_to_string(path).map_err(|source| EventError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&payload)
    }

    /// Text sources scanned for an issue key, in priority order.
    #[must_use]
    pub fn key_sources(&self) -> [&str; 3] {
        [&self.head_ref, &self.title, &self.body]
    }

    /// Who to credit in comments: the sender, falling back to the PR author.
    #[must_use]
    pub fn actor(&self) -> &str {
        self.sender
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.user)
    }
}

/// Load the payload at `path`, if there is one.
///
/// Returns `Ok(None)` when no path is configured or the file does not exist,
/// which callers report as a skip rather than a failure.
pub fn load_event(path: Option<&Path>) -> Result<Option<PullRequestEvent>, EventError> {
    match path {
        Some(path) if path.exists() => PullRequestEvent::from_path(path).map(Some),
        _ => Ok(None),
    }
}

#[derive(Debug, Deserialize)]
struct WebhookPayload {
    #[serde(default)]
    action: String,
    pull_request: Option<RawPullRequest>,
    sender: Option<RawUser>,
}

#[derive(Debug, Deserialize)]
struct RawPullRequest {
    #[serde(default)]
    number: u64,
    title: Option<String>,
    body: Option<String>,
    head: Option<RawRef>,
    base: Option<RawRef>,
    state: Option<String>,
    merged: Option<bool>,
    html_url: Option<String>,
    user: Option<RawUser>,
    created_at: Option<DateTime<Utc>>,
    merged_at: Option<DateTime<Utc>>,
    closed_at: Option<DateTime<Utc>>,
    merge_commit_sha: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawRef {
    #[serde(rename = "ref", default)]
    ref_name: String,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    #[serde(default)]
    login: String,
}

impl WebhookPayload {
    fn into_event(self) -> Result<PullRequestEvent, EventError> {
        let pr = self.pull_request.ok_or(EventError::NotPullRequest)?;
        let action = PrAction::parse(&self.action);

        let state = match pr.state.as_deref() {
            Some("open") => PrState::Open,
            Some(_) => PrState::Closed,
            None if action == PrAction::Closed => PrState::Closed,
            None => PrState::Open,
        };

        Ok(PullRequestEvent {
            action,
            number: pr.number,
            title: pr.title.unwrap_or_default(),
            body: pr.body.unwrap_or_default(),
            head_ref: pr.head.map(|r| r.ref_name).unwrap_or_default(),
            base_ref: pr.base.map(|r| r.ref_name).unwrap_or_default(),
            state,
            merged: pr.merged.unwrap_or(false),
            html_url: pr.html_url.unwrap_or_default(),
            user: pr.user.map(|u| u.login).unwrap_or_default(),
            sender: self.sender.map(|u| u.login),
            created_at: pr.created_at,
            merged_at: pr.merged_at,
            closed_at: pr.closed_at,
            merge_commit_sha: pr.merge_commit_sha.filter(|sha| !sha.is_empty()),
        })
    }
}
