//! Jira integration.
//!
//! [`IssueTracker`] is the seam the sync engine talks to; [`JiraClient`] is
//! the REST v3 implementation.

mod client;
pub mod models;

use async_trait::async_trait;

pub use client::JiraClient;
pub use models::{Comment, Issue, RemoteLink, RemoteLinkRequest, Transition};

use crate::error::JiraError;
use crate::keys::IssueKey;

/// Operations the sync engine needs from an issue tracker.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// Fetch an issue; fails when it does not exist or is not visible.
    async fn get_issue(&self, key: &IssueKey) -> Result<Issue, JiraError>;

    /// List remote links attached to an issue.
    async fn remote_links(&self, key: &IssueKey) -> Result<Vec<RemoteLink>, JiraError>;

    /// Attach a new remote link.
    async fn create_remote_link(
        &self,
        key: &IssueKey,
        link: &RemoteLinkRequest,
    ) -> Result<(), JiraError>;

    /// Overwrite an existing remote link in place.
    async fn update_remote_link(
        &self,
        key: &IssueKey,
        link_id: u64,
        link: &RemoteLinkRequest,
    ) -> Result<(), JiraError>;

    /// Post a comment.
    async fn add_comment(&self, key: &IssueKey, comment: &Comment) -> Result<(), JiraError>;

    /// Transitions available from the issue's current status.
    async fn transitions(&self, key: &IssueKey) -> Result<Vec<Transition>, JiraError>;

    /// Execute a transition by id.
    async fn transition(&self, key: &IssueKey, transition_id: &str) -> Result<(), JiraError>;
}
