//! GitHub pull request to Jira issue synchronization.
//!
//! This crate provides:
//! - Jira issue-key extraction from branch names, titles and bodies
//! - A typed model of the GitHub `pull_request` webhook payload
//! - A small Jira REST client (issues, remote links, comments, transitions)
//! - The sync engine that maps PR actions to Jira side effects
//! - GitHub Actions annotation output (`::notice::`, `::warning::`, `::error::`)
//!
//! # Example
//!
//! ```no_run
//! use jira_sync::{JiraClient, KeyExtractor, SyncConfig, SyncEngine, PullRequestEvent};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = SyncConfig::from_env()?;
//! let event = PullRequestEvent::from_path("event.json")?;
//!
//! let engine = SyncEngine::new(
//!     JiraClient::new(&config.jira)?,
//!     KeyExtractor::new(config.projects.clone()),
//!     config.transitions.clone(),
//! );
//! let outcome = engine.run(&event).await?;
//! for annotation in outcome.annotations() {
//!     println!("{annotation}");
//! }
//! # Ok(())
//! # }
//! ```

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)] // Every Jira call can fail the same way

pub mod annotations;
pub mod config;
pub mod error;
pub mod event;
pub mod jira;
pub mod keys;
pub mod sync;

pub use annotations::{Annotation, AnnotationLevel};
pub use config::{JiraConfig, SyncConfig, TransitionConfig};
pub use error::{ConfigError, EventError, JiraError, SyncError};
pub use event::{PrAction, PrState, PullRequestEvent};
pub use jira::{IssueTracker, JiraClient};
pub use keys::{extract_keys, first_key, IssueKey, KeyExtractor, ProjectFilter};
pub use sync::{
    prepare, LinkOutcome, PreparedSync, SkipReason, SyncEngine, SyncOutcome, SyncReport,
    TransitionOutcome,
};
